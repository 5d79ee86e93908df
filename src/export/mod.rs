pub mod annotate;
pub use annotate::export_annotated;
pub mod markers;
pub use markers::export_markers;
pub mod sheet;
pub use sheet::{CellRef, CountSheet, GridSheet, XlsxSheet, export_counts};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("day {day} not found in the header row")]
    ColumnNotFound { day: i64 },
    #[error("no 'colonies' cell under day {day}")]
    RowNotFound { day: i64 },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sample {sample} is out of sheet range under day {day}")]
    RowOutOfRange { day: i64, sample: u32 },
    #[error("workbook error for {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: umya_spreadsheet::XlsxError,
    },
    #[error("workbook {path} has no worksheet")]
    MissingWorksheet { path: PathBuf },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}
