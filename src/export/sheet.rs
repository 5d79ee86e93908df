//! Writing per-image colony counts into a day-by-sample workbook.
//!
//! The sheet layout is a header row of day numbers; somewhere below each day
//! header sits a cell reading `colonies`, and sample `n` goes `n` rows below it.

use log::{debug, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use umya_spreadsheet::{Spreadsheet, reader, writer};

use super::ExportError;
use crate::model::Timepoint;
use crate::session::DetectionSession;

const HEADER_ROW: u32 = 1;
const COLONIES_LABEL: &str = "colonies";

/// 1-based worksheet coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub column: u32,
    pub row: u32,
}

pub trait CountSheet {
    fn cell_text(&self, column: u32, row: u32) -> Option<String>;

    /// Highest used (column, row).
    fn extent(&self) -> (u32, u32);

    fn write(&mut self, cell: CellRef, count: usize) -> Result<(), ExportError>;

    fn save(&mut self) -> Result<(), ExportError>;

    fn locate(&self, day: i64, sample: u32) -> Result<CellRef, ExportError> {
        let (max_col, max_row) = self.extent();
        let column = (1..=max_col)
            .find(|&col| {
                self.cell_text(col, HEADER_ROW)
                    .and_then(|text| text.trim().parse::<f64>().ok())
                    .is_some_and(|value| value == day as f64)
            })
            .ok_or(ExportError::ColumnNotFound { day })?;
        let colonies_row = (1..=max_row)
            .find(|&row| {
                self.cell_text(column, row)
                    .is_some_and(|text| text.trim().eq_ignore_ascii_case(COLONIES_LABEL))
            })
            .ok_or(ExportError::RowNotFound { day })?;
        let row = colonies_row
            .checked_add(sample)
            .ok_or(ExportError::RowOutOfRange { day, sample })?;
        Ok(CellRef { column, row })
    }
}

/// Writes every resolved timepoint, ordered by sample number.
///
/// Every target cell is located before the first write, so a missing day
/// column or `colonies` row leaves the sheet untouched. The sheet is saved
/// once, after all writes.
pub fn export_counts<S: CountSheet + ?Sized>(
    sessions: &[DetectionSession],
    sheet: &mut S,
) -> Result<usize, ExportError> {
    let mut timepoints: Vec<Timepoint> = sessions.iter().filter_map(|s| s.timepoint()).collect();
    timepoints.sort_by_key(|t| t.sample_number);

    let plan = timepoints
        .iter()
        .map(|t| Ok((sheet.locate(t.day, t.sample_number)?, t.num_keypoints)))
        .collect::<Result<Vec<_>, ExportError>>()?;

    for &(cell, count) in &plan {
        debug!("writing {count} at column {} row {}", cell.column, cell.row);
        sheet.write(cell, count)?;
    }
    sheet.save()?;
    info!("exported {} counts", plan.len());
    Ok(plan.len())
}

/// First worksheet of an `.xlsx` workbook, saved back to the same path.
pub struct XlsxSheet {
    path: PathBuf,
    book: Spreadsheet,
}

impl XlsxSheet {
    pub fn open(path: &Path) -> Result<Self, ExportError> {
        let book = reader::xlsx::read(path).map_err(|source| ExportError::Workbook {
            path: path.to_path_buf(),
            source,
        })?;
        if book.get_sheet(&0).is_none() {
            return Err(ExportError::MissingWorksheet {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            book,
        })
    }
}

impl CountSheet for XlsxSheet {
    fn cell_text(&self, column: u32, row: u32) -> Option<String> {
        let cell = self.book.get_sheet(&0)?.get_cell((column, row))?;
        Some(cell.get_value().into_owned())
    }

    fn extent(&self) -> (u32, u32) {
        self.book
            .get_sheet(&0)
            .map(|ws| ws.get_highest_column_and_row())
            .unwrap_or((0, 0))
    }

    fn write(&mut self, cell: CellRef, count: usize) -> Result<(), ExportError> {
        let ws = self
            .book
            .get_sheet_mut(&0)
            .ok_or_else(|| ExportError::MissingWorksheet {
                path: self.path.clone(),
            })?;
        ws.get_cell_mut((cell.column, cell.row))
            .set_value_number(count as f64);
        Ok(())
    }

    fn save(&mut self) -> Result<(), ExportError> {
        writer::xlsx::write(&self.book, &self.path).map_err(|source| ExportError::Workbook {
            path: self.path.clone(),
            source,
        })?;
        info!("workbook saved to {}", self.path.display());
        Ok(())
    }
}

/// In-memory sheet that records what was written and how often it was saved.
#[derive(Debug, Clone, Default)]
pub struct GridSheet {
    cells: BTreeMap<(u32, u32), String>,
    writes: Vec<(CellRef, usize)>,
    saves: usize,
}

impl GridSheet {
    /// `rows[0]` is worksheet row 1, `rows[r][0]` column 1. Empty strings
    /// are left blank.
    pub fn from_rows<'a, R: AsRef<[&'a str]>>(rows: &[R]) -> Self {
        let mut sheet = Self::default();
        for (r, row) in rows.iter().enumerate() {
            for (c, text) in row.as_ref().iter().enumerate() {
                if !text.is_empty() {
                    sheet
                        .cells
                        .insert((c as u32 + 1, r as u32 + 1), text.to_string());
                }
            }
        }
        sheet
    }

    pub fn writes(&self) -> &[(CellRef, usize)] {
        &self.writes
    }

    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl CountSheet for GridSheet {
    fn cell_text(&self, column: u32, row: u32) -> Option<String> {
        self.cells.get(&(column, row)).cloned()
    }

    fn extent(&self) -> (u32, u32) {
        self.cells
            .keys()
            .fold((0, 0), |(c, r), &(col, row)| (c.max(col), r.max(row)))
    }

    fn write(&mut self, cell: CellRef, count: usize) -> Result<(), ExportError> {
        self.cells.insert((cell.column, cell.row), count.to_string());
        self.writes.push((cell, count));
        Ok(())
    }

    fn save(&mut self) -> Result<(), ExportError> {
        self.saves += 1;
        Ok(())
    }
}
