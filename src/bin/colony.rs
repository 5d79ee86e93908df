use clap::Parser;
use log::{error, info};
use std::error::Error;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use colony_counter::batch::{BatchRunner, CancelToken, DEFAULT_CONCURRENCY};
use colony_counter::export::{XlsxSheet, export_annotated, export_counts, export_markers};
use colony_counter::{DetectionParams, DetectionSession, ExportConfig, NameResolver};

#[derive(Parser, Debug)]
#[command(
    name = "colony",
    about = "Count colonies in plate photographs and export the counts",
    version
)]
struct Cli {
    /// Directory containing plate images
    #[arg(short = 'd', long = "dir")]
    dir: PathBuf,

    /// JSON file overriding detection parameters
    #[arg(short = 'p', long = "params")]
    params: Option<PathBuf>,

    /// Workbook to write counts into (day header row, "colonies" row)
    #[arg(short = 'w', long = "workbook")]
    workbook: Option<PathBuf>,

    /// Write keypoint positions as JSON into the output directory
    #[arg(short = 'm', long = "markers")]
    markers: bool,

    /// Write annotated images into the output directory
    #[arg(short = 'a', long = "annotate")]
    annotate: bool,

    /// Output directory for markers and annotated images
    #[arg(short = 'o', long = "out", default_value = "counted_images")]
    out: PathBuf,

    /// Number of images processed at once
    #[arg(short = 'j', long = "concurrency", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,
}

fn is_image_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(OsStr::to_str) else {
        return false;
    };
    matches!(
        ext.to_ascii_lowercase().as_str(),
        "png" | "jpg" | "jpeg" | "bmp"
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    if !cli.dir.is_dir() {
        return Err(format!("Not a directory: {}", cli.dir.display()).into());
    }

    let params = match &cli.params {
        Some(path) => DetectionParams::from_json_file(path)?,
        None => DetectionParams::default(),
    };

    let mut images: Vec<PathBuf> = fs::read_dir(&cli.dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_image_file(p))
        .collect();
    images.sort();

    if images.is_empty() {
        eprintln!("No images found in {}", cli.dir.display());
        return Ok(());
    }

    let runner = BatchRunner::new(cli.concurrency);
    let report = runner
        .open_all(
            images,
            &params,
            &NameResolver::default(),
            &CancelToken::new(),
            |path, result| match result {
                Ok(session) => info!("{} done ({} colonies)", path.display(), session.total()),
                Err(e) => error!("{}: {e}", path.display()),
            },
        )
        .await;

    let mut sessions: Vec<DetectionSession> = report.sessions;
    sessions.sort_by_key(|s| s.resolved_name().sample);
    for session in &sessions {
        println!("{} - Keypoints: {}", session.display_name(), session.total());
    }
    for (path, e) in &report.failures {
        eprintln!("Failed to open {}: {e}", path.display());
    }

    if let Some(workbook) = &cli.workbook {
        let mut sheet = XlsxSheet::open(workbook)?;
        let written = export_counts(&sessions, &mut sheet)?;
        println!("Wrote {written} counts to {}", workbook.display());
    }

    let config = ExportConfig {
        output_dir: cli.out.clone(),
        ..ExportConfig::default()
    };

    if cli.markers {
        let path = config.output_dir.join(&config.markers_file);
        export_markers(&sessions, &path)?;
        println!("Keypoints written to {}", path.display());
    }

    if cli.annotate {
        for session in &sessions {
            match export_annotated(session, &config) {
                Ok(Some(path)) => println!("Annotated image written to {}", path.display()),
                Ok(None) => eprintln!("Skipped {} (no day/sample)", session.display_name()),
                Err(e) => eprintln!(
                    "Failed to annotate {}: {e}",
                    session.path().display()
                ),
            }
        }
    }

    Ok(())
}
