//! Tunable settings for detection, filename parsing and export.

use image::Rgb;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MIN_AREA: f32 = 144.0;
pub const DEFAULT_MAX_AREA: f32 = 5000.0;
pub const DEFAULT_MIN_CIRCULARITY: f32 = 0.4;
pub const DEFAULT_MIN_CONVEXITY: f32 = 0.80;
pub const DEFAULT_MIN_INERTIA_RATIO: f32 = 0.01;
pub const DEFAULT_MIN_DISTANCE_BETWEEN_BLOBS: f32 = 1.0;
pub const DEFAULT_MIN_THRESHOLD: u8 = 100;
pub const DEFAULT_MAX_THRESHOLD: u8 = 160;
pub const DEFAULT_THRESHOLD_STEP: u8 = 10;
pub const DEFAULT_MIN_REPEATABILITY: usize = 2;
/// Radius of a keypoint placed by hand (40px diameter).
pub const NEW_KEYPOINT_RADIUS: f32 = 20.0;

const DEFAULT_DILUTION_ORDINAL: &str = "3rd";
const ANNOTATION_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const ANNOTATION_THICKNESS: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("failed to read params file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid params json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("min area {min} exceeds max area {max}")]
    AreaRange { min: f32, max: f32 },
    #[error("min threshold {min} exceeds max threshold {max}")]
    ThresholdRange { min: u8, max: u8 },
    #[error("threshold step must be positive")]
    ZeroThresholdStep,
}

/// Snapshot of every knob the detection pipeline reads.
///
/// A pipeline run takes the params by reference and never mutates them, so a
/// recount under new settings always starts from a fresh copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    pub min_area: f32,
    pub max_area: f32,
    pub min_circularity: f32,
    pub min_convexity: f32,
    pub min_inertia_ratio: f32,
    pub min_distance_between_blobs: f32,
    pub min_threshold: u8,
    pub max_threshold: u8,
    pub threshold_step: u8,
    pub min_repeatability: usize,
    pub apply_blur: bool,
    pub apply_morphology: bool,
    pub new_keypoint_radius: f32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            min_area: DEFAULT_MIN_AREA,
            max_area: DEFAULT_MAX_AREA,
            min_circularity: DEFAULT_MIN_CIRCULARITY,
            min_convexity: DEFAULT_MIN_CONVEXITY,
            min_inertia_ratio: DEFAULT_MIN_INERTIA_RATIO,
            min_distance_between_blobs: DEFAULT_MIN_DISTANCE_BETWEEN_BLOBS,
            min_threshold: DEFAULT_MIN_THRESHOLD,
            max_threshold: DEFAULT_MAX_THRESHOLD,
            threshold_step: DEFAULT_THRESHOLD_STEP,
            min_repeatability: DEFAULT_MIN_REPEATABILITY,
            apply_blur: false,
            apply_morphology: false,
            new_keypoint_radius: NEW_KEYPOINT_RADIUS,
        }
    }
}

impl DetectionParams {
    /// Loads params from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ParamsError> {
        let text = std::fs::read_to_string(path).map_err(|source| ParamsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let params: Self = serde_json::from_str(&text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.min_area > self.max_area {
            return Err(ParamsError::AreaRange {
                min: self.min_area,
                max: self.max_area,
            });
        }
        if self.min_threshold > self.max_threshold {
            return Err(ParamsError::ThresholdRange {
                min: self.min_threshold,
                max: self.max_threshold,
            });
        }
        if self.threshold_step == 0 {
            return Err(ParamsError::ZeroThresholdStep);
        }
        Ok(())
    }

    pub fn area_in_range(&self, area: f32) -> bool {
        (self.min_area..=self.max_area).contains(&area)
    }
}

/// Filename/folder conventions understood by [`crate::naming::NameResolver`].
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub delimiter: char,
    pub dilution_marker: String,
    pub label_suffix: String,
    pub default_ordinal: String,
    pub use_day: bool,
    pub use_dilution: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            delimiter: '_',
            dilution_marker: "dilution".to_string(),
            label_suffix: "label".to_string(),
            default_ordinal: DEFAULT_DILUTION_ORDINAL.to_string(),
            use_day: true,
            use_dilution: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub color: Rgb<u8>,
    pub thickness: u32,
    pub markers_file: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("counted_images"),
            color: ANNOTATION_COLOR,
            thickness: ANNOTATION_THICKNESS,
            markers_file: "keypoints.json".to_string(),
        }
    }
}
