//! Keypoint positions of every counted image, grouped day then sample.

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::ExportError;
use crate::session::DetectionSession;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerPoint {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMarkers {
    pub sample: u32,
    pub keypoints: Vec<MarkerPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayMarkers {
    pub day: i64,
    pub samples: Vec<SampleMarkers>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerDocument {
    pub days: Vec<DayMarkers>,
}

impl MarkerDocument {
    /// Sessions without a timepoint are left out.
    pub fn collect(sessions: &[DetectionSession]) -> Self {
        let mut tree: BTreeMap<i64, BTreeMap<u32, Vec<MarkerPoint>>> = BTreeMap::new();
        for session in sessions {
            let Some(tp) = session.timepoint() else {
                continue;
            };
            tree.entry(tp.day)
                .or_default()
                .entry(tp.sample_number)
                .or_default()
                .extend(session.keypoints().map(|kp| MarkerPoint {
                    x: kp.center.0,
                    y: kp.center.1,
                    radius: kp.radius,
                }));
        }

        let days = tree
            .into_iter()
            .map(|(day, samples)| DayMarkers {
                day,
                samples: samples
                    .into_iter()
                    .map(|(sample, keypoints)| SampleMarkers { sample, keypoints })
                    .collect(),
            })
            .collect();
        Self { days }
    }
}

pub fn export_markers(sessions: &[DetectionSession], path: &Path) -> Result<MarkerDocument, ExportError> {
    let document = MarkerDocument::collect(sessions);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(&document)?)?;
    info!("keypoints exported to {}", path.display());
    Ok(document)
}
