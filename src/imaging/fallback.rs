use image::{GrayImage, Luma};
use imageproc::contours::find_contours;
use imageproc::drawing::draw_filled_circle_mut;
use log::debug;

use super::morphology;
use super::shape;
use crate::model::{BlobCandidate, BoundingBox, RegionCandidate};
use crate::params::DetectionParams;

pub const MIN_ASPECT_RATIO: f32 = 0.8;
pub const MAX_ASPECT_RATIO: f32 = 1.2;

/// Recovers near-circular colonies the blob sweep missed by tracing
/// contours in whatever the detected blobs leave uncovered.
#[derive(Debug, Clone)]
pub struct ContourFallbackDetector {
    params: DetectionParams,
}

impl ContourFallbackDetector {
    pub fn new(params: &DetectionParams) -> Self {
        Self {
            params: params.clone(),
        }
    }

    /// `foreground` restricts the search to segmented colony pixels; pass
    /// `None` to search the whole uncovered image.
    pub fn detect(
        &self,
        width: u32,
        height: u32,
        blobs: &[BlobCandidate],
        foreground: Option<&GrayImage>,
    ) -> Vec<RegionCandidate> {
        let mut mask = coverage_mask(width, height, blobs);
        morphology::invert(&mut mask);
        if let Some(foreground) = foreground {
            for (px, fg) in mask.pixels_mut().zip(foreground.pixels()) {
                if fg[0] == 0 {
                    px[0] = 0;
                }
            }
        }

        let contours = find_contours::<i32>(&mask);
        let total = contours.len();
        let regions: Vec<RegionCandidate> = contours
            .into_iter()
            .filter_map(|contour| {
                let points: Vec<(i32, i32)> =
                    contour.points.iter().map(|pt| (pt.x, pt.y)).collect();
                retain_region(points, &self.params)
            })
            .collect();
        debug!("contour fallback kept {} of {} contours", regions.len(), total);
        regions
    }
}

/// Filled discs at every blob, 255 inside.
pub fn coverage_mask(width: u32, height: u32, blobs: &[BlobCandidate]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    for blob in blobs {
        let center = (blob.center.0.round() as i32, blob.center.1.round() as i32);
        draw_filled_circle_mut(&mut mask, center, blob.radius.ceil() as i32, Luma([255]));
    }
    mask
}

/// Area and bounding-box aspect filter for a traced contour.
pub fn retain_region(points: Vec<(i32, i32)>, params: &DetectionParams) -> Option<RegionCandidate> {
    let bbox = BoundingBox::of(&points)?;
    let area = shape::polygon_area(&points) as f32;
    if !params.area_in_range(area) {
        return None;
    }
    let aspect = bbox.aspect_ratio();
    if !(MIN_ASPECT_RATIO..=MAX_ASPECT_RATIO).contains(&aspect) {
        return None;
    }
    Some(RegionCandidate { points, area, bbox })
}
