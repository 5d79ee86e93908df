//! Threshold + distance-transform + watershed segmentation of a plate image.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::{ThresholdType, threshold};
use imageproc::region_labelling::{Connectivity, connected_components};
use log::debug;

use super::morphology::{self, DistanceMap};
use super::raster::{GrayRaster, Raster};
use super::watershed::{BOUNDARY, LabelMap, watershed};
use crate::params::DetectionParams;

/// Fraction of the peak distance a pixel needs to count as sure foreground.
const SURE_FOREGROUND_RATIO: f32 = 0.7;
const BOUNDARY_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

#[derive(Debug, thiserror::Error)]
pub enum SegmentationError {
    #[error("watershed markers are degenerate")]
    DegenerateMarkers,
    #[error("marker map does not match image dimensions")]
    DimensionMismatch,
}

/// Everything the segmentation stage derives from one image.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Smoothed and opened grayscale the blob extractor runs on.
    pub preprocessed: GrayRaster,
    /// Inverse Otsu mask after noise removal; colonies are 255.
    pub foreground: GrayImage,
    pub threshold: u8,
    pub markers: LabelMap,
    pub regions: LabelMap,
}

impl Segmentation {
    /// Copy of `raster` with the watershed boundaries painted in.
    pub fn boundary_overlay(&self, raster: &Raster) -> RgbImage {
        let mut out = raster.as_rgb().clone();
        for (x, y, px) in out.enumerate_pixels_mut() {
            if self.regions.get(x, y) == BOUNDARY {
                *px = BOUNDARY_COLOR;
            }
        }
        out
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SegmentationEngine;

impl SegmentationEngine {
    pub fn run(
        &self,
        raster: &Raster,
        gray: &GrayRaster,
        params: &DetectionParams,
    ) -> Result<Segmentation, SegmentationError> {
        if raster.is_empty() || gray.dimensions() != (raster.width(), raster.height()) {
            return Err(SegmentationError::DimensionMismatch);
        }

        let preprocessed = preprocess(gray, params);

        let otsu = morphology::otsu_threshold(preprocessed.as_raw());
        let binary = threshold(&preprocessed, otsu, ThresholdType::BinaryInverted);
        let foreground = morphology::open(&binary, 2);
        debug!("otsu threshold {otsu}");

        let sure_background = morphology::dilate(&foreground, 3);
        let distance = morphology::distance_transform(&foreground);
        let sure_foreground = sure_foreground(&distance);
        let unknown = morphology::subtract(&sure_background, &sure_foreground);

        let markers = seed_markers(&sure_foreground, &unknown);
        debug!("{} seed regions", markers.region_count());

        let regions = watershed(raster.as_rgb(), &markers)?;
        debug!(
            "watershed: {} regions, {} boundary pixels",
            regions.region_count(),
            regions.count_boundary()
        );

        Ok(Segmentation {
            preprocessed,
            foreground,
            threshold: otsu,
            markers,
            regions,
        })
    }
}

/// Optional blur and speckle removal, then a two-pass opening.
pub fn preprocess(gray: &GrayRaster, params: &DetectionParams) -> GrayRaster {
    let mut out = gray.clone();
    if params.apply_blur {
        out = morphology::blur(&out);
    }
    if params.apply_morphology {
        out = morphology::erode(&out, 1);
        out = morphology::dilate(&out, 1);
    }
    morphology::open(&out, 2)
}

fn sure_foreground(distance: &DistanceMap) -> GrayImage {
    let cutoff = SURE_FOREGROUND_RATIO * morphology::max_distance(distance);
    let (width, height) = distance.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        if distance.get_pixel(x, y)[0] > cutoff {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Connected components of the sure foreground shifted by one so the
/// background becomes a seed too; the unknown band is left at 0.
fn seed_markers(sure_foreground: &GrayImage, unknown: &GrayImage) -> LabelMap {
    let components = connected_components(sure_foreground, Connectivity::Eight, Luma([0u8]));
    let (width, height) = sure_foreground.dimensions();
    let labels = components
        .pixels()
        .zip(unknown.pixels())
        .map(|(label, band)| {
            if band[0] == 255 {
                0
            } else {
                label[0] as i32 + 1
            }
        })
        .collect();
    LabelMap::new(width, height, labels)
}
