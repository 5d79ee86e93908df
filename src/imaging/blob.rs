//! Multi-threshold circular blob extraction.
//!
//! The grayscale image is binarized at every level of the threshold sweep.
//! Each level contributes the centers of the contours that pass the shape
//! filters; centers that line up across levels are grouped, and a group seen
//! at enough levels becomes one blob.

use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::contrast::{ThresholdType, threshold};
use log::debug;
use std::f64::consts::PI;

use super::shape;
use crate::model::BlobCandidate;
use crate::params::DetectionParams;

#[derive(Debug, Clone, Copy)]
struct Center {
    location: (f64, f64),
    radius: f64,
}

#[derive(Debug, Clone)]
pub struct BlobDetector {
    params: DetectionParams,
}

impl BlobDetector {
    pub fn new(params: &DetectionParams) -> Self {
        Self {
            params: params.clone(),
        }
    }

    pub fn detect(&self, gray: &GrayImage) -> Vec<BlobCandidate> {
        let p = &self.params;
        let mut groups: Vec<Vec<Center>> = Vec::new();

        let mut level = p.min_threshold as u32;
        while level < p.max_threshold as u32 {
            let centers = self.find_centers(gray, level as u8);
            merge_level(&mut groups, centers, p.min_distance_between_blobs as f64);
            level += p.threshold_step.max(1) as u32;
        }

        let mut accepted: Vec<BlobCandidate> = Vec::new();
        for group in groups.iter().filter(|g| g.len() >= p.min_repeatability.max(1)) {
            let n = group.len() as f64;
            let x = group.iter().map(|c| c.location.0).sum::<f64>() / n;
            let y = group.iter().map(|c| c.location.1).sum::<f64>() / n;
            let radius = group[group.len() / 2].radius;
            let candidate = BlobCandidate {
                center: (x as f32, y as f32),
                radius: radius as f32,
            };
            if radius > 0.0 && !too_close(&accepted, &candidate, p.min_distance_between_blobs) {
                accepted.push(candidate);
            }
        }
        debug!(
            "blob sweep {}..{} step {}: {} groups, {} blobs",
            p.min_threshold,
            p.max_threshold,
            p.threshold_step,
            groups.len(),
            accepted.len()
        );
        accepted
    }

    fn find_centers(&self, gray: &GrayImage, level: u8) -> Vec<Center> {
        let binary = threshold(gray, level, ThresholdType::Binary);

        find_contours::<i32>(&binary)
            .into_iter()
            .filter_map(|contour| {
                let points: Vec<(i32, i32)> =
                    contour.points.iter().map(|pt| (pt.x, pt.y)).collect();
                self.measure(&points)
            })
            .filter(|center| is_dark_at(&binary, center.location))
            .collect()
    }

    /// Shape filters; returns the center when the contour passes all of them.
    fn measure(&self, points: &[(i32, i32)]) -> Option<Center> {
        let p = &self.params;
        let moments = shape::polygon_moments(points);
        let area = moments.m00;
        if area <= 0.0 || !p.area_in_range(area as f32) {
            return None;
        }

        let perimeter = shape::perimeter(points);
        if perimeter <= 0.0 {
            return None;
        }
        let circularity = 4.0 * PI * area / (perimeter * perimeter);
        if circularity < p.min_circularity as f64 {
            return None;
        }

        if moments.inertia_ratio() < p.min_inertia_ratio as f64 {
            return None;
        }

        let hull_area = shape::convex_hull_area(points);
        if hull_area <= 0.0 || area / hull_area < p.min_convexity as f64 {
            return None;
        }

        let location = moments.centroid()?;
        let mut distances: Vec<f64> = points
            .iter()
            .map(|&(x, y)| {
                let dx = x as f64 - location.0;
                let dy = y as f64 - location.1;
                (dx * dx + dy * dy).sqrt()
            })
            .collect();
        distances.sort_by(f64::total_cmp);
        let n = distances.len();
        let radius = (distances[(n - 1) / 2] + distances[n / 2]) / 2.0;

        Some(Center { location, radius })
    }
}

/// Adds one level's centers to the running groups. A center joins the first
/// group whose median member is within the blob radius or the minimum
/// distance; groups stay sorted by radius so the median is `len / 2`.
fn merge_level(groups: &mut Vec<Vec<Center>>, centers: Vec<Center>, min_distance: f64) {
    let mut fresh: Vec<Vec<Center>> = Vec::new();
    for center in centers {
        let mut joined = false;
        for group in groups.iter_mut() {
            let median = group[group.len() / 2];
            let dx = median.location.0 - center.location.0;
            let dy = median.location.1 - center.location.1;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist < min_distance || dist < median.radius || dist < center.radius {
                group.push(center);
                let mut k = group.len() - 1;
                while k > 0 && group[k].radius < group[k - 1].radius {
                    group.swap(k, k - 1);
                    k -= 1;
                }
                joined = true;
                break;
            }
        }
        if !joined {
            fresh.push(vec![center]);
        }
    }
    groups.extend(fresh);
}

/// Colonies are dark on a bright plate: keep only contours whose centroid
/// lands on a background (0) pixel of the binarized level.
fn is_dark_at(binary: &GrayImage, (x, y): (f64, f64)) -> bool {
    let (x, y) = (x.round(), y.round());
    if x < 0.0 || y < 0.0 || x >= binary.width() as f64 || y >= binary.height() as f64 {
        return false;
    }
    binary.get_pixel(x as u32, y as u32)[0] == 0
}

fn too_close(accepted: &[BlobCandidate], candidate: &BlobCandidate, min_distance: f32) -> bool {
    accepted.iter().any(|other| {
        let dx = other.center.0 - candidate.center.0;
        let dy = other.center.1 - candidate.center.1;
        (dx * dx + dy * dy).sqrt() < min_distance
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect;

    fn dish() -> GrayImage {
        let mut img = GrayImage::from_pixel(200, 150, Luma([235]));
        draw_filled_circle_mut(&mut img, (50, 50), 12, Luma([40]));
        draw_filled_circle_mut(&mut img, (140, 90), 15, Luma([40]));
        // too small
        draw_filled_circle_mut(&mut img, (160, 30), 3, Luma([40]));
        // not circular
        draw_filled_rect_mut(&mut img, Rect::at(20, 120).of_size(70, 6), Luma([40]));
        img
    }

    #[test]
    fn finds_round_colonies_only() {
        let blobs = BlobDetector::new(&DetectionParams::default()).detect(&dish());
        assert_eq!(blobs.len(), 2, "{blobs:?}");
        let near = |x: f32, y: f32| {
            blobs
                .iter()
                .any(|b| (b.center.0 - x).abs() < 2.0 && (b.center.1 - y).abs() < 2.0)
        };
        assert!(near(50.0, 50.0));
        assert!(near(140.0, 90.0));
        assert!(blobs.iter().all(|b| b.radius > 10.0 && b.radius < 18.0));
    }

    #[test]
    fn same_input_same_output() {
        let detector = BlobDetector::new(&DetectionParams::default());
        let img = dish();
        assert_eq!(detector.detect(&img), detector.detect(&img));
    }

    #[test]
    fn bright_plate_border_is_not_a_blob() {
        let img = GrayImage::from_pixel(64, 48, Luma([200]));
        assert!(BlobDetector::new(&DetectionParams::default()).detect(&img).is_empty());
    }

    #[test]
    fn single_level_sweep_is_below_repeatability() {
        let params = DetectionParams {
            min_threshold: 100,
            max_threshold: 105,
            ..Default::default()
        };
        assert!(BlobDetector::new(&params).detect(&dish()).is_empty());
    }
}
