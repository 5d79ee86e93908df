//! Keypoint rings and contour outlines burnt into a copy of the plate image.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use log::info;
use std::fs;
use std::path::PathBuf;

use super::ExportError;
use crate::model::{ContourRegion, Keypoint};
use crate::params::ExportConfig;
use crate::session::DetectionSession;

/// Ring of `thickness` px centred on the circle of `radius`.
pub fn draw_ring(canvas: &mut RgbImage, center: (f32, f32), radius: f32, color: Rgb<u8>, thickness: u32) {
    let (cx, cy) = center;
    let half_stroke = (thickness.max(1) as f32) * 0.5;
    let radius = radius.max(half_stroke);

    let cx_i = cx.round() as i32;
    let cy_i = cy.round() as i32;
    let max_r = (radius + half_stroke + 1.0).ceil() as i32;

    let width = canvas.width() as i32;
    let height = canvas.height() as i32;

    let min_x = (cx_i - max_r).max(0);
    let max_x = (cx_i + max_r).min(width - 1);
    let min_y = (cy_i - max_r).max(0);
    let max_y = (cy_i + max_r).min(height - 1);

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            if (dist - radius).abs() <= half_stroke {
                *canvas.get_pixel_mut(x as u32, y as u32) = color;
            }
        }
    }
}

/// Traces the closed contour with round pen strokes.
pub fn draw_contour(canvas: &mut RgbImage, points: &[(i32, i32)], color: Rgb<u8>, thickness: u32) {
    let pen = (thickness / 2).max(1) as i32;
    for &pt in points {
        draw_filled_circle_mut(canvas, pt, pen, color);
    }
}

pub fn draw_annotations<'a>(
    canvas: &mut RgbImage,
    keypoints: impl IntoIterator<Item = &'a Keypoint>,
    contours: impl IntoIterator<Item = &'a ContourRegion>,
    color: Rgb<u8>,
    thickness: u32,
) {
    for kp in keypoints {
        draw_ring(canvas, kp.center, kp.radius, color, thickness);
    }
    for contour in contours {
        draw_contour(canvas, &contour.points, color, thickness);
    }
}

/// Writes `<output_dir>/Day {d}/Sample_{n}.png`. Sessions without a resolved
/// day and sample are skipped and yield `Ok(None)`.
pub fn export_annotated(
    session: &DetectionSession,
    config: &ExportConfig,
) -> Result<Option<PathBuf>, ExportError> {
    let name = session.resolved_name();
    let (Some(day), Some(sample)) = (name.day, name.sample) else {
        return Ok(None);
    };
    let Some(image) = session.annotated_image(config.color, config.thickness) else {
        return Ok(None);
    };

    let dir = config.output_dir.join(format!("Day {day}"));
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("Sample_{sample}.png"));
    image.save(&path)?;
    info!("annotated image written to {}", path.display());
    Ok(Some(path))
}
