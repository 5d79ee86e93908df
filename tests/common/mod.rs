#![allow(dead_code)]

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use std::fs;
use std::path::{Path, PathBuf};

pub const AGAR: Rgb<u8> = Rgb([235, 232, 225]);
pub const COLONY: Rgb<u8> = Rgb([40, 38, 35]);

/// Round colonies the blob sweep should pick up on its own.
pub const ROUND_COLONIES: [(i32, i32, i32); 3] = [(60, 60, 12), (170, 70, 15), (90, 170, 13)];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Bright plate with dark round colonies, `(x, y, radius)` each.
pub fn plate(colonies: &[(i32, i32, i32)]) -> RgbImage {
    let mut img = RgbImage::from_pixel(300, 240, AGAR);
    for &(x, y, r) in colonies {
        draw_filled_circle_mut(&mut img, (x, y), r, COLONY);
    }
    img
}

/// Cross-shaped colony: too concave for the blob filters, square enough for
/// the contour fallback.
pub fn add_cross(img: &mut RgbImage, cx: i32, cy: i32) {
    draw_filled_rect_mut(img, Rect::at(cx - 24, cy - 6).of_size(48, 12), COLONY);
    draw_filled_rect_mut(img, Rect::at(cx - 6, cy - 24).of_size(12, 48), COLONY);
}

/// Saves `img` under `root/relative`, creating folders on the way.
pub fn write_plate(root: &Path, relative: &str, img: &RgbImage) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create plate folder");
    }
    img.save(&path).expect("save plate");
    path
}
