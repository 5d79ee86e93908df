//! Grayscale morphology, smoothing, thresholding and the distance transform.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::distance_transform::euclidean_squared_distance_transform;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode, grayscale_open};

/// Half-width of the 5x5 square structuring element.
pub const KERNEL_RADIUS: u8 = 2;
/// Sigma a 5x5 gaussian kernel gets when the sigma is derived from its size.
pub const BLUR_SIGMA: f32 = 1.1;

pub type DistanceMap = ImageBuffer<Luma<f32>, Vec<f32>>;

pub fn blur(image: &GrayImage) -> GrayImage {
    gaussian_blur_f32(image, BLUR_SIGMA)
}

fn square() -> Mask {
    Mask::square(KERNEL_RADIUS)
}

pub fn erode(image: &GrayImage, iterations: usize) -> GrayImage {
    let mask = square();
    let mut out = image.clone();
    for _ in 0..iterations {
        out = grayscale_erode(&out, &mask);
    }
    out
}

pub fn dilate(image: &GrayImage, iterations: usize) -> GrayImage {
    let mask = square();
    let mut out = image.clone();
    for _ in 0..iterations {
        out = grayscale_dilate(&out, &mask);
    }
    out
}

/// `iterations` erosions followed by as many dilations.
pub fn open(image: &GrayImage, iterations: usize) -> GrayImage {
    if iterations == 1 {
        return grayscale_open(image, &square());
    }
    dilate(&erode(image, iterations), iterations)
}

/// Threshold maximizing the between-class variance of the histogram.
pub fn otsu_threshold(pixels: &[u8]) -> u8 {
    let mut histogram = [0u32; 256];
    for &value in pixels {
        histogram[value as usize] += 1;
    }

    let total_pixels = pixels.len() as f64;
    let mut sum_total = 0f64;
    for (value, &count) in histogram.iter().enumerate() {
        sum_total += value as f64 * count as f64;
    }

    let mut sum_background = 0f64;
    let mut weight_background = 0f64;
    let mut max_variance = f64::MIN;
    let mut threshold = 0u8;

    for (value, &count) in histogram.iter().enumerate() {
        weight_background += count as f64;
        if weight_background == 0.0 {
            continue;
        }

        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0.0 {
            break;
        }

        sum_background += value as f64 * count as f64;

        let mean_background = sum_background / weight_background;
        let mean_foreground = (sum_total - sum_background) / weight_foreground;
        let variance =
            weight_background * weight_foreground * (mean_background - mean_foreground).powi(2);

        if variance > max_variance {
            max_variance = variance;
            threshold = value as u8;
        }
    }

    threshold
}

pub fn invert(mask: &mut GrayImage) {
    for px in mask.pixels_mut() {
        px[0] = 255 - px[0];
    }
}

/// `minuend - subtrahend`, saturating at zero.
pub fn subtract(minuend: &GrayImage, subtrahend: &GrayImage) -> GrayImage {
    let mut out = minuend.clone();
    for (dst, src) in out.pixels_mut().zip(subtrahend.pixels()) {
        dst[0] = dst[0].saturating_sub(src[0]);
    }
    out
}

/// Exact Euclidean distance from every foreground (non-zero) pixel to the
/// nearest background pixel. Background pixels map to 0.
pub fn distance_transform(mask: &GrayImage) -> DistanceMap {
    let (width, height) = mask.dimensions();
    let mut background = mask.clone();
    invert(&mut background);
    let squared = euclidean_squared_distance_transform(&background);
    let data = squared
        .pixels()
        .map(|px| {
            let d = px[0].sqrt();
            if d.is_finite() { d as f32 } else { 0.0 }
        })
        .collect();
    ImageBuffer::from_raw(width, height, data).unwrap_or_else(|| ImageBuffer::new(width, height))
}

pub fn max_distance(map: &DistanceMap) -> f32 {
    map.pixels().map(|px| px[0]).fold(0.0, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otsu_splits_bimodal_histogram() {
        let mut pixels = vec![20u8; 500];
        pixels.extend(vec![220u8; 500]);
        let t = otsu_threshold(&pixels);
        assert!((20..220).contains(&t), "threshold {t}");
    }

    #[test]
    fn opening_removes_speckle_but_keeps_large_blocks() {
        let mut img = GrayImage::new(30, 30);
        img.put_pixel(3, 3, Luma([255]));
        for y in 10..25 {
            for x in 10..25 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let opened = open(&img, 1);
        assert_eq!(opened.get_pixel(3, 3)[0], 0);
        assert_eq!(opened.get_pixel(17, 17)[0], 255);
        assert_eq!(opened.get_pixel(10, 10)[0], 255);
    }

    #[test]
    fn distance_transform_of_square() {
        let mut img = GrayImage::new(11, 11);
        for y in 1..10 {
            for x in 1..10 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let dist = distance_transform(&img);
        assert_eq!(dist.get_pixel(0, 0)[0], 0.0);
        assert_eq!(dist.get_pixel(1, 5)[0], 1.0);
        assert_eq!(dist.get_pixel(5, 5)[0], 5.0);
        assert_eq!(max_distance(&dist), 5.0);
    }

    #[test]
    fn distance_transform_is_euclidean() {
        let mut img = GrayImage::from_pixel(9, 9, Luma([255]));
        img.put_pixel(0, 0, Luma([0]));
        let dist = distance_transform(&img);
        assert!((dist.get_pixel(3, 4)[0] - 5.0).abs() < 1e-5);
    }
}
