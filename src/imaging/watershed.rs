//! Marker-based watershed by priority flooding.

use image::RgbImage;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::segmentation::SegmentationError;

/// Label assigned to pixels where two basins meet.
pub const BOUNDARY: i32 = -1;
const IN_QUEUE: i32 = -2;

/// Per-pixel region labels, row major.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap {
    pub width: u32,
    pub height: u32,
    pub labels: Vec<i32>,
}

impl LabelMap {
    pub fn new(width: u32, height: u32, labels: Vec<i32>) -> Self {
        Self {
            width,
            height,
            labels,
        }
    }

    pub fn get(&self, x: u32, y: u32) -> i32 {
        self.labels[(y * self.width + x) as usize]
    }

    pub fn count_boundary(&self) -> usize {
        self.labels.iter().filter(|&&l| l == BOUNDARY).count()
    }

    pub fn region_count(&self) -> usize {
        let mut seen: Vec<i32> = self.labels.iter().copied().filter(|&l| l > 0).collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }
}

fn color_distance(image: &RgbImage, a: usize, b: usize) -> u8 {
    let raw = image.as_raw();
    let (pa, pb) = (&raw[a * 3..a * 3 + 3], &raw[b * 3..b * 3 + 3]);
    pa.iter()
        .zip(pb)
        .map(|(&x, &y)| x.abs_diff(y))
        .max()
        .unwrap_or(0)
}

/// Floods `markers` over `image`.
///
/// Marker `0` means unknown, positive markers are seeds. Every unknown pixel
/// ends up with the label of the basin that reached it first, or
/// [`BOUNDARY`] where two basins touch. The outer frame is always boundary.
pub fn watershed(image: &RgbImage, markers: &LabelMap) -> Result<LabelMap, SegmentationError> {
    let (width, height) = image.dimensions();
    if (width, height) != (markers.width, markers.height) {
        return Err(SegmentationError::DimensionMismatch);
    }
    if width < 3 || height < 3 {
        return Err(SegmentationError::DegenerateMarkers);
    }
    let (w, h) = (width as usize, height as usize);
    let mut labels = markers.labels.clone();

    for x in 0..w {
        labels[x] = BOUNDARY;
        labels[(h - 1) * w + x] = BOUNDARY;
    }
    for y in 0..h {
        labels[y * w] = BOUNDARY;
        labels[y * w + w - 1] = BOUNDARY;
    }
    if !labels.iter().any(|&l| l > 0) {
        return Err(SegmentationError::DegenerateMarkers);
    }

    let neighbours = |idx: usize| {
        let (x, y) = (idx % w, idx / w);
        [
            (x > 0).then(|| idx - 1),
            (x + 1 < w).then(|| idx + 1),
            (y > 0).then(|| idx - w),
            (y + 1 < h).then(|| idx + w),
        ]
    };

    let mut heap: BinaryHeap<Reverse<(u8, u64, usize)>> = BinaryHeap::new();
    let mut seq = 0u64;

    for idx in 0..labels.len() {
        if labels[idx] != 0 {
            continue;
        }
        let seeded = neighbours(idx)
            .into_iter()
            .flatten()
            .find(|&n| labels[n] > 0);
        if let Some(n) = seeded {
            heap.push(Reverse((color_distance(image, idx, n), seq, idx)));
            seq += 1;
            labels[idx] = IN_QUEUE;
        }
    }

    let mut level = 0u8;
    while let Some(Reverse((priority, _, idx))) = heap.pop() {
        level = level.max(priority);
        let mut label = 0;
        for n in neighbours(idx).into_iter().flatten() {
            let l = labels[n];
            if l <= 0 {
                continue;
            }
            if label == 0 {
                label = l;
            } else if label != l {
                label = BOUNDARY;
            }
        }
        labels[idx] = label;
        if label <= 0 {
            labels[idx] = BOUNDARY;
            continue;
        }
        for n in neighbours(idx).into_iter().flatten() {
            if labels[n] == 0 {
                let p = color_distance(image, n, idx).max(level);
                heap.push(Reverse((p, seq, n)));
                seq += 1;
                labels[n] = IN_QUEUE;
            }
        }
    }

    for l in labels.iter_mut() {
        if *l == IN_QUEUE || *l == 0 {
            *l = BOUNDARY;
        }
    }

    Ok(LabelMap::new(width, height, labels))
}
