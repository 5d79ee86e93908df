//! Detection results and per-image report records.

use serde::Serialize;
use std::fmt;

use crate::imaging::shape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct KeypointId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ContourId(pub u64);

/// Whether a keypoint came out of the pipeline or was placed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Origin {
    Auto,
    Manual,
}

/// A detected or manually placed circular colony.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keypoint {
    pub id: KeypointId,
    pub center: (f32, f32),
    pub radius: f32,
    pub origin: Origin,
}

impl Keypoint {
    pub fn contains(&self, point: (f32, f32)) -> bool {
        let dx = point.0 - self.center.0;
        let dy = point.1 - self.center.1;
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

/// Blob center and radius before it is given an identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlobCandidate {
    pub center: (f32, f32),
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn of(points: &[(i32, i32)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let (mut min_x, mut min_y) = *first;
        let (mut max_x, mut max_y) = *first;
        for &(x, y) in rest {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Self {
            x: min_x,
            y: min_y,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        })
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Traced contour that passed the fallback filters.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionCandidate {
    pub points: Vec<(i32, i32)>,
    pub area: f32,
    pub bbox: BoundingBox,
}

/// Closed boundary of a colony found by the contour fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContourRegion {
    pub id: ContourId,
    pub points: Vec<(i32, i32)>,
    pub area: f32,
    pub bbox: BoundingBox,
}

impl ContourRegion {
    /// Even-odd ray casting against the boundary polygon.
    pub fn contains(&self, point: (f32, f32)) -> bool {
        shape::point_in_polygon(&self.points, point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Dilution {
    X10,
    X100,
    X1000,
}

impl Dilution {
    /// Case-insensitive ordinal lookup. When several markers appear, "1st"
    /// wins over "2nd", and "2nd" over "3rd".
    pub fn from_ordinal(text: &str) -> Option<Self> {
        let lower = text.to_ascii_lowercase();
        if lower.contains("1st") {
            Some(Self::X10)
        } else if lower.contains("2nd") {
            Some(Self::X100)
        } else if lower.contains("3rd") {
            Some(Self::X1000)
        } else {
            None
        }
    }
}

impl fmt::Display for Dilution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::X10 => "x10",
            Self::X100 => "x100",
            Self::X1000 => "x1000",
        };
        f.write_str(s)
    }
}

/// One image's row in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timepoint {
    pub day: i64,
    pub sample_number: u32,
    pub dilution: Dilution,
    pub num_keypoints: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_is_inclusive() {
        let bbox = BoundingBox::of(&[(2, 3), (6, 3), (6, 7), (2, 7)]).unwrap();
        assert_eq!((bbox.width, bbox.height), (5, 5));
        assert_eq!(bbox.aspect_ratio(), 1.0);
        assert!(BoundingBox::of(&[]).is_none());
    }

    #[test]
    fn ordinals_are_case_insensitive() {
        assert_eq!(Dilution::from_ordinal("1ST"), Some(Dilution::X10));
        assert_eq!(Dilution::from_ordinal("2nd"), Some(Dilution::X100));
        assert_eq!(Dilution::from_ordinal("the 3Rd one"), Some(Dilution::X1000));
        assert_eq!(Dilution::from_ordinal("4th"), None);
        assert_eq!(Dilution::from_ordinal("3rd_or_1st"), Some(Dilution::X10));
    }
}
