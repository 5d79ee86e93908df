//! Polygon measurements shared by the blob extractor and the contour fallback.

use imageproc::geometry::{arc_length, convex_hull};
use imageproc::point::Point;

/// Spatial and central second-order moments of a closed polygon.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub mu20: f64,
    pub mu02: f64,
    pub mu11: f64,
}

impl Moments {
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00.abs() < f64::EPSILON {
            return None;
        }
        Some((self.m10 / self.m00, self.m01 / self.m00))
    }

    /// Ratio of the minor to the major principal second moment, 1.0 for a disc.
    pub fn inertia_ratio(&self) -> f64 {
        let denominator = ((2.0 * self.mu11).powi(2) + (self.mu20 - self.mu02).powi(2)).sqrt();
        if denominator <= 0.01 {
            return 1.0;
        }
        let cos_min = (self.mu20 - self.mu02) / denominator;
        let sin_min = 2.0 * self.mu11 / denominator;
        let half_sum = 0.5 * (self.mu20 + self.mu02);
        let half_diff = 0.5 * (self.mu20 - self.mu02);
        let i_min = half_sum - half_diff * cos_min - self.mu11 * sin_min;
        let i_max = half_sum + half_diff * cos_min + self.mu11 * sin_min;
        if i_max.abs() < f64::EPSILON {
            return 1.0;
        }
        i_min / i_max
    }
}

/// Moments of the region enclosed by `points` (Green's theorem over edges).
pub fn polygon_moments(points: &[(i32, i32)]) -> Moments {
    let n = points.len();
    if n < 3 {
        return Moments::default();
    }
    let (mut a00, mut a10, mut a01, mut a20, mut a02, mut a11) =
        (0f64, 0f64, 0f64, 0f64, 0f64, 0f64);
    for i in 0..n {
        let (x0, y0) = (points[i].0 as f64, points[i].1 as f64);
        let (x1, y1) = (points[(i + 1) % n].0 as f64, points[(i + 1) % n].1 as f64);
        let cross = x0 * y1 - x1 * y0;
        a00 += cross;
        a10 += cross * (x0 + x1);
        a01 += cross * (y0 + y1);
        a20 += cross * (x0 * x0 + x0 * x1 + x1 * x1);
        a02 += cross * (y0 * y0 + y0 * y1 + y1 * y1);
        a11 += cross * (x0 * (2.0 * y0 + y1) + x1 * (y0 + 2.0 * y1));
    }
    let sign = if a00 < 0.0 { -1.0 } else { 1.0 };
    let m00 = sign * a00 / 2.0;
    let m10 = sign * a10 / 6.0;
    let m01 = sign * a01 / 6.0;
    let m20 = sign * a20 / 12.0;
    let m02 = sign * a02 / 12.0;
    let m11 = sign * a11 / 24.0;
    if m00.abs() < f64::EPSILON {
        return Moments::default();
    }
    let cx = m10 / m00;
    let cy = m01 / m00;
    Moments {
        m00,
        m10,
        m01,
        mu20: m20 - cx * m10,
        mu02: m02 - cy * m01,
        mu11: m11 - cx * m01,
    }
}

/// Unsigned shoelace area.
pub fn polygon_area(points: &[(i32, i32)]) -> f64 {
    polygon_moments(points).m00
}

pub fn perimeter(points: &[(i32, i32)]) -> f64 {
    arc_length(&to_points(points), true)
}

pub fn convex_hull_area(points: &[(i32, i32)]) -> f64 {
    let hull = convex_hull(to_points(points));
    let hull: Vec<(i32, i32)> = hull.into_iter().map(|p| (p.x, p.y)).collect();
    polygon_area(&hull)
}

/// Even-odd rule; points on a vertex row are resolved by the half-open edge test.
pub fn point_in_polygon(points: &[(i32, i32)], point: (f32, f32)) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let (px, py) = point;
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (points[i].0 as f32, points[i].1 as f32);
        let (xj, yj) = (points[j].0 as f32, points[j].1 as f32);
        if (yi > py) != (yj > py) {
            let x_cross = (xj - xi) * (py - yi) / (yj - yi) + xi;
            if px < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn to_points(points: &[(i32, i32)]) -> Vec<Point<i32>> {
    points.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: i32) -> Vec<(i32, i32)> {
        vec![(0, 0), (side, 0), (side, side), (0, side)]
    }

    #[test]
    fn square_area_and_centroid() {
        let m = polygon_moments(&square(10));
        assert!((m.m00 - 100.0).abs() < 1e-9);
        let (cx, cy) = m.centroid().unwrap();
        assert!((cx - 5.0).abs() < 1e-9 && (cy - 5.0).abs() < 1e-9);
        assert!((m.inertia_ratio() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn orientation_does_not_change_area() {
        let mut pts = square(4);
        pts.reverse();
        assert!((polygon_area(&pts) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn elongated_rectangle_has_low_inertia_ratio() {
        let pts = vec![(0, 0), (40, 0), (40, 4), (0, 4)];
        let ratio = polygon_moments(&pts).inertia_ratio();
        assert!(ratio < 0.05, "ratio {ratio}");
    }

    #[test]
    fn hull_of_concave_shape_is_larger() {
        // an L shape
        let pts = vec![(0, 0), (10, 0), (10, 2), (2, 2), (2, 10), (0, 10)];
        assert!(convex_hull_area(&pts) > polygon_area(&pts));
    }

    #[test]
    fn ray_casting() {
        let pts = square(10);
        assert!(point_in_polygon(&pts, (5.0, 5.0)));
        assert!(!point_in_polygon(&pts, (15.0, 5.0)));
        assert!(!point_in_polygon(&pts, (-0.5, 5.0)));
        assert!(!point_in_polygon(&pts[..2], (0.5, 0.0)));
    }
}
