//! Vector and bounding-box helpers shared by movement, spawning and combat

use serde::{Deserialize, Serialize};

/// Normalize a direction. A zero vector stays zero.
pub fn normalize(dx: f32, dy: f32) -> (f32, f32) {
    let len = (dx * dx + dy * dy).sqrt();
    if len <= f32::EPSILON {
        (0.0, 0.0)
    } else {
        (dx / len, dy / len)
    }
}

/// Squared distance between two points
#[inline]
pub fn dist_sq(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = bx - ax;
    let dy = by - ay;
    dx * dx + dy * dy
}

/// True when the two points are at most `radius` apart
#[inline]
pub fn within_radius(ax: f32, ay: f32, bx: f32, by: f32, radius: f32) -> bool {
    dist_sq(ax, ay, bx, by) <= radius * radius
}

/// True when any point of the segment `a -> b` is at most `radius` from `c`
pub fn segment_within_radius(
    (ax, ay): (f32, f32),
    (bx, by): (f32, f32),
    (cx, cy): (f32, f32),
    radius: f32,
) -> bool {
    let (sx, sy) = (bx - ax, by - ay);
    let len_sq = sx * sx + sy * sy;
    if len_sq <= f32::EPSILON {
        return within_radius(ax, ay, cx, cy, radius);
    }
    // Closest point on the segment to the circle centre
    let t = (((cx - ax) * sx + (cy - ay) * sy) / len_sq).clamp(0.0, 1.0);
    within_radius(ax + sx * t, ay + sy * t, cx, cy, radius)
}

/// Clamp a coordinate so a circle of `radius` stays inside `[0, extent]`
#[inline]
pub fn clamp_axis(value: f32, radius: f32, extent: f32) -> f32 {
    value.clamp(radius, extent - radius)
}

/// Axis-aligned rectangle, anchored at its top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Grow the rectangle by `margin` on every side
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            w: self.w + margin * 2.0,
            h: self.h + margin * 2.0,
        }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }

    /// Whether a circle's bounding box intersects this rectangle
    pub fn overlaps_circle(&self, cx: f32, cy: f32, radius: f32) -> bool {
        self.expanded(radius).contains(cx, cy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_diagonal_has_unit_length() {
        let (x, y) = normalize(1.0, 1.0);
        assert!((x - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((y - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(normalize(0.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn radius_test_is_inclusive() {
        assert!(within_radius(0.0, 0.0, 3.0, 4.0, 5.0));
        assert!(!within_radius(0.0, 0.0, 3.0, 4.1, 5.0));
    }

    #[test]
    fn segment_test_catches_passing_circle() {
        // Both endpoints are outside the circle, the middle crosses it
        assert!(segment_within_radius((0.0, 0.0), (90.0, 0.0), (45.0, 10.0), 25.0));
        assert!(!segment_within_radius((0.0, 0.0), (90.0, 0.0), (45.0, 30.0), 25.0));
        // Closest point clamps to the segment ends
        assert!(!segment_within_radius((0.0, 0.0), (90.0, 0.0), (130.0, 0.0), 25.0));
        assert!(segment_within_radius((5.0, 5.0), (5.0, 5.0), (8.0, 9.0), 5.0));
    }

    #[test]
    fn rect_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        let c = Rect::new(20.0, 0.0, 5.0, 5.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(a.overlaps_circle(-3.0, 5.0, 4.0));
        assert!(!a.overlaps_circle(-5.0, 5.0, 4.0));
    }

    #[test]
    fn clamp_keeps_radius_inside() {
        assert_eq!(clamp_axis(-10.0, 20.0, 100.0), 20.0);
        assert_eq!(clamp_axis(150.0, 20.0, 100.0), 80.0);
        assert_eq!(clamp_axis(50.0, 20.0, 100.0), 50.0);
    }
}
