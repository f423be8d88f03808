use serde::{Deserialize, Serialize};

/// A 2D point in sheet coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Per-axis comparison within `eps`.
    pub fn approx_eq(&self, other: &Point, eps: f64) -> bool {
        approx_eq(self.x, other.x, eps) && approx_eq(self.y, other.y, eps)
    }

    /// Coordinate along `axis` (x for horizontal runs, y for vertical ones).
    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.x,
            Axis::Vertical => self.y,
        }
    }

    /// Coordinate perpendicular to `axis`.
    pub fn across(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.y,
            Axis::Vertical => self.x,
        }
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        })
    }

    /// Box spanned by a segment's endpoints.
    pub fn of_segment(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min: Point::new(self.min.x - margin, self.min.y - margin),
            max: Point::new(self.max.x + margin, self.max.y + margin),
        }
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// Orientation of an orthogonal segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub const BOTH: [Axis; 2] = [Axis::Horizontal, Axis::Vertical];

    pub fn perpendicular(self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

/// Orientation of the segment `a`–`b`, or `None` when the points coincide
/// or the segment is diagonal.
pub fn axis_between(a: &Point, b: &Point, eps: f64) -> Option<Axis> {
    let same_x = approx_eq(a.x, b.x, eps);
    let same_y = approx_eq(a.y, b.y, eps);
    match (same_x, same_y) {
        (true, true) | (false, false) => None,
        (false, true) => Some(Axis::Horizontal),
        (true, false) => Some(Axis::Vertical),
    }
}

/// Distance from `p` to the closed segment `a`–`b`.
pub fn distance_to_segment(p: &Point, a: &Point, b: &Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_to(&Point::new(a.x + t * dx, a.y + t * dy))
}

/// Whether `p` lies on the segment `a`–`b` within `tol`.
pub fn is_point_on_segment(p: &Point, a: &Point, b: &Point, tol: f64) -> bool {
    if !BBox::of_segment(*a, *b).expanded(tol).contains_point(p) {
        return false;
    }
    let len = a.distance_to(b);
    if len <= tol {
        return p.distance_to(a) <= tol;
    }
    // Perpendicular distance to the carrier line.
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    cross.abs() / len <= tol
}

/// On the segment but not at either endpoint.
pub fn is_strictly_inside_segment(p: &Point, a: &Point, b: &Point, eps: f64) -> bool {
    is_point_on_segment(p, a, b, eps) && !p.approx_eq(a, eps) && !p.approx_eq(b, eps)
}

pub fn snap_to_grid(p: &Point, step: f64) -> Point {
    if step <= 0.0 {
        return *p;
    }
    Point::new((p.x / step).round() * step, (p.y / step).round() * step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_relative_eq!(a.distance_to(&b), 5.0);
    }

    #[test]
    fn test_segment_bbox_margin() {
        let b = BBox::of_segment(Point::new(10.0, 0.0), Point::new(0.0, 0.0));
        assert!(b.contains_point(&Point::new(5.0, 0.0)));
        assert!(!b.contains_point(&Point::new(5.0, 0.5)));
        assert!(b.expanded(1.0).contains_point(&Point::new(5.0, 0.5)));
        assert!(BBox::from_points(&[]).is_none());
    }

    #[test]
    fn test_axis_between() {
        let eps = 1e-6;
        let o = Point::new(0.0, 0.0);
        assert_eq!(axis_between(&o, &Point::new(5.0, 0.0), eps), Some(Axis::Horizontal));
        assert_eq!(axis_between(&o, &Point::new(0.0, -5.0), eps), Some(Axis::Vertical));
        assert_eq!(axis_between(&o, &Point::new(5.0, 5.0), eps), None);
        assert_eq!(axis_between(&o, &o, eps), None);
    }

    #[test]
    fn test_point_on_segment() {
        let a = Point::new(0.0, 10.0);
        let b = Point::new(20.0, 10.0);
        assert!(is_point_on_segment(&Point::new(10.0, 10.0), &a, &b, 1e-6));
        assert!(is_point_on_segment(&Point::new(10.0, 10.4), &a, &b, 0.5));
        assert!(!is_point_on_segment(&Point::new(10.0, 11.0), &a, &b, 0.5));
        // Bounding-box pre-check rejects collinear points beyond the ends.
        assert!(!is_point_on_segment(&Point::new(30.0, 10.0), &a, &b, 1e-6));
    }

    #[test]
    fn test_strictly_inside_excludes_endpoints() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(0.0, 20.0);
        assert!(is_strictly_inside_segment(&Point::new(0.0, 5.0), &a, &b, 1e-6));
        assert!(!is_strictly_inside_segment(&a, &a, &b, 1e-6));
        assert!(!is_strictly_inside_segment(&b, &a, &b, 1e-6));
    }

    #[test]
    fn test_distance_to_segment_clamps() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_relative_eq!(distance_to_segment(&Point::new(5.0, 3.0), &a, &b), 3.0);
        assert_relative_eq!(distance_to_segment(&Point::new(13.0, 4.0), &a, &b), 5.0);
    }

    #[test]
    fn test_snap_to_grid() {
        let p = snap_to_grid(&Point::new(12.0, -7.0), 5.0);
        assert_relative_eq!(p.x, 10.0);
        assert_relative_eq!(p.y, -5.0);
    }
}
