use serde::{Deserialize, Serialize};

/// An integer pixel position, used for control points and mesh vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset by a delta.
    pub fn offset(&self, dx: i32, dy: i32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    /// Interpolate towards `other`, truncating toward zero.
    ///
    /// `x = trunc((1 - t) * self.x + t * other.x)`, likewise for `y`. At
    /// `t = 0` and `t = 1` the endpoints are reproduced exactly.
    pub fn lerp_trunc(&self, other: &Point, t: f64) -> Point {
        let x = (1.0 - t) * self.x as f64 + t * other.x as f64;
        let y = (1.0 - t) * self.y as f64 + t * other.y as f64;
        Point::new(x as i32, y as i32)
    }

    pub fn to_f64(self) -> Point2D {
        Point2D::new(self.x as f64, self.y as f64)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Point::new(x, y)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A continuous 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

impl Default for Point2D {
    fn default() -> Self {
        Self::zero()
    }
}

/// Twice the signed area of triangle `abc`, in image coordinates (y down).
///
/// Positive for the winding used by every mesh triangle (top-left, top-right,
/// bottom-left); zero when the points are collinear. Exact for any
/// coordinates that fit in `i32`.
pub fn cross(a: Point, b: Point, c: Point) -> i64 {
    let (ax, ay) = (a.x as i64, a.y as i64);
    let (bx, by) = (b.x as i64, b.y as i64);
    let (cx, cy) = (c.x as i64, c.y as i64);
    (bx - ax) * (cy - ay) - (by - ay) * (cx - ax)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_trunc_endpoints() {
        let a = Point::new(50, 50);
        let b = Point::new(60, 61);
        assert_eq!(a.lerp_trunc(&b, 0.0), a);
        assert_eq!(a.lerp_trunc(&b, 1.0), b);
    }

    #[test]
    fn test_lerp_trunc_truncates() {
        let a = Point::new(0, 0);
        let b = Point::new(10, 3);
        // 0.99 * 10 = 9.9 and 0.99 * 3 = 2.97: both truncate down.
        assert_eq!(a.lerp_trunc(&b, 0.99), Point::new(9, 2));
    }

    #[test]
    fn test_cross_orientation() {
        let tl = Point::new(0, 0);
        let tr = Point::new(10, 0);
        let bl = Point::new(0, 10);
        assert_eq!(cross(tl, tr, bl), 100);
        assert_eq!(cross(tl, bl, tr), -100);
        assert_eq!(cross(tl, tr, Point::new(20, 0)), 0);
    }
}
