//! The deformable control lattice attached to one image.
//!
//! A lattice is an `N x N` grid of movable control points strictly inside
//! the image rectangle. The rectangle's edges and corners are implicit
//! fixed vertices; [`Lattice::vertex`] exposes the full `(N + 2) x (N + 2)`
//! grid including them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MorphError, MorphResult};
use crate::math::Point;

/// Half-diagonal of the diamond handle drawn around each control point.
pub const HANDLE_RADIUS: i32 = 5;

/// Supported lattice densities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum LatticeResolution {
    Five,
    #[default]
    Ten,
    Twenty,
}

impl LatticeResolution {
    pub const ALL: [LatticeResolution; 3] = [
        LatticeResolution::Five,
        LatticeResolution::Ten,
        LatticeResolution::Twenty,
    ];

    /// Number of control points along each axis.
    pub fn n(self) -> usize {
        match self {
            LatticeResolution::Five => 5,
            LatticeResolution::Ten => 10,
            LatticeResolution::Twenty => 20,
        }
    }

    /// Whether a `width x height` image leaves at least one pixel between
    /// neighbouring default vertices. Smaller images collapse the border
    /// vertices onto the corners.
    pub fn fits(self, width: u32, height: u32) -> bool {
        let min = self.n() as u32 + 1;
        width >= min && height >= min
    }

    /// Reject dimensions that [`LatticeResolution::fits`] refuses.
    pub fn check_fits(self, width: u32, height: u32) -> MorphResult<()> {
        if self.fits(width, height) {
            return Ok(());
        }
        Err(MorphError::InvalidArgument(format!(
            "a {} lattice needs an image of at least {}x{} pixels, got {}x{}",
            self,
            self.n() + 1,
            self.n() + 1,
            width,
            height
        )))
    }
}

impl TryFrom<u32> for LatticeResolution {
    type Error = MorphError;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        match n {
            5 => Ok(LatticeResolution::Five),
            10 => Ok(LatticeResolution::Ten),
            20 => Ok(LatticeResolution::Twenty),
            other => Err(MorphError::InvalidArgument(format!(
                "lattice resolution must be 5, 10 or 20, got {}",
                other
            ))),
        }
    }
}

impl From<LatticeResolution> for u32 {
    fn from(r: LatticeResolution) -> u32 {
        r.n() as u32
    }
}

impl FromStr for LatticeResolution {
    type Err = MorphError;

    /// Accepts `"10"` as well as the `"10x10"` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let head = s.trim().split('x').next().unwrap_or_default();
        let n: u32 = head
            .parse()
            .map_err(|_| MorphError::InvalidArgument(format!("invalid lattice resolution '{}'", s)))?;
        LatticeResolution::try_from(n)
    }
}

impl fmt::Display for LatticeResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.n(), self.n())
    }
}

/// An `N x N` grid of control points over a `width x height` image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lattice {
    width: u32,
    height: u32,
    resolution: LatticeResolution,
    /// Row-major, `points[i * n + j]` is control point `(i, j)`.
    points: Vec<Point>,
}

impl Lattice {
    /// Create a lattice with evenly spaced control points.
    pub fn new(width: u32, height: u32, resolution: LatticeResolution) -> Self {
        let mut lattice = Self {
            width,
            height,
            resolution,
            points: Vec::new(),
        };
        lattice.reset();
        lattice
    }

    /// Re-hydrate a lattice from persisted, row-major control points.
    ///
    /// Positions are taken as given; only shape and bounds are checked.
    pub fn from_points(
        width: u32,
        height: u32,
        resolution: LatticeResolution,
        points: Vec<Point>,
    ) -> MorphResult<Self> {
        let n = resolution.n();
        if points.len() != n * n {
            return Err(MorphError::InvalidArgument(format!(
                "expected {} control points for a {} lattice, got {}",
                n * n,
                resolution,
                points.len()
            )));
        }
        let lattice = Self {
            width,
            height,
            resolution,
            points,
        };
        if let Some(p) = lattice.points.iter().find(|p| !lattice.in_bounds(**p)) {
            return Err(MorphError::InvalidArgument(format!(
                "control point {} lies outside the {}x{} image",
                p, width, height
            )));
        }
        Ok(lattice)
    }

    /// Restore the default, evenly spaced interior grid.
    pub fn reset(&mut self) {
        let n = self.n();
        let wo = self.width_offset();
        let ho = self.height_offset();
        self.points = (0..n)
            .flat_map(|i| {
                (0..n).map(move |j| {
                    Point::new(((j + 1) as f64 * wo) as i32, ((i + 1) as f64 * ho) as i32)
                })
            })
            .collect();
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resolution(&self) -> LatticeResolution {
        self.resolution
    }

    /// Number of control points along each axis.
    pub fn n(&self) -> usize {
        self.resolution.n()
    }

    /// Horizontal spacing of the default grid, `width / (N + 1)`.
    pub fn width_offset(&self) -> f64 {
        self.width as f64 / (self.n() + 1) as f64
    }

    /// Vertical spacing of the default grid, `height / (N + 1)`.
    pub fn height_offset(&self) -> f64 {
        self.height as f64 / (self.n() + 1) as f64
    }

    /// Row-major control points.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Control point `(i, j)`; panics if the indices are out of range.
    pub fn point(&self, i: usize, j: usize) -> Point {
        self.points[i * self.n() + j]
    }

    /// Move control point `(i, j)` without any fold-over check.
    ///
    /// Only bounds are enforced; interactive edits go through
    /// [`crate::editor::LatticeEditor`].
    pub fn set_point(&mut self, i: usize, j: usize, p: Point) -> MorphResult<()> {
        let n = self.n();
        if i >= n || j >= n {
            return Err(MorphError::InvalidArgument(format!(
                "control point ({}, {}) out of range for a {} lattice",
                i, j, self.resolution
            )));
        }
        if !self.in_bounds(p) {
            return Err(MorphError::InvalidArgument(format!(
                "position {} lies outside the {}x{} image",
                p, self.width, self.height
            )));
        }
        self.points[i * n + j] = p;
        Ok(())
    }

    /// Whether `p` lies inside `[0, width] x [0, height]`.
    pub fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && p.x <= self.width as i32 && p.y <= self.height as i32
    }

    /// Vertex `(r, c)` of the extended grid, `-1 <= r, c <= N`.
    ///
    /// Interior indices address control points. Row `-1`/`N` lies on the
    /// top/bottom edge and column `-1`/`N` on the left/right edge; when both
    /// indices are on the border the result is an image corner. Edge
    /// vertices are spaced by the truncated offset, `trunc(offset) * (k + 1)`.
    pub fn vertex(&self, r: isize, c: isize) -> Point {
        let n = self.n() as isize;
        debug_assert!((-1..=n).contains(&r) && (-1..=n).contains(&c));
        if (0..n).contains(&r) && (0..n).contains(&c) {
            return self.point(r as usize, c as usize);
        }
        let x = if c < 0 {
            0
        } else if c >= n {
            self.width as i32
        } else {
            self.width_offset() as i32 * (c as i32 + 1)
        };
        let y = if r < 0 {
            0
        } else if r >= n {
            self.height as i32
        } else {
            self.height_offset() as i32 * (r as i32 + 1)
        };
        Point::new(x, y)
    }

    /// Interpolate every control point between two lattices at time `t`.
    ///
    /// Coordinates are truncated toward zero, so `t = 0` reproduces `start`
    /// and `t = 1` reproduces `end` exactly.
    pub fn interpolate(start: &Lattice, end: &Lattice, t: f64) -> MorphResult<Lattice> {
        if start.resolution != end.resolution {
            return Err(MorphError::ResolutionMismatch {
                start: start.n(),
                end: end.n(),
            });
        }
        if start.width != end.width || start.height != end.height {
            return Err(MorphError::InvalidArgument(format!(
                "lattice dimensions differ: {}x{} vs {}x{}",
                start.width, start.height, end.width, end.height
            )));
        }
        let points = start
            .points
            .iter()
            .zip(&end.points)
            .map(|(s, e)| s.lerp_trunc(e, t))
            .collect();
        Ok(Lattice {
            width: start.width,
            height: start.height,
            resolution: start.resolution,
            points,
        })
    }

    /// Indices of the first control point (row-major) whose handle contains `p`.
    pub fn hit_test(&self, p: Point) -> Option<(usize, usize)> {
        let n = self.n();
        self.points
            .iter()
            .position(|cp| (cp.x - p.x).abs() + (cp.y - p.y).abs() < HANDLE_RADIUS)
            .map(|idx| (idx / n, idx % n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spacing() {
        let lattice = Lattice::new(600, 400, LatticeResolution::Five);
        assert_eq!(lattice.points().len(), 25);
        assert!((lattice.width_offset() - 100.0).abs() < 1e-9);
        assert_eq!(lattice.point(0, 0), Point::new(100, 66));
        assert_eq!(lattice.point(4, 4), Point::new(500, 333));
    }

    #[test]
    fn test_vertex_boundary_and_corners() {
        let lattice = Lattice::new(100, 100, LatticeResolution::Five);
        let n = 5;
        assert_eq!(lattice.vertex(-1, -1), Point::new(0, 0));
        assert_eq!(lattice.vertex(-1, n), Point::new(100, 0));
        assert_eq!(lattice.vertex(n, -1), Point::new(0, 100));
        assert_eq!(lattice.vertex(n, n), Point::new(100, 100));
        // Offset 16.67 truncates to 16 before scaling.
        assert_eq!(lattice.vertex(-1, 2), Point::new(48, 0));
        assert_eq!(lattice.vertex(3, n), Point::new(100, 64));
        assert_eq!(lattice.vertex(2, 2), lattice.point(2, 2));
    }

    #[test]
    fn test_resolution_parsing() {
        assert_eq!("10x10".parse::<LatticeResolution>().unwrap(), LatticeResolution::Ten);
        assert_eq!("20".parse::<LatticeResolution>().unwrap(), LatticeResolution::Twenty);
        assert!("7".parse::<LatticeResolution>().is_err());
        assert!(LatticeResolution::try_from(15).is_err());
        assert_eq!(LatticeResolution::Five.to_string(), "5x5");
    }

    #[test]
    fn test_resolution_fits_image() {
        assert!(LatticeResolution::Twenty.fits(21, 21));
        assert!(!LatticeResolution::Twenty.fits(16, 16));
        assert!(!LatticeResolution::Ten.fits(200, 8));
        assert!(LatticeResolution::Five.fits(200, 8));
        assert!(matches!(
            LatticeResolution::Twenty.check_fits(16, 16),
            Err(MorphError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_from_points_validates_shape_and_bounds() {
        let good = Lattice::new(100, 100, LatticeResolution::Five);
        let restored =
            Lattice::from_points(100, 100, LatticeResolution::Five, good.points().to_vec()).unwrap();
        assert_eq!(restored, good);

        let short = good.points()[..10].to_vec();
        assert!(Lattice::from_points(100, 100, LatticeResolution::Five, short).is_err());

        let mut outside = good.points().to_vec();
        outside[3] = Point::new(101, 5);
        assert!(Lattice::from_points(100, 100, LatticeResolution::Five, outside).is_err());
    }

    #[test]
    fn test_set_point_bounds() {
        let mut lattice = Lattice::new(100, 100, LatticeResolution::Five);
        assert!(lattice.set_point(2, 2, Point::new(60, 60)).is_ok());
        assert_eq!(lattice.point(2, 2), Point::new(60, 60));
        assert!(lattice.set_point(5, 0, Point::new(1, 1)).is_err());
        assert!(lattice.set_point(0, 0, Point::new(-1, 1)).is_err());
    }

    #[test]
    fn test_interpolate_endpoints_and_mismatch() {
        let start = Lattice::new(100, 100, LatticeResolution::Five);
        let mut end = start.clone();
        end.set_point(2, 2, Point::new(60, 60)).unwrap();

        assert_eq!(Lattice::interpolate(&start, &end, 0.0).unwrap(), start);
        assert_eq!(Lattice::interpolate(&start, &end, 1.0).unwrap(), end);

        let mid = Lattice::interpolate(&start, &end, 0.5).unwrap();
        assert_eq!(mid.point(2, 2), Point::new(55, 55));

        let other = Lattice::new(100, 100, LatticeResolution::Ten);
        assert!(matches!(
            Lattice::interpolate(&start, &other, 0.5),
            Err(MorphError::ResolutionMismatch { start: 5, end: 10 })
        ));
    }

    #[test]
    fn test_hit_test() {
        let lattice = Lattice::new(600, 400, LatticeResolution::Five);
        assert_eq!(lattice.hit_test(Point::new(102, 68)), Some((0, 0)));
        assert_eq!(lattice.hit_test(Point::new(300, 200)), Some((2, 2)));
        assert_eq!(lattice.hit_test(Point::new(105, 66)), None);
        assert_eq!(lattice.hit_test(Point::new(10, 10)), None);
    }

    #[test]
    fn test_serde_round_trip_keeps_positions() {
        let mut lattice = Lattice::new(100, 100, LatticeResolution::Five);
        lattice.set_point(1, 1, Point::new(40, 30)).unwrap();
        let json = serde_json::to_string(&lattice).unwrap();
        assert!(json.contains("\"resolution\":5"));
        let back: Lattice = serde_json::from_str(&json).unwrap();
        assert_eq!(back, lattice);
    }
}
