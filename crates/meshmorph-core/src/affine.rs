//! Per-triangle affine solve.
//!
//! Given source triangle `S` and destination triangle `D`, find the unique
//! map with `D[k] = M(S[k])` for `k = 0, 1, 2`. With
//! `A = [[x0, y0, 1], [x1, y1, 1], [x2, y2, 1]]` built from `S`, the two
//! systems `A * (a, c, e) = Dx` and `A * (b, d, f) = Dy` are solved by
//! Cramer's rule. Every determinant is evaluated on integer inputs, so an
//! identical source and destination yields the exact identity map.

use serde::{Deserialize, Serialize};

use crate::math::Point2D;
use crate::mesh::Triangle;

/// `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineMap {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

/// The source triangle's vertices are collinear, so no unique map exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("source triangle is degenerate (collinear vertices)")]
pub struct SingularTriangle;

impl AffineMap {
    pub const IDENTITY: AffineMap = AffineMap {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// Solve for the map sending each `src` vertex to the matching `dst` vertex.
    pub fn solve(src: &Triangle, dst: &Triangle) -> Result<AffineMap, SingularTriangle> {
        let s = src.vertices.map(|p| [p.x as f64, p.y as f64]);
        let det = det3(
            [s[0][0], s[0][1], 1.0],
            [s[1][0], s[1][1], 1.0],
            [s[2][0], s[2][1], 1.0],
        );
        if det == 0.0 {
            return Err(SingularTriangle);
        }

        let dx = dst.vertices.map(|p| p.x as f64);
        let dy = dst.vertices.map(|p| p.y as f64);
        let (a, c, e) = cramer(&s, dx, det);
        let (b, d, f) = cramer(&s, dy, det);
        Ok(AffineMap { a, b, c, d, e, f })
    }

    /// Apply the map to a point.
    pub fn apply(&self, p: Point2D) -> Point2D {
        Point2D::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// The inverse map, or `None` when the linear part is singular.
    pub fn inverse(&self) -> Option<AffineMap> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        let a = self.d * inv;
        let b = -self.b * inv;
        let c = -self.c * inv;
        let d = self.a * inv;
        let e = -(a * self.e + c * self.f);
        let f = -(b * self.e + d * self.f);
        Some(AffineMap { a, b, c, d, e, f })
    }
}

impl Default for AffineMap {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn det3(r0: [f64; 3], r1: [f64; 3], r2: [f64; 3]) -> f64 {
    r0[0] * (r1[1] * r2[2] - r1[2] * r2[1]) - r0[1] * (r1[0] * r2[2] - r1[2] * r2[0])
        + r0[2] * (r1[0] * r2[1] - r1[1] * r2[0])
}

/// Solve `A * (u, v, w) = rhs` for the homogeneous source matrix `A`.
fn cramer(s: &[[f64; 2]; 3], rhs: [f64; 3], det: f64) -> (f64, f64, f64) {
    let row = |k: usize| [s[k][0], s[k][1], 1.0];
    let (r0, r1, r2) = (row(0), row(1), row(2));
    let u = det3(
        [rhs[0], r0[1], 1.0],
        [rhs[1], r1[1], 1.0],
        [rhs[2], r2[1], 1.0],
    );
    let v = det3(
        [r0[0], rhs[0], 1.0],
        [r1[0], rhs[1], 1.0],
        [r2[0], rhs[2], 1.0],
    );
    let w = det3(
        [r0[0], r0[1], rhs[0]],
        [r1[0], r1[1], rhs[1]],
        [r2[0], r2[1], rhs[2]],
    );
    (u / det, v / det, w / det)
}
