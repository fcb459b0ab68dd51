//! Triangle mesh derivation from a lattice snapshot.
//!
//! Every cell `(i, j)`, `0 <= i, j <= N`, of the extended grid is split
//! along its top-right/bottom-left diagonal into an upper triangle
//! (top-left, top-right, bottom-left) and a lower triangle (top-right,
//! bottom-right, bottom-left). The two families together tile the image
//! rectangle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lattice::Lattice;
use crate::math::{cross, Point};

/// Which of the two triangle families a triangle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriangleFamily {
    Upper,
    Lower,
}

impl fmt::Display for TriangleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriangleFamily::Upper => write!(f, "upper"),
            TriangleFamily::Lower => write!(f, "lower"),
        }
    }
}

/// Three vertices in a fixed winding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triangle {
    pub vertices: [Point; 3],
}

impl Triangle {
    pub fn new(a: Point, b: Point, c: Point) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }

    /// Twice the signed area; positive for the mesh winding in image space.
    pub fn doubled_signed_area(&self) -> i64 {
        let [a, b, c] = self.vertices;
        cross(a, b, c)
    }

    /// Unsigned area in square pixels.
    pub fn area(&self) -> f64 {
        self.doubled_signed_area().unsigned_abs() as f64 / 2.0
    }

    /// Whether the three vertices are collinear.
    pub fn is_degenerate(&self) -> bool {
        self.doubled_signed_area() == 0
    }

    /// Closed containment test: points on an edge count as inside.
    ///
    /// Works for either winding; degenerate triangles contain nothing.
    pub fn contains(&self, p: Point) -> bool {
        let [a, b, c] = self.vertices;
        let area = cross(a, b, c);
        if area == 0 {
            return false;
        }
        let sign = area.signum();
        cross(a, b, p) * sign >= 0 && cross(b, c, p) * sign >= 0 && cross(c, a, p) * sign >= 0
    }

    /// Whether any vertex lies on the border of a `width x height` rectangle.
    pub fn touches_border(&self, width: u32, height: u32) -> bool {
        self.vertices.iter().any(|v| {
            v.x == 0 || v.y == 0 || v.x == width as i32 || v.y == height as i32
        })
    }
}

/// Upper triangle of cell `(i, j)`: top-left, top-right, bottom-left.
pub fn upper_at(lattice: &Lattice, i: usize, j: usize) -> Triangle {
    let (i, j) = (i as isize, j as isize);
    Triangle::new(
        lattice.vertex(i - 1, j - 1),
        lattice.vertex(i - 1, j),
        lattice.vertex(i, j - 1),
    )
}

/// Lower triangle of cell `(i, j)`: top-right, bottom-right, bottom-left.
pub fn lower_at(lattice: &Lattice, i: usize, j: usize) -> Triangle {
    let (i, j) = (i as isize, j as isize);
    Triangle::new(
        lattice.vertex(i - 1, j),
        lattice.vertex(i, j),
        lattice.vertex(i, j - 1),
    )
}

/// The six triangles around control point `(i, j)`, read straight from the
/// lattice without building a whole mesh.
pub fn neighbourhood_of(lattice: &Lattice, i: usize, j: usize) -> [Triangle; 6] {
    [
        lower_at(lattice, i, j),
        lower_at(lattice, i, j + 1),
        lower_at(lattice, i + 1, j),
        upper_at(lattice, i, j + 1),
        upper_at(lattice, i + 1, j + 1),
        upper_at(lattice, i + 1, j),
    ]
}

/// The upper and lower triangle families derived from one lattice snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mesh {
    /// Cells per side, `N + 1`.
    cells: usize,
    width: u32,
    height: u32,
    upper: Vec<Triangle>,
    lower: Vec<Triangle>,
}

impl Mesh {
    /// Derive both triangle families from a lattice.
    pub fn build(lattice: &Lattice) -> Mesh {
        let cells = lattice.n() + 1;
        let mut upper = Vec::with_capacity(cells * cells);
        let mut lower = Vec::with_capacity(cells * cells);

        for i in 0..cells {
            for j in 0..cells {
                upper.push(upper_at(lattice, i, j));
                lower.push(lower_at(lattice, i, j));
            }
        }

        Mesh {
            cells,
            width: lattice.width(),
            height: lattice.height(),
            upper,
            lower,
        }
    }

    /// Cells per side, `N + 1`.
    pub fn cells(&self) -> usize {
        self.cells
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn upper(&self, i: usize, j: usize) -> &Triangle {
        &self.upper[i * self.cells + j]
    }

    pub fn lower(&self, i: usize, j: usize) -> &Triangle {
        &self.lower[i * self.cells + j]
    }

    /// All triangles of one family, row-major.
    pub fn family(&self, family: TriangleFamily) -> &[Triangle] {
        match family {
            TriangleFamily::Upper => &self.upper,
            TriangleFamily::Lower => &self.lower,
        }
    }

    /// Every triangle with its family and cell indices.
    pub fn triangles(&self) -> impl Iterator<Item = (TriangleFamily, usize, usize, &Triangle)> + '_ {
        let cells = self.cells;
        [TriangleFamily::Upper, TriangleFamily::Lower]
            .into_iter()
            .flat_map(move |family| {
                self.family(family)
                    .iter()
                    .enumerate()
                    .map(move |(idx, tri)| (family, idx / cells, idx % cells, tri))
            })
    }

    /// The six triangles that share control point `(i, j)` as a vertex.
    pub fn neighbourhood(&self, i: usize, j: usize) -> [Triangle; 6] {
        [
            *self.lower(i, j),
            *self.lower(i, j + 1),
            *self.lower(i + 1, j),
            *self.upper(i, j + 1),
            *self.upper(i + 1, j + 1),
            *self.upper(i + 1, j),
        ]
    }

    /// Sum of unsigned triangle areas over both families.
    pub fn total_area(&self) -> f64 {
        self.upper.iter().chain(&self.lower).map(Triangle::area).sum()
    }

    /// Whether every triangle keeps the mesh winding with non-zero area.
    pub fn is_fold_free(&self) -> bool {
        self.upper
            .iter()
            .chain(&self.lower)
            .all(|t| t.doubled_signed_area() > 0)
    }

    /// Family and cell of the first zero-area triangle, if any.
    pub fn first_degenerate(&self) -> Option<(TriangleFamily, usize, usize)> {
        self.triangles()
            .find(|(_, _, _, tri)| tri.is_degenerate())
            .map(|(family, i, j, _)| (family, i, j))
    }
}
