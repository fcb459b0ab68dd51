//! Interactive control-point relocation with a fold-over guard.
//!
//! A drag begins on a control point's handle. The six triangles around that
//! point are captured at that moment and stay fixed for the whole drag: a
//! move is applied only when the target lies inside their union and every
//! one of the six triangles, rebuilt with the new position, keeps a strictly
//! positive signed area. Anything else is ignored and the point stays put.

use tracing::debug;

use crate::error::{MorphError, MorphResult};
use crate::lattice::Lattice;
use crate::math::Point;
use crate::mesh::{neighbourhood_of, Triangle};

/// State captured when a drag begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub row: usize,
    pub col: usize,
    /// Position of the point before the drag.
    pub origin: Point,
    allowed: [Triangle; 6],
}

impl DragSession {
    fn capture(lattice: &Lattice, row: usize, col: usize) -> Self {
        Self {
            row,
            col,
            origin: lattice.point(row, col),
            allowed: neighbourhood_of(lattice, row, col),
        }
    }

    /// Whether `p` lies in the region captured at drag start (edges included).
    pub fn allows(&self, p: Point) -> bool {
        self.allowed.iter().any(|t| t.contains(p))
    }
}

/// Tracks at most one in-progress drag over a lattice.
#[derive(Debug, Default)]
pub struct LatticeEditor {
    drag: Option<DragSession>,
}

impl LatticeEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// Start dragging the control point whose handle contains `at`.
    ///
    /// Returns the grabbed indices, or `None` when `at` hits no handle.
    pub fn begin_drag(&mut self, lattice: &Lattice, at: Point) -> Option<(usize, usize)> {
        let (row, col) = lattice.hit_test(at)?;
        debug!(row, col, "begin drag");
        self.drag = Some(DragSession::capture(lattice, row, col));
        Some((row, col))
    }

    /// Start dragging control point `(row, col)` directly.
    pub fn begin_drag_at(&mut self, lattice: &Lattice, row: usize, col: usize) -> MorphResult<()> {
        let n = lattice.n();
        if row >= n || col >= n {
            return Err(MorphError::InvalidArgument(format!(
                "control point ({}, {}) out of range for a {} lattice",
                row,
                col,
                lattice.resolution()
            )));
        }
        self.drag = Some(DragSession::capture(lattice, row, col));
        Ok(())
    }

    /// Move the dragged point to `to` if the move keeps the mesh fold-free.
    ///
    /// Returns whether the point moved. Without an active drag this is a no-op.
    pub fn drag_to(&mut self, lattice: &mut Lattice, to: Point) -> bool {
        let Some(session) = &self.drag else {
            return false;
        };
        if !session.allows(to) || !lattice.in_bounds(to) {
            debug!(row = session.row, col = session.col, %to, "move outside allowed region ignored");
            return false;
        }

        let (row, col) = (session.row, session.col);
        let previous = lattice.point(row, col);
        if lattice.set_point(row, col, to).is_err() {
            return false;
        }
        let folds = neighbourhood_of(lattice, row, col)
            .iter()
            .any(|t| t.doubled_signed_area() <= 0);
        if folds {
            // Bounds were checked above, so restoring cannot fail.
            let _ = lattice.set_point(row, col, previous);
            debug!(row, col, %to, "move would fold the mesh; ignored");
            return false;
        }
        true
    }

    /// Finish the drag, returning the indices of the point that was dragged.
    pub fn end_drag(&mut self) -> Option<(usize, usize)> {
        self.drag.take().map(|s| (s.row, s.col))
    }

    /// One-shot relocation of `(row, col)` under the same guard as a drag.
    pub fn try_move(lattice: &mut Lattice, row: usize, col: usize, to: Point) -> MorphResult<bool> {
        let mut editor = LatticeEditor::new();
        editor.begin_drag_at(lattice, row, col)?;
        let moved = editor.drag_to(lattice, to);
        editor.end_drag();
        Ok(moved)
    }
}
