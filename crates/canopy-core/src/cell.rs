//! Per-leaf cell payload: solver fields plus boundary tagging.

use crate::boundary::BoundaryMask;
use crate::face::Face;

/// Number of conserved variables carried by every cell.
pub const SOLVER_FIELD_COUNT: usize = 5;

/// Fixed-size physical state of one cell.
///
/// The layout is owned by the physics layer. The reference ideal-gas
/// physics stores conserved variables `[rho, rho*u, rho*v, rho*w, E]`.
pub type SolverFields = [f64; SOLVER_FIELD_COUNT];

/// State attached to exactly one leaf cell of the octree.
///
/// Created by the cell factory whenever the mesh hands a new cell to a
/// process (initial construction, refinement). Moves with its cell on
/// repartition. Mutated only by the owning process during the neighbour
/// pass; remote processes see it as a read-only ghost copy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellState {
    /// Physical state vector.
    pub fields: SolverFields,
    /// Faces of this cell found on the domain boundary.
    pub boundary: BoundaryMask,
    /// Outward normal of the last boundary face tagged. Zero until the
    /// first boundary face is seen.
    pub boundary_normal: [f64; 3],
}

impl CellState {
    /// Fresh state with the given solver fields, an empty boundary mask,
    /// and a zero normal.
    pub fn new(fields: SolverFields) -> Self {
        Self {
            fields,
            boundary: BoundaryMask::empty(),
            boundary_normal: [0.0; 3],
        }
    }

    /// Record `face` as a boundary face.
    ///
    /// The mask accumulates; the normal is overwritten, so after several
    /// calls it holds the normal of the last face recorded.
    pub fn tag_boundary(&mut self, face: Face) {
        self.boundary.insert(face);
        self.boundary_normal = face.normal();
    }

    /// Whether any boundary face has been recorded.
    pub fn is_boundary(&self) -> bool {
        !self.boundary.is_empty()
    }
}

impl Default for CellState {
    fn default() -> Self {
        Self::new([0.0; SOLVER_FIELD_COUNT])
    }
}
