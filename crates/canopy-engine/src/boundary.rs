//! Domain-boundary face detection.

use canopy_core::{CellState, Face};
use canopy_mesh::{CubeDomain, Octant};
use tracing::trace;

/// Tags faces of cells that lie on the outer surface of the domain.
#[derive(Clone, Copy, Debug)]
pub struct BoundaryDetector<'a> {
    domain: &'a CubeDomain,
}

impl<'a> BoundaryDetector<'a> {
    /// Detector for cells of `domain`.
    pub fn new(domain: &'a CubeDomain) -> Self {
        Self { domain }
    }

    /// Whether `face` of `octant` lies on the domain boundary.
    pub fn is_boundary(&self, octant: &Octant, face: Face) -> bool {
        self.domain.is_boundary_face(octant, face)
    }

    /// If `face` of `octant` is a boundary face, record it in `state` and
    /// return `true`.
    ///
    /// The mask accumulates across calls; the stored normal is that of the
    /// last face recorded.
    pub fn tag(&self, octant: &Octant, face: Face, state: &mut CellState) -> bool {
        if !self.is_boundary(octant, face) {
            return false;
        }
        state.tag_boundary(face);
        trace!(%octant, %face, mask = state.boundary.bits(), "tagged boundary face");
        true
    }
}
