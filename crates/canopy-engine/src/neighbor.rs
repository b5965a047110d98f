//! The face-neighbour pass of a solve step.

use canopy_core::CellState;
use canopy_mesh::{Forest, GhostLayer, MeshError, MeshIndex, NeighborSlot};
use tracing::{debug, trace};

use crate::boundary::BoundaryDetector;
use crate::context::DomainContext;
use crate::physics::Physics;

/// Counters from one neighbour pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NeighborPassStats {
    /// Local cells visited.
    pub visits: usize,
    /// Flux hook invocations, one per (cell, face-neighbour) entry.
    pub flux_calls: usize,
    /// Entries whose face lies on the domain boundary.
    pub boundary_tags: usize,
}

/// Walks every local cell's face neighbours, tagging boundary faces and
/// invoking the flux hook.
///
/// Neighbour state is read from the local leaf, the ghost buffer, or the
/// cell itself at a domain boundary. Local neighbours visited earlier in
/// the pass are seen with their updated state.
#[derive(Debug)]
pub struct NeighborFluxIterator<'a, P: ?Sized> {
    physics: &'a P,
    ctx: &'a DomainContext,
}

impl<'a, P: Physics + ?Sized> NeighborFluxIterator<'a, P> {
    /// Iterator applying `physics` under the timestep held by `ctx`.
    pub fn new(physics: &'a P, ctx: &'a DomainContext) -> Self {
        Self { physics, ctx }
    }

    /// Run the pass over `forest`.
    ///
    /// `index` and `ghost` must describe the current forest revision, and
    /// `ghost_data` must hold one entry per ghost.
    pub fn run(
        &self,
        forest: &mut Forest<CellState>,
        ghost: &GhostLayer,
        index: &MeshIndex,
        ghost_data: &[CellState],
    ) -> Result<NeighborPassStats, MeshError> {
        for built_for in [ghost.revision(), index.revision()] {
            if built_for != forest.revision() {
                return Err(MeshError::StaleGhostLayer {
                    built_for,
                    current: forest.revision(),
                });
            }
        }
        if ghost_data.len() != ghost.len() {
            return Err(MeshError::GhostCountMismatch {
                source_rank: forest.rank(),
                expected: ghost.len(),
                got: ghost_data.len(),
            });
        }

        let domain = *forest.domain();
        let detector = BoundaryDetector::new(&domain);
        let rank = forest.rank();
        let leaves = forest.leaves_mut();
        let mut stats = NeighborPassStats::default();

        for cell in 0..leaves.len() {
            stats.visits += 1;
            for n in index.face_neighbors(cell) {
                let neighbor = match n.slot {
                    NeighborSlot::Local(j) => leaves[j].data,
                    NeighborSlot::Ghost(g) => ghost_data[g],
                    NeighborSlot::DomainBoundary => leaves[cell].data,
                };
                let leaf = &mut leaves[cell];
                let octant = *leaf.octant();
                if detector.tag(&octant, n.face, &mut leaf.data) {
                    stats.boundary_tags += 1;
                }
                trace!(
                    rank,
                    cell,
                    face = %n.face,
                    owner = n.owner,
                    relation = ?n.relation,
                    "flux"
                );
                self.physics
                    .exchange_flux(&mut leaf.data, &neighbor, n.face.normal(), self.ctx);
                stats.flux_calls += 1;
            }
        }

        debug!(
            rank,
            visits = stats.visits,
            flux_calls = stats.flux_calls,
            boundary_tags = stats.boundary_tags,
            "neighbour pass done"
        );
        Ok(stats)
    }
}
