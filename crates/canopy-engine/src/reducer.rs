//! Stability-bound reduction.
//!
//! The step's global timestep is computed in two strictly ordered parts:
//! [`TimestepReducer::local_pass`] folds the bound of every local cell
//! into the context, then [`global_reduce`] replaces it with the minimum
//! over all ranks. The local pass always finishes before the collective
//! starts, since the reduction needs the completed local value.

use canopy_comm::{CommError, Communicator};
use canopy_core::{CellState, Rank};
use canopy_mesh::Forest;
use tracing::debug;

use crate::context::DomainContext;
use crate::error::SolveError;
use crate::physics::Physics;

/// Folds per-cell stability bounds into the context's global timestep.
#[derive(Debug)]
pub struct TimestepReducer<'a, P: ?Sized> {
    physics: &'a P,
}

impl<'a, P: Physics + ?Sized> TimestepReducer<'a, P> {
    /// Reducer evaluating bounds with `physics`.
    pub fn new(physics: &'a P) -> Self {
        Self { physics }
    }

    /// Reset the global timestep to infinity, then lower it to the bound
    /// of every local cell. Returns the local minimum, which stays
    /// infinite on a rank without cells.
    ///
    /// Fails with [`SolveError::InvalidTimestep`] if any bound is not
    /// finite and positive.
    pub fn local_pass(
        &self,
        forest: &Forest<CellState>,
        ctx: &mut DomainContext,
    ) -> Result<f64, SolveError> {
        ctx.set_global_timestep(f64::INFINITY);
        let domain = forest.domain();
        for leaf in forest.leaves() {
            let h = domain.edge_length(leaf.octant());
            let dt = self.physics.stability_bound(&leaf.data.fields, h, ctx);
            if !(dt.is_finite() && dt > 0.0) {
                return Err(SolveError::InvalidTimestep {
                    rank: Rank(forest.rank()),
                    value: dt,
                });
            }
            if dt < ctx.global_timestep() {
                ctx.set_global_timestep(dt);
            }
        }
        let local = ctx.global_timestep();
        debug!(
            rank = forest.rank(),
            local_cells = forest.local_count(),
            local_dt = local,
            "local stability pass done"
        );
        Ok(local)
    }
}

/// Replace the context's timestep with the minimum across all ranks.
///
/// Collective. Every rank returns the same value.
pub fn global_reduce<C: Communicator>(
    comm: &C,
    ctx: &mut DomainContext,
) -> Result<f64, CommError> {
    let dt_old = ctx.global_timestep();
    let dt_new = comm.all_reduce_min(dt_old)?;
    ctx.set_global_timestep(dt_new);
    debug!(rank = comm.rank().0, dt_old, dt_new, "reduced global timestep");
    Ok(dt_new)
}
