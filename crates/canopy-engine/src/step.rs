//! The solve step: one synchronized timestep across every rank.
//!
//! [`SolveStepCoordinator`] drives the phases of [`StepPhase`] in a fixed
//! order. Every phase except the local stability pass and the neighbour
//! pass is collective, so all ranks walk the same sequence. A failure in
//! any phase ends the step with a [`SolveError`] naming the phase; the
//! coordinator is not reused after that.

use std::fmt;
use std::time::Instant;

use canopy_comm::Communicator;
use canopy_core::{CellState, Rank, StepIndex};
use canopy_mesh::{Connectivity, Forest, GhostLayer, MeshError, MeshIndex};
#[cfg(test)]
use canopy_mesh::Octant;
use canopy_output::{CellRecord, OutputFrame, SolutionWriter};
use tracing::{debug, info, instrument};

use crate::context::DomainContext;
use crate::error::SolveError;
use crate::metrics::StepMetrics;
use crate::neighbor::NeighborFluxIterator;
use crate::physics::Physics;
use crate::reducer::{global_reduce, TimestepReducer};

/// Name of the per-corner field carrying each cell's boundary mask.
pub const BOUNDARY_FIELD: &str = "boundary";

// ── StepPhase ──────────────────────────────────────────────────────

/// Phases of a solve step, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepPhase {
    /// Build the ghost layer and mesh index, then fill the ghost buffer.
    BuildGhostLayer,
    /// Fold every local cell's stability bound into the context.
    LocalCflPass,
    /// Minimum-reduce the timestep across ranks.
    GlobalReduce,
    /// Refresh ghosts before the neighbour pass.
    ExchangeGhost1,
    /// Tag boundary faces and exchange fluxes.
    NeighborPass,
    /// Refresh ghosts with the post-pass state.
    ExchangeGhost2,
    /// Hand the step's frame to the writer.
    Output,
    /// Release the step's ghost layer, index, and buffer.
    Teardown,
}

impl StepPhase {
    /// Every phase in execution order.
    pub const SEQUENCE: [StepPhase; 8] = [
        StepPhase::BuildGhostLayer,
        StepPhase::LocalCflPass,
        StepPhase::GlobalReduce,
        StepPhase::ExchangeGhost1,
        StepPhase::NeighborPass,
        StepPhase::ExchangeGhost2,
        StepPhase::Output,
        StepPhase::Teardown,
    ];

    /// The phase that follows this one. Teardown is followed by the next
    /// step's ghost-layer build.
    pub fn next(self) -> Self {
        match self {
            Self::BuildGhostLayer => Self::LocalCflPass,
            Self::LocalCflPass => Self::GlobalReduce,
            Self::GlobalReduce => Self::ExchangeGhost1,
            Self::ExchangeGhost1 => Self::NeighborPass,
            Self::NeighborPass => Self::ExchangeGhost2,
            Self::ExchangeGhost2 => Self::Output,
            Self::Output => Self::Teardown,
            Self::Teardown => Self::BuildGhostLayer,
        }
    }
}

impl fmt::Display for StepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BuildGhostLayer => "ghost layer build",
            Self::LocalCflPass => "local stability pass",
            Self::GlobalReduce => "global reduce",
            Self::ExchangeGhost1 => "first ghost exchange",
            Self::NeighborPass => "neighbour pass",
            Self::ExchangeGhost2 => "second ghost exchange",
            Self::Output => "output",
            Self::Teardown => "teardown",
        })
    }
}

// ── StepOutcome ────────────────────────────────────────────────────

/// Result of a completed solve step.
#[derive(Clone, Debug)]
pub struct StepOutcome {
    /// The step that ran.
    pub step: StepIndex,
    /// The reduced timestep, identical on every rank.
    pub global_timestep: f64,
    /// Leaves across all ranks.
    pub global_cells: u64,
    /// This rank's timings and counters.
    pub metrics: StepMetrics,
}

// ── Frames ─────────────────────────────────────────────────────────

/// A frame holding the geometry of every local leaf of `forest`, with no
/// corner fields.
pub fn mesh_frame<T>(forest: &Forest<T>, stem: impl Into<String>) -> OutputFrame {
    let domain = forest.domain();
    let mut frame = OutputFrame::new(stem, Rank(forest.rank()), forest.size());
    frame.cells = forest
        .leaves()
        .iter()
        .map(|leaf| {
            let g = domain.geometry(leaf.octant());
            CellRecord {
                center: g.midpoint,
                edge_length: g.edge_length,
                level: g.level,
            }
        })
        .collect();
    frame
}

fn solution_frame(forest: &Forest<CellState>, step: StepIndex) -> OutputFrame {
    let mut frame = mesh_frame(forest, step.solution_stem());
    let mask = forest
        .leaves()
        .iter()
        .map(|leaf| [leaf.data.boundary.output_value(); 8])
        .collect();
    frame.add_corner_field(BOUNDARY_FIELD, mask);
    frame
}

fn mesh_failure(phase: StepPhase) -> impl FnOnce(MeshError) -> SolveError {
    move |e| match e {
        MeshError::Comm(source) => SolveError::Comm { phase, source },
        source => SolveError::Mesh { phase, source },
    }
}

// ── SolveStepCoordinator ───────────────────────────────────────────

/// Per-step adjacency: built at the start of a step, dropped at teardown.
struct StepScope {
    ghost: GhostLayer,
    index: MeshIndex,
    ghost_data: Vec<CellState>,
}

/// Runs solve steps on one rank.
#[derive(Debug)]
pub struct SolveStepCoordinator<'a, C, P: ?Sized> {
    comm: &'a C,
    physics: &'a P,
    phase: Option<StepPhase>,
    #[cfg(test)]
    retired_ghosts: Vec<(Octant, CellState)>,
}

impl<'a, C, P> SolveStepCoordinator<'a, C, P>
where
    C: Communicator,
    P: Physics + ?Sized,
{
    /// Coordinator for this rank of `comm`.
    pub fn new(comm: &'a C, physics: &'a P) -> Self {
        Self {
            comm,
            physics,
            phase: None,
            #[cfg(test)]
            retired_ghosts: Vec::new(),
        }
    }

    /// Phase most recently entered, `None` before the first step.
    pub fn phase(&self) -> Option<StepPhase> {
        self.phase
    }

    fn enter(&mut self, phase: StepPhase) {
        let expected = self.phase.map_or(StepPhase::BuildGhostLayer, StepPhase::next);
        debug_assert_eq!(phase, expected, "solve step phases out of order");
        self.phase = Some(phase);
        debug!(rank = self.comm.rank().0, %phase, "entering phase");
    }

    /// Run step `step` over `forest`, writing its frame to `writer`.
    ///
    /// Collective. On return the context holds the step's global
    /// timestep and every local cell carries its boundary mask.
    #[instrument(skip_all, name = "solve_step", fields(step = step.0, rank = self.comm.rank().0))]
    pub fn run<W>(
        &mut self,
        step: StepIndex,
        forest: &mut Forest<CellState>,
        ctx: &mut DomainContext,
        writer: &mut W,
    ) -> Result<StepOutcome, SolveError>
    where
        W: SolutionWriter + ?Sized,
    {
        let comm = self.comm;
        let start = Instant::now();
        let mut metrics = StepMetrics::default();
        info!(
            rank = comm.rank().0,
            %step,
            local_cells = forest.local_count(),
            global_cells = forest.global_count(),
            "solve step started"
        );

        // Ghost layer, index, and initial fill.
        self.enter(StepPhase::BuildGhostLayer);
        let t = Instant::now();
        let mut scope = {
            let at = StepPhase::BuildGhostLayer;
            let ghost = GhostLayer::build(forest, comm, Connectivity::Face)
                .map_err(mesh_failure(at))?;
            let index = MeshIndex::build(forest, &ghost).map_err(mesh_failure(at))?;
            let mut ghost_data = Vec::with_capacity(ghost.len());
            ghost
                .exchange(forest, comm, &mut ghost_data)
                .map_err(mesh_failure(at))?;
            StepScope {
                ghost,
                index,
                ghost_data,
            }
        };
        metrics.ghost_build_us = t.elapsed().as_micros() as u64;
        metrics.local_cells = forest.local_count();
        metrics.ghost_cells = scope.ghost.len();
        metrics.index_memory_bytes = scope.index.memory_bytes();
        debug!(
            rank = comm.rank().0,
            local_cells = metrics.local_cells,
            ghost_cells = metrics.ghost_cells,
            "ghost layer ready"
        );

        self.enter(StepPhase::LocalCflPass);
        let t = Instant::now();
        metrics.local_timestep = TimestepReducer::new(self.physics).local_pass(forest, ctx)?;
        metrics.cfl_pass_us = t.elapsed().as_micros() as u64;

        self.enter(StepPhase::GlobalReduce);
        let t = Instant::now();
        metrics.global_timestep =
            global_reduce(comm, ctx).map_err(|source| SolveError::Comm {
                phase: StepPhase::GlobalReduce,
                source,
            })?;
        metrics.reduce_us = t.elapsed().as_micros() as u64;

        self.enter(StepPhase::ExchangeGhost1);
        let t = Instant::now();
        scope
            .ghost
            .exchange(forest, comm, &mut scope.ghost_data)
            .map_err(mesh_failure(StepPhase::ExchangeGhost1))?;
        metrics.exchange_us = t.elapsed().as_micros() as u64;

        self.enter(StepPhase::NeighborPass);
        let t = Instant::now();
        let stats = NeighborFluxIterator::new(self.physics, ctx)
            .run(forest, &scope.ghost, &scope.index, &scope.ghost_data)
            .map_err(mesh_failure(StepPhase::NeighborPass))?;
        metrics.neighbor_pass_us = t.elapsed().as_micros() as u64;
        metrics.flux_calls = stats.flux_calls;
        metrics.boundary_tags = stats.boundary_tags;

        self.enter(StepPhase::ExchangeGhost2);
        let t = Instant::now();
        scope
            .ghost
            .exchange(forest, comm, &mut scope.ghost_data)
            .map_err(mesh_failure(StepPhase::ExchangeGhost2))?;
        metrics.exchange_us += t.elapsed().as_micros() as u64;

        self.enter(StepPhase::Output);
        let t = Instant::now();
        let frame = solution_frame(forest, step);
        writer
            .write_frame(&frame)
            .map_err(|source| SolveError::Output {
                stem: frame.stem.clone(),
                source,
            })?;
        metrics.output_us = t.elapsed().as_micros() as u64;

        self.enter(StepPhase::Teardown);
        #[cfg(test)]
        {
            self.retired_ghosts = scope
                .ghost
                .ghosts()
                .iter()
                .map(|g| *g.octant())
                .zip(scope.ghost_data.iter().copied())
                .collect();
        }
        drop(scope);

        metrics.total_us = start.elapsed().as_micros() as u64;
        info!(
            rank = comm.rank().0,
            %step,
            dt = metrics.global_timestep,
            flux_calls = metrics.flux_calls,
            total_us = metrics.total_us,
            "solve step finished"
        );
        Ok(StepOutcome {
            step,
            global_timestep: ctx.global_timestep(),
            global_cells: forest.global_count(),
            metrics,
        })
    }
}
