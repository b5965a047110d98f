//! Per-step performance metrics.
//!
//! [`StepMetrics`] captures phase timings and counters for a single solve
//! step on one rank.

/// Timing and counters collected during one solve step.
///
/// All durations are wall-clock microseconds on the reporting rank.
#[derive(Clone, Debug, Default)]
pub struct StepMetrics {
    /// Wall-clock time for the entire step, in microseconds.
    pub total_us: u64,
    /// Ghost layer and mesh index construction plus the initial fill.
    pub ghost_build_us: u64,
    /// Local stability pass over every local cell.
    pub cfl_pass_us: u64,
    /// Collective minimum reduction.
    pub reduce_us: u64,
    /// Both post-reduction ghost exchanges combined.
    pub exchange_us: u64,
    /// Face-neighbour iteration.
    pub neighbor_pass_us: u64,
    /// Frame assembly and writing.
    pub output_us: u64,
    /// Leaves owned by this rank.
    pub local_cells: usize,
    /// Ghost cells mirrored from other ranks.
    pub ghost_cells: usize,
    /// Flux hook invocations.
    pub flux_calls: usize,
    /// Boundary faces tagged.
    pub boundary_tags: usize,
    /// Heap footprint of the step's mesh index, in bytes.
    pub index_memory_bytes: usize,
    /// This rank's minimum stability bound (infinite for an empty rank).
    pub local_timestep: f64,
    /// The reduced timestep shared by every rank.
    pub global_timestep: f64,
}
