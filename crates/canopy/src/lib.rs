//! Canopy: the timestep core of a distributed adaptive octree
//! finite-volume solver.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Canopy sub-crates. For most users, adding `canopy` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use canopy::prelude::*;
//!
//! let dir = std::env::temp_dir().join("canopy-doc");
//! std::fs::create_dir_all(&dir).unwrap();
//! let config = SimulationConfig {
//!     min_cell_size: 0.2,
//!     output_dir: dir,
//!     ..Default::default()
//! };
//! let writer = config.vtk_writer();
//! let mut sim =
//!     Simulation::new(config, SerialComm::new(), IdealGas::default(), writer).unwrap();
//! let outcome = sim.step().unwrap();
//! assert!(outcome.global_timestep > 0.0);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `canopy-core` | Faces, boundary masks, cell state, IDs |
//! | [`comm`] | `canopy-comm` | Collective operations and in-process rank groups |
//! | [`mesh`] | `canopy-mesh` | Distributed linear octree, ghosts, face index |
//! | [`output`] | `canopy-output` | VTK frames and timing files |
//! | [`engine`] | `canopy-engine` | Solve step, physics, simulation driver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`canopy-core`).
///
/// [`types::Face`], [`types::BoundaryMask`], and the per-leaf
/// [`types::CellState`].
pub use canopy_core as types;

/// Collective operations (`canopy-comm`).
///
/// The [`comm::Communicator`] trait with [`comm::SerialComm`] for one
/// rank and [`comm::ProcessGroup`] for several in-process ranks.
pub use canopy_comm as comm;

/// The distributed octree (`canopy-mesh`).
///
/// [`mesh::Forest`] for refinement, balance, and partition;
/// [`mesh::GhostLayer`] and [`mesh::MeshIndex`] for per-step adjacency.
pub use canopy_mesh as mesh;

/// Visualization and timing output (`canopy-output`).
pub use canopy_output as output;

/// Solve step and driver (`canopy-engine`).
///
/// [`engine::Simulation`] runs a configured simulation;
/// [`engine::SolveStepCoordinator`] runs a single step.
pub use canopy_engine as engine;

/// Common imports for typical Canopy usage.
pub mod prelude {
    // Core types
    pub use canopy_core::{BoundaryMask, CellState, Face, Rank, SolverFields, StepIndex};

    // Communication
    pub use canopy_comm::{CommError, Communicator, ProcessGroup, SerialComm};

    // Mesh
    pub use canopy_mesh::{Connectivity, CubeDomain, Forest, MeshError, Octant};

    // Output
    pub use canopy_output::{OutputError, SolutionWriter, VtkWriter};

    // Engine
    pub use canopy_engine::{
        DomainContext, IdealGas, Physics, RefinementPolicy, Simulation, SimulationConfig,
        SolveError, SolveStepCoordinator, StepMetrics, StepOutcome,
    };
}
