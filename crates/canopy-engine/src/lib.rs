//! Solve-step coordination and the simulation driver for Canopy.
//!
//! A [`Simulation`] builds an adapted octree mesh over a cube, then runs
//! solve steps through the [`SolveStepCoordinator`]: ghost exchange, a
//! local stability pass reduced to one global timestep, a face-neighbour
//! pass that tags domain-boundary faces and calls the [`Physics`] flux
//! hook, and per-step output. Between steps every leaf is split once and
//! the mesh is repartitioned.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod neighbor;
pub mod physics;
pub mod policy;
pub mod reducer;
pub mod simulation;
pub mod step;

pub use boundary::BoundaryDetector;
pub use config::{ConfigError, SimulationConfig};
pub use context::DomainContext;
pub use error::SolveError;
pub use metrics::StepMetrics;
pub use neighbor::{NeighborFluxIterator, NeighborPassStats};
pub use physics::{IdealGas, Physics};
pub use policy::{BandRefinement, RefineAlways, RefinementPolicy};
pub use reducer::{global_reduce, TimestepReducer};
pub use simulation::{Simulation, INIT_STEM};
pub use step::{mesh_frame, SolveStepCoordinator, StepOutcome, StepPhase, BOUNDARY_FIELD};
