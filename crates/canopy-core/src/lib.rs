//! Core types for the Canopy octree finite-volume solver.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the per-cell payload ([`CellState`]), the face direction table shared
//! by boundary tagging and flux code ([`Face`], [`FACE_NORMALS`]), the
//! six-bit [`BoundaryMask`], and the strongly-typed identifiers used
//! throughout the workspace.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod cell;
pub mod face;
pub mod id;

pub use boundary::BoundaryMask;
pub use cell::{CellState, SolverFields, SOLVER_FIELD_COUNT};
pub use face::{Face, FACE_COUNT, FACE_NORMALS};
pub use id::{Rank, StepIndex};
