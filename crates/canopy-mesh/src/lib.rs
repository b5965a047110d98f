//! Distributed linear octree mesh for Canopy.
//!
//! A single cubical tree is stored as a Morton-ordered list of leaf
//! [`Octant`]s split into contiguous per-rank ranges. The [`Forest`]
//! owns one payload per local leaf and provides the collective mesh
//! operations the solver drives between and during steps:
//!
//! - [`Forest::new_uniform`]: fill the domain at a fixed level
//! - [`Forest::refine`]: split leaves selected by a predicate
//! - [`Forest::balance`]: enforce the 2:1 level condition
//! - [`Forest::partition`]: redistribute leaves to equal counts
//!
//! Per step, a [`GhostLayer`] collects the remote leaves adjacent to the
//! local partition and exchanges their payloads, and a [`MeshIndex`]
//! records every local leaf's face neighbours (same level, coarser,
//! finer, local or ghost). Both are snapshots of one mesh revision and
//! are rejected once the forest changes.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod balance;
pub mod domain;
pub mod error;
pub mod forest;
pub mod ghost;
pub mod index;
pub mod lookup;
pub mod octant;

pub use balance::Connectivity;
pub use domain::{CellGeometry, CubeDomain};
pub use error::MeshError;
pub use forest::{CellInit, Forest, Leaf};
pub use ghost::{GhostLayer, GhostOctant};
pub use index::{FaceNeighbor, LevelRelation, MeshIndex, NeighborSlot};
pub use octant::{Contact, Octant, MAX_LEVEL, ROOT_LEN};
