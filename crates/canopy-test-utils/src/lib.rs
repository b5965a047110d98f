//! Test utilities and fixtures for Canopy development.
//!
//! Provides deterministic refinement patterns, an instrumented physics, and
//! in-memory or failing [`SolutionWriter`]s for exercising the mesh and the
//! solve step without touching the filesystem.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::path::Path;

use canopy_engine::SimulationConfig;
use canopy_mesh::Octant;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub use fixtures::{CountingPhysics, FailingWriter, RecordingWriter};

/// Seeded pseudo-random refinement predicate.
///
/// The decision for an octant depends only on the seed and the octant, so
/// every rank makes the same choice for the same cell regardless of how
/// leaves are distributed.
#[derive(Clone, Copy, Debug)]
pub struct RandomRefinement {
    seed: u64,
    threshold: u64,
    max_level: u8,
}

impl RandomRefinement {
    /// Split roughly `probability` of the octants below `max_level`.
    pub fn new(seed: u64, probability: f64, max_level: u8) -> Self {
        let p = probability.clamp(0.0, 1.0);
        Self {
            seed,
            threshold: (p * u64::MAX as f64) as u64,
            max_level,
        }
    }

    pub fn select(&self, octant: &Octant) -> bool {
        if octant.level() >= self.max_level {
            return false;
        }
        let key = self.seed ^ octant.morton() ^ (u64::from(octant.level()) << 58);
        ChaCha8Rng::seed_from_u64(key).next_u64() < self.threshold
    }
}

/// A configuration small enough for debug-build tests: band cells stop
/// splitting at level 4 instead of level 6.
pub fn small_config(output_dir: &Path) -> SimulationConfig {
    SimulationConfig {
        min_cell_size: 0.1,
        output_dir: output_dir.to_path_buf(),
        ..Default::default()
    }
}
