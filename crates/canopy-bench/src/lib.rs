//! Benchmark profiles and utilities for the Canopy octree solver.
//!
//! - [`reference_profile`]: the default band-refined unit cube
//! - [`coarse_profile`]: the same band stopped two levels earlier
//! - [`band_forest`]: the initial adapted forest of a profile on one rank
//! - [`DiscardWriter`]: a writer that drops every frame

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use canopy_comm::SerialComm;
use canopy_core::CellState;
use canopy_engine::{
    BandRefinement, DomainContext, IdealGas, Physics, RefinementPolicy, SimulationConfig,
};
use canopy_mesh::{Forest, MeshError, Octant};
use canopy_output::{OutputError, OutputFrame, SolutionWriter};

/// The default configuration: band cells refined to level 6.
pub fn reference_profile() -> SimulationConfig {
    SimulationConfig::default()
}

/// Band cells refined to level 4 (`min_cell_size` 0.1).
pub fn coarse_profile() -> SimulationConfig {
    SimulationConfig {
        min_cell_size: 0.1,
        ..Default::default()
    }
}

/// Build, band-refine, and balance the forest of `config` on a single
/// rank, with ideal-gas initial states.
pub fn band_forest(config: &SimulationConfig) -> Result<Forest<CellState>, MeshError> {
    let comm = SerialComm::new();
    let ctx = DomainContext::from_config(config);
    let gas = IdealGas::new(config.cfl);
    let domain = config.domain;
    let band = BandRefinement::from_context(&ctx);
    let mut init = |o: &Octant| CellState::new(gas.initial_state(&domain.geometry(o), &ctx));

    let mut forest = Forest::new_uniform(&comm, domain, config.min_level, &mut init)?;
    forest.refine(
        &comm,
        true,
        |o: &Octant| band.should_refine(&domain.geometry(o)),
        &mut init,
    )?;
    forest.balance(&comm, config.balance, &mut init)?;
    Ok(forest)
}

/// Accepts and drops every frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardWriter;

impl SolutionWriter for DiscardWriter {
    fn write_frame(&mut self, frame: &OutputFrame) -> Result<(), OutputError> {
        frame.validate()
    }
}
