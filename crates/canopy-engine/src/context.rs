//! Process-wide simulation parameters.

use crate::config::SimulationConfig;

/// Parameters every rank holds identically, plus the global timestep.
///
/// The refinement band and constants are fixed for the run. The global
/// timestep is written only by the [`reducer`](crate::reducer): the local
/// pass folds each cell's stability bound into it, and the collective
/// reduction replaces it with the minimum across ranks.
#[derive(Clone, Debug, PartialEq)]
pub struct DomainContext {
    /// Center of the refinement band.
    pub center: [f64; 3],
    /// Squared inner radius of the refinement band.
    pub inner_radius_sq: f64,
    /// Squared outer radius of the refinement band.
    pub outer_radius_sq: f64,
    /// Smallest edge length the band refinement may still split.
    pub min_cell_size: f64,
    /// Ratio of specific heats.
    pub adiabatic_index: f64,
    global_timestep: f64,
}

impl DomainContext {
    /// Context with an unset (infinite) global timestep.
    pub fn new(
        center: [f64; 3],
        inner_radius_sq: f64,
        outer_radius_sq: f64,
        min_cell_size: f64,
        adiabatic_index: f64,
    ) -> Self {
        Self {
            center,
            inner_radius_sq,
            outer_radius_sq,
            min_cell_size,
            adiabatic_index,
            global_timestep: f64::INFINITY,
        }
    }

    /// Context for `config`.
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(
            config.center,
            config.inner_radius_sq,
            config.outer_radius_sq,
            config.min_cell_size,
            config.adiabatic_index,
        )
    }

    /// Current global timestep. Infinite until the first reduction.
    pub fn global_timestep(&self) -> f64 {
        self.global_timestep
    }

    pub(crate) fn set_global_timestep(&mut self, dt: f64) {
        self.global_timestep = dt;
    }
}

impl Default for DomainContext {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}
