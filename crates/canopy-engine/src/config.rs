//! Simulation configuration, validation, and error types.
//!
//! [`SimulationConfig`] is the input for constructing a
//! [`Simulation`](crate::simulation::Simulation). Its defaults reproduce
//! the reference setup: a unit cube refined in a spherical shell about its
//! center, advanced for one step. [`validate()`](SimulationConfig::validate)
//! checks it before any collective work starts.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use canopy_mesh::{Connectivity, CubeDomain, MAX_LEVEL};
use canopy_output::VtkWriter;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SimulationConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The initial uniform level exceeds the deepest octree level.
    LevelOutOfRange {
        /// The configured level.
        level: u8,
    },
    /// The refinement band radii are negative, non-finite, or out of
    /// order.
    InvalidBand {
        /// Configured inner radius squared.
        inner_sq: f64,
        /// Configured outer radius squared.
        outer_sq: f64,
    },
    /// The band center has a non-finite coordinate.
    NonFiniteCenter {
        /// The configured center.
        center: [f64; 3],
    },
    /// A parameter that must be finite and positive is not.
    NotPositive {
        /// Parameter name.
        name: &'static str,
        /// The invalid value.
        value: f64,
    },
    /// The adiabatic index must exceed one.
    InvalidAdiabaticIndex {
        /// The invalid value.
        value: f64,
    },
    /// A fraction that must lie in `(0, 1]` does not.
    FractionOutOfRange {
        /// Parameter name.
        name: &'static str,
        /// The invalid value.
        value: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LevelOutOfRange { level } => {
                write!(f, "min_level {level} exceeds maximum level {MAX_LEVEL}")
            }
            Self::InvalidBand { inner_sq, outer_sq } => write!(
                f,
                "refinement band needs 0 <= inner ({inner_sq}) < outer ({outer_sq})"
            ),
            Self::NonFiniteCenter { center } => {
                write!(f, "refinement band center must be finite, got {center:?}")
            }
            Self::NotPositive { name, value } => {
                write!(f, "{name} must be finite and positive, got {value}")
            }
            Self::InvalidAdiabaticIndex { value } => {
                write!(f, "adiabatic index must be finite and above 1, got {value}")
            }
            Self::FractionOutOfRange { name, value } => {
                write!(f, "{name} must lie in (0, 1], got {value}")
            }
        }
    }
}

impl Error for ConfigError {}

// ── SimulationConfig ───────────────────────────────────────────────

/// Parameters of a simulation run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Physical placement of the octree root. Default: the unit cube.
    pub domain: CubeDomain,
    /// Center of the refinement band. Default: `(0.5, 0.5, 0.5)`.
    pub center: [f64; 3],
    /// Squared inner radius of the refinement band. Default: 0.08.
    pub inner_radius_sq: f64,
    /// Squared outer radius of the refinement band. Default: 0.2.
    pub outer_radius_sq: f64,
    /// Cells at or below this edge length are never band-refined.
    /// Default: 0.02.
    pub min_cell_size: f64,
    /// Ratio of specific heats. Default: 1.4.
    pub adiabatic_index: f64,
    /// Level of the initial uniform mesh. Default: 2.
    pub min_level: u8,
    /// Number of solve steps. Default: 1.
    pub steps: u32,
    /// Courant number of the stability bound. Default: 0.5.
    pub cfl: f64,
    /// Size of drawn cells relative to their true size. Default: 0.99.
    pub output_scale: f64,
    /// Adjacency enforced by the initial balance. Default: full.
    pub balance: Connectivity,
    /// Directory receiving visualization and timing files. Default: `.`.
    pub output_dir: PathBuf,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            domain: CubeDomain::unit(),
            center: [0.5; 3],
            inner_radius_sq: 0.08,
            outer_radius_sq: 0.2,
            min_cell_size: 0.02,
            adiabatic_index: 1.4,
            min_level: 2,
            steps: 1,
            cfl: 0.5,
            output_scale: 0.99,
            balance: Connectivity::Full,
            output_dir: PathBuf::from("."),
        }
    }
}

impl SimulationConfig {
    /// Check every parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_level > MAX_LEVEL {
            return Err(ConfigError::LevelOutOfRange {
                level: self.min_level,
            });
        }
        let (inner_sq, outer_sq) = (self.inner_radius_sq, self.outer_radius_sq);
        let band_ok = outer_sq.is_finite() && 0.0 <= inner_sq && inner_sq < outer_sq;
        if !band_ok {
            return Err(ConfigError::InvalidBand { inner_sq, outer_sq });
        }
        if !self.center.iter().all(|c| c.is_finite()) {
            return Err(ConfigError::NonFiniteCenter {
                center: self.center,
            });
        }
        for (name, value) in [
            ("min_cell_size", self.min_cell_size),
            ("domain size", self.domain.size()),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        if !(self.adiabatic_index.is_finite() && self.adiabatic_index > 1.0) {
            return Err(ConfigError::InvalidAdiabaticIndex {
                value: self.adiabatic_index,
            });
        }
        for (name, value) in [("cfl", self.cfl), ("output_scale", self.output_scale)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::FractionOutOfRange { name, value });
            }
        }
        Ok(())
    }

    /// A VTK writer into [`output_dir`](Self::output_dir) at
    /// [`output_scale`](Self::output_scale).
    pub fn vtk_writer(&self) -> VtkWriter {
        VtkWriter::new(&self.output_dir, self.output_scale)
    }
}
