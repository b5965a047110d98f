//! Error types for the solve step and the simulation driver.

use std::error::Error;
use std::fmt;

use canopy_comm::CommError;
use canopy_core::{Rank, StepIndex};
use canopy_mesh::MeshError;
use canopy_output::OutputError;

use crate::config::ConfigError;
use crate::step::StepPhase;

/// Errors that end a run.
///
/// Every variant is fatal: the group cannot continue once one rank has
/// failed a collective, and a partially written step is not recoverable.
#[derive(Debug)]
pub enum SolveError {
    /// The configuration was rejected before any collective work.
    Config(ConfigError),
    /// Initial mesh construction failed.
    Setup(MeshError),
    /// A mesh operation failed inside a step phase.
    Mesh {
        /// Phase in which the failure occurred.
        phase: StepPhase,
        /// The underlying mesh error.
        source: MeshError,
    },
    /// A collective failed inside a step phase.
    Comm {
        /// Phase in which the failure occurred.
        phase: StepPhase,
        /// The underlying communication error.
        source: CommError,
    },
    /// The writer failed for a frame.
    Output {
        /// Stem of the frame being written.
        stem: String,
        /// The underlying output error, naming the write stage.
        source: OutputError,
    },
    /// The physics produced a non-finite or non-positive stability bound.
    InvalidTimestep {
        /// Rank that computed it.
        rank: Rank,
        /// The offending bound.
        value: f64,
    },
    /// Refinement or repartition between steps failed.
    Regrid {
        /// Step that had just completed.
        step: StepIndex,
        /// The underlying mesh error.
        source: MeshError,
    },
    /// A timing side file could not be written.
    Timing(OutputError),
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::Setup(e) => write!(f, "mesh setup failed: {e}"),
            Self::Mesh { phase, source } => write!(f, "{phase} failed: {source}"),
            Self::Comm { phase, source } => write!(f, "{phase} failed: {source}"),
            Self::Output { stem, source } => write!(f, "writing {stem} failed: {source}"),
            Self::InvalidTimestep { rank, value } => {
                write!(f, "rank {rank} computed invalid stability bound {value}")
            }
            Self::Regrid { step, source } => {
                write!(f, "regrid after step {step} failed: {source}")
            }
            Self::Timing(e) => write!(f, "timing output failed: {e}"),
        }
    }
}

impl Error for SolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Setup(e) => Some(e),
            Self::Mesh { source, .. } => Some(source),
            Self::Comm { source, .. } => Some(source),
            Self::Output { source, .. } => Some(source),
            Self::InvalidTimestep { .. } => None,
            Self::Regrid { source, .. } => Some(source),
            Self::Timing(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SolveError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_is_named_in_message() {
        let e = SolveError::Comm {
            phase: StepPhase::GlobalReduce,
            source: CommError::PeerDisconnected { rank: Rank(2) },
        };
        let msg = e.to_string();
        assert!(msg.starts_with("global reduce failed"), "{msg}");
        assert!(e.source().is_some());
    }

    #[test]
    fn config_errors_convert() {
        let e: SolveError = ConfigError::LevelOutOfRange { level: 40 }.into();
        assert!(matches!(e, SolveError::Config(_)));
    }
}
