//! Error types for mesh operations.

use canopy_comm::CommError;
use canopy_core::Face;
use std::error::Error;
use std::fmt;

use crate::octant::Octant;

/// Errors arising from forest construction, adaptation, ghost exchange,
/// or adjacency queries.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshError {
    /// A collective operation failed.
    Comm(CommError),
    /// A requested refinement level is outside `0..=MAX_LEVEL`.
    LevelOutOfRange {
        /// The level requested.
        level: u8,
    },
    /// A ghost layer or mesh index was used after the forest changed.
    StaleGhostLayer {
        /// Revision the ghost layer was built for.
        built_for: u64,
        /// Current forest revision.
        current: u64,
    },
    /// A ghost exchange delivered a different number of payloads than the
    /// layer expects from a rank.
    GhostCountMismatch {
        /// Sending rank.
        source_rank: usize,
        /// Payloads expected.
        expected: usize,
        /// Payloads received.
        got: usize,
    },
    /// No leaf covers the region across an interior face. The ghost layer
    /// does not match the forest.
    MissingNeighbor {
        /// The local leaf whose neighbour is missing.
        octant: Octant,
        /// The face that was searched.
        face: Face,
    },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comm(e) => write!(f, "collective failed: {e}"),
            Self::LevelOutOfRange { level } => write!(f, "level {level} out of range"),
            Self::StaleGhostLayer { built_for, current } => write!(
                f,
                "ghost layer built for mesh revision {built_for}, forest is at {current}"
            ),
            Self::GhostCountMismatch {
                source_rank,
                expected,
                got,
            } => write!(
                f,
                "rank {source_rank} sent {got} ghost payloads, expected {expected}"
            ),
            Self::MissingNeighbor { octant, face } => {
                write!(f, "no neighbour of {octant} across face {face}")
            }
        }
    }
}

impl Error for MeshError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Comm(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CommError> for MeshError {
    fn from(e: CommError) -> Self {
        Self::Comm(e)
    }
}
