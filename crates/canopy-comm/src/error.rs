//! Error types for collective operations.

use canopy_core::Rank;
use std::fmt;

/// Failure of a collective or point-to-point operation.
///
/// None of these are recoverable: once a collective fails, ranks may have
/// diverged and the whole group must stop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommError {
    /// A peer left the group before completing the collective.
    PeerDisconnected {
        /// The rank that is no longer reachable.
        rank: Rank,
    },
    /// A peer sent a payload of a different type than expected, meaning
    /// the ranks are executing collectives in different orders.
    ProtocolMismatch {
        /// The rank whose message did not match.
        rank: Rank,
    },
    /// An exchange was given the wrong number of outgoing buffers.
    BadMessageCount {
        /// Group size.
        expected: usize,
        /// Number of buffers supplied.
        got: usize,
    },
    /// A rank's thread panicked.
    RankPanicked {
        /// The rank that panicked.
        rank: Rank,
    },
    /// A rank's thread could not be started.
    SpawnFailed {
        /// Description of the failure.
        reason: String,
    },
    /// A process group was requested with zero ranks.
    EmptyGroup,
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerDisconnected { rank } => write!(f, "rank {rank} left the process group"),
            Self::ProtocolMismatch { rank } => {
                write!(f, "rank {rank} sent a message for a different collective")
            }
            Self::BadMessageCount { expected, got } => {
                write!(f, "exchange needs {expected} outgoing buffers, got {got}")
            }
            Self::RankPanicked { rank } => write!(f, "rank {rank} panicked"),
            Self::SpawnFailed { reason } => write!(f, "could not start rank: {reason}"),
            Self::EmptyGroup => write!(f, "process group must have at least one rank"),
        }
    }
}

impl std::error::Error for CommError {}
