//! Single-rank communicator.

use crate::communicator::Communicator;
use crate::error::CommError;
use canopy_core::Rank;

/// A process group of exactly one rank.
///
/// Every collective completes immediately with this rank's own
/// contribution, so the distributed code paths run unchanged in a
/// single-process program.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialComm;

impl SerialComm {
    /// Create the single-rank communicator.
    pub fn new() -> Self {
        Self
    }
}

impl Communicator for SerialComm {
    fn rank(&self) -> Rank {
        Rank(0)
    }

    fn size(&self) -> usize {
        1
    }

    fn all_to_all<T: Send + 'static>(
        &self,
        outgoing: Vec<Vec<T>>,
    ) -> Result<Vec<Vec<T>>, CommError> {
        if outgoing.len() != 1 {
            return Err(CommError::BadMessageCount {
                expected: 1,
                got: outgoing.len(),
            });
        }
        Ok(outgoing)
    }
}
