//! The [`Communicator`] trait.

use crate::error::CommError;
use canopy_core::Rank;

/// Collective operations over a fixed group of cooperating ranks.
///
/// # Contract
///
/// - Every method is collective: all ranks call it, in the same order,
///   with matching payload types.
/// - Calls block until every rank has contributed.
/// - Errors are terminal for the group; callers propagate them and stop.
///
/// The trait uses generic methods and is therefore not object-safe;
/// distributed code takes `C: Communicator` by reference.
pub trait Communicator {
    /// This process's rank.
    fn rank(&self) -> Rank;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Personalized exchange: `outgoing[r]` is delivered to rank `r`, and
    /// the returned `incoming[r]` is what rank `r` sent here.
    ///
    /// `outgoing.len()` must equal [`size`](Self::size).
    fn all_to_all<T: Send + 'static>(
        &self,
        outgoing: Vec<Vec<T>>,
    ) -> Result<Vec<Vec<T>>, CommError>;

    /// Every rank contributes one value; every rank receives all of them,
    /// indexed by rank.
    fn all_gather<T: Clone + Send + 'static>(&self, value: T) -> Result<Vec<T>, CommError> {
        let outgoing = vec![vec![value]; self.size()];
        let incoming = self.all_to_all(outgoing)?;
        incoming
            .into_iter()
            .enumerate()
            .map(|(src, mut v)| {
                v.pop()
                    .ok_or(CommError::ProtocolMismatch { rank: Rank(src) })
            })
            .collect()
    }

    /// Block until every rank has arrived.
    fn barrier(&self) -> Result<(), CommError> {
        self.all_gather(()).map(|_| ())
    }

    /// Global minimum of one `f64` per rank, returned on every rank.
    fn all_reduce_min(&self, value: f64) -> Result<f64, CommError> {
        let all = self.all_gather(value)?;
        Ok(all.into_iter().fold(f64::INFINITY, f64::min))
    }

    /// Global sum of one `u64` per rank, returned on every rank.
    fn all_reduce_sum(&self, value: u64) -> Result<u64, CommError> {
        let all = self.all_gather(value)?;
        Ok(all.into_iter().sum())
    }

    /// Logical OR of one flag per rank, returned on every rank.
    fn any(&self, flag: bool) -> Result<bool, CommError> {
        let all = self.all_gather(flag)?;
        Ok(all.into_iter().any(|f| f))
    }

    /// Whether this rank is the coordinator (rank 0) that writes
    /// group-wide side files.
    fn is_root(&self) -> bool {
        self.rank() == Rank(0)
    }
}
