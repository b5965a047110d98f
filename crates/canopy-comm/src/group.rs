//! In-process SPMD process group: one thread per rank.
//!
//! Ranks are connected by a full matrix of unbounded crossbeam channels,
//! one per ordered `(src, dst)` pair. Because every collective is called
//! in the same order on every rank and each pair channel is FIFO, the
//! n-th message a rank receives from a peer always belongs to the n-th
//! collective, so no tags or sequence numbers are needed.

use std::any::Any;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;

use crate::communicator::Communicator;
use crate::error::CommError;
use canopy_core::Rank;

type Envelope = Box<dyn Any + Send>;

/// One rank's endpoint in a [`ProcessGroup`].
///
/// Dropping a `GroupComm` disconnects this rank: peers blocked on a
/// message from it return [`CommError::PeerDisconnected`].
pub struct GroupComm {
    rank: usize,
    size: usize,
    /// `senders[dst]` carries messages from this rank to `dst`.
    senders: Vec<Sender<Envelope>>,
    /// `receivers[src]` carries messages from `src` to this rank.
    receivers: Vec<Receiver<Envelope>>,
}

impl Communicator for GroupComm {
    fn rank(&self) -> Rank {
        Rank(self.rank)
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_to_all<T: Send + 'static>(
        &self,
        outgoing: Vec<Vec<T>>,
    ) -> Result<Vec<Vec<T>>, CommError> {
        if outgoing.len() != self.size {
            return Err(CommError::BadMessageCount {
                expected: self.size,
                got: outgoing.len(),
            });
        }

        let mut own = None;
        for (dst, payload) in outgoing.into_iter().enumerate() {
            if dst == self.rank {
                own = Some(payload);
                continue;
            }
            self.senders[dst]
                .send(Box::new(payload))
                .map_err(|_| CommError::PeerDisconnected { rank: Rank(dst) })?;
        }

        let mut incoming = Vec::with_capacity(self.size);
        for src in 0..self.size {
            if src == self.rank {
                incoming.push(own.take().unwrap_or_default());
                continue;
            }
            let envelope = self.receivers[src]
                .recv()
                .map_err(|_| CommError::PeerDisconnected { rank: Rank(src) })?;
            let payload = envelope
                .downcast::<Vec<T>>()
                .map_err(|_| CommError::ProtocolMismatch { rank: Rank(src) })?;
            incoming.push(*payload);
        }
        Ok(incoming)
    }
}

/// A fixed-size group of ranks running inside one OS process.
///
/// # Examples
///
/// ```
/// use canopy_comm::{Communicator, ProcessGroup};
///
/// let group = ProcessGroup::new(4).unwrap();
/// let minima = group
///     .run(|comm| comm.all_reduce_min(comm.rank().0 as f64 + 1.0))
///     .unwrap();
/// for m in minima {
///     assert_eq!(m.unwrap(), 1.0);
/// }
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ProcessGroup {
    size: usize,
}

impl ProcessGroup {
    /// Describe a group of `size` ranks.
    ///
    /// Returns `Err(CommError::EmptyGroup)` if `size` is zero.
    pub fn new(size: usize) -> Result<Self, CommError> {
        if size == 0 {
            return Err(CommError::EmptyGroup);
        }
        Ok(Self { size })
    }

    /// Number of ranks.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Build one connected endpoint per rank, indexed by rank.
    ///
    /// Useful when the caller manages its own threads; [`run`](Self::run)
    /// is the usual entry point.
    pub fn communicators(&self) -> Vec<GroupComm> {
        let n = self.size;
        let mut senders: Vec<Vec<Sender<Envelope>>> =
            (0..n).map(|_| Vec::with_capacity(n)).collect();
        let mut receivers: Vec<Vec<Receiver<Envelope>>> =
            (0..n).map(|_| Vec::with_capacity(n)).collect();
        for src_senders in senders.iter_mut() {
            for dst_receivers in receivers.iter_mut() {
                let (tx, rx) = unbounded();
                src_senders.push(tx);
                dst_receivers.push(rx);
            }
        }
        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (senders, receivers))| GroupComm {
                rank,
                size: n,
                senders,
                receivers,
            })
            .collect()
    }

    /// Run `f` once per rank, each on its own thread, and collect the
    /// results in rank order.
    ///
    /// Returns `Err(CommError::RankPanicked)` if any rank panicked; the
    /// surviving ranks observe the panic as a disconnected peer.
    pub fn run<F, R>(&self, f: F) -> Result<Vec<R>, CommError>
    where
        F: Fn(GroupComm) -> R + Sync,
        R: Send,
    {
        debug!(size = self.size, "starting process group");
        let comms = self.communicators();
        let f = &f;
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.size);
            for comm in comms {
                let rank = comm.rank;
                let handle = thread::Builder::new()
                    .name(format!("canopy-rank-{rank}"))
                    .spawn_scoped(scope, move || f(comm))
                    .map_err(|e| CommError::SpawnFailed {
                        reason: e.to_string(),
                    })?;
                handles.push((rank, handle));
            }
            handles
                .into_iter()
                .map(|(rank, handle)| {
                    handle
                        .join()
                        .map_err(|_| CommError::RankPanicked { rank: Rank(rank) })
                })
                .collect()
        })
    }
}
