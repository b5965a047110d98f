//! Ghost layers: read-only copies of remote leaves next to the local
//! partition.

use std::ops::Range;

use canopy_comm::Communicator;
use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::balance::Connectivity;
use crate::error::MeshError;
use crate::forest::Forest;
use crate::octant::Octant;

/// A remote leaf held as a ghost.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GhostOctant {
    octant: Octant,
    owner: usize,
    remote_index: usize,
}

impl GhostOctant {
    /// The remote cell.
    pub fn octant(&self) -> &Octant {
        &self.octant
    }

    /// Rank that owns the cell.
    pub fn owner(&self) -> usize {
        self.owner
    }

    /// Index of the cell among its owner's local leaves.
    pub fn remote_index(&self) -> usize {
        self.remote_index
    }
}

/// The remote leaves adjacent to one rank's partition, for one mesh
/// revision.
///
/// Built collectively: every rank pushes each of its leaves to all ranks
/// whose partition may touch it under the requested [`Connectivity`].
/// The set is conservative, so it can hold a few leaves that are not
/// adjacent to any local leaf, but it always holds every one that is.
///
/// Ghosts are ordered by owner rank and then Morton order, which is the
/// global Morton order. A layer is tied to the forest revision it was
/// built from and refuses to exchange once the forest has changed.
#[derive(Debug)]
pub struct GhostLayer {
    revision: u64,
    connectivity: Connectivity,
    ghosts: Vec<GhostOctant>,
    /// `by_owner[r]` is the range of `ghosts` owned by rank `r`.
    by_owner: Vec<Range<usize>>,
    /// `mirrors[r]` lists the local leaves sent to rank `r`.
    mirrors: Vec<Vec<usize>>,
    positions: IndexMap<Octant, usize>,
}

impl GhostLayer {
    /// Build the ghost layer for the current partition of `forest`.
    ///
    /// Collective.
    pub fn build<T, C: Communicator>(
        forest: &Forest<T>,
        comm: &C,
        connectivity: Connectivity,
    ) -> Result<Self, MeshError> {
        let me = forest.rank();
        let size = forest.size();

        let mut mirrors: Vec<Vec<usize>> = vec![Vec::new(); size];
        for (i, leaf) in forest.leaves().iter().enumerate() {
            let mut dests: SmallVec<[usize; 8]> = SmallVec::new();
            for off in connectivity.offsets() {
                let Some(region) = leaf.octant().neighbor(off) else {
                    continue;
                };
                for r in forest.ranks_overlapping(&region) {
                    if r != me && !dests.contains(&r) {
                        dests.push(r);
                    }
                }
            }
            for r in dests {
                mirrors[r].push(i);
            }
        }

        let outgoing: Vec<Vec<(Octant, usize)>> = mirrors
            .iter()
            .map(|idx| idx.iter().map(|&i| (*forest.leaves()[i].octant(), i)).collect())
            .collect();
        let incoming = comm.all_to_all(outgoing)?;

        let mut ghosts = Vec::new();
        let mut by_owner = Vec::with_capacity(size);
        for (owner, batch) in incoming.into_iter().enumerate() {
            let start = ghosts.len();
            ghosts.extend(batch.into_iter().map(|(octant, remote_index)| GhostOctant {
                octant,
                owner,
                remote_index,
            }));
            by_owner.push(start..ghosts.len());
        }
        let positions = ghosts
            .iter()
            .enumerate()
            .map(|(g, o)| (o.octant, g))
            .collect();

        debug!(
            rank = me,
            ghosts = ghosts.len(),
            mirrors = mirrors.iter().map(Vec::len).sum::<usize>(),
            ?connectivity,
            "built ghost layer"
        );
        Ok(Self {
            revision: forest.revision(),
            connectivity,
            ghosts,
            by_owner,
            mirrors,
            positions,
        })
    }

    /// Forest revision this layer describes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Connectivity the layer was built for.
    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// All ghosts in global Morton order.
    pub fn ghosts(&self) -> &[GhostOctant] {
        &self.ghosts
    }

    /// Number of ghosts.
    pub fn len(&self) -> usize {
        self.ghosts.len()
    }

    /// Returns `true` if no remote leaf touches the local partition.
    pub fn is_empty(&self) -> bool {
        self.ghosts.is_empty()
    }

    /// Ghosts owned by `rank`.
    pub fn owned_by(&self, rank: usize) -> &[GhostOctant] {
        self.by_owner
            .get(rank)
            .map_or(&[][..], |r| &self.ghosts[r.clone()])
    }

    /// Position of `octant` in [`ghosts`](Self::ghosts), if held.
    pub fn find(&self, octant: &Octant) -> Option<usize> {
        self.positions.get(octant).copied()
    }

    /// Number of (leaf, destination) pairs this rank sends on exchange.
    pub fn mirror_count(&self) -> usize {
        self.mirrors.iter().map(Vec::len).sum()
    }

    /// Refresh `buffer` with the current payload of every ghost, aligned
    /// with [`ghosts`](Self::ghosts).
    ///
    /// Collective. Fails with [`MeshError::StaleGhostLayer`] if `forest`
    /// changed since the layer was built.
    pub fn exchange<T, C>(
        &self,
        forest: &Forest<T>,
        comm: &C,
        buffer: &mut Vec<T>,
    ) -> Result<(), MeshError>
    where
        T: Clone + Send + 'static,
        C: Communicator,
    {
        forest.check_revision(self.revision)?;
        let leaves = forest.leaves();
        let outgoing: Vec<Vec<T>> = self
            .mirrors
            .iter()
            .map(|idx| idx.iter().map(|&i| leaves[i].data.clone()).collect())
            .collect();
        let incoming = comm.all_to_all(outgoing)?;

        buffer.clear();
        buffer.reserve(self.ghosts.len());
        for (src, batch) in incoming.into_iter().enumerate() {
            let expected = self.by_owner[src].len();
            if batch.len() != expected {
                return Err(MeshError::GhostCountMismatch {
                    source_rank: src,
                    expected,
                    got: batch.len(),
                });
            }
            buffer.extend(batch);
        }
        trace!(rank = forest.rank(), ghosts = buffer.len(), "exchanged ghost data");
        Ok(())
    }
}
