//! The distributed linear octree.

use std::ops::RangeInclusive;

use canopy_comm::Communicator;
use tracing::debug;

use crate::domain::CubeDomain;
use crate::error::MeshError;
use crate::octant::{Octant, MAX_LEVEL, ROOT_POSITIONS};

/// Factory for the payload of a leaf the forest has just created.
///
/// Called for every leaf produced by [`Forest::new_uniform`] and for each
/// child produced by refinement or balancing. Any `FnMut(&Octant) -> T`
/// closure implements it.
pub trait CellInit<T> {
    /// Build the payload for `octant`.
    fn init(&mut self, octant: &Octant) -> T;
}

impl<T, F> CellInit<T> for F
where
    F: FnMut(&Octant) -> T,
{
    fn init(&mut self, octant: &Octant) -> T {
        self(octant)
    }
}

/// A local leaf and its payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Leaf<T> {
    octant: Octant,
    /// Per-cell payload owned by this rank.
    pub data: T,
}

impl<T> Leaf<T> {
    pub(crate) fn new(octant: Octant, data: T) -> Self {
        Self { octant, data }
    }

    /// The cell this leaf covers.
    pub fn octant(&self) -> &Octant {
        &self.octant
    }
}

/// One rank's share of a distributed linear octree over a cube domain.
///
/// The global leaf sequence is sorted in Morton order, never overlaps, and
/// covers the root cube. Each rank holds a contiguous (possibly empty)
/// run of it. Every operation that changes the set of leaves is
/// collective and bumps [`revision`](Self::revision).
#[derive(Debug)]
pub struct Forest<T> {
    domain: CubeDomain,
    rank: usize,
    size: usize,
    pub(crate) leaves: Vec<Leaf<T>>,
    global_count: u64,
    global_offset: u64,
    rank_counts: Vec<u64>,
    /// `first_positions[r]` is the Morton position of rank `r`'s first
    /// leaf. Empty ranks repeat the next rank's value; the final entry is
    /// one past the last position of the root.
    first_positions: Vec<u64>,
    revision: u64,
}

impl<T> Forest<T> {
    /// Cover `domain` with every octant of `level`, split evenly across
    /// ranks in Morton order.
    ///
    /// Collective.
    pub fn new_uniform<C, I>(
        comm: &C,
        domain: CubeDomain,
        level: u8,
        mut init: I,
    ) -> Result<Self, MeshError>
    where
        C: Communicator,
        I: CellInit<T>,
    {
        if level > MAX_LEVEL {
            return Err(MeshError::LevelOutOfRange { level });
        }
        let total = 1u64 << (3 * u32::from(level));
        let (rank, size) = (comm.rank().0, comm.size());
        let begin = split_point(total, rank, size);
        let end = split_point(total, rank + 1, size);

        let leaves = (begin..end)
            .map(|i| {
                let octant = Octant::from_morton_index(i, level);
                let data = init.init(&octant);
                Leaf::new(octant, data)
            })
            .collect();

        let mut forest = Self {
            domain,
            rank,
            size,
            leaves,
            global_count: 0,
            global_offset: 0,
            rank_counts: Vec::new(),
            first_positions: Vec::new(),
            revision: 0,
        };
        forest.update_markers(comm)?;
        debug!(
            rank,
            level,
            local = forest.leaves.len(),
            global = forest.global_count,
            "created uniform forest"
        );
        Ok(forest)
    }

    /// Physical placement of the root.
    pub fn domain(&self) -> &CubeDomain {
        &self.domain
    }

    /// Rank that owns this share.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of ranks sharing the forest.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Local leaves in Morton order.
    pub fn leaves(&self) -> &[Leaf<T>] {
        &self.leaves
    }

    /// Local leaves with mutable payloads.
    pub fn leaves_mut(&mut self) -> &mut [Leaf<T>] {
        &mut self.leaves
    }

    /// Number of local leaves.
    pub fn local_count(&self) -> usize {
        self.leaves.len()
    }

    /// Number of leaves across all ranks.
    pub fn global_count(&self) -> u64 {
        self.global_count
    }

    /// Global index of this rank's first leaf.
    pub fn global_offset(&self) -> u64 {
        self.global_offset
    }

    /// Leaf count of every rank, indexed by rank.
    pub fn rank_counts(&self) -> &[u64] {
        &self.rank_counts
    }

    /// Counter bumped by every collective change to the leaf set.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn bump_revision(&mut self) {
        self.revision += 1;
    }

    pub(crate) fn check_revision(&self, built_for: u64) -> Result<(), MeshError> {
        if built_for == self.revision {
            Ok(())
        } else {
            Err(MeshError::StaleGhostLayer {
                built_for,
                current: self.revision,
            })
        }
    }

    /// Rank owning the leaf that contains finest-level Morton `position`.
    pub fn owner_of(&self, position: u64) -> usize {
        let n = self.first_positions[..self.size].partition_point(|&p| p <= position);
        n.saturating_sub(1)
    }

    /// Non-empty ranks whose leaves may overlap `region`.
    pub(crate) fn ranks_overlapping(&self, region: &Octant) -> impl Iterator<Item = usize> + '_ {
        let span: RangeInclusive<usize> =
            self.owner_of(region.morton())..=self.owner_of(region.last_position());
        span.filter(move |&r| self.rank_counts[r] > 0)
    }

    /// Split leaves selected by `predicate` into their eight children.
    ///
    /// With `recursive` set, new children are offered to `predicate` again
    /// until it declines or [`MAX_LEVEL`] is reached; otherwise each leaf
    /// is split at most once. Split leaves lose their payload and every
    /// child gets a fresh one from `init`. Returns the number of local
    /// leaves that were split.
    ///
    /// Collective.
    pub fn refine<C, P, I>(
        &mut self,
        comm: &C,
        recursive: bool,
        mut predicate: P,
        mut init: I,
    ) -> Result<usize, MeshError>
    where
        C: Communicator,
        P: FnMut(&Octant) -> bool,
        I: CellInit<T>,
    {
        let old = std::mem::take(&mut self.leaves);
        let mut out = Vec::with_capacity(old.len());
        let mut split = 0;
        let mut stack: Vec<Octant> = Vec::new();

        for leaf in old {
            let kids = match leaf.octant.children() {
                Some(kids) if predicate(&leaf.octant) => kids,
                _ => {
                    out.push(leaf);
                    continue;
                }
            };
            split += 1;
            stack.extend(kids.iter().rev());
            while let Some(o) = stack.pop() {
                if recursive {
                    if let Some(grand) = o.children().filter(|_| predicate(&o)) {
                        split += 1;
                        stack.extend(grand.iter().rev());
                        continue;
                    }
                }
                let data = init.init(&o);
                out.push(Leaf::new(o, data));
            }
        }

        self.leaves = out;
        self.bump_revision();
        self.update_markers(comm)?;
        debug!(
            rank = self.rank,
            recursive,
            split,
            local = self.leaves.len(),
            global = self.global_count,
            "refined forest"
        );
        Ok(split)
    }

    /// Every leaf octant across all ranks, in global Morton order.
    ///
    /// Collective. Meant for verification and small meshes.
    pub fn gather_octants<C: Communicator>(&self, comm: &C) -> Result<Vec<Octant>, MeshError> {
        let local: Vec<Octant> = self.leaves.iter().map(|l| l.octant).collect();
        let all = comm.all_gather(local)?;
        Ok(all.into_iter().flatten().collect())
    }

    /// Recompute counts, offsets, and partition markers from every rank's
    /// local leaves.
    pub(crate) fn update_markers<C: Communicator>(&mut self, comm: &C) -> Result<(), MeshError> {
        let local = (
            self.leaves.len() as u64,
            self.leaves.first().map(|l| l.octant.morton()),
        );
        let all = comm.all_gather(local)?;

        self.rank_counts = all.iter().map(|(n, _)| *n).collect();
        self.global_count = self.rank_counts.iter().sum();
        self.global_offset = self.rank_counts[..self.rank].iter().sum();

        let mut positions = vec![ROOT_POSITIONS; self.size + 1];
        for r in (0..self.size).rev() {
            positions[r] = all[r].1.unwrap_or(positions[r + 1]);
        }
        self.first_positions = positions;
        Ok(())
    }
}

impl<T: Send + 'static> Forest<T> {
    /// Redistribute leaves so every rank holds `global / size` of them
    /// (the first `global % size` ranks one fewer or more by rounding),
    /// preserving the global Morton order. Payloads move with their
    /// leaves. Returns the number of leaves this rank sent away.
    ///
    /// Collective.
    pub fn partition<C: Communicator>(&mut self, comm: &C) -> Result<usize, MeshError> {
        let total = self.global_count;
        let starts: Vec<u64> = (0..=self.size)
            .map(|r| split_point(total, r, self.size))
            .collect();

        let mut outgoing: Vec<Vec<Leaf<T>>> = (0..self.size).map(|_| Vec::new()).collect();
        let mut dst = 0;
        let mut shipped = 0;
        for (i, leaf) in std::mem::take(&mut self.leaves).into_iter().enumerate() {
            let g = self.global_offset + i as u64;
            while starts[dst + 1] <= g {
                dst += 1;
            }
            if dst != self.rank {
                shipped += 1;
            }
            outgoing[dst].push(leaf);
        }

        let incoming = comm.all_to_all(outgoing)?;
        self.leaves = incoming.into_iter().flatten().collect();
        self.bump_revision();
        self.update_markers(comm)?;
        debug!(
            rank = self.rank,
            shipped,
            local = self.leaves.len(),
            "partitioned forest"
        );
        Ok(shipped)
    }
}

/// First global index assigned to `rank` when `total` items are split
/// into `size` contiguous runs.
fn split_point(total: u64, rank: usize, size: usize) -> u64 {
    (u128::from(total) * rank as u128 / size as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_comm::SerialComm;

    fn level_of(o: &Octant) -> u8 {
        o.level()
    }

    #[test]
    fn uniform_level_two_has_64_leaves() {
        let comm = SerialComm::new();
        let f = Forest::new_uniform(&comm, CubeDomain::unit(), 2, level_of).unwrap();
        assert_eq!(f.local_count(), 64);
        assert_eq!(f.global_count(), 64);
        assert!(f.leaves().iter().all(|l| l.data == 2));
        for w in f.leaves().windows(2) {
            assert!(w[0].octant() < w[1].octant());
        }
    }

    #[test]
    fn level_out_of_range_is_rejected() {
        let comm = SerialComm::new();
        let err = Forest::new_uniform(&comm, CubeDomain::unit(), MAX_LEVEL + 1, level_of)
            .unwrap_err();
        assert_eq!(err, MeshError::LevelOutOfRange { level: MAX_LEVEL + 1 });
    }

    #[test]
    fn refine_all_once_multiplies_by_eight() {
        let comm = SerialComm::new();
        let mut f = Forest::new_uniform(&comm, CubeDomain::unit(), 1, level_of).unwrap();
        let rev = f.revision();
        let split = f.refine(&comm, false, |_| true, level_of).unwrap();
        assert_eq!(split, 8);
        assert_eq!(f.global_count(), 64);
        assert!(f.leaves().iter().all(|l| l.octant().level() == 2 && l.data == 2));
        assert!(f.revision() > rev);
    }

    #[test]
    fn recursive_refine_follows_predicate_down() {
        let comm = SerialComm::new();
        let mut f = Forest::new_uniform(&comm, CubeDomain::unit(), 0, level_of).unwrap();
        // keep splitting the cell at the origin down to level 3
        f.refine(&comm, true, |o| o.morton() == 0 && o.level() < 3, level_of)
            .unwrap();
        assert_eq!(f.global_count(), 1 + 7 * 3);
        assert_eq!(f.leaves()[0].octant().level(), 3);
        assert_eq!(f.leaves().last().map(|l| l.octant().level()), Some(1));
    }

    #[test]
    fn refine_keeps_payload_of_unsplit_leaves() {
        let comm = SerialComm::new();
        let mut f = Forest::new_uniform(&comm, CubeDomain::unit(), 1, |_: &Octant| 7u32).unwrap();
        f.refine(&comm, false, |o| o.morton() == 0, |_: &Octant| 1u32)
            .unwrap();
        let sevens = f.leaves().iter().filter(|l| l.data == 7).count();
        let ones = f.leaves().iter().filter(|l| l.data == 1).count();
        assert_eq!((sevens, ones), (7, 8));
    }

    #[test]
    fn owner_of_single_rank_is_zero() {
        let comm = SerialComm::new();
        let f = Forest::new_uniform(&comm, CubeDomain::unit(), 2, level_of).unwrap();
        assert_eq!(f.owner_of(0), 0);
        assert_eq!(f.owner_of(ROOT_POSITIONS - 1), 0);
    }

    #[test]
    fn split_point_covers_range() {
        assert_eq!(split_point(64, 0, 3), 0);
        assert_eq!(split_point(64, 1, 3), 21);
        assert_eq!(split_point(64, 2, 3), 42);
        assert_eq!(split_point(64, 3, 3), 64);
    }
}
