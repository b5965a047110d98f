//! Region queries over the leaves visible to one rank.

use smallvec::SmallVec;

use crate::forest::Forest;
use crate::ghost::GhostLayer;
use crate::octant::Octant;

/// Where a visible leaf lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Located {
    /// Index into the forest's local leaves.
    Local(usize),
    /// Index into the ghost layer.
    Ghost(usize),
}

/// Sorted view of local leaves and ghosts.
///
/// Because visible leaves never overlap, every leaf intersecting a region
/// is either the single leaf just before the region in Morton order (an
/// ancestor) or one of the consecutive leaves whose anchor falls inside
/// the region's position range (descendants).
#[derive(Debug)]
pub struct OctantLookup {
    entries: Vec<(Octant, Located)>,
}

impl OctantLookup {
    /// Index every local leaf of `forest` and every ghost of `ghost`.
    pub fn new<T>(forest: &Forest<T>, ghost: &GhostLayer) -> Self {
        let mut entries: Vec<(Octant, Located)> = forest
            .leaves()
            .iter()
            .enumerate()
            .map(|(i, l)| (*l.octant(), Located::Local(i)))
            .chain(
                ghost
                    .ghosts()
                    .iter()
                    .enumerate()
                    .map(|(g, o)| (*o.octant(), Located::Ghost(g))),
            )
            .collect();
        entries.sort_unstable_by_key(|(o, _)| *o);
        Self { entries }
    }

    /// Number of indexed leaves.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Visible leaves intersecting `region`, in Morton order.
    pub fn overlapping(&self, region: &Octant) -> SmallVec<[(Octant, Located); 8]> {
        let pos = self.entries.partition_point(|(o, _)| o < region);
        let mut found = SmallVec::new();

        if let Some(prev) = pos.checked_sub(1).map(|p| self.entries[p]) {
            if prev.0.contains(region) {
                found.push(prev);
                return found;
            }
        }

        let last = region.last_position();
        found.extend(
            self.entries[pos..]
                .iter()
                .take_while(|(o, _)| o.morton() <= last)
                .copied(),
        );
        found
    }
}
