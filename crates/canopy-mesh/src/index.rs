//! Face adjacency of local leaves.

use std::mem;
use std::ops::Range;

use canopy_core::Face;
use tracing::debug;

use crate::error::MeshError;
use crate::forest::Forest;
use crate::ghost::GhostLayer;
use crate::lookup::{Located, OctantLookup};

/// Where a face neighbour's state lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NeighborSlot {
    /// A leaf owned by this rank, by local index.
    Local(usize),
    /// A ghost, by index into the ghost layer and its exchange buffer.
    Ghost(usize),
    /// The face lies on the domain boundary; the cell is its own
    /// neighbour.
    DomainBoundary,
}

/// Level of a face neighbour relative to the cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LevelRelation {
    /// Same size.
    Same,
    /// One level coarser: the neighbour covers this face and more.
    Coarser,
    /// One level finer: one of up to four neighbours covering the face.
    Finer,
}

/// One entry of a cell's face-neighbour list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceNeighbor {
    /// Face of the cell the neighbour lies across.
    pub face: Face,
    /// Where to read the neighbour's state.
    pub slot: NeighborSlot,
    /// Rank owning the neighbour.
    pub owner: usize,
    /// Neighbour level relative to the cell.
    pub relation: LevelRelation,
}

/// Face neighbours of every local leaf for one mesh revision.
///
/// Faces are visited in [`Face::ALL`] order. A face on the domain
/// boundary yields one [`NeighborSlot::DomainBoundary`] entry; an interior
/// face yields one same-level or coarser neighbour, or every finer leaf
/// sharing face area with it. Requires a ghost layer built for the same
/// revision.
#[derive(Debug)]
pub struct MeshIndex {
    revision: u64,
    offsets: Vec<usize>,
    neighbors: Vec<FaceNeighbor>,
}

impl MeshIndex {
    /// Resolve the face neighbours of every local leaf of `forest`.
    pub fn build<T>(forest: &Forest<T>, ghost: &GhostLayer) -> Result<Self, MeshError> {
        forest.check_revision(ghost.revision())?;
        let lookup = OctantLookup::new(forest, ghost);
        let me = forest.rank();

        let mut offsets = Vec::with_capacity(forest.local_count() + 1);
        let mut neighbors = Vec::with_capacity(forest.local_count() * 6);
        offsets.push(0);

        for leaf in forest.leaves() {
            let oct = leaf.octant();
            for face in Face::ALL {
                let Some(region) = oct.face_neighbor(face) else {
                    neighbors.push(FaceNeighbor {
                        face,
                        slot: NeighborSlot::DomainBoundary,
                        owner: me,
                        relation: LevelRelation::Same,
                    });
                    continue;
                };

                let before = neighbors.len();
                for (other, located) in lookup.overlapping(&region) {
                    if other.level() > oct.level() && oct.shared_face(&other) != Some(face) {
                        continue;
                    }
                    let relation = match other.level().cmp(&oct.level()) {
                        std::cmp::Ordering::Less => LevelRelation::Coarser,
                        std::cmp::Ordering::Equal => LevelRelation::Same,
                        std::cmp::Ordering::Greater => LevelRelation::Finer,
                    };
                    let (slot, owner) = match located {
                        Located::Local(i) => (NeighborSlot::Local(i), me),
                        Located::Ghost(g) => {
                            (NeighborSlot::Ghost(g), ghost.ghosts()[g].owner())
                        }
                    };
                    neighbors.push(FaceNeighbor {
                        face,
                        slot,
                        owner,
                        relation,
                    });
                }
                if neighbors.len() == before {
                    return Err(MeshError::MissingNeighbor { octant: *oct, face });
                }
            }
            offsets.push(neighbors.len());
        }

        debug!(
            rank = me,
            cells = forest.local_count(),
            entries = neighbors.len(),
            "built mesh index"
        );
        Ok(Self {
            revision: forest.revision(),
            offsets,
            neighbors,
        })
    }

    /// Forest revision this index describes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of local cells indexed.
    pub fn cell_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Face neighbours of local cell `cell`, grouped by face in
    /// [`Face::ALL`] order.
    ///
    /// # Panics
    ///
    /// Panics if `cell >= cell_count()`.
    pub fn face_neighbors(&self, cell: usize) -> &[FaceNeighbor] {
        &self.neighbors[self.range(cell)]
    }

    fn range(&self, cell: usize) -> Range<usize> {
        self.offsets[cell]..self.offsets[cell + 1]
    }

    /// Total number of neighbour entries.
    pub fn entry_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Approximate heap footprint in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.offsets.capacity() * mem::size_of::<usize>()
            + self.neighbors.capacity() * mem::size_of::<FaceNeighbor>()
    }
}
