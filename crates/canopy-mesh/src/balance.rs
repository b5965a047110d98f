//! 2:1 level balance.

use canopy_comm::Communicator;
use tracing::{debug, trace};

use crate::error::MeshError;
use crate::forest::{CellInit, Forest, Leaf};
use crate::ghost::GhostLayer;
use crate::lookup::OctantLookup;
use crate::octant::{Contact, Octant};

/// Which kinds of contact count as adjacency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Connectivity {
    /// Cells sharing face area.
    Face,
    /// Cells sharing face area or an edge segment.
    Edge,
    /// Cells sharing face area, an edge segment, or a corner.
    #[default]
    Full,
}

impl Connectivity {
    fn max_nonzero(self) -> usize {
        match self {
            Self::Face => 1,
            Self::Edge => 2,
            Self::Full => 3,
        }
    }

    /// Whether `contact` counts as adjacency under this connectivity.
    pub fn admits(self, contact: Contact) -> bool {
        match contact {
            Contact::Face => true,
            Contact::Edge => self != Self::Face,
            Contact::Corner => self == Self::Full,
        }
    }

    /// Same-level displacements, in cells, of every neighbour position
    /// this connectivity considers: 6 for faces, 18 with edges, 26 with
    /// corners.
    pub fn offsets(self) -> impl Iterator<Item = [i32; 3]> {
        let max = self.max_nonzero();
        (0..27).filter_map(move |i: i32| {
            let o = [i % 3 - 1, (i / 3) % 3 - 1, i / 9 - 1];
            let nonzero = o.iter().filter(|&&c| c != 0).count();
            (1..=max).contains(&nonzero).then_some(o)
        })
    }
}

impl<T: Send + 'static> Forest<T> {
    /// Refine until no two leaves adjacent under `connectivity` differ by
    /// more than one level. New children get payloads from `init`.
    /// Returns the number of rounds that changed the mesh.
    ///
    /// Collective. Each round builds a ghost layer of octants only, splits
    /// every local leaf that touches a leaf two or more levels finer, and
    /// repeats while any rank changed.
    pub fn balance<C, I>(
        &mut self,
        comm: &C,
        connectivity: Connectivity,
        mut init: I,
    ) -> Result<usize, MeshError>
    where
        C: Communicator,
        I: CellInit<T>,
    {
        let mut rounds = 0;
        loop {
            let ghost = GhostLayer::build(self, comm, connectivity)?;
            let lookup = OctantLookup::new(self, &ghost);

            let marked: Vec<bool> = self
                .leaves
                .iter()
                .map(|leaf| needs_split(leaf.octant(), connectivity, &lookup))
                .collect();
            let count = marked.iter().filter(|&&m| m).count();
            trace!(rank = self.rank(), round = rounds, count, "balance round");

            if count > 0 {
                let old = std::mem::take(&mut self.leaves);
                let mut out = Vec::with_capacity(old.len() + 7 * count);
                for (leaf, split) in old.into_iter().zip(marked) {
                    match leaf.octant().children() {
                        Some(kids) if split => {
                            out.extend(kids.iter().map(|k| Leaf::new(*k, init.init(k))));
                        }
                        _ => out.push(leaf),
                    }
                }
                self.leaves = out;
            }
            self.bump_revision();
            self.update_markers(comm)?;

            if !comm.any(count > 0)? {
                break;
            }
            rounds += 1;
        }
        debug!(
            rank = self.rank(),
            rounds,
            global = self.global_count(),
            "balanced forest"
        );
        Ok(rounds)
    }
}

fn needs_split(oct: &Octant, connectivity: Connectivity, lookup: &OctantLookup) -> bool {
    connectivity
        .offsets()
        .filter_map(|off| oct.neighbor(off))
        .any(|region| {
            lookup.overlapping(&region).iter().any(|(other, _)| {
                other.level() > oct.level() + 1
                    && oct.contact(other).is_some_and(|c| connectivity.admits(c))
            })
        })
}
