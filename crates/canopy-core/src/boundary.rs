//! The six-bit [`BoundaryMask`] set of domain-boundary faces.

use crate::face::{Face, FACE_COUNT};

/// Set of cell faces that lie on the outer domain boundary.
///
/// Bit `i` corresponds to [`Face::index`] `i`. Insertion is a bitwise OR,
/// so a cell visited once per neighbour direction accumulates every
/// boundary face it touches within a step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BoundaryMask {
    bits: u8,
}

impl BoundaryMask {
    const ALL_BITS: u8 = (1 << FACE_COUNT) - 1;

    /// The empty mask: no boundary face seen.
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Build a mask from raw bits. Bits above the sixth are discarded.
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            bits: bits & Self::ALL_BITS,
        }
    }

    /// Raw bit pattern.
    pub const fn bits(self) -> u8 {
        self.bits
    }

    /// Mark `face` as a boundary face.
    pub fn insert(&mut self, face: Face) {
        self.bits |= 1 << face.index();
    }

    /// Whether `face` has been marked.
    pub fn contains(self, face: Face) -> bool {
        self.bits & (1 << face.index()) != 0
    }

    /// Returns `true` if no face has been marked.
    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Number of marked faces.
    pub fn len(self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Marked faces in index order.
    pub fn faces(self) -> impl Iterator<Item = Face> {
        Face::ALL.into_iter().filter(move |f| self.contains(*f))
    }

    /// Outward normals of every marked face.
    ///
    /// A cell on a domain edge or corner keeps only its last normal in
    /// [`CellState::boundary_normal`](crate::CellState::boundary_normal);
    /// the full set is always recoverable from the mask through the face
    /// table.
    pub fn normals(self) -> impl Iterator<Item = [f64; 3]> {
        self.faces().map(Face::normal)
    }

    /// Scalar written to visualization output: `-1` for an empty mask,
    /// otherwise the integer value of the bit pattern.
    pub fn output_value(self) -> f64 {
        if self.is_empty() {
            -1.0
        } else {
            f64::from(self.bits)
        }
    }
}
