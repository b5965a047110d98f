//! Face directions of a hexahedral cell and the shared normal table.

use std::fmt;

/// Number of faces of an octree cell.
pub const FACE_COUNT: usize = 6;

/// Outward unit normal of each face, indexed by [`Face::index`].
///
/// Order is `-x, +x, -y, +y, -z, +z`, the same order the mesh uses to
/// number faces. Boundary tagging and flux evaluation both read this
/// table instead of branching on the face index.
pub static FACE_NORMALS: [[f64; 3]; FACE_COUNT] = [
    [-1.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, -1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, -1.0],
    [0.0, 0.0, 1.0],
];

/// One of the six faces of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Face {
    /// The face at the low end of the x axis.
    NegX,
    /// The face at the high end of the x axis.
    PosX,
    /// The face at the low end of the y axis.
    NegY,
    /// The face at the high end of the y axis.
    PosY,
    /// The face at the low end of the z axis.
    NegZ,
    /// The face at the high end of the z axis.
    PosZ,
}

impl Face {
    /// All faces in index order.
    pub const ALL: [Face; FACE_COUNT] = [
        Face::NegX,
        Face::PosX,
        Face::NegY,
        Face::PosY,
        Face::NegZ,
        Face::PosZ,
    ];

    /// Face number in `0..6`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Face for a face number, or `None` if `index >= 6`.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Axis the face is perpendicular to (0 = x, 1 = y, 2 = z).
    pub fn axis(self) -> usize {
        self.index() / 2
    }

    /// Whether the face sits at the high end of its axis.
    pub fn is_positive(self) -> bool {
        self.index() % 2 == 1
    }

    /// The face on the other side of the cell along the same axis.
    pub fn opposite(self) -> Self {
        Self::ALL[self.index() ^ 1]
    }

    /// Outward unit normal, read from [`FACE_NORMALS`].
    pub fn normal(self) -> [f64; 3] {
        FACE_NORMALS[self.index()]
    }

    /// Face perpendicular to `axis` on the requested side.
    ///
    /// # Panics
    ///
    /// Panics if `axis >= 3`.
    pub fn on_axis(axis: usize, positive: bool) -> Self {
        assert!(axis < 3, "axis {axis} out of range");
        Self::ALL[axis * 2 + usize::from(positive)]
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NegX => "-x",
            Self::PosX => "+x",
            Self::NegY => "-y",
            Self::PosY => "+y",
            Self::NegZ => "-z",
            Self::PosZ => "+z",
        };
        f.write_str(name)
    }
}
