//! Physical placement of the octree root.

use canopy_core::Face;

use crate::octant::{Octant, ROOT_LEN};

/// Axis-aligned cube in physical space that the root octant maps onto.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubeDomain {
    origin: [f64; 3],
    size: f64,
}

/// Geometry of one cell, as handed to per-cell callbacks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellGeometry {
    /// Refinement level of the cell.
    pub level: u8,
    /// Physical midpoint.
    pub midpoint: [f64; 3],
    /// Physical edge length.
    pub edge_length: f64,
}

impl CubeDomain {
    /// Cube with lowest corner `origin` and edge length `size`.
    pub fn new(origin: [f64; 3], size: f64) -> Self {
        Self { origin, size }
    }

    /// The unit cube `[0, 1]^3`.
    pub fn unit() -> Self {
        Self::new([0.0; 3], 1.0)
    }

    /// Lowest corner.
    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    /// Edge length of the whole domain.
    pub fn size(&self) -> f64 {
        self.size
    }

    fn scale(&self) -> f64 {
        self.size / f64::from(ROOT_LEN)
    }

    /// Physical coordinates of a point given in finest-level units.
    pub fn to_physical(&self, p: [u32; 3]) -> [f64; 3] {
        let s = self.scale();
        std::array::from_fn(|k| self.origin[k] + f64::from(p[k]) * s)
    }

    /// Physical edge length of `oct`.
    pub fn edge_length(&self, oct: &Octant) -> f64 {
        f64::from(oct.len()) * self.scale()
    }

    /// Physical midpoint of `oct`.
    pub fn midpoint(&self, oct: &Octant) -> [f64; 3] {
        let a = self.to_physical(oct.anchor());
        let h = 0.5 * self.edge_length(oct);
        [a[0] + h, a[1] + h, a[2] + h]
    }

    /// The eight corners of `oct` in VTK voxel order (x fastest, then y,
    /// then z), the same order as [`Octant::children`].
    pub fn corners(&self, oct: &Octant) -> [[f64; 3]; 8] {
        let a = self.to_physical(oct.anchor());
        let h = self.edge_length(oct);
        std::array::from_fn(|i| {
            [
                a[0] + if i & 1 != 0 { h } else { 0.0 },
                a[1] + if i & 2 != 0 { h } else { 0.0 },
                a[2] + if i & 4 != 0 { h } else { 0.0 },
            ]
        })
    }

    /// Whether `face` of `oct` lies on the outer surface of the domain.
    pub fn is_boundary_face(&self, oct: &Octant, face: Face) -> bool {
        oct.is_on_root_face(face)
    }

    /// Level, midpoint, and edge length of `oct`.
    pub fn geometry(&self, oct: &Octant) -> CellGeometry {
        CellGeometry {
            level: oct.level(),
            midpoint: self.midpoint(oct),
            edge_length: self.edge_length(oct),
        }
    }
}

impl Default for CubeDomain {
    fn default() -> Self {
        Self::unit()
    }
}
