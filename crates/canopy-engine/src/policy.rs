//! Refinement predicates.

use canopy_mesh::CellGeometry;

use crate::context::DomainContext;

/// Decides whether a cell splits.
///
/// Implementations are pure: the answer depends only on the cell's
/// geometry and the policy's own parameters.
pub trait RefinementPolicy {
    /// Whether the cell described by `cell` should be split.
    fn should_refine(&self, cell: &CellGeometry) -> bool;
}

/// Splits every cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefineAlways;

impl RefinementPolicy for RefineAlways {
    fn should_refine(&self, _cell: &CellGeometry) -> bool {
        true
    }
}

/// Splits cells whose midpoint lies strictly inside a spherical shell and
/// whose edge is still longer than a minimum size.
///
/// With `l` the squared midpoint distance from `center` and `h` the edge
/// length, a cell splits iff `inner_sq < l < outer_sq` and `h > min_size`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandRefinement {
    /// Center of the shell.
    pub center: [f64; 3],
    /// Squared inner radius.
    pub inner_sq: f64,
    /// Squared outer radius.
    pub outer_sq: f64,
    /// Edge length at or below which cells never split.
    pub min_size: f64,
}

impl BandRefinement {
    /// The band described by `ctx`.
    pub fn from_context(ctx: &DomainContext) -> Self {
        Self {
            center: ctx.center,
            inner_sq: ctx.inner_radius_sq,
            outer_sq: ctx.outer_radius_sq,
            min_size: ctx.min_cell_size,
        }
    }

    /// Squared distance from `p` to the center.
    pub fn distance_sq(&self, p: [f64; 3]) -> f64 {
        (0..3).map(|k| (p[k] - self.center[k]).powi(2)).sum()
    }
}

impl RefinementPolicy for BandRefinement {
    fn should_refine(&self, cell: &CellGeometry) -> bool {
        let l = self.distance_sq(cell.midpoint);
        l < self.outer_sq && l > self.inner_sq && cell.edge_length > self.min_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn band() -> BandRefinement {
        BandRefinement::from_context(&DomainContext::default())
    }

    fn cell(midpoint: [f64; 3], edge_length: f64) -> CellGeometry {
        CellGeometry {
            level: 0,
            midpoint,
            edge_length,
        }
    }

    #[test]
    fn center_never_refines() {
        assert!(!band().should_refine(&cell([0.5; 3], 1.0)));
    }

    #[test]
    fn inside_band_refines() {
        // l = 0.1
        let p = [0.5 + 0.1f64.sqrt(), 0.5, 0.5];
        assert!(band().should_refine(&cell(p, 0.25)));
    }

    #[test]
    fn small_cells_stop_refining() {
        let p = [0.5 + 0.1f64.sqrt(), 0.5, 0.5];
        assert!(!band().should_refine(&cell(p, 0.02)));
        assert!(!band().should_refine(&cell(p, 0.01)));
    }

    #[test]
    fn refine_always_says_yes() {
        assert!(RefineAlways.should_refine(&cell([0.0; 3], 1e-9)));
    }

    proptest! {
        #[test]
        fn outside_band_never_refines(
            x in 0.0f64..1.0,
            y in 0.0f64..1.0,
            z in 0.0f64..1.0,
            h in 0.0f64..1.0,
        ) {
            let b = band();
            let l = b.distance_sq([x, y, z]);
            prop_assume!(l <= b.inner_sq || l >= b.outer_sq);
            prop_assert!(!b.should_refine(&cell([x, y, z], h)));
        }

        #[test]
        fn inside_band_with_large_cells_always_refines(
            x in 0.0f64..1.0,
            y in 0.0f64..1.0,
            z in 0.0f64..1.0,
            h in 0.03f64..1.0,
        ) {
            let b = band();
            let l = b.distance_sq([x, y, z]);
            prop_assume!(l > b.inner_sq && l < b.outer_sq);
            prop_assert!(b.should_refine(&cell([x, y, z], h)));
        }
    }
}
