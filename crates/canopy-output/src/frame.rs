//! Per-step output frames.

use canopy_core::Rank;

use crate::error::OutputError;

/// Geometry and level of one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellRecord {
    /// Physical midpoint.
    pub center: [f64; 3],
    /// Physical edge length.
    pub edge_length: f64,
    /// Refinement level.
    pub level: u8,
}

impl CellRecord {
    /// Corners in VTK voxel order of the cell shrunk by `scale` about its
    /// center.
    pub fn scaled_corners(&self, scale: f64) -> [[f64; 3]; 8] {
        let h = 0.5 * self.edge_length * scale;
        let c = self.center;
        std::array::from_fn(|i| {
            [
                c[0] + if i & 1 != 0 { h } else { -h },
                c[1] + if i & 2 != 0 { h } else { -h },
                c[2] + if i & 4 != 0 { h } else { -h },
            ]
        })
    }
}

/// A named scalar with one value per cell corner.
#[derive(Clone, Debug, PartialEq)]
pub struct CornerField {
    /// Field name as it appears in the output.
    pub name: String,
    /// Eight values per cell, aligned with [`OutputFrame::cells`].
    pub values: Vec<[f64; 8]>,
}

/// Everything one rank writes for one step.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputFrame {
    /// File stem, e.g. `solution_00` or `init`.
    pub stem: String,
    /// Writing rank.
    pub rank: Rank,
    /// Number of ranks writing the same stem.
    pub size: usize,
    /// Local cells in mesh order.
    pub cells: Vec<CellRecord>,
    /// Per-corner fields.
    pub corner_fields: Vec<CornerField>,
}

impl OutputFrame {
    /// Empty frame for `stem` written by `rank` of `size`.
    pub fn new(stem: impl Into<String>, rank: Rank, size: usize) -> Self {
        Self {
            stem: stem.into(),
            rank,
            size,
            cells: Vec::new(),
            corner_fields: Vec::new(),
        }
    }

    /// Append a per-corner field.
    pub fn add_corner_field(
        &mut self,
        name: impl Into<String>,
        values: Vec<[f64; 8]>,
    ) -> &mut Self {
        self.corner_fields.push(CornerField {
            name: name.into(),
            values,
        });
        self
    }

    /// Check that every corner field has one entry per cell.
    pub fn validate(&self) -> Result<(), OutputError> {
        for field in &self.corner_fields {
            if field.values.len() != self.cells.len() {
                return Err(OutputError::FieldLength {
                    field: field.name.clone(),
                    expected: self.cells.len(),
                    got: field.values.len(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn scaled_corners_shrink_about_center() {
        let cell = CellRecord {
            center: [0.5, 0.5, 0.5],
            edge_length: 1.0,
            level: 0,
        };
        let c = cell.scaled_corners(0.5);
        assert_eq!(c[0], [0.25, 0.25, 0.25]);
        assert_eq!(c[1], [0.75, 0.25, 0.25]);
        assert_eq!(c[6], [0.25, 0.75, 0.75]);
        assert_eq!(c[7], [0.75, 0.75, 0.75]);
    }

    #[test]
    fn mismatched_field_is_rejected() {
        let mut frame = OutputFrame::new("init", Rank(0), 1);
        frame.cells.push(CellRecord {
            center: [0.0; 3],
            edge_length: 1.0,
            level: 0,
        });
        frame.add_corner_field("boundary", vec![]);
        match frame.validate() {
            Err(OutputError::FieldLength { field, expected, got }) => {
                assert_eq!((field.as_str(), expected, got), ("boundary", 1, 0));
            }
            other => panic!("expected FieldLength, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn scaled_corners_stay_inside_the_cell(
            x in -10.0f64..10.0,
            y in -10.0f64..10.0,
            z in -10.0f64..10.0,
            edge in 1.0e-6f64..4.0,
            scale in 1.0e-3f64..=1.0,
        ) {
            let cell = CellRecord {
                center: [x, y, z],
                edge_length: edge,
                level: 0,
            };
            let half = 0.5 * edge;
            let corners = cell.scaled_corners(scale);
            for corner in &corners {
                for (axis, &v) in corner.iter().enumerate() {
                    let c = cell.center[axis];
                    prop_assert!(v >= c - half && v <= c + half);
                    prop_assert!(v != c);
                }
            }
            // Opposite corners span the scaled edge on every axis.
            for axis in 0..3 {
                let span = corners[7][axis] - corners[0][axis];
                prop_assert!((span - edge * scale).abs() <= 1.0e-9 * edge.max(1.0));
            }
        }
    }
}
