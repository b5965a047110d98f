//! Visualization output and timing side files for Canopy.
//!
//! A solve step hands an [`OutputFrame`] (one record per local cell plus
//! named per-corner fields) to a [`SolutionWriter`]. The reference
//! [`VtkWriter`] produces one VTK XML unstructured-grid piece per rank and
//! a parallel index file on rank 0. [`TimingRecord`] writes the one-line
//! `init.time` and `solution_NN.time` diagnostics.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod frame;
pub mod timing;
pub mod vtk;

pub use error::{OutputError, WriteStage};
pub use frame::{CellRecord, CornerField, OutputFrame};
pub use timing::TimingRecord;
pub use vtk::{VtkWriter, VTK_VOXEL};

/// Consumer of per-step output frames.
///
/// Called once per step on every rank with that rank's cells. Failures
/// are fatal to the run.
pub trait SolutionWriter {
    /// Persist `frame`.
    fn write_frame(&mut self, frame: &OutputFrame) -> Result<(), OutputError>;
}

impl<W: SolutionWriter + ?Sized> SolutionWriter for &mut W {
    fn write_frame(&mut self, frame: &OutputFrame) -> Result<(), OutputError> {
        (**self).write_frame(frame)
    }
}

impl<W: SolutionWriter + ?Sized> SolutionWriter for Box<W> {
    fn write_frame(&mut self, frame: &OutputFrame) -> Result<(), OutputError> {
        (**self).write_frame(frame)
    }
}
