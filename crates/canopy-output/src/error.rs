//! Error types for output.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Stage of writing one visualization file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteStage {
    /// Creating the file and writing points and cells.
    Header,
    /// Per-cell fields.
    CellData,
    /// Per-corner fields.
    PointData,
    /// Closing tags and flush.
    Footer,
    /// The parallel index written by rank 0.
    Index,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Header => "header",
            Self::CellData => "cell data",
            Self::PointData => "point data",
            Self::Footer => "footer",
            Self::Index => "index",
        };
        f.write_str(name)
    }
}

/// Errors from writing visualization or timing files.
#[derive(Debug)]
pub enum OutputError {
    /// Writing a visualization file failed at `stage`.
    Stage {
        /// Stage that failed.
        stage: WriteStage,
        /// File being written.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// A per-corner field does not have one entry per cell.
    FieldLength {
        /// Field name.
        field: String,
        /// Number of cells in the frame.
        expected: usize,
        /// Number of entries in the field.
        got: usize,
    },
    /// Writing a timing record failed.
    Timing {
        /// File being written.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stage {
                stage,
                path,
                source,
            } => write!(
                f,
                "failed to write {stage} of {}: {source}",
                path.display()
            ),
            Self::FieldLength {
                field,
                expected,
                got,
            } => write!(
                f,
                "field '{field}' has {got} cells, frame has {expected}"
            ),
            Self::Timing { path, source } => {
                write!(f, "failed to write timing file {}: {source}", path.display())
            }
        }
    }
}

impl Error for OutputError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Stage { source, .. } | Self::Timing { source, .. } => Some(source),
            Self::FieldLength { .. } => None,
        }
    }
}

impl OutputError {
    /// Stage that failed, for visualization write failures.
    pub fn stage(&self) -> Option<WriteStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
