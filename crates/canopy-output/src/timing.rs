//! One-line timing side files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use canopy_core::StepIndex;

use crate::error::OutputError;

/// A wall-clock timing record written by the coordinating rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimingRecord {
    /// Initial mesh construction and output, `init.time`.
    Init,
    /// One solve step, `solution_NN.time`.
    Solution(StepIndex),
}

impl TimingRecord {
    /// File name of the record.
    pub fn file_name(&self) -> String {
        match self {
            Self::Init => "init.time".to_owned(),
            Self::Solution(step) => step.timing_file_name(),
        }
    }

    /// Text of the record, including the trailing newline.
    pub fn line(&self, elapsed: Duration) -> String {
        let what = match self {
            Self::Init => "Init",
            Self::Solution(_) => "Solution",
        };
        format!("{what} took {:.6} seconds\n", elapsed.as_secs_f64())
    }

    /// Write the record into `dir`, replacing any earlier file.
    pub fn write(&self, dir: &Path, elapsed: Duration) -> Result<PathBuf, OutputError> {
        let path = dir.join(self.file_name());
        fs::write(&path, self.line(elapsed)).map_err(|source| OutputError::Timing {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
