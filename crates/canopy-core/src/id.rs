//! Strongly-typed identifiers.

use std::fmt;

/// Index of a process within the cooperating process group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rank(pub usize);

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for Rank {
    fn from(v: usize) -> Self {
        Self(v)
    }
}

/// Zero-based index of a solve step.
///
/// Output files carry it zero-padded to two digits (`solution_00`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepIndex(pub u32);

impl StepIndex {
    /// Stem of the visualization file written for this step.
    pub fn solution_stem(self) -> String {
        format!("solution_{:02}", self.0)
    }

    /// Name of the timing record written for this step.
    pub fn timing_file_name(self) -> String {
        format!("solution_{:02}.time", self.0)
    }
}

impl fmt::Display for StepIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for StepIndex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_names_are_zero_padded() {
        assert_eq!(StepIndex(0).solution_stem(), "solution_00");
        assert_eq!(StepIndex(7).timing_file_name(), "solution_07.time");
        assert_eq!(StepIndex(12).solution_stem(), "solution_12");
    }
}
