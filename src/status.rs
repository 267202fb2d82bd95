//! Exit status codes for the CLI
//!
//! - 0: every step passed
//! - 1: fatal error (suite could not be loaded, bad arguments, report I/O)
//! - 10: the run completed but at least one step failed

use std::process::{ExitCode, Termination};

/// Exit status codes following standard Unix conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    /// Every step passed
    Success = 0,
    /// Fatal error before or after the run
    Error = 1,
    /// At least one step failed
    StepsFailed = 10,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status as u8)
    }
}

impl Termination for ExitStatus {
    fn report(self) -> ExitCode {
        ExitCode::from(self as u8)
    }
}

impl ExitStatus {
    /// Exit status for a finished run
    pub fn from_run(failed: usize) -> Self {
        if failed == 0 {
            ExitStatus::Success
        } else {
            ExitStatus::StepsFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_run() {
        assert_eq!(ExitStatus::from_run(0), ExitStatus::Success);
        assert_eq!(ExitStatus::from_run(3), ExitStatus::StepsFailed);
    }
}
