//! Exit status codes for the CLI
//!
//! - 0: success
//! - 1: any error (bad workspace, missing entity, transport failure)
//! - 10: a flow ran and failed
//! - 130: interrupted (Ctrl+C, standard SIGINT exit code)

use std::process::{ExitCode, Termination};

use crate::models::FlowStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    Success = 0,
    Error = 1,
    FlowFailed = 10,
    Interrupted = 130,
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

impl From<FlowStatus> for ExitStatus {
    fn from(status: FlowStatus) -> Self {
        match status {
            FlowStatus::Completed => ExitStatus::Success,
            FlowStatus::Failed => ExitStatus::FlowFailed,
            FlowStatus::Cancelled => ExitStatus::Interrupted,
            FlowStatus::Running => ExitStatus::Error,
        }
    }
}
