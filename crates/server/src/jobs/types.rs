// crates/server/src/jobs/types.rs
//! Types for separation job tracking.

use serde::Serialize;
use std::path::PathBuf;
use stemsplit_core::{ModelChoice, Stem};

/// Process-local identifier of a separation job.
pub type JobId = u64;

/// Lifecycle of a separation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum JobStatus {
    Pending = 0,
    Running = 1,
    Succeeded = 2,
    Failed = 3,
}

impl JobStatus {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => JobStatus::Pending,
            1 => JobStatus::Running,
            2 => JobStatus::Succeeded,
            _ => JobStatus::Failed,
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// One entry of `GET /api/jobs`.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub stem: Stem,
    pub model: ModelChoice,
    pub input_path: PathBuf,
    pub status: JobStatus,
    pub progress: u8,
    pub started_at: String,
}
