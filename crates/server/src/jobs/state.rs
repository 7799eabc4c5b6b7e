// crates/server/src/jobs/state.rs
//! Atomic state tracking for a single separation job.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use stemsplit_core::{Invocation, ModelChoice, Stem};

use super::types::{JobId, JobSnapshot, JobStatus};

/// Live state of one job.
///
/// Status and progress are lock-free atomics; the request fields never
/// change after registration.
pub struct JobState {
    id: JobId,
    stem: Stem,
    model: ModelChoice,
    input_path: PathBuf,
    started_at: DateTime<Utc>,
    status: AtomicU8,
    progress: AtomicU8,
}

impl JobState {
    pub fn new(id: JobId, invocation: &Invocation) -> Self {
        Self {
            id,
            stem: invocation.stem,
            model: invocation.model,
            input_path: invocation.input_path.clone(),
            started_at: Utc::now(),
            status: AtomicU8::new(JobStatus::Pending as u8),
            progress: AtomicU8::new(0),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.status.load(Ordering::Relaxed))
    }

    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }

    pub fn set_running(&self) {
        self.status
            .store(JobStatus::Running as u8, Ordering::Relaxed);
    }

    /// Record a progress value; never moves backwards.
    pub fn record_progress(&self, value: u8) {
        self.progress.fetch_max(value.min(100), Ordering::Relaxed);
    }

    pub fn succeed(&self) {
        self.progress.store(100, Ordering::Relaxed);
        self.status
            .store(JobStatus::Succeeded as u8, Ordering::Relaxed);
    }

    pub fn fail(&self) {
        self.status
            .store(JobStatus::Failed as u8, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id,
            stem: self.stem,
            model: self.model,
            input_path: self.input_path.clone(),
            status: self.status(),
            progress: self.progress(),
            started_at: self.started_at.to_rfc3339(),
        }
    }
}
