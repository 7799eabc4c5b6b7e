// crates/server/src/jobs/registry.rs
//! Registry of separation jobs currently in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use stemsplit_core::Invocation;

use super::state::JobState;
use super::types::{JobId, JobSnapshot};

/// Tracks running jobs for `GET /api/jobs` and log correlation.
///
/// Entries live exactly as long as their [`JobTicket`].
pub struct JobRegistry {
    next_id: AtomicU64,
    jobs: RwLock<HashMap<JobId, Arc<JobState>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new job. Dropping the returned ticket removes it.
    pub fn register(self: &Arc<Self>, invocation: &Invocation) -> JobTicket {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(JobState::new(id, invocation));

        match self.jobs.write() {
            Ok(mut jobs) => {
                jobs.insert(id, Arc::clone(&state));
            }
            Err(e) => tracing::error!("RwLock poisoned writing jobs map: {e}"),
        }

        JobTicket {
            registry: Arc::clone(self),
            state,
        }
    }

    fn remove(&self, id: JobId) {
        match self.jobs.write() {
            Ok(mut jobs) => {
                jobs.remove(&id);
            }
            Err(e) => tracing::error!("RwLock poisoned removing job {id}: {e}"),
        }
    }

    pub fn get(&self, id: JobId) -> Option<JobSnapshot> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(&id).map(|s| s.snapshot()),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs map: {e}");
                None
            }
        }
    }

    /// Snapshots of all registered jobs, oldest first.
    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        let mut snaps: Vec<JobSnapshot> = match self.jobs.read() {
            Ok(jobs) => jobs.values().map(|s| s.snapshot()).collect(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs: {e}");
                Vec::new()
            }
        };
        snaps.sort_by_key(|s| s.job_id);
        snaps
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|jobs| jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration of one job; unregisters on drop.
pub struct JobTicket {
    registry: Arc<JobRegistry>,
    state: Arc<JobState>,
}

impl JobTicket {
    pub fn id(&self) -> JobId {
        self.state.id()
    }

    pub fn state(&self) -> &Arc<JobState> {
        &self.state
    }
}

impl Drop for JobTicket {
    fn drop(&mut self) {
        self.registry.remove(self.state.id());
    }
}
