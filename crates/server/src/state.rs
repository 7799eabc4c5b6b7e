// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use stemsplit_core::{DemucsCli, Separator, ServiceConfig};

use crate::hub::ProgressHub;
use crate::jobs::{JobOrchestrator, JobRegistry};

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    pub config: Arc<ServiceConfig>,
    /// Connected `/ws/progress` subscribers.
    pub hub: Arc<ProgressHub>,
    /// Jobs in flight, for `/api/jobs`.
    pub jobs: Arc<JobRegistry>,
    pub orchestrator: JobOrchestrator,
}

impl AppState {
    /// State backed by the Demucs command-line tool described in `config.tool`.
    pub fn new(config: ServiceConfig) -> Arc<Self> {
        let separator = Arc::new(DemucsCli::new(config.tool.clone()));
        Self::with_separator(config, separator)
    }

    /// State backed by an arbitrary separator.
    pub fn with_separator(config: ServiceConfig, separator: Arc<dyn Separator>) -> Arc<Self> {
        let hub = Arc::new(ProgressHub::new(config.server.max_subscribers));
        let jobs = Arc::new(JobRegistry::new());
        let orchestrator =
            JobOrchestrator::new(separator, Arc::clone(&hub), Arc::clone(&jobs), &config.tool);
        Arc::new(Self {
            start_time: Instant::now(),
            config: Arc::new(config),
            hub,
            jobs,
            orchestrator,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Arc<Self> {
        Self::new(ServiceConfig::default())
    }
}
