// crates/server/src/jobs/mod.rs
//! Separation jobs.
//!
//! Provides:
//! - `JobOrchestrator` validates a request, runs the separator in the
//!   background and forwards its progress to the hub
//! - `JobRegistry` tracks jobs in flight for `/api/jobs`
//! - `JobState` atomic status and progress per job

pub mod orchestrator;
pub mod registry;
pub mod state;
pub mod types;

pub use orchestrator::{JobOrchestrator, OrchestrateError};
pub use registry::{JobRegistry, JobTicket};
pub use state::JobState;
pub use types::{JobId, JobSnapshot, JobStatus};
