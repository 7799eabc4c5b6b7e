// crates/core/src/separator.rs
//! Trait seam between the job orchestrator and whatever performs the
//! separation.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::error::RunError;
use crate::types::{ModelChoice, ProgressEvent, Stem};

/// Sending half of a job's progress channel.
///
/// Unbounded: the runner must never stall on a slow consumer while the
/// child process keeps writing.
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Receiving half of a job's progress channel.
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Create a per-job progress channel.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Everything one separation run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub stem: Stem,
    pub model: ModelChoice,
}

/// Something that can split an audio file into a stem and its residual.
///
/// Implementations write into `invocation.output_dir` using the flat
/// `<output_dir>/<track>/<stem>.wav` layout, emit non-decreasing progress
/// through `progress`, and finish a successful run with a 100 event.
#[async_trait]
pub trait Separator: Send + Sync {
    async fn separate(
        &self,
        invocation: &Invocation,
        progress: ProgressSender,
    ) -> Result<(), RunError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}
