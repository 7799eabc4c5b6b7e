// crates/server/src/jobs/orchestrator.rs
//! Runs one separation request end to end.
//!
//! Validates the input, prepares the output directory, starts the separator
//! on a background task and relays its progress to the hub until the task's
//! channel closes. Then the task's result decides the response.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use stemsplit_core::{
    expected_outputs, progress_channel, track_name, InputError, Invocation, ModelChoice, RunError,
    SeparationOutput, SeparationRequest, Separator, ToolConfig,
};
use tracing::Instrument;

use super::registry::JobRegistry;
use crate::hub::ProgressHub;
use crate::metrics::{record_job, JobOutcome};

#[derive(Debug, thiserror::Error)]
pub enum OrchestrateError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("Cannot derive a track name from {path}")]
    TrackName { path: PathBuf },

    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Run(#[from] RunError),

    #[error("Separation finished but {path} was not produced")]
    OutputNotProduced { path: PathBuf },

    #[error("Separation job panicked")]
    JobPanicked,
}

/// Cheap to clone; all shared parts are behind `Arc`.
#[derive(Clone)]
pub struct JobOrchestrator {
    separator: Arc<dyn Separator>,
    hub: Arc<ProgressHub>,
    jobs: Arc<JobRegistry>,
    default_model: ModelChoice,
    residual_file_name: Arc<str>,
}

impl JobOrchestrator {
    pub fn new(
        separator: Arc<dyn Separator>,
        hub: Arc<ProgressHub>,
        jobs: Arc<JobRegistry>,
        tool: &ToolConfig,
    ) -> Self {
        Self {
            separator,
            hub,
            jobs,
            default_model: tool.default_model,
            residual_file_name: Arc::from(tool.residual_file_name.as_str()),
        }
    }

    pub fn separator_name(&self) -> &str {
        self.separator.name()
    }

    /// Run a request on its own task and wait for it.
    ///
    /// The work is detached from the caller: if the HTTP client goes away
    /// the job still runs to completion and keeps broadcasting progress.
    pub async fn submit(
        &self,
        request: SeparationRequest,
    ) -> Result<SeparationOutput, OrchestrateError> {
        let this = self.clone();
        tokio::spawn(async move { this.execute(request).await })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "separation job task failed");
                OrchestrateError::JobPanicked
            })?
    }

    /// Run a request on the current task.
    pub async fn execute(
        &self,
        request: SeparationRequest,
    ) -> Result<SeparationOutput, OrchestrateError> {
        let model = request.model.unwrap_or(self.default_model);

        if let Err(e) = self.prepare(&request).await {
            tracing::warn!(
                input = %request.input_path.display(),
                error = %e,
                "separation request rejected"
            );
            record_job(JobOutcome::Rejected, model.model_name(), None);
            return Err(e);
        }
        let track = track_name(&request.input_path).ok_or_else(|| {
            OrchestrateError::TrackName {
                path: request.input_path.clone(),
            }
        })?;

        let invocation = Invocation {
            input_path: request.input_path,
            output_dir: request.output_dir,
            stem: request.stem,
            model,
        };
        let ticket = self.jobs.register(&invocation);
        let span = tracing::info_span!(
            "separation",
            job_id = ticket.id(),
            stem = %invocation.stem,
            model = %invocation.model,
        );

        async move {
            let job = ticket.state();
            job.set_running();
            tracing::info!(
                separator = self.separator.name(),
                input = %invocation.input_path.display(),
                "separation started"
            );
            let started = Instant::now();

            let (tx, mut rx) = progress_channel();
            let separator = Arc::clone(&self.separator);
            let task_invocation = invocation.clone();
            let handle = tokio::spawn(
                async move { separator.separate(&task_invocation, tx).await }.in_current_span(),
            );

            // Ends once the separator drops its sender, i.e. when the task is done.
            while let Some(event) = rx.recv().await {
                job.record_progress(event.value);
                let delivered = self.hub.broadcast(event);
                tracing::trace!(progress = event.value, delivered, "progress forwarded");
            }

            let result = match handle.await {
                Ok(Ok(())) => self.verify_outputs(&invocation, &track).await,
                Ok(Err(e)) => Err(OrchestrateError::from(e)),
                Err(e) => {
                    tracing::error!(error = %e, "separator task panicked");
                    Err(OrchestrateError::JobPanicked)
                }
            };

            let elapsed = started.elapsed();
            match &result {
                Ok(output) => {
                    job.succeed();
                    record_job(JobOutcome::Succeeded, invocation.model.model_name(), Some(elapsed));
                    tracing::info!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        track = %output.output_file_track.display(),
                        "separation succeeded"
                    );
                }
                Err(e) => {
                    job.fail();
                    record_job(JobOutcome::Failed, invocation.model.model_name(), Some(elapsed));
                    tracing::warn!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        error = %e,
                        "separation failed"
                    );
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn prepare(&self, request: &SeparationRequest) -> Result<(), OrchestrateError> {
        validate_input(&request.input_path).await?;
        tokio::fs::create_dir_all(&request.output_dir)
            .await
            .map_err(|source| OrchestrateError::OutputDir {
                path: request.output_dir.clone(),
                source,
            })
    }

    /// Only the stem file is required; the residual is reported as-is.
    async fn verify_outputs(
        &self,
        invocation: &Invocation,
        track: &str,
    ) -> Result<SeparationOutput, OrchestrateError> {
        let output = expected_outputs(
            &invocation.output_dir,
            track,
            invocation.stem,
            &self.residual_file_name,
        );
        match tokio::fs::metadata(&output.output_file_track).await {
            Ok(meta) if meta.is_file() => Ok(output),
            _ => Err(OrchestrateError::OutputNotProduced {
                path: output.output_file_track,
            }),
        }
    }
}

/// The input must be an existing regular file we can open.
pub async fn validate_input(path: &Path) -> Result<(), InputError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| InputError::io(path, e))?;
    if !meta.is_file() {
        return Err(InputError::Unreadable {
            path: path.to_path_buf(),
            source: None,
        });
    }
    tokio::fs::File::open(path)
        .await
        .map_err(|e| InputError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stemsplit_core::{ProgressEvent, ProgressSender, Stem};

    /// Emits `steps` then writes the flat layout, unless told otherwise.
    struct FakeSeparator {
        steps: Vec<u8>,
        write_outputs: bool,
        fail_with: Option<i32>,
        panic: bool,
        calls: AtomicUsize,
    }

    impl FakeSeparator {
        fn ok(steps: &[u8]) -> Self {
            Self {
                steps: steps.to_vec(),
                write_outputs: true,
                fail_with: None,
                panic: false,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Separator for FakeSeparator {
        async fn separate(
            &self,
            invocation: &Invocation,
            progress: ProgressSender,
        ) -> Result<(), RunError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for step in &self.steps {
                let _ = progress.send(ProgressEvent::new(*step).unwrap());
                tokio::task::yield_now().await;
            }
            if self.panic {
                panic!("separator blew up");
            }
            if let Some(code) = self.fail_with {
                return Err(RunError::ToolFailed {
                    code: Some(code),
                    output: "CUDA error: out of memory".into(),
                });
            }
            if self.write_outputs {
                let track = track_name(&invocation.input_path).unwrap();
                let dir = invocation.output_dir.join(track);
                tokio::fs::create_dir_all(&dir).await.unwrap();
                tokio::fs::write(dir.join(invocation.stem.file_name()), b"RIFF")
                    .await
                    .unwrap();
                tokio::fs::write(dir.join("no_vocals.wav"), b"RIFF").await.unwrap();
            }
            let _ = progress.send(ProgressEvent::COMPLETE);
            Ok(())
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        input: PathBuf,
        output_dir: PathBuf,
        hub: Arc<ProgressHub>,
        jobs: Arc<JobRegistry>,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("My Song.mp3");
        std::fs::write(&input, b"ID3").unwrap();
        let output_dir = tmp.path().join("nested").join("out");
        Fixture {
            input,
            output_dir,
            hub: Arc::new(ProgressHub::default()),
            jobs: Arc::new(JobRegistry::new()),
            _tmp: tmp,
        }
    }

    fn orchestrator(fx: &Fixture, separator: Arc<FakeSeparator>) -> JobOrchestrator {
        JobOrchestrator::new(
            separator,
            Arc::clone(&fx.hub),
            Arc::clone(&fx.jobs),
            &ToolConfig::default(),
        )
    }

    fn request(fx: &Fixture, stem: Stem) -> SeparationRequest {
        SeparationRequest {
            input_path: fx.input.clone(),
            output_dir: fx.output_dir.clone(),
            stem,
            model: None,
        }
    }

    #[tokio::test]
    async fn test_success_reports_flat_paths_and_forwards_progress() {
        let fx = fixture();
        let mut subscriber = fx.hub.connect().unwrap();
        let orch = orchestrator(&fx, Arc::new(FakeSeparator::ok(&[0, 25, 80])));

        let output = orch.submit(request(&fx, Stem::Vocals)).await.unwrap();

        assert_eq!(
            output.output_file_track,
            fx.output_dir.join("My Song").join("vocals.wav")
        );
        assert_eq!(
            output.output_file_instrumental,
            fx.output_dir.join("My Song").join("no_vocals.wav")
        );

        let mut received = Vec::new();
        while let Ok(Some(ev)) =
            tokio::time::timeout(std::time::Duration::from_millis(50), subscriber.recv()).await
        {
            received.push(ev.value);
        }
        assert_eq!(received, vec![0, 25, 80, 100]);
        assert!(fx.jobs.is_empty(), "finished jobs leave the registry");
    }

    #[tokio::test]
    async fn test_missing_input_never_calls_separator() {
        let fx = fixture();
        let separator = Arc::new(FakeSeparator::ok(&[]));
        let orch = orchestrator(&fx, Arc::clone(&separator));

        let mut req = request(&fx, Stem::Vocals);
        req.input_path = fx.input.with_file_name("missing.mp3");
        let err = orch.submit(req).await.unwrap_err();

        assert!(matches!(err, OrchestrateError::Input(InputError::NotFound { .. })));
        assert!(err.to_string().contains("not found"));
        assert_eq!(separator.calls.load(Ordering::SeqCst), 0);
        assert!(!fx.output_dir.exists());
    }

    #[tokio::test]
    async fn test_directory_input_is_unreadable() {
        let fx = fixture();
        let orch = orchestrator(&fx, Arc::new(FakeSeparator::ok(&[])));
        let mut req = request(&fx, Stem::Drums);
        req.input_path = fx.input.parent().unwrap().to_path_buf();

        let err = orch.submit(req).await.unwrap_err();
        assert!(matches!(err, OrchestrateError::Input(InputError::Unreadable { .. })));
    }

    #[tokio::test]
    async fn test_output_dir_created_before_run() {
        let fx = fixture();
        let orch = orchestrator(&fx, Arc::new(FakeSeparator::ok(&[50])));
        assert!(!fx.output_dir.exists());
        orch.submit(request(&fx, Stem::Bass)).await.unwrap();
        assert!(fx.output_dir.is_dir());
    }

    #[tokio::test]
    async fn test_tool_failure_surfaces_code_and_output() {
        let fx = fixture();
        let separator = FakeSeparator {
            fail_with: Some(1),
            ..FakeSeparator::ok(&[10])
        };
        let orch = orchestrator(&fx, Arc::new(separator));

        let err = orch.submit(request(&fx, Stem::Vocals)).await.unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, OrchestrateError::Run(RunError::ToolFailed { .. })));
        assert!(msg.contains("code 1"));
        assert!(msg.contains("CUDA error"));
        assert!(fx.jobs.is_empty());
    }

    #[tokio::test]
    async fn test_missing_stem_file_is_output_not_produced() {
        let fx = fixture();
        let separator = FakeSeparator {
            write_outputs: false,
            ..FakeSeparator::ok(&[])
        };
        let orch = orchestrator(&fx, Arc::new(separator));

        let err = orch.submit(request(&fx, Stem::Other)).await.unwrap_err();
        match err {
            OrchestrateError::OutputNotProduced { path } => {
                assert!(path.ends_with("My Song/other.wav"));
            }
            other => panic!("expected OutputNotProduced, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_separator_panic_is_contained() {
        let fx = fixture();
        let separator = FakeSeparator {
            panic: true,
            ..FakeSeparator::ok(&[5])
        };
        let orch = orchestrator(&fx, Arc::new(separator));

        let err = orch.submit(request(&fx, Stem::Vocals)).await.unwrap_err();
        assert!(matches!(err, OrchestrateError::JobPanicked));
        assert!(fx.jobs.is_empty());
    }

    #[tokio::test]
    async fn test_validate_input_accepts_regular_file() {
        let fx = fixture();
        assert!(validate_input(&fx.input).await.is_ok());
    }
}
