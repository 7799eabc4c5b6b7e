// crates/core/src/demucs.rs
//! Demucs CLI runner: spawns the `demucs` process and streams its progress.

use std::ffi::OsString;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::process::Command;
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};

use crate::config::ToolConfig;
use crate::error::RunError;
use crate::layout::flatten_model_dir;
use crate::progress::ProgressTracker;
use crate::separator::{Invocation, ProgressSender, Separator};
use crate::tail::OutputTail;

/// Timeout for the availability probe (`demucs --help`).
const PROBE_TIMEOUT: Duration = Duration::from_secs(20);

/// Runs separations through the Demucs command-line tool.
///
/// Invocation: `<program> [prefix_args..] -n <model> --two-stems=<stem>
/// -o <output_dir> [--float32] -- <input>`, always as an argument vector.
#[derive(Debug, Clone)]
pub struct DemucsCli {
    config: ToolConfig,
}

impl DemucsCli {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Arguments after the program name.
    pub fn command_args(&self, invocation: &Invocation) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.config.prefix_args.iter().map(OsString::from).collect();
        args.push("-n".into());
        args.push(invocation.model.model_name().into());
        args.push(format!("--two-stems={}", invocation.stem).into());
        args.push("-o".into());
        args.push(invocation.output_dir.clone().into_os_string());
        if self.config.float32 {
            args.push("--float32".into());
        }
        // End of options: an input named `-live.mp3` stays positional
        args.push("--".into());
        args.push(invocation.input_path.clone().into_os_string());
        args
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(self.command_args(invocation))
            // Null stdin so the child never blocks waiting for input
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Line-buffered Python output, otherwise progress arrives in bursts
            .env("PYTHONUNBUFFERED", "1")
            .kill_on_drop(true);
        cmd
    }

    /// Run one separation to completion.
    ///
    /// Reads stdout and stderr (merged) until both close, then waits for the
    /// exit status. Output is split on `\n` and `\r`: the progress bar
    /// redraws itself with carriage returns.
    pub async fn run(
        &self,
        invocation: &Invocation,
        progress: ProgressSender,
    ) -> Result<(), RunError> {
        let program = self.config.program.clone();
        let t0 = Instant::now();

        tracing::info!(
            program = %program,
            model = %invocation.model,
            stem = %invocation.stem,
            input = %invocation.input_path.display(),
            output_dir = %invocation.output_dir.display(),
            "demucs: spawning"
        );

        let mut child = self.command(invocation).spawn().map_err(|source| {
            tracing::error!(program = %program, error = %source, "demucs: failed to spawn");
            RunError::Spawn {
                program: program.clone(),
                source,
            }
        })?;

        let stdout = child.stdout.take().ok_or_else(|| RunError::Io {
            program: program.clone(),
            source: std::io::Error::other("stdout was not captured"),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| RunError::Io {
            program: program.clone(),
            source: std::io::Error::other("stderr was not captured"),
        })?;

        let mut lines = futures_util::stream::select(
            FramedRead::new(stdout, line_codec()),
            FramedRead::new(stderr, line_codec()),
        );

        let mut tracker = ProgressTracker::new();
        let mut tail = OutputTail::new(self.config.tail_chars);

        while let Some(frame) = lines.next().await {
            let chunk = frame.map_err(|e| RunError::Io {
                program: program.clone(),
                source: std::io::Error::other(e),
            })?;
            let text = String::from_utf8_lossy(&chunk);
            let line = text.trim_end();
            if line.trim().is_empty() {
                continue;
            }
            tracing::trace!(line, "demucs output");
            tail.push_line(line);
            if let Some(event) = tracker.observe_line(line) {
                // A closed receiver only means nobody is watching.
                let _ = progress.send(event);
            }
        }

        let status = child.wait().await.map_err(|source| RunError::Io {
            program: program.clone(),
            source,
        })?;
        let elapsed_ms = t0.elapsed().as_millis() as u64;

        if !status.success() {
            tracing::warn!(
                elapsed_ms,
                exit_code = ?status.code(),
                output = %tail.as_str(),
                "demucs: non-zero exit"
            );
            return Err(RunError::ToolFailed {
                code: status.code(),
                output: tail.into_string(),
            });
        }

        let model_name = invocation.model.model_name();
        let moved = flatten_model_dir(&invocation.output_dir, model_name)
            .await
            .map_err(|source| RunError::Normalize {
                path: invocation.output_dir.join(model_name),
                source,
            })?;

        tracing::info!(elapsed_ms, moved, "demucs: separation complete");
        let _ = progress.send(tracker.complete());
        Ok(())
    }

    /// Check that the tool can be started at all (`<program> --help`).
    pub async fn probe(&self) -> Result<(), RunError> {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.prefix_args)
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let status = tokio::time::timeout(PROBE_TIMEOUT, cmd.status())
            .await
            .map_err(|_| RunError::Spawn {
                program: self.config.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::TimedOut, "probe timed out"),
            })?
            .map_err(|source| RunError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(RunError::ToolFailed {
                code: status.code(),
                output: format!("{} --help failed", self.config.program),
            })
        }
    }
}

// No length cap: a decoder error ends the stream, leaving the pipe undrained
// and the child blocked on a full buffer.
fn line_codec() -> AnyDelimiterCodec {
    AnyDelimiterCodec::new(b"\r\n".to_vec(), Vec::new())
}

#[async_trait]
impl Separator for DemucsCli {
    async fn separate(
        &self,
        invocation: &Invocation,
        progress: ProgressSender,
    ) -> Result<(), RunError> {
        self.run(invocation, progress).await
    }

    fn name(&self) -> &str {
        "demucs-cli"
    }
}
