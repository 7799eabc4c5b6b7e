//! Prometheus metrics for separation jobs and progress streaming.
//!
//! The recorder is installed once by the binary; until then every helper
//! here is a no-op and `/metrics` answers 503.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!(
        "separation_jobs_total",
        "Separation jobs finished, by outcome"
    );
    describe_histogram!(
        "separation_duration_seconds",
        "Wall time of separation jobs in seconds, by model"
    );
    describe_gauge!(
        "progress_subscribers",
        "Currently connected progress WebSocket subscribers"
    );
    describe_counter!(
        "progress_events_total",
        "Progress events broadcast to subscribers"
    );
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Outcome label of a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed,
    Rejected,
}

impl JobOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            JobOutcome::Succeeded => "succeeded",
            JobOutcome::Failed => "failed",
            JobOutcome::Rejected => "rejected",
        }
    }
}

/// Record a finished (or rejected) separation job.
pub fn record_job(outcome: JobOutcome, model: &str, duration: Option<Duration>) {
    counter!("separation_jobs_total", "outcome" => outcome.as_str()).increment(1);
    if let Some(duration) = duration {
        histogram!("separation_duration_seconds", "model" => model.to_string())
            .record(duration.as_secs_f64());
    }
}

pub fn set_progress_subscribers(count: usize) {
    gauge!("progress_subscribers").set(count as f64);
}

pub fn record_progress_event() {
    counter!("progress_events_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_without_recorder_do_not_panic() {
        record_job(JobOutcome::Failed, "htdemucs", Some(Duration::from_millis(5)));
        record_job(JobOutcome::Rejected, "htdemucs", None);
        set_progress_subscribers(3);
        record_progress_event();
    }

    #[test]
    fn test_init_metrics_is_idempotent() {
        init_metrics();
        assert!(!init_metrics());
        record_job(JobOutcome::Succeeded, "htdemucs", Some(Duration::from_secs(2)));
        let rendered = render_metrics().unwrap();
        assert!(rendered.contains("separation_jobs_total"));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(JobOutcome::Succeeded.as_str(), "succeeded");
        assert_eq!(JobOutcome::Failed.as_str(), "failed");
        assert_eq!(JobOutcome::Rejected.as_str(), "rejected");
    }
}
