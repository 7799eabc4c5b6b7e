// crates/observability/src/lib.rs
//! Process-wide tracing setup for the stemsplit binaries.

use std::path::Path;

use anyhow::Context;
use stemsplit_core::{LogFormat, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Prefix of the daily-rolling log files (`stemsplit.log.2026-01-31`).
pub const LOG_FILE_PREFIX: &str = "stemsplit.log";

/// `RUST_LOG` when set, otherwise the configured directive.
pub fn build_filter(fallback: &str) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(fallback)
            .with_context(|| format!("invalid log filter '{fallback}'")),
    }
}

/// Install the global subscriber.
///
/// Console output is pretty or JSON per `config.format`. With
/// `config.directory` set, a plain-text copy goes to daily files there; keep
/// the returned guard alive for the life of the process or buffered lines are
/// lost on exit.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = build_filter(&config.filter)?;

    let (pretty, json) = match config.format {
        LogFormat::Pretty => (Some(fmt::layer().with_target(true)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_current_span(true))),
    };

    let (file, guard) = match config.directory.as_deref() {
        Some(dir) => {
            let (layer, guard) = file_layer(dir)?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .with(file)
        .try_init()
        .context("tracing subscriber already installed")?;

    Ok(guard)
}

fn file_layer<S>(
    dir: &Path,
) -> anyhow::Result<(
    fmt::Layer<S, fmt::format::DefaultFields, fmt::format::Format, tracing_appender::non_blocking::NonBlocking>,
    WorkerGuard,
)>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = fmt::layer().with_ansi(false).with_writer(writer);
    Ok((layer, guard))
}
