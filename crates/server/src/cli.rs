// crates/server/src/cli.rs
//! Command-line flags for the `stemsplit` binary.
//!
//! Every flag also reads a `STEMSPLIT_*` environment variable. Flags that
//! are left unset fall through to the TOML config, then to defaults.

use std::path::PathBuf;

use clap::Parser;
use stemsplit_core::{LogFormat, ModelChoice, ServiceConfig};

#[derive(Parser, Debug, Default)]
#[command(name = "stemsplit")]
#[command(about = "Local HTTP/WebSocket service for Demucs stem separation")]
#[command(version)]
pub struct Cli {
    /// Config file (default: <config dir>/stemsplit/config.toml when present)
    #[arg(short, long, env = "STEMSPLIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "STEMSPLIT_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "STEMSPLIT_PORT")]
    pub port: Option<u16>,

    /// Maximum concurrent progress WebSocket subscribers
    #[arg(long, env = "STEMSPLIT_MAX_SUBSCRIBERS")]
    pub max_subscribers: Option<usize>,

    /// Separation tool executable
    #[arg(long, env = "STEMSPLIT_DEMUCS")]
    pub demucs: Option<String>,

    /// Argument placed before the generated ones; repeatable
    /// (e.g. `--demucs python3 --demucs-arg=-m --demucs-arg demucs`)
    #[arg(long = "demucs-arg", allow_hyphen_values = true)]
    pub demucs_args: Vec<String>,

    /// Model used when a request does not name one
    #[arg(long, env = "STEMSPLIT_MODEL")]
    pub model: Option<ModelChoice>,

    /// Write 32-bit float WAV output
    #[arg(long, env = "STEMSPLIT_FLOAT32")]
    pub float32: bool,

    /// File name reported as the residual of every stem
    #[arg(long, env = "STEMSPLIT_RESIDUAL_NAME")]
    pub residual_name: Option<String>,

    /// Log filter directive, used when RUST_LOG is unset
    #[arg(long, env = "STEMSPLIT_LOG_FILTER")]
    pub log_filter: Option<String>,

    /// Console log format: pretty or json
    #[arg(long, env = "STEMSPLIT_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Also write daily-rolling log files to this directory
    #[arg(long, env = "STEMSPLIT_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut ServiceConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(max) = self.max_subscribers {
            config.server.max_subscribers = max;
        }
        if let Some(program) = &self.demucs {
            config.tool.program = program.clone();
        }
        if !self.demucs_args.is_empty() {
            config.tool.prefix_args = self.demucs_args.clone();
        }
        if let Some(model) = self.model {
            config.tool.default_model = model;
        }
        if self.float32 {
            config.tool.float32 = true;
        }
        if let Some(name) = &self.residual_name {
            config.tool.residual_file_name = name.clone();
        }
        if let Some(filter) = &self.log_filter {
            config.logging.filter = filter.clone();
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if let Some(dir) = &self.log_dir {
            config.logging.directory = Some(dir.clone());
        }
    }
}
