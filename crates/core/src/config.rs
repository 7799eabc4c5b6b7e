// crates/core/src/config.rs
//! Service configuration.
//!
//! Loaded from TOML; every field has a compiled default so an absent or
//! partial file is fine. Command-line flags and environment variables are
//! layered on top by the server binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::tail::DEFAULT_TAIL_CHARS;
use crate::types::ModelChoice;

/// Default port, matching the desktop front-end's expectations.
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub tool: ToolConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on concurrent `/ws/progress` subscribers.
    pub max_subscribers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            max_subscribers: 64,
        }
    }
}

/// How the external separation tool is invoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Executable to spawn.
    pub program: String,
    /// Arguments placed before the generated ones, e.g. `["-m", "demucs"]`
    /// when `program` is a Python interpreter.
    pub prefix_args: Vec<String>,
    pub default_model: ModelChoice,
    /// Pass `--float32` so WAV output is written as 32-bit float.
    pub float32: bool,
    /// File name reported as the residual for every stem.
    pub residual_file_name: String,
    /// Characters of console output kept for failure reports.
    pub tail_chars: usize,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: "demucs".into(),
            prefix_args: Vec::new(),
            default_model: ModelChoice::Htdemucs,
            float32: false,
            residual_file_name: "no_vocals.wav".into(),
            tail_chars: DEFAULT_TAIL_CHARS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}' (expected pretty or json)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub format: LogFormat,
    /// When set, logs are also written to daily-rolling files here.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,stemsplit_server=debug,stemsplit_core=debug".into(),
            format: LogFormat::Pretty,
            directory: None,
        }
    }
}

impl ServiceConfig {
    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// `<config_dir>/stemsplit/config.toml`, e.g. `~/.config/stemsplit/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("stemsplit").join("config.toml"))
    }

    /// Load `explicit` when given (missing file is an error), else the
    /// default path when it exists, else compiled defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.tool.program, "demucs");
        assert_eq!(config.tool.default_model, ModelChoice::Htdemucs);
        assert_eq!(config.tool.residual_file_name, "no_vocals.wav");
        assert_eq!(config.tool.tail_chars, 500);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServiceConfig::from_toml(
            r#"
            [server]
            port = 9100

            [tool]
            program = "python3"
            prefix_args = ["-m", "demucs"]
            default_model = "mdx_extra_q"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.tool.program, "python3");
        assert_eq!(config.tool.prefix_args, vec!["-m", "demucs"]);
        assert_eq!(config.tool.default_model, ModelChoice::MdxExtraQ);
        assert!(!config.tool.float32);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(ServiceConfig::from_toml("[server]\nport = \"high\"").is_err());
    }

    #[test]
    fn test_load_explicit_missing_file_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ServiceConfig::load(Some(&tmp.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_explicit_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[logging]\nformat = \"json\"\n").unwrap();
        let config = ServiceConfig::load(Some(&path)).unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    }
}
