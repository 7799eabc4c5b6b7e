// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while validating a separation request's input file.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Input file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Input file is not readable: {path}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl InputError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Unreadable {
                path,
                source: Some(source),
            },
        }
    }
}

/// Errors raised by a separation run (spawning the tool, reading it,
/// reconciling its output layout).
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read output of {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Demucs failed with code {}. Output: {output}", display_code(.code))]
    ToolFailed { code: Option<i32>, output: String },

    #[error("Failed to normalize output directory {path}: {source}")]
    Normalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "<terminated by signal>".to_string(),
    }
}

impl RunError {
    /// Exit code of the external tool, when the run got that far.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ToolFailed { code, .. } => *code,
            _ => None,
        }
    }
}

/// Errors raised while loading service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_io_classification() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = InputError::io("/music/song.mp3", io_err);
        assert!(matches!(err, InputError::NotFound { .. }));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = InputError::io("/music/song.mp3", io_err);
        assert!(matches!(err, InputError::Unreadable { .. }));
    }

    #[test]
    fn test_input_error_display() {
        let err = InputError::not_found("/music/song.mp3");
        assert!(err.to_string().contains("not found"));
        assert!(err.to_string().contains("/music/song.mp3"));
    }

    #[test]
    fn test_tool_failed_message_carries_code_and_output() {
        let err = RunError::ToolFailed {
            code: Some(1),
            output: "CUDA error: out of memory".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("code 1"));
        assert!(msg.contains("CUDA error"));
        assert_eq!(err.exit_code(), Some(1));
    }

    #[test]
    fn test_tool_failed_by_signal() {
        let err = RunError::ToolFailed {
            code: None,
            output: String::new(),
        };
        assert!(err.to_string().contains("terminated by signal"));
        assert_eq!(err.exit_code(), None);
    }
}
