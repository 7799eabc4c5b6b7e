// crates/core/src/types.rs
//! Request, result and event types shared by the runner and the server.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A stem the separation tool can isolate in two-stem mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stem {
    Vocals,
    Drums,
    Bass,
    Other,
}

impl Stem {
    pub const ALL: [Stem; 4] = [Stem::Vocals, Stem::Drums, Stem::Bass, Stem::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stem::Vocals => "vocals",
            Stem::Drums => "drums",
            Stem::Bass => "bass",
            Stem::Other => "other",
        }
    }

    /// File name the tool writes for this stem.
    pub fn file_name(&self) -> String {
        format!("{}.wav", self.as_str())
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stem::ALL
            .iter()
            .copied()
            .find(|stem| stem.as_str() == s)
            .ok_or_else(|| format!("unknown stem '{s}' (expected vocals, drums, bass or other)"))
    }
}

/// The two pre-trained models the service exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelChoice {
    /// Hybrid transformer model, the tool's default.
    #[default]
    #[serde(rename = "htdemucs")]
    Htdemucs,
    /// Older quantized bag of models, kept for lower-end machines.
    #[serde(rename = "mdx_extra_q")]
    MdxExtraQ,
}

impl ModelChoice {
    /// Identifier passed to the tool's `-n` flag; also the name of the
    /// directory it nests results under.
    pub fn model_name(&self) -> &'static str {
        match self {
            ModelChoice::Htdemucs => "htdemucs",
            ModelChoice::MdxExtraQ => "mdx_extra_q",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_name())
    }
}

impl FromStr for ModelChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "htdemucs" => Ok(ModelChoice::Htdemucs),
            "mdx_extra_q" => Ok(ModelChoice::MdxExtraQ),
            other => Err(format!(
                "unknown model '{other}' (expected htdemucs or mdx_extra_q)"
            )),
        }
    }
}

/// Body of `POST /separate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeparationRequest {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    #[serde(alias = "track")]
    pub stem: Stem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelChoice>,
}

/// Paths reported back once a separation succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeparationOutput {
    pub output_file_track: PathBuf,
    pub output_file_instrumental: PathBuf,
}

/// One progress update, 0-100. Serialized as `{"progress": n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "progress")]
    pub value: u8,
}

impl ProgressEvent {
    pub const COMPLETE: ProgressEvent = ProgressEvent { value: 100 };

    /// Returns `None` for values above 100.
    pub fn new(value: u8) -> Option<Self> {
        (value <= 100).then_some(Self { value })
    }
}
