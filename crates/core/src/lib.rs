// crates/core/src/lib.rs
//! Core of the stem-separation service: request types, progress parsing,
//! output layout reconciliation and the Demucs subprocess runner.

pub mod config;
pub mod demucs;
pub mod error;
pub mod layout;
pub mod progress;
pub mod separator;
pub mod tail;
pub mod types;

pub use config::*;
pub use demucs::DemucsCli;
pub use error::*;
pub use layout::{expected_outputs, flatten_model_dir, track_name};
pub use progress::{parse_progress_line, ProgressTracker};
pub use separator::*;
pub use tail::OutputTail;
pub use types::*;
