// crates/core/src/layout.rs
//! Output directory layout.
//!
//! The tool writes `<out>/<model>/<track>/<stem>.wav`; the service reports
//! `<out>/<track>/<stem>.wav`.

use std::io;
use std::path::{Path, PathBuf};

use crate::types::{SeparationOutput, Stem};

/// Directory name the tool uses for one input: its file name minus the
/// extension.
pub fn track_name(input_path: &Path) -> Option<String> {
    input_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}

/// Paths the service reports after a successful, normalized run.
///
/// The residual keeps one configured name for every stem: the tool's
/// two-stem mode is framed as "stem vs rest", and callers have always
/// received `no_vocals.wav` here.
pub fn expected_outputs(
    output_dir: &Path,
    track: &str,
    stem: Stem,
    residual_file_name: &str,
) -> SeparationOutput {
    let track_dir = output_dir.join(track);
    SeparationOutput {
        output_file_track: track_dir.join(stem.file_name()),
        output_file_instrumental: track_dir.join(residual_file_name),
    }
}

/// Move every directory under `<output_dir>/<model_name>/` up into
/// `<output_dir>/`, then remove the emptied model directory.
///
/// An existing `<output_dir>/<track>/` from an earlier run is replaced.
/// Returns how many directories were moved; 0 when there is no model
/// directory, so a second call is a no-op.
///
/// The model directory is first renamed to a staging name, so a track
/// named like the model (`htdemucs.mp3`) cannot replace its own source.
pub async fn flatten_model_dir(output_dir: &Path, model_name: &str) -> io::Result<usize> {
    let model_dir = output_dir.join(model_name);
    match tokio::fs::metadata(&model_dir).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Ok(0),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    }

    let staging = output_dir.join(format!(".{model_name}.flatten"));
    if tokio::fs::try_exists(&staging).await? {
        tracing::debug!(staging = %staging.display(), "removing leftover staging directory");
        remove_path(&staging).await?;
    }
    tokio::fs::rename(&model_dir, &staging).await?;

    let mut moved = 0;
    let mut entries = tokio::fs::read_dir(&staging).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let dest: PathBuf = output_dir.join(entry.file_name());
        if tokio::fs::try_exists(&dest).await? {
            tracing::debug!(dest = %dest.display(), "replacing previous separation output");
            remove_path(&dest).await?;
        }
        tokio::fs::rename(entry.path(), &dest).await?;
        moved += 1;
    }

    tokio::fs::remove_dir_all(&staging).await?;
    Ok(moved)
}

async fn remove_path(path: &Path) -> io::Result<()> {
    if tokio::fs::metadata(path).await?.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    }
}
