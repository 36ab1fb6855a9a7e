//! Subtitle track extraction via ffmpeg.

use std::path::{Path, PathBuf};

use duct::cmd;
use tempfile::TempPath;
use thiserror::Error;

use crate::probe::SubtitleTrack;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("ffmpeg not found; install FFmpeg or pass --ffmpeg-path")]
    FfmpegMissing,
    #[error("failed to create scratch file: {0}")]
    TempFile(#[from] std::io::Error),
    #[error("ffmpeg failed on track {track}: {message}")]
    FfmpegFailed { track: usize, message: String },
    #[error("extraction of track {0} produced no output")]
    EmptyOutput(usize),
}

/// Locate the ffmpeg binary, honoring an explicit override.
pub fn find_ffmpeg(custom: Option<&Path>) -> Result<PathBuf, ExtractError> {
    match custom {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(_) => Err(ExtractError::FfmpegMissing),
        None => which::which("ffmpeg").map_err(|_| ExtractError::FfmpegMissing),
    }
}

/// Extract one subtitle track into a scratch file.
///
/// The returned `TempPath` deletes the file when dropped; keep it alive
/// for as long as the extracted track is being read.
pub fn extract_track(
    ffmpeg: &Path,
    video: &Path,
    track: &SubtitleTrack,
) -> Result<TempPath, ExtractError> {
    let scratch = tempfile::Builder::new()
        .prefix("subpace_")
        .suffix(&format!(".{}", track.extraction_extension()))
        .tempfile()?
        .into_temp_path();

    // mov_text and plain text have no standalone file form; everything
    // else is copied without re-encoding.
    let codec_arg = match track.codec.to_lowercase().as_str() {
        "mov_text" | "text" => "srt",
        _ => "copy",
    };

    let scratch_path: &Path = &scratch;
    let output = cmd!(
        ffmpeg,
        "-y",
        "-v",
        "error",
        "-i",
        video,
        "-map",
        format!("0:{}", track.index),
        "-c:s",
        codec_arg,
        scratch_path
    )
    .stderr_capture()
    .stdout_capture()
    .unchecked()
    .run()
    .map_err(|e| ExtractError::FfmpegFailed {
        track: track.index,
        message: e.to_string(),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ExtractError::FfmpegFailed {
            track: track.index,
            message: if stderr.is_empty() {
                format!("exit status {:?}", output.status.code())
            } else {
                stderr
            },
        });
    }

    let size = std::fs::metadata(&scratch).map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return Err(ExtractError::EmptyOutput(track.index));
    }

    Ok(scratch)
}
