//! Container probing via ffprobe.
//!
//! Lists the subtitle streams of a video container so the extractor knows
//! what to pull. Only text-based tracks are eligible for optimization;
//! image tracks (PGS, VobSub) are reported and skipped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use duct::cmd;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("ffprobe not found; install FFmpeg or pass --ffprobe-path")]
    FfprobeMissing,
    #[error("video file not found: {0}")]
    VideoMissing(PathBuf),
    #[error("ffprobe failed: {0}")]
    FfprobeFailed(String),
    #[error("failed to parse ffprobe output: {0}")]
    BadOutput(#[from] serde_json::Error),
}

/// One subtitle stream inside a container.
#[derive(Debug, Clone)]
pub struct SubtitleTrack {
    /// Absolute stream index, usable with `-map 0:<index>`.
    pub index: usize,
    pub codec: String,
    pub language: Option<String>,
    pub title: Option<String>,
    pub default: bool,
    pub forced: bool,
}

impl SubtitleTrack {
    pub fn is_text_based(&self) -> bool {
        matches!(
            self.codec.to_lowercase().as_str(),
            "subrip" | "srt" | "ass" | "ssa" | "webvtt" | "vtt" | "mov_text" | "text"
                | "subviewer" | "microdvd"
        )
    }

    /// Extension of the file this track extracts to.
    pub fn extraction_extension(&self) -> &'static str {
        match self.codec.to_lowercase().as_str() {
            "ass" | "ssa" => "ass",
            "webvtt" | "vtt" => "vtt",
            // mov_text and friends are converted to SRT on extraction.
            _ => "srt",
        }
    }

    pub fn describe(&self) -> String {
        let mut parts = vec![format!("track {} [{}]", self.index, self.codec)];
        if let Some(language) = &self.language {
            parts.push(format!("({language})"));
        }
        if let Some(title) = &self.title {
            parts.push(format!("\"{title}\""));
        }
        if self.default {
            parts.push("default".to_string());
        }
        if self.forced {
            parts.push("forced".to_string());
        }
        parts.join(" ")
    }
}

#[derive(Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Deserialize)]
struct FfprobeStream {
    index: usize,
    #[serde(default)]
    codec_name: Option<String>,
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    disposition: HashMap<String, i64>,
}

/// Locate the ffprobe binary, honoring an explicit override.
pub fn find_ffprobe(custom: Option<&Path>) -> Result<PathBuf, ProbeError> {
    match custom {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(_) => Err(ProbeError::FfprobeMissing),
        None => which::which("ffprobe").map_err(|_| ProbeError::FfprobeMissing),
    }
}

/// List every subtitle stream in `video`, text-based or not.
pub fn probe_subtitle_tracks(
    ffprobe: &Path,
    video: &Path,
) -> Result<Vec<SubtitleTrack>, ProbeError> {
    if !video.is_file() {
        return Err(ProbeError::VideoMissing(video.to_path_buf()));
    }

    let output = cmd!(
        ffprobe,
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_streams",
        "-select_streams",
        "s",
        video
    )
    .stderr_capture()
    .stdout_capture()
    .unchecked()
    .run()
    .map_err(|e| ProbeError::FfprobeFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ProbeError::FfprobeFailed(if stderr.is_empty() {
            format!("exit status {:?}", output.status.code())
        } else {
            stderr
        }));
    }

    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    let tracks = parsed
        .streams
        .into_iter()
        .filter(|stream| stream.codec_type.as_deref() == Some("subtitle"))
        .map(|stream| SubtitleTrack {
            index: stream.index,
            codec: stream.codec_name.unwrap_or_else(|| "unknown".to_string()),
            language: stream
                .tags
                .get("language")
                .or_else(|| stream.tags.get("lang"))
                .cloned(),
            title: stream.tags.get("title").cloned(),
            default: stream.disposition.get("default").copied() == Some(1),
            forced: stream.disposition.get("forced").copied() == Some(1),
        })
        .collect();

    Ok(tracks)
}
