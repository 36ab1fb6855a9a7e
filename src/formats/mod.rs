//! Subtitle file formats.
//!
//! One module per format, each with a `parse` and a `render` half. Cues
//! keep their original markup in metadata so rendering changes timestamps
//! and nothing else.

pub mod ass;
pub mod srt;
pub mod vtt;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::cue::Cue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Srt,
    Vtt,
    Ass,
}

impl Format {
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "srt" => Some(Format::Srt),
            "vtt" | "webvtt" => Some(Format::Vtt),
            "ass" | "ssa" => Some(Format::Ass),
            _ => None,
        }
    }

    /// Guess the format from file content. VTT is checked before SRT
    /// because both use `-->` timing arrows.
    pub fn sniff(content: &str) -> Option<Self> {
        let mut head_len = content.len().min(1024);
        while !content.is_char_boundary(head_len) {
            head_len -= 1;
        }
        let head = &content[..head_len];
        if head.trim_start().starts_with("WEBVTT") {
            return Some(Format::Vtt);
        }
        if content.contains("[Script Info]") || content.contains("[Events]") {
            return Some(Format::Ass);
        }
        if head.contains("-->") {
            return Some(Format::Srt);
        }
        None
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Srt => "srt",
            Format::Vtt => "vtt",
            Format::Ass => "ass",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Srt => "SRT (SubRip)",
            Format::Vtt => "WebVTT",
            Format::Ass => "ASS (Advanced SubStation Alpha)",
        }
    }
}

/// Per-format document state that lives outside the cues: everything a
/// writer needs to reproduce the parts of the file the pipeline never
/// touches.
#[derive(Debug, Clone)]
pub enum HeaderData {
    None,
    /// Raw WEBVTT header block plus NOTE/STYLE/REGION blocks, in order.
    Vtt { blocks: Vec<String> },
    /// Raw lines up to and including the events `Format:` line, plus any
    /// non-dialogue event lines, and the dialogue field order.
    Ass {
        lines: Vec<String>,
        fields: Vec<String>,
    },
}

/// A parsed subtitle document: cues for the pipeline, header for the
/// writer.
#[derive(Debug, Clone)]
pub struct SubtitleFile {
    pub format: Format,
    pub header: HeaderData,
    pub cues: Vec<Cue>,
}

impl SubtitleFile {
    /// Serialize with the given cues in place of the parsed ones. The
    /// cues' metadata must come from this file for markup to round-trip.
    pub fn render(&self, cues: &[Cue]) -> String {
        match self.format {
            Format::Srt => srt::render(cues),
            Format::Vtt => vtt::render(&self.header, cues),
            Format::Ass => ass::render(&self.header, cues),
        }
    }
}

pub fn parse_str(content: &str, format: Format) -> Result<SubtitleFile> {
    match format {
        Format::Srt => srt::parse(content),
        Format::Vtt => vtt::parse(content),
        Format::Ass => ass::parse(content),
    }
}

/// Read and parse a subtitle file, detecting the format from the
/// extension first and the content second.
pub fn parse_file(path: &Path) -> Result<SubtitleFile> {
    let bytes =
        fs::read(path).with_context(|| format!("reading subtitle file {}", path.display()))?;
    let content = String::from_utf8_lossy(&bytes);

    let format = match Format::from_extension(path).or_else(|| Format::sniff(&content)) {
        Some(format) => format,
        None => bail!("unrecognized subtitle format: {}", path.display()),
    };

    parse_str(&content, format)
        .with_context(|| format!("parsing {} as {}", path.display(), format.name()))
}

pub fn write_file(file: &SubtitleFile, cues: &[Cue], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {}", parent.display()))?;
        }
    }
    fs::write(path, file.render(cues))
        .with_context(|| format!("writing subtitle file {}", path.display()))
}

/// Milliseconds-precision timestamp parsing shared by SRT and VTT:
/// `HH:MM:SS,mmm`, `HH:MM:SS.mmm` or `MM:SS.mmm`.
pub(crate) fn parse_clock_timestamp(value: &str) -> Result<f64> {
    let cleaned = value.trim().replace(',', ".");
    let (time_part, fraction) = match cleaned.split_once('.') {
        Some((time, frac)) => (time, frac),
        None => (cleaned.as_str(), "0"),
    };

    let pieces: Vec<&str> = time_part.split(':').collect();
    let (hours, minutes, seconds) = match pieces.as_slice() {
        [h, m, s] => (
            h.trim()
                .parse::<u64>()
                .with_context(|| format!("invalid hours in timestamp '{value}'"))?,
            m.parse::<u64>()
                .with_context(|| format!("invalid minutes in timestamp '{value}'"))?,
            s.parse::<u64>()
                .with_context(|| format!("invalid seconds in timestamp '{value}'"))?,
        ),
        [m, s] => (
            0,
            m.trim()
                .parse::<u64>()
                .with_context(|| format!("invalid minutes in timestamp '{value}'"))?,
            s.parse::<u64>()
                .with_context(|| format!("invalid seconds in timestamp '{value}'"))?,
        ),
        _ => bail!("timestamp '{value}' must be MM:SS.mmm or HH:MM:SS.mmm"),
    };

    let mut millis_digits = fraction.to_string();
    while millis_digits.len() < 3 {
        millis_digits.push('0');
    }
    let millis = millis_digits[..3]
        .parse::<u64>()
        .with_context(|| format!("invalid fraction in timestamp '{value}'"))?;

    Ok((hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
}

/// Decompose seconds into (hours, minutes, seconds, milliseconds) with
/// round-half-up millisecond precision.
pub(crate) fn split_millis(seconds: f64) -> (u64, u64, u64, u64) {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    (total_secs / 3600, (total_secs % 3600) / 60, total_secs % 60, ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn extension_detection_covers_aliases() {
        assert_eq!(
            Format::from_extension(&PathBuf::from("movie.srt")),
            Some(Format::Srt)
        );
        assert_eq!(
            Format::from_extension(&PathBuf::from("movie.WEBVTT")),
            Some(Format::Vtt)
        );
        assert_eq!(
            Format::from_extension(&PathBuf::from("movie.ssa")),
            Some(Format::Ass)
        );
        assert_eq!(Format::from_extension(&PathBuf::from("movie.mkv")), None);
    }

    #[test]
    fn sniffing_prefers_vtt_over_srt() {
        assert_eq!(
            Format::sniff("WEBVTT\n\n00:01.000 --> 00:02.000\nHi\n"),
            Some(Format::Vtt)
        );
        assert_eq!(
            Format::sniff("1\n00:00:01,000 --> 00:00:02,000\nHi\n"),
            Some(Format::Srt)
        );
        assert_eq!(Format::sniff("[Script Info]\nTitle: x\n"), Some(Format::Ass));
        assert_eq!(Format::sniff("plain prose"), None);
    }

    #[test]
    fn clock_timestamps_parse_both_separators() {
        assert!((parse_clock_timestamp("00:00:01,500").unwrap() - 1.5).abs() < 1e-9);
        assert!((parse_clock_timestamp("00:00:01.500").unwrap() - 1.5).abs() < 1e-9);
        assert!((parse_clock_timestamp("01:30.250").unwrap() - 90.25).abs() < 1e-9);
        assert!((parse_clock_timestamp("01:02:03.004").unwrap() - 3723.004).abs() < 1e-9);
        assert!(parse_clock_timestamp("nonsense").is_err());
    }

    #[test]
    fn millis_split_rounds_cleanly() {
        assert_eq!(split_millis(3723.004), (1, 2, 3, 4));
        assert_eq!(split_millis(0.9995), (0, 0, 1, 0));
        assert_eq!(split_millis(10.75), (0, 0, 10, 750));
    }
}
