//! SRT (SubRip) parsing and rendering.

use anyhow::{Context, Result, bail};

use crate::cue::{Cue, CueMetadata, strip_markup};

use super::{HeaderData, SubtitleFile, parse_clock_timestamp, split_millis};

pub fn parse(input: &str) -> Result<SubtitleFile> {
    let mut cues = Vec::new();
    let mut lines = input.lines().peekable();

    while let Some(line) = lines.next() {
        let index_line = line.trim().trim_start_matches('\u{feff}');
        if index_line.is_empty() {
            continue;
        }

        // The numeric index line is sometimes omitted; when the first line
        // of a block already carries the arrow it is the timing line.
        let times = if index_line.contains("-->") {
            index_line
        } else {
            lines
                .next()
                .map(str::trim)
                .context("subtitle block is missing its timing line")?
        };

        let (start_raw, end_raw) = times
            .split_once("-->")
            .map(|(a, b)| (a.trim(), b.trim()))
            .context("timing line must contain '-->'")?;

        let start = parse_clock_timestamp(start_raw)
            .with_context(|| format!("bad start timestamp '{start_raw}'"))?;
        let end = parse_clock_timestamp(end_raw)
            .with_context(|| format!("bad end timestamp '{end_raw}'"))?;

        let mut text_lines = Vec::new();
        while let Some(next) = lines.peek() {
            if next.trim().is_empty() {
                break;
            }
            text_lines.push(lines.next().unwrap_or_default().to_string());
        }

        while let Some(next) = lines.peek() {
            if next.trim().is_empty() {
                lines.next();
            } else {
                break;
            }
        }

        let raw_text = text_lines.join("\n");
        let cue = Cue::new(
            cues.len(),
            start,
            end,
            display_text(&raw_text),
            CueMetadata::Srt { raw_text },
        );

        // Broken entries are dropped here rather than poisoning the run.
        if cue.is_valid() {
            cues.push(cue);
        }
    }

    if cues.is_empty() {
        bail!("no valid subtitles found");
    }

    cues.sort_by(|a, b| a.start.total_cmp(&b.start));
    for (i, cue) in cues.iter_mut().enumerate() {
        cue.index = i;
    }

    Ok(SubtitleFile {
        format: super::Format::Srt,
        header: HeaderData::None,
        cues,
    })
}

pub fn render(cues: &[Cue]) -> String {
    let mut out = String::new();

    for (i, cue) in cues.iter().enumerate() {
        out.push_str(&(i + 1).to_string());
        out.push('\n');
        out.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(cue.start),
            format_timestamp(cue.end)
        ));
        let text = match &cue.metadata {
            CueMetadata::Srt { raw_text } => raw_text.as_str(),
            _ => cue.text.as_str(),
        };
        out.push_str(text);
        out.push_str("\n\n");
    }

    out
}

/// Markup-stripped text with line structure intact.
fn display_text(raw: &str) -> String {
    raw.lines()
        .map(strip_markup)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn format_timestamp(seconds: f64) -> String {
    let (h, m, s, ms) = split_millis(seconds);
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}
