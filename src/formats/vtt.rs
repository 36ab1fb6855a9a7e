//! WebVTT parsing and rendering.

use anyhow::{Context, Result, bail};
use lazy_static::lazy_static;
use regex::Regex;

use crate::cue::{Cue, CueMetadata};

use super::{HeaderData, SubtitleFile, parse_clock_timestamp, split_millis};

lazy_static! {
    static ref VOICE_TAGS: Regex = Regex::new(r"</?v[^>]*>").expect("voice tag pattern");
    static ref CLASS_TAGS: Regex = Regex::new(r"</?c[^>]*>").expect("class tag pattern");
    static ref STYLE_TAGS: Regex = Regex::new(r"</?[ibu]>").expect("style tag pattern");
    static ref TIME_TAGS: Regex =
        Regex::new(r"<\d{2}:\d{2}:\d{2}\.\d{3}>").expect("timestamp tag pattern");
    static ref RUBY_TAGS: Regex = Regex::new(r"</?(ruby|rt|lang[^>]*)>").expect("ruby tag pattern");
}

pub fn parse(input: &str) -> Result<SubtitleFile> {
    let normalized = input
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");
    let blocks: Vec<&str> = normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .collect();

    let mut header_blocks = Vec::new();
    let mut cues = Vec::new();

    for (position, block) in blocks.iter().enumerate() {
        if position == 0 && block.starts_with("WEBVTT") {
            header_blocks.push((*block).to_string());
            continue;
        }

        let first = block.lines().next().unwrap_or_default();
        if first.starts_with("NOTE") || first.starts_with("STYLE") || first.starts_with("REGION") {
            header_blocks.push((*block).to_string());
            continue;
        }

        // A malformed block loses that cue, not the file.
        if let Ok(Some(cue)) = parse_cue_block(block, cues.len()) {
            cues.push(cue);
        }
    }

    if cues.is_empty() {
        bail!("no valid captions found");
    }

    cues.sort_by(|a, b| a.start.total_cmp(&b.start));
    for (i, cue) in cues.iter_mut().enumerate() {
        cue.index = i;
    }

    Ok(SubtitleFile {
        format: super::Format::Vtt,
        header: HeaderData::Vtt {
            blocks: header_blocks,
        },
        cues,
    })
}

fn parse_cue_block(block: &str, next_index: usize) -> Result<Option<Cue>> {
    let lines: Vec<&str> = block.lines().collect();
    let Some(timing_pos) = lines.iter().position(|line| line.contains("-->")) else {
        // Stray prose between cues; WebVTT says skip it.
        return Ok(None);
    };

    let identifier = if timing_pos == 1 {
        Some(lines[0].trim().to_string())
    } else {
        None
    };

    let timing_line = lines[timing_pos];
    let (start_raw, rest) = timing_line
        .split_once("-->")
        .context("timing line must contain '-->'")?;
    let rest = rest.trim();
    let (end_raw, settings) = match rest.split_once(char::is_whitespace) {
        Some((end, settings)) => (end, Some(settings.trim().to_string())),
        None => (rest, None),
    };

    let start = parse_clock_timestamp(start_raw)
        .with_context(|| format!("bad start timestamp '{}'", start_raw.trim()))?;
    let end =
        parse_clock_timestamp(end_raw).with_context(|| format!("bad end timestamp '{end_raw}'"))?;

    let raw_text = lines[timing_pos + 1..].join("\n");
    let cue = Cue::new(
        next_index,
        start,
        end,
        display_text(&raw_text),
        CueMetadata::Vtt {
            raw_text,
            identifier,
            settings,
        },
    );

    Ok(cue.is_valid().then_some(cue))
}

pub fn render(header: &HeaderData, cues: &[Cue]) -> String {
    let mut out = String::new();

    let blocks: &[String] = match header {
        HeaderData::Vtt { blocks } => blocks,
        _ => &[],
    };
    if blocks.first().map(|b| b.starts_with("WEBVTT")) != Some(true) {
        out.push_str("WEBVTT\n\n");
    }
    for block in blocks {
        out.push_str(block);
        out.push_str("\n\n");
    }

    for cue in cues {
        let (raw_text, identifier, settings) = match &cue.metadata {
            CueMetadata::Vtt {
                raw_text,
                identifier,
                settings,
            } => (raw_text.as_str(), identifier.as_deref(), settings.as_deref()),
            _ => (cue.text.as_str(), None, None),
        };

        if let Some(identifier) = identifier {
            out.push_str(identifier);
            out.push('\n');
        }
        out.push_str(&format_timestamp(cue.start));
        out.push_str(" --> ");
        out.push_str(&format_timestamp(cue.end));
        if let Some(settings) = settings {
            out.push(' ');
            out.push_str(settings);
        }
        out.push('\n');
        out.push_str(raw_text);
        out.push_str("\n\n");
    }

    out
}

/// Strip WebVTT voice/class/style/timestamp tags and collapse whitespace.
fn display_text(raw: &str) -> String {
    let text = VOICE_TAGS.replace_all(raw, "");
    let text = CLASS_TAGS.replace_all(&text, "");
    let text = STYLE_TAGS.replace_all(&text, "");
    let text = TIME_TAGS.replace_all(&text, "");
    let text = RUBY_TAGS.replace_all(&text, "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn format_timestamp(seconds: f64) -> String {
    let (h, m, s, ms) = split_millis(seconds);
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}.{ms:03}")
    } else {
        format!("{m:02}:{s:02}.{ms:03}")
    }
}
