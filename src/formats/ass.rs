//! ASS/SSA parsing and rendering.
//!
//! Only `Dialogue:` events become cues. Every other line — script info,
//! styles, the events `Format:` line, `Comment:` events — is carried
//! through verbatim so the written file differs from the input only in
//! dialogue timestamps.

use anyhow::{Context, Result, bail};
use lazy_static::lazy_static;
use regex::Regex;

use crate::cue::{Cue, CueMetadata};

use super::{HeaderData, SubtitleFile};

lazy_static! {
    static ref OVERRIDE_TAGS: Regex = Regex::new(r"\{[^}]*\}").expect("override tag pattern");
}

/// Field order used when an `[Events]` section has no `Format:` line.
const DEFAULT_FIELDS: [&str; 10] = [
    "layer", "start", "end", "style", "name", "marginl", "marginr", "marginv", "effect", "text",
];

pub fn parse(input: &str) -> Result<SubtitleFile> {
    let mut header_lines = Vec::new();
    let mut fields: Vec<String> = DEFAULT_FIELDS.iter().map(|s| s.to_string()).collect();
    let mut in_events = false;
    let mut saw_events_section = false;
    let mut cues = Vec::new();

    for line in input.trim_start_matches('\u{feff}').lines() {
        let line = line.trim_end_matches('\r');
        let trimmed = line.trim();

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            in_events = trimmed.to_lowercase().contains("events");
            saw_events_section |= in_events;
            header_lines.push(line.to_string());
            continue;
        }

        if !in_events {
            header_lines.push(line.to_string());
            continue;
        }

        let lowered = trimmed.to_lowercase();
        if lowered.starts_with("format:") {
            fields = trimmed["format:".len()..]
                .split(',')
                .map(|field| field.trim().to_lowercase())
                .collect();
            header_lines.push(line.to_string());
            continue;
        }

        if lowered.starts_with("dialogue:") {
            match parse_dialogue(trimmed, &fields, cues.len()) {
                Ok(Some(cue)) => cues.push(cue),
                // Unparseable or empty events survive as passthrough.
                Ok(None) | Err(_) => header_lines.push(line.to_string()),
            }
            continue;
        }

        header_lines.push(line.to_string());
    }

    if !saw_events_section {
        bail!("no [Events] section found");
    }
    if cues.is_empty() {
        bail!("no dialogue events found");
    }

    cues.sort_by(|a, b| a.start.total_cmp(&b.start));
    for (i, cue) in cues.iter_mut().enumerate() {
        cue.index = i;
    }

    Ok(SubtitleFile {
        format: super::Format::Ass,
        header: HeaderData::Ass {
            lines: header_lines,
            fields,
        },
        cues,
    })
}

fn parse_dialogue(line: &str, fields: &[String], next_index: usize) -> Result<Option<Cue>> {
    let body = &line["dialogue:".len()..];
    // The text field is last and may contain commas.
    let values: Vec<&str> = body.splitn(fields.len(), ',').collect();
    if values.len() < fields.len() {
        bail!("dialogue line has {} of {} fields", values.len(), fields.len());
    }

    let start = parse_timestamp(field_value(fields, &values, "start"))
        .with_context(|| format!("bad start timestamp '{}'", field_value(fields, &values, "start")))?;
    let end = parse_timestamp(field_value(fields, &values, "end"))
        .with_context(|| format!("bad end timestamp '{}'", field_value(fields, &values, "end")))?;

    // Text keeps its leading whitespace; only the named fields are trimmed.
    let raw_text = fields
        .iter()
        .position(|f| f == "text")
        .map(|i| values[i])
        .unwrap_or("")
        .to_string();

    let cue = Cue::new(
        next_index,
        start,
        end,
        display_text(&raw_text),
        CueMetadata::Ass {
            raw_text,
            layer: field_value(fields, &values, "layer").to_string(),
            style: field_value(fields, &values, "style").to_string(),
            name: field_value(fields, &values, "name").to_string(),
            margin_l: field_value(fields, &values, "marginl").to_string(),
            margin_r: field_value(fields, &values, "marginr").to_string(),
            margin_v: field_value(fields, &values, "marginv").to_string(),
            effect: field_value(fields, &values, "effect").to_string(),
        },
    );

    Ok(cue.is_valid().then_some(cue))
}

fn field_value<'a>(fields: &[String], values: &[&'a str], name: &str) -> &'a str {
    fields
        .iter()
        .position(|f| f == name)
        .map(|i| values[i].trim())
        .unwrap_or("")
}

pub fn render(header: &HeaderData, cues: &[Cue]) -> String {
    let (lines, fields) = match header {
        HeaderData::Ass { lines, fields } => (lines.as_slice(), fields.as_slice()),
        _ => (&[] as &[String], &[] as &[String]),
    };

    let mut out = String::new();
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }

    let fields: Vec<String> = if fields.is_empty() {
        DEFAULT_FIELDS.iter().map(|s| s.to_string()).collect()
    } else {
        fields.to_vec()
    };

    for cue in cues {
        out.push_str("Dialogue: ");
        let values: Vec<String> = fields
            .iter()
            .map(|field| dialogue_field(cue, field))
            .collect();
        out.push_str(&values.join(","));
        out.push('\n');
    }

    out
}

fn dialogue_field(cue: &Cue, field: &str) -> String {
    let meta = match &cue.metadata {
        CueMetadata::Ass {
            raw_text,
            layer,
            style,
            name,
            margin_l,
            margin_r,
            margin_v,
            effect,
        } => Some((raw_text, layer, style, name, margin_l, margin_r, margin_v, effect)),
        _ => None,
    };

    match field {
        "start" => format_timestamp(cue.start),
        "end" => format_timestamp(cue.end),
        "text" => meta
            .map(|(raw_text, ..)| raw_text.clone())
            .unwrap_or_else(|| cue.text.clone()),
        "layer" | "marked" => meta
            .map(|(_, layer, ..)| layer.clone())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "0".to_string()),
        "style" => meta
            .map(|(_, _, style, ..)| style.clone())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "Default".to_string()),
        "name" => meta.map(|(_, _, _, name, ..)| name.clone()).unwrap_or_default(),
        "marginl" => meta
            .map(|(_, _, _, _, l, ..)| l.clone())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "0".to_string()),
        "marginr" => meta
            .map(|(_, _, _, _, _, r, ..)| r.clone())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "0".to_string()),
        "marginv" => meta
            .map(|(_, _, _, _, _, _, v, _)| v.clone())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "0".to_string()),
        "effect" => meta
            .map(|(_, _, _, _, _, _, _, effect)| effect.clone())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Strip `{\…}` override tags and normalize ASS escapes for counting.
fn display_text(raw: &str) -> String {
    let text = OVERRIDE_TAGS.replace_all(raw, "");
    let text = text.replace("\\N", "\n").replace("\\n", " ").replace("\\h", " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `H:MM:SS.cc` (centiseconds) to seconds.
fn parse_timestamp(value: &str) -> Result<f64> {
    let parts: Vec<&str> = value.split([':', '.']).collect();
    if parts.len() != 4 {
        bail!("timestamp '{value}' must be H:MM:SS.cc");
    }

    let hours: u64 = parts[0].parse().context("invalid hours")?;
    let minutes: u64 = parts[1].parse().context("invalid minutes")?;
    let seconds: u64 = parts[2].parse().context("invalid seconds")?;
    let centis: u64 = parts[3].parse().context("invalid centiseconds")?;

    Ok((hours * 3600 + minutes * 60 + seconds) as f64 + centis as f64 / 100.0)
}

fn format_timestamp(seconds: f64) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let cs = total_cs % 100;
    let total_secs = total_cs / 100;
    format!(
        "{}:{:02}:{:02}.{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60,
        cs
    )
}
