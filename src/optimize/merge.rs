//! Optional pre-pass: unify duplicate and continuation cues.
//!
//! Runs before the duration pass and only when `merge_duplicates` is set.
//! Two adjacent cues merge when their normalized text is identical and
//! they overlap or sit within half a second of each other, or when they
//! overlap heavily and one text continues the other.

use crate::cue::{Cue, strip_markup};

use super::stats::OptimizeStats;

/// Identical-text cues this close together are one event split by the
/// encoder.
const DUPLICATE_GAP_SECS: f64 = 0.5;

pub fn merge_duplicates(cues: &[Cue], stats: &mut OptimizeStats) -> Vec<Cue> {
    let mut merged: Vec<Cue> = Vec::with_capacity(cues.len());
    let mut i = 0;

    while i < cues.len() {
        let mut group = vec![cues[i].clone()];
        let mut j = i + 1;

        while j < cues.len() {
            let last = group.last().expect("group is never empty");
            if should_merge(last, &cues[j]) {
                group.push(cues[j].clone());
                j += 1;
            } else {
                break;
            }
        }

        if group.len() > 1 {
            stats.merged_cues += group.len() - 1;
            merged.push(merge_group(&group));
        } else {
            merged.push(group.remove(0));
        }

        i = j;
    }

    merged
}

fn should_merge(current: &Cue, next: &Cue) -> bool {
    let current_text = normalize(&current.text);
    let next_text = normalize(&next.text);

    if !current_text.is_empty() && current_text == next_text {
        let gap = next.start - current.end;
        if gap <= DUPLICATE_GAP_SECS {
            return true;
        }
    }

    if current.end > next.start {
        let overlap = current.end - next.start;
        let shorter = current.duration().min(next.duration());
        if overlap > shorter * 0.5
            && (current_text.contains(&next_text)
                || next_text.contains(&current_text)
                || is_continuation(&current_text, &next_text))
        {
            return true;
        }
    }

    false
}

fn normalize(text: &str) -> String {
    strip_markup(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// True when `next` picks up where `current` left off (shared boundary
/// words), which is how retail streams encode rolling captions.
fn is_continuation(current: &str, next: &str) -> bool {
    if current.is_empty() || next.is_empty() {
        return false;
    }

    let trimmed = current.trim_end_matches(['.', ',', '!', '?', ';', ':', ' ']);
    let head: Vec<&str> = trimmed.split_whitespace().collect();
    let tail: Vec<&str> = next.split_whitespace().collect();

    if head.len() >= 2 && tail.len() >= 2 && head[head.len() - 2..] == tail[..2] {
        return true;
    }

    head.last() == tail.first()
}

fn merge_group(group: &[Cue]) -> Cue {
    let start = group
        .iter()
        .map(|cue| cue.start)
        .fold(f64::INFINITY, f64::min);
    let end = group
        .iter()
        .map(|cue| cue.end)
        .fold(f64::NEG_INFINITY, f64::max);

    let first = &group[0];
    Cue::new(first.index, start, end, pick_text(group), first.metadata.clone())
}

fn pick_text(group: &[Cue]) -> String {
    let normalized: Vec<String> = group.iter().map(|cue| normalize(&cue.text)).collect();

    if normalized.iter().all(|text| *text == normalized[0]) {
        return group[0].text.clone();
    }

    // When one rendition subsumes the rest, keep it whole.
    let longest_idx = (0..group.len())
        .max_by_key(|&i| normalized[i].chars().count())
        .unwrap_or(0);
    let longest = &normalized[longest_idx];
    if normalized
        .iter()
        .all(|text| longest.contains(text.as_str()) || text.contains(longest.as_str()))
    {
        return group[longest_idx].text.clone();
    }

    let mut seen = Vec::new();
    let mut parts = Vec::new();
    for (cue, norm) in group.iter().zip(&normalized) {
        if !norm.is_empty() && !seen.contains(norm) {
            parts.push(cue.text.trim().to_string());
            seen.push(norm.clone());
        }
    }
    parts.join("\n")
}
