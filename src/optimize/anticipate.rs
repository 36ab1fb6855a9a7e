//! Pass 3: start cues earlier when the preceding gap has room.
//!
//! Only the start moves; the end is untouched, so the shift converts dead
//! air into display time. Each cue is measured against its already-shifted
//! predecessor, which keeps the sweep cascade-free.

use crate::cue::Cue;

use super::config::OptimizeConfig;
use super::stats::OptimizeStats;

/// Shifts smaller than this are not worth the visual churn.
const MIN_BENEFIT_SECS: f64 = 0.1;

pub fn anticipate_starts(
    cues: &[Cue],
    config: &OptimizeConfig,
    stats: &mut OptimizeStats,
) -> Vec<Cue> {
    let mut anticipated: Vec<Cue> = Vec::with_capacity(cues.len());

    for cue in cues {
        let previous = anticipated.last();
        match shifted(cue, previous, config) {
            Some((shifted_cue, offset)) => {
                stats.record_anticipation(offset);
                anticipated.push(shifted_cue);
            }
            None => anticipated.push(cue.clone()),
        }
    }

    anticipated
}

fn shifted(cue: &Cue, previous: Option<&Cue>, config: &OptimizeConfig) -> Option<(Cue, f64)> {
    // Corrupt cues ride through untouched for the validation pass.
    if cue.duration() <= 0.0 {
        return None;
    }

    let max_offset = match previous {
        None => config.max_anticipation,
        Some(prev) => ((cue.start - prev.end) - config.min_gap).max(0.0),
    };
    if max_offset <= 0.0 {
        return None;
    }

    let offset = max_offset.min(config.max_anticipation);
    if !is_beneficial(cue, offset, config) {
        return None;
    }

    let candidate = cue.with_start(cue.start - offset);
    if !shift_is_safe(cue, &candidate, previous, config) {
        return None;
    }

    Some((candidate, offset))
}

fn is_beneficial(cue: &Cue, offset: f64, config: &OptimizeConfig) -> bool {
    if offset < MIN_BENEFIT_SECS {
        return false;
    }

    // A cue already at its reading-speed ideal (unclamped) and above the
    // duration floor gains nothing from starting earlier.
    let ideal = cue.char_count() as f64 / config.chars_per_sec;
    if cue.duration() >= ideal && cue.duration() >= config.min_duration {
        return false;
    }

    true
}

fn shift_is_safe(
    original: &Cue,
    candidate: &Cue,
    previous: Option<&Cue>,
    config: &OptimizeConfig,
) -> bool {
    if candidate.start < 0.0 {
        return false;
    }
    if candidate.start >= candidate.end {
        return false;
    }
    if candidate.duration() <= original.duration() {
        return false;
    }
    if let Some(prev) = previous {
        if candidate.start - prev.end < config.min_gap {
            return false;
        }
    }
    true
}
