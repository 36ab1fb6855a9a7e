//! Pass 1: extend display durations toward the reading-speed target.
//!
//! Each cue is stretched toward `char_count / chars_per_sec`, clamped to
//! `[min_duration, max_duration]`, and bounded by the next cue. Starts are
//! never moved and a cue is never shortened.

use crate::cue::Cue;

use super::config::OptimizeConfig;
use super::overlaps::OverlapRegistry;
use super::stats::OptimizeStats;

pub fn extend_durations(
    cues: &[Cue],
    config: &OptimizeConfig,
    stats: &mut OptimizeStats,
    registry: &OverlapRegistry,
) -> Vec<Cue> {
    let mut adjusted = Vec::with_capacity(cues.len());

    for (i, cue) in cues.iter().enumerate() {
        let next = cues.get(i + 1);
        let overlap_allowed = next.is_some() && registry.allows(i, i + 1);
        let extended = extend_one(cue, next, config, overlap_allowed);

        stats.record_duration_change(extended.duration() - cue.duration());
        adjusted.push(extended);
    }

    adjusted
}

fn extend_one(
    cue: &Cue,
    next: Option<&Cue>,
    config: &OptimizeConfig,
    overlap_allowed: bool,
) -> Cue {
    // A non-positive duration means the cue arrived corrupt; extending it
    // would masquerade as a repair. The validation pass owns that case.
    if cue.duration() <= 0.0 {
        return cue.clone();
    }

    let ideal = cue.char_count() as f64 / config.chars_per_sec;
    let target = ideal.clamp(config.min_duration, config.max_duration);

    let upper_bound = match next {
        // A registered overlap may keep its envelope: the cue can grow up
        // to the next cue's end, not beyond it.
        Some(next) if overlap_allowed => next.end - cue.start,
        Some(next) => (next.start - config.min_gap) - cue.start,
        None => f64::INFINITY,
    };

    let new_duration = target.min(upper_bound);
    let final_duration = new_duration.max(cue.duration());

    if final_duration <= 0.0 {
        return cue.clone();
    }

    cue.with_end(cue.start + final_duration)
}
