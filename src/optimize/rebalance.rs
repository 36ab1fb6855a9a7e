//! Pass 2: move display time from a long cue to the short cue before it.
//!
//! One left-to-right sweep; when a transfer succeeds the updated right
//! member becomes the left member of the next pair, so no fixed-point
//! iteration is needed.

use crate::cue::Cue;

use super::config::OptimizeConfig;
use super::stats::OptimizeStats;

pub fn rebalance_pairs(
    cues: &[Cue],
    config: &OptimizeConfig,
    stats: &mut OptimizeStats,
) -> Vec<Cue> {
    if cues.len() < 2 {
        return cues.to_vec();
    }

    let mut rebalanced = cues.to_vec();

    for i in 0..rebalanced.len() - 1 {
        if let Some((new_current, new_next, transfer)) =
            rebalance_pair(&rebalanced[i], &rebalanced[i + 1], config)
        {
            stats.record_transfer(transfer);
            rebalanced[i] = new_current;
            rebalanced[i + 1] = new_next;
        }
    }

    rebalanced
}

fn rebalance_pair(
    current: &Cue,
    next: &Cue,
    config: &OptimizeConfig,
) -> Option<(Cue, Cue, f64)> {
    // Corrupt cues ride through untouched for the validation pass.
    if current.duration() <= 0.0 || next.duration() <= 0.0 {
        return None;
    }

    let is_current_short = current.duration() < config.short_threshold;
    let is_next_long = next.duration() > config.long_threshold;
    if !is_current_short || !is_next_long {
        return None;
    }

    let deficit = config.short_threshold - current.duration();
    let surplus = next.duration() - config.long_threshold;
    let transfer = deficit.min(surplus);
    if transfer <= 0.0 {
        return None;
    }

    let new_current_end = current.end + transfer;
    let new_next_start = new_current_end + config.min_gap;

    // Transfer would swallow the donor entirely.
    if new_next_start >= next.end {
        return None;
    }

    let new_current = current.with_end(new_current_end);
    let new_next = next.with_start(new_next_start);

    if !transfer_is_safe(current, &new_current, &new_next, config) {
        return None;
    }

    Some((new_current, new_next, transfer))
}

fn transfer_is_safe(
    original_current: &Cue,
    new_current: &Cue,
    new_next: &Cue,
    config: &OptimizeConfig,
) -> bool {
    if new_current.start >= new_current.end || new_next.start >= new_next.end {
        return false;
    }

    let gap = new_next.start - new_current.end;
    if gap < config.min_gap {
        return false;
    }

    // The receiver must actually benefit.
    if new_current.duration() <= original_current.duration() {
        return false;
    }

    // The donor must stay displayable.
    if new_next.duration() < config.min_duration {
        return false;
    }

    // Do not leave the donor shorter than the receiver originally was:
    // that would just flip the imbalance.
    if new_next.duration() < original_current.duration() {
        return false;
    }

    true
}
