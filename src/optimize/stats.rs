use std::time::Instant;

use serde::Serialize;

/// Changes below this magnitude are noise and are not counted.
const SIGNIFICANT_SECS: f64 = 0.01;

/// Counters and magnitudes accumulated across the pipeline for one track.
///
/// The record is write-only from the passes' point of view; nothing in it
/// feeds back into optimization decisions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OptimizeStats {
    pub track_index: usize,
    pub original_count: usize,
    pub final_count: usize,

    pub merged_cues: usize,

    pub duration_adjustments: usize,
    pub total_duration_change: f64,

    pub rebalanced_pairs: usize,
    pub total_time_transferred: f64,

    pub anticipated_cues: usize,
    pub total_anticipation: f64,

    pub min_duration_repairs: usize,
    pub gap_repairs: usize,
    pub chronology_fixes: usize,
    pub removed_invalid: usize,

    /// Wall clock seconds spent in the pipeline.
    pub processing_secs: f64,
    #[serde(skip)]
    started: Option<Instant>,
}

impl OptimizeStats {
    pub fn new(track_index: usize) -> Self {
        Self {
            track_index,
            ..Default::default()
        }
    }

    pub fn start_timing(&mut self) {
        self.started = Some(Instant::now());
    }

    pub fn stop_timing(&mut self) {
        if let Some(started) = self.started.take() {
            self.processing_secs = started.elapsed().as_secs_f64();
        }
    }

    pub fn record_duration_change(&mut self, change: f64) {
        if change.abs() > SIGNIFICANT_SECS {
            self.duration_adjustments += 1;
            self.total_duration_change += change;
        }
    }

    pub fn record_transfer(&mut self, transfer: f64) {
        if transfer > SIGNIFICANT_SECS {
            self.rebalanced_pairs += 1;
            self.total_time_transferred += transfer;
        }
    }

    pub fn record_anticipation(&mut self, offset: f64) {
        if offset > SIGNIFICANT_SECS {
            self.anticipated_cues += 1;
            self.total_anticipation += offset;
        }
    }

    pub fn avg_duration_change(&self) -> f64 {
        if self.duration_adjustments == 0 {
            0.0
        } else {
            self.total_duration_change / self.duration_adjustments as f64
        }
    }

    pub fn avg_anticipation(&self) -> f64 {
        if self.anticipated_cues == 0 {
            0.0
        } else {
            self.total_anticipation / self.anticipated_cues as f64
        }
    }

    pub fn total_modifications(&self) -> usize {
        self.merged_cues
            + self.duration_adjustments
            + self.rebalanced_pairs
            + self.anticipated_cues
            + self.min_duration_repairs
            + self.gap_repairs
            + self.chronology_fixes
    }

    pub fn modification_percentage(&self) -> f64 {
        if self.original_count == 0 {
            0.0
        } else {
            self.total_modifications() as f64 / self.original_count as f64 * 100.0
        }
    }
}
