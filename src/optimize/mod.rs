//! Timing optimization pipeline.
//!
//! Four passes run in a fixed order over an immutable snapshot of the
//! input: duration extension, pair rebalancing, anticipation, constraint
//! validation. An overlap registry computed from the original timing is
//! threaded through so deliberate overlaps survive, and a statistics
//! record collects what happened for reporting.

pub mod anticipate;
pub mod config;
pub mod duration;
pub mod merge;
pub mod overlaps;
pub mod rebalance;
pub mod stats;
pub mod validate;

pub use config::{ConfigError, Defaults, OptimizeConfig};
pub use overlaps::OverlapRegistry;
pub use stats::OptimizeStats;

use crate::cue::Cue;

/// Result of one pipeline run: the retimed cues plus everything the
/// passes recorded about themselves.
#[derive(Debug, Clone)]
pub struct OptimizeOutcome {
    pub cues: Vec<Cue>,
    pub stats: OptimizeStats,
}

/// Run the full pipeline over `cues`.
///
/// The configuration is validated up front; an invalid one is the only
/// error this function returns. An empty input yields an empty outcome
/// with zeroed statistics.
pub fn optimize(
    cues: &[Cue],
    config: &OptimizeConfig,
    track_index: usize,
) -> Result<OptimizeOutcome, ConfigError> {
    config.validate()?;

    let mut stats = OptimizeStats::new(track_index);

    if cues.is_empty() {
        return Ok(OptimizeOutcome {
            cues: Vec::new(),
            stats,
        });
    }

    stats.original_count = cues.len();
    stats.start_timing();

    // The registry reads the input's original timing; every later pass
    // operates on the in-progress sequence only.
    let registry = OverlapRegistry::detect(cues);

    let current = if config.merge_duplicates {
        merge::merge_duplicates(cues, &mut stats)
    } else {
        cues.to_vec()
    };

    let current = duration::extend_durations(&current, config, &mut stats, &registry);
    let current = rebalance::rebalance_pairs(&current, config, &mut stats);
    let current = anticipate::anticipate_starts(&current, config, &mut stats);
    let current = validate::enforce_constraints(&current, config, &mut stats, &registry);

    stats.final_count = current.len();
    stats.stop_timing();

    Ok(OptimizeOutcome {
        cues: current,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::CueMetadata;

    fn cue(index: usize, start: f64, end: f64, text: &str) -> Cue {
        Cue::new(index, start, end, text, CueMetadata::Plain)
    }

    fn run(cues: &[Cue]) -> OptimizeOutcome {
        optimize(cues, &OptimizeConfig::default(), 0).expect("default config is valid")
    }

    #[test]
    fn invalid_config_fails_before_the_pipeline() {
        let config = OptimizeConfig {
            chars_per_sec: 100.0,
            ..Default::default()
        };
        assert!(optimize(&[cue(0, 0.0, 1.0, "x")], &config, 0).is_err());
    }

    #[test]
    fn empty_input_yields_empty_outcome() {
        let outcome = run(&[]);
        assert!(outcome.cues.is_empty());
        assert_eq!(outcome.stats.original_count, 0);
        assert_eq!(outcome.stats.total_modifications(), 0);
    }

    #[test]
    fn lone_short_cue_extends_to_min_duration() {
        let outcome = run(&[cue(0, 10.0, 10.3, "Hi")]);
        assert_eq!(outcome.cues.len(), 1);
        assert!((outcome.cues[0].start - 10.0).abs() < 1e-9);
        assert!((outcome.cues[0].end - 11.0).abs() < 1e-9);
    }

    #[test]
    fn extension_respects_the_following_cue() {
        let outcome = run(&[cue(0, 10.0, 10.3, "Hi"), cue(1, 10.8, 12.0, "Next")]);
        assert!((outcome.cues[0].end - 10.75).abs() < 1e-9);
        assert!((outcome.cues[1].start - outcome.cues[0].end - 0.05).abs() < 1e-9);
    }

    #[test]
    fn duration_pass_preempts_rebalancing() {
        // The duration pass already lifts the first cue to 1.0s, so the
        // rebalance pair never forms and the long cue keeps its timing.
        let outcome = run(&[
            cue(0, 10.0, 10.5, "Short"),
            cue(1, 12.0, 16.0, "Much longer line"),
        ]);
        assert!((outcome.cues[0].start - 10.0).abs() < 1e-9);
        assert!((outcome.cues[0].end - 11.0).abs() < 1e-9);
        assert!((outcome.cues[1].start - 12.0).abs() < 1e-9);
        assert!((outcome.cues[1].end - 16.0).abs() < 1e-9);
        assert_eq!(outcome.stats.rebalanced_pairs, 0);
    }

    #[test]
    fn cramped_cue_anticipates_across_a_gap() {
        // Cue 1 cannot reach the duration floor by extending (cue 2 is in
        // the way), so it claims the gap behind it instead: the duration
        // pass yields [12.0, 12.45], anticipation moves the start to 11.5,
        // and validation lifts the result to the floor.
        let outcome = run(&[
            cue(0, 10.0, 11.0, "A"),
            cue(1, 12.0, 12.4, "B"),
            cue(2, 12.5, 14.0, "C"),
        ]);
        assert!((outcome.cues[1].start - 11.5).abs() < 1e-9);
        assert!((outcome.cues[1].start - outcome.cues[0].end - 0.5).abs() < 1e-9);
        assert!(outcome.cues[1].duration() >= 1.0 - 1e-9);
        assert_eq!(outcome.stats.anticipated_cues, 1);
    }

    #[test]
    fn satisfied_cue_is_not_anticipated() {
        // The duration pass lifts cue 1 to the floor; a cue at its target
        // gains nothing from starting earlier and stays put.
        let outcome = run(&[cue(0, 10.0, 11.0, "A"), cue(1, 12.0, 12.4, "B")]);
        assert!((outcome.cues[1].start - 12.0).abs() < 1e-9);
        assert!((outcome.cues[1].end - 13.0).abs() < 1e-9);
        assert_eq!(outcome.stats.anticipated_cues, 0);
    }

    #[test]
    fn original_overlap_survives_the_whole_pipeline() {
        let outcome = run(&[
            cue(0, 10.0, 13.0, "Speaker A"),
            cue(1, 12.0, 14.0, "Speaker B"),
        ]);
        assert_eq!(outcome.cues.len(), 2);
        // Validation must not push cue 1 out to 13.05.
        assert!(outcome.cues[1].start <= outcome.cues[0].end + 1e-9);
        assert_eq!(outcome.stats.gap_repairs, 0);
    }

    #[test]
    fn corrupt_cue_is_the_only_removal() {
        let outcome = run(&[
            cue(0, 0.0, 1.5, "Fine"),
            cue(1, 5.0, 5.0, "Zero width"),
            cue(2, 8.0, 9.5, "Also fine"),
        ]);
        assert_eq!(outcome.cues.len(), 2);
        assert_eq!(outcome.stats.removed_invalid, 1);
        let texts: Vec<&str> = outcome.cues.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Fine", "Also fine"]);
    }

    #[test]
    fn texts_form_a_subsequence_of_the_input() {
        let input = vec![
            cue(0, 0.0, 0.4, "One"),
            cue(1, 2.0, 7.0, "Two, a rather long-running cue"),
            cue(2, 8.0, 8.2, "Three"),
            cue(3, 9.0, 9.8, "Four"),
        ];
        let outcome = run(&input);
        let in_texts: Vec<&str> = input.iter().map(|c| c.text.as_str()).collect();
        let out_texts: Vec<&str> = outcome.cues.iter().map(|c| c.text.as_str()).collect();

        let mut cursor = 0;
        for text in &out_texts {
            let found = in_texts[cursor..]
                .iter()
                .position(|t| t == text)
                .expect("output text must appear in input order");
            cursor += found + 1;
        }
    }

    #[test]
    fn output_is_chronologically_ordered_with_gaps() {
        let input = vec![
            cue(0, 0.0, 0.3, "Alpha"),
            cue(1, 0.6, 0.8, "Beta"),
            cue(2, 2.0, 6.3, "Gamma is a long cue with plenty of text"),
            cue(3, 7.0, 7.2, "Delta"),
        ];
        let outcome = run(&input);
        let registry = OverlapRegistry::detect(&input);
        for (i, pair) in outcome.cues.windows(2).enumerate() {
            assert!(pair[0].start <= pair[1].start + 1e-9);
            if !registry.allows(i, i + 1) {
                assert!(pair[1].start - pair[0].end >= 0.05 - 1e-6);
            }
        }
        for cue in &outcome.cues {
            assert!(cue.start >= 0.0);
            assert!(cue.end > cue.start);
        }
    }

    #[test]
    fn pipeline_is_deterministic() {
        let input = vec![
            cue(0, 0.0, 0.3, "Alpha"),
            cue(1, 0.4, 0.6, "Beta text that runs on"),
            cue(2, 0.9, 5.2, "Gamma"),
        ];
        let first = run(&input);
        let second = run(&input);
        assert_eq!(first.cues, second.cues);
        assert_eq!(
            first.stats.total_modifications(),
            second.stats.total_modifications()
        );
    }

    #[test]
    fn durations_never_shrink_without_cause() {
        let input = vec![
            cue(0, 0.0, 0.5, "First"),
            cue(1, 1.0, 2.5, "Second cue with text"),
            cue(2, 4.0, 5.0, "Third"),
        ];
        let outcome = run(&input);
        for (before, after) in input.iter().zip(&outcome.cues) {
            assert!(after.duration() >= before.duration() - 1e-9);
        }
    }

    #[test]
    fn merge_flag_unifies_duplicates_before_the_passes() {
        let config = OptimizeConfig {
            merge_duplicates: true,
            ..Default::default()
        };
        let input = vec![
            cue(0, 10.0, 11.0, "Repeated line"),
            cue(1, 11.2, 12.0, "Repeated line"),
            cue(2, 14.0, 15.5, "Different line"),
        ];
        let outcome = optimize(&input, &config, 0).expect("valid config");
        assert_eq!(outcome.cues.len(), 2);
        assert_eq!(outcome.stats.merged_cues, 1);

        // Default config leaves them alone.
        let untouched = run(&input);
        assert_eq!(untouched.cues.len(), 3);
        assert_eq!(untouched.stats.merged_cues, 0);
    }
}
