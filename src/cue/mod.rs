//! Cue model shared by the parsers, the optimization pipeline and the
//! writers.
//!
//! A cue is immutable once constructed; passes that need to retime one
//! build a copy with `with_start`/`with_end`/`with_times`. Text and
//! metadata travel unchanged so writers can round-trip the original
//! markup.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ANGLE_TAGS: Regex = Regex::new(r"<[^>]*>").expect("angle tag pattern");
    static ref BRACE_TAGS: Regex = Regex::new(r"\{[^}]*\}").expect("brace tag pattern");
}

/// Format-specific payload carried through the pipeline untouched.
///
/// The optimization passes never look inside this; only the writers do,
/// to restore the original markup and positioning fields.
#[derive(Debug, Clone, PartialEq)]
pub enum CueMetadata {
    Srt {
        raw_text: String,
    },
    Vtt {
        raw_text: String,
        identifier: Option<String>,
        settings: Option<String>,
    },
    Ass {
        raw_text: String,
        layer: String,
        style: String,
        name: String,
        margin_l: String,
        margin_r: String,
        margin_v: String,
        effect: String,
    },
    /// No format attached (programmatic cues, tests).
    Plain,
}

/// One displayable subtitle event. Times are seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    /// Ordinal from the source file; diagnostics only, never rewritten.
    pub index: usize,
    pub start: f64,
    pub end: f64,
    /// Display text with markup stripped, line breaks preserved.
    pub text: String,
    pub metadata: CueMetadata,
}

impl Cue {
    pub fn new(
        index: usize,
        start: f64,
        end: f64,
        text: impl Into<String>,
        metadata: CueMetadata,
    ) -> Self {
        Self {
            index,
            start,
            end,
            text: text.into(),
            metadata,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Count of displayable characters: markup of the form `<…>` and `{…}`
    /// is stripped, surrounding whitespace trimmed. Feeds the reading-speed
    /// budget.
    pub fn char_count(&self) -> usize {
        strip_markup(&self.text).chars().count()
    }

    pub fn with_start(&self, start: f64) -> Self {
        Self {
            start,
            ..self.clone()
        }
    }

    pub fn with_end(&self, end: f64) -> Self {
        Self {
            end,
            ..self.clone()
        }
    }

    pub fn with_times(&self, start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            ..self.clone()
        }
    }

    /// Structural validity: non-negative start, positive duration,
    /// non-empty trimmed text.
    pub fn is_valid(&self) -> bool {
        self.start >= 0.0 && self.end > self.start && !self.text.trim().is_empty()
    }
}

/// Remove `<…>` and `{…}` style markup and trim the result.
pub fn strip_markup(text: &str) -> String {
    let without_angle = ANGLE_TAGS.replace_all(text, "");
    let without_brace = BRACE_TAGS.replace_all(&without_angle, "");
    without_brace.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(start: f64, end: f64, text: &str) -> Cue {
        Cue::new(0, start, end, text, CueMetadata::Plain)
    }

    #[test]
    fn duration_is_end_minus_start() {
        let cue = plain(10.0, 12.5, "Hello");
        assert!((cue.duration() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn char_count_strips_markup_and_trims() {
        let cue = plain(0.0, 1.0, " <i>Hello</i> {\\an8}world ");
        assert_eq!(cue.char_count(), "Hello world".chars().count());
    }

    #[test]
    fn char_count_counts_code_points() {
        let cue = plain(0.0, 1.0, "héllo");
        assert_eq!(cue.char_count(), 5);
    }

    #[test]
    fn with_times_leaves_original_untouched() {
        let cue = plain(1.0, 2.0, "A");
        let moved = cue.with_times(0.5, 3.0);
        assert_eq!(cue.start, 1.0);
        assert_eq!(cue.end, 2.0);
        assert_eq!(moved.start, 0.5);
        assert_eq!(moved.end, 3.0);
        assert_eq!(moved.text, cue.text);
    }

    #[test]
    fn validity_rejects_bad_structure() {
        assert!(plain(0.0, 1.0, "ok").is_valid());
        assert!(!plain(-0.1, 1.0, "negative start").is_valid());
        assert!(!plain(2.0, 2.0, "zero duration").is_valid());
        assert!(!plain(2.0, 1.0, "inverted").is_valid());
        assert!(!plain(0.0, 1.0, "   ").is_valid());
    }
}
