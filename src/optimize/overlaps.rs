use std::collections::HashSet;

use crate::cue::Cue;

/// Adjacent index pairs whose *original* timing overlaps.
///
/// Computed once from the input sequence before any pass runs, then
/// consulted read-only so intentional overlaps (dual speakers, karaoke
/// layers) survive gap enforcement.
#[derive(Debug, Clone, Default)]
pub struct OverlapRegistry {
    pairs: HashSet<(usize, usize)>,
}

impl OverlapRegistry {
    pub fn detect(cues: &[Cue]) -> Self {
        let mut pairs = HashSet::new();
        for (i, window) in cues.windows(2).enumerate() {
            if window[0].end > window[1].start {
                pairs.insert((i, i + 1));
            }
        }
        Self { pairs }
    }

    pub fn allows(&self, left: usize, right: usize) -> bool {
        self.pairs.contains(&(left, right))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
