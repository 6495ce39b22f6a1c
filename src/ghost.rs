//! Replay of a previous result's pacing.
//!
//! A result only keeps per-second `(t, wpm)` samples, so the replay turns
//! each sample back into a cumulative character count (`wpm * t / 12`),
//! interpolates between the samples around the requested time and walks
//! the reference word list to find where the ghost cursor would be.

use std::cmp::Ordering;

use crate::result::TestResult;
use crate::time_series::Sample;

/// Where the ghost is at a given moment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostPosition {
    pub word_index: usize,
    pub char_index: usize,
    /// interpolated characters typed so far, separators included
    pub chars: f64,
    pub wpm: f64,
    pub is_active: bool,
}

impl GhostPosition {
    fn inactive() -> Self {
        Self {
            word_index: 0,
            char_index: 0,
            chars: 0.0,
            wpm: 0.0,
            is_active: false,
        }
    }
}

/// Live typist relative to the ghost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    Ahead,
    Level,
    Behind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ghost {
    samples: Vec<Sample>,
    words: Vec<String>,
}

impl Ghost {
    pub fn new(samples: Vec<Sample>, words: Vec<String>) -> Self {
        Self { samples, words }
    }

    pub fn from_result(result: &TestResult) -> Self {
        Self::new(result.samples.clone(), result.words.clone())
    }

    /// A ghost needs words to walk and a sane, increasing timeline.
    pub fn is_active(&self) -> bool {
        !self.words.is_empty()
            && !self.samples.is_empty()
            && self
                .samples
                .iter()
                .all(|s| s.t.is_finite() && s.wpm.is_finite() && s.t >= 0.0 && s.wpm >= 0.0)
            && self.samples.windows(2).all(|pair| pair[0].t < pair[1].t)
    }

    /// Reconstruct the ghost cursor `t` seconds into a live session.
    pub fn position_at(&self, t: f64) -> GhostPosition {
        if !self.is_active() || !t.is_finite() || t < 0.0 {
            return GhostPosition::inactive();
        }
        let (chars, wpm) = interpolate(&self.samples, t);
        let (word_index, char_index) = locate(&self.words, chars);
        GhostPosition {
            word_index,
            char_index,
            chars,
            wpm,
            is_active: true,
        }
    }

    /// Compare a live typist with the ghost at `t`; `None` when inactive.
    ///
    /// `live_offset` is how far into its own stream the typist is, one
    /// separator counted per finished word (see `Session::char_offset`).
    /// Offsets are compared rather than cursors, so the verdict holds even
    /// when the live words differ from the reference words.
    pub fn compare_at(&self, t: f64, live_offset: usize) -> Option<Pace> {
        let ghost = self.position_at(t);
        if !ghost.is_active {
            return None;
        }
        let ghost_offset = offset_of(&self.words, ghost.word_index, ghost.char_index);
        Some(match live_offset.cmp(&ghost_offset) {
            Ordering::Greater => Pace::Ahead,
            Ordering::Equal => Pace::Level,
            Ordering::Less => Pace::Behind,
        })
    }
}

/// Cumulative characters and displayed WPM at `t`.
///
/// Before the first sample the series is anchored at `(0, 0)`; after the
/// last one it holds, with no extrapolation. `samples` must be non-empty
/// and increasing in `t`.
fn interpolate(samples: &[Sample], t: f64) -> (f64, f64) {
    let anchor = Sample::new(0.0, 0.0, 0);
    let Some(upper_idx) = samples.iter().position(|s| s.t >= t) else {
        let last = samples[samples.len() - 1];
        return (last.cumulative_chars(), last.wpm);
    };
    let upper = samples[upper_idx];
    let lower = if upper_idx == 0 {
        anchor
    } else {
        samples[upper_idx - 1]
    };

    if upper.t <= lower.t {
        return (upper.cumulative_chars(), upper.wpm);
    }
    let ratio = (t - lower.t) / (upper.t - lower.t);
    let chars = lower.cumulative_chars() + (upper.cumulative_chars() - lower.cumulative_chars()) * ratio;
    let wpm = lower.wpm + (upper.wpm - lower.wpm) * ratio;
    (chars, wpm)
}

/// Translate a character count into a cursor, each word consuming its
/// length plus one separator. Counts past the end stop on the last word.
fn locate(words: &[String], chars: f64) -> (usize, usize) {
    let mut remaining = chars.max(0.0).floor() as usize;
    for (idx, word) in words.iter().enumerate() {
        let len = word.chars().count();
        if remaining <= len {
            return (idx, remaining);
        }
        remaining -= len + 1;
    }
    let last = words.len() - 1;
    (last, words[last].chars().count())
}

fn offset_of(words: &[String], word_index: usize, char_index: usize) -> usize {
    words
        .iter()
        .take(word_index)
        .map(|w| w.chars().count() + 1)
        .sum::<usize>()
        + char_index
}
