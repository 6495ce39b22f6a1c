use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::metrics::{calculate_accuracy, calculate_consistency, calculate_raw_wpm, calculate_wpm};
use crate::session::{Session, TestMode};
use crate::time_series::{wpm_series, Sample};

/// Immutable snapshot of a finished test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub timestamp: DateTime<Local>,
    pub mode: TestMode,
    pub duration_secs: Option<u32>,
    pub word_count: usize,
    pub wpm: u32,
    pub raw_wpm: u32,
    pub accuracy: u32,
    pub consistency: u32,
    pub correct_chars: usize,
    pub incorrect_chars: usize,
    pub extra_chars: usize,
    pub elapsed_secs: f64,
    pub best_streak: u32,
    pub samples: Vec<Sample>,
    /// the word stream the test was typed against, replayed by ghosts
    pub words: Vec<String>,
    pub is_personal_best: bool,
}

impl TestResult {
    /// Build the snapshot; the personal-best flag is left to the caller.
    pub fn from_session(session: &Session, elapsed_secs: f64, timestamp: DateTime<Local>) -> Self {
        let counters = session.counters();
        let config = session.config();
        Self {
            timestamp,
            mode: config.mode,
            duration_secs: config.duration_secs,
            word_count: config.word_count,
            wpm: calculate_wpm(counters.correct, elapsed_secs),
            raw_wpm: calculate_raw_wpm(counters.total(), elapsed_secs),
            accuracy: calculate_accuracy(counters.correct, counters.incorrect, counters.extra),
            consistency: calculate_consistency(&wpm_series(session.samples())),
            correct_chars: counters.correct,
            incorrect_chars: counters.incorrect,
            extra_chars: counters.extra,
            elapsed_secs,
            best_streak: session.best_streak(),
            samples: session.samples().to_vec(),
            words: session.words().to_vec(),
            is_personal_best: false,
        }
    }

    /// Personal bests are compared within mode + duration for timed tests
    /// and mode + word count for everything else.
    pub fn same_configuration(&self, other: &TestResult) -> bool {
        if self.mode != other.mode {
            return false;
        }
        match self.mode {
            TestMode::Time => self.duration_secs == other.duration_secs,
            _ => self.word_count == other.word_count,
        }
    }

    pub fn total_chars(&self) -> usize {
        self.correct_chars + self.incorrect_chars + self.extra_chars
    }

    /// Short label such as `time 30s` or `words 25`
    pub fn configuration_label(&self) -> String {
        match (self.mode, self.duration_secs) {
            (TestMode::Time, Some(secs)) => format!("{} {}s", self.mode, secs),
            (TestMode::Zen, _) => self.mode.to_string(),
            _ => format!("{} {}", self.mode, self.word_count),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A result with the given headline numbers and a flat sample timeline.
    pub fn result(mode: TestMode, duration_secs: Option<u32>, word_count: usize, wpm: u32) -> TestResult {
        TestResult {
            timestamp: Local::now(),
            mode,
            duration_secs,
            word_count,
            wpm,
            raw_wpm: wpm,
            accuracy: 100,
            consistency: 100,
            correct_chars: 0,
            incorrect_chars: 0,
            extra_chars: 0,
            elapsed_secs: duration_secs.unwrap_or(30) as f64,
            best_streak: 0,
            samples: vec![Sample::new(1.0, wpm as f64, 0)],
            words: vec!["word".to_string(); 10],
            is_personal_best: false,
        }
    }
}
