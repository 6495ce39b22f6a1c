use std::time::Instant;

use chrono::Local;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::history::History;
use crate::input::InputAction;
use crate::metrics::calculate_wpm;
use crate::result::TestResult;
use crate::time_series::{is_sample_due, Sample};

/// How a test decides it is over
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TestMode {
    /// ends when the nominal duration has elapsed
    Time,
    /// ends on the last character of the last word
    Words,
    /// like words, over a quote's text
    Quote,
    /// never ends on its own
    Zen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub mode: TestMode,
    pub duration_secs: Option<u32>,
    pub word_count: usize,
}

impl SessionConfig {
    pub fn time(duration_secs: u32) -> Self {
        Self {
            mode: TestMode::Time,
            duration_secs: Some(duration_secs),
            word_count: 0,
        }
    }

    pub fn words(word_count: usize) -> Self {
        Self {
            mode: TestMode::Words,
            duration_secs: None,
            word_count,
        }
    }

    pub fn quote(word_count: usize) -> Self {
        Self {
            mode: TestMode::Quote,
            duration_secs: None,
            word_count,
        }
    }

    pub fn zen() -> Self {
        Self {
            mode: TestMode::Zen,
            duration_secs: None,
            word_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Running,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharClass {
    Correct,
    Incorrect,
    /// typed past the end of the target word
    Extra,
}

/// Classify `typed` entered at `position` of `target`.
///
/// Used both when a character is typed and when it is deleted, so the
/// counter touched by a delete is always the one the type incremented.
pub fn classify(position: usize, typed: char, target: &str) -> CharClass {
    match target.chars().nth(position) {
        Some(expected) if expected == typed => CharClass::Correct,
        Some(_) => CharClass::Incorrect,
        None => CharClass::Extra,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub correct: usize,
    pub incorrect: usize,
    pub extra: usize,
}

impl Counters {
    fn add(&mut self, class: CharClass) {
        match class {
            CharClass::Correct => self.correct += 1,
            CharClass::Incorrect => self.incorrect += 1,
            CharClass::Extra => self.extra += 1,
        }
    }

    fn remove(&mut self, class: CharClass) {
        match class {
            CharClass::Correct => self.correct -= 1,
            CharClass::Incorrect => self.incorrect -= 1,
            CharClass::Extra => self.extra -= 1,
        }
    }

    pub fn total(&self) -> usize {
        self.correct + self.incorrect + self.extra
    }

    pub fn errors(&self) -> usize {
        self.incorrect + self.extra
    }
}

/// One accepted keypress, kept for the key heatmap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keystroke {
    /// `None` for extra characters typed past the word
    pub expected: Option<char>,
    pub typed: char,
    pub class: CharClass,
}

/// What a single input did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Ignored,
    Typed(CharClass),
    Deleted,
    Advanced,
    /// advance pressed on the final word; the caller should finish the test
    FinishRequested,
}

/// One typing attempt, from the first keystroke to finish or reset
#[derive(Debug, Clone)]
pub struct Session {
    config: SessionConfig,
    words: Vec<String>,
    typed: Vec<Vec<char>>,
    word_index: usize,
    char_index: usize,
    counters: Counters,
    streak: u32,
    best_streak: u32,
    samples: Vec<Sample>,
    keystrokes: Vec<Keystroke>,
    status: SessionStatus,
    started_at: Option<Instant>,
    errors_at_last_sample: usize,
}

impl Session {
    /// `words` must not be empty.
    pub fn new(config: SessionConfig, words: Vec<String>) -> Self {
        assert!(!words.is_empty(), "a session needs at least one word");
        let typed = vec![Vec::new(); words.len()];
        Self {
            config,
            words,
            typed,
            word_index: 0,
            char_index: 0,
            counters: Counters::default(),
            streak: 0,
            best_streak: 0,
            samples: Vec::new(),
            keystrokes: Vec::new(),
            status: SessionStatus::Idle,
            started_at: None,
            errors_at_last_sample: 0,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn typed(&self, word_index: usize) -> &[char] {
        &self.typed[word_index]
    }

    /// `(word_index, char_index)` of the next expected character
    pub fn cursor(&self) -> (usize, usize) {
        (self.word_index, self.char_index)
    }

    /// Characters into the stream at the cursor, counting one separator
    /// per finished word. Matches how a ghost measures its own progress.
    pub fn char_offset(&self) -> usize {
        self.words[..self.word_index]
            .iter()
            .map(|w| w.chars().count() + 1)
            .sum::<usize>()
            + self.char_index
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn best_streak(&self) -> u32 {
        self.best_streak
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn keystrokes(&self) -> &[Keystroke] {
        &self.keystrokes
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now())
    }

    pub fn start_at(&mut self, now: Instant) {
        if self.status == SessionStatus::Idle {
            debug!("session started in {} mode", self.config.mode);
            self.started_at = Some(now);
            self.status = SessionStatus::Running;
        }
    }

    pub fn elapsed_secs_at(&self, now: Instant) -> f64 {
        self.started_at
            .map(|start| now.saturating_duration_since(start).as_secs_f64())
            .unwrap_or(0.0)
    }

    pub fn type_char(&mut self, c: char) {
        if self.status != SessionStatus::Running {
            return;
        }
        let target = &self.words[self.word_index];
        let class = classify(self.char_index, c, target);
        let expected = target.chars().nth(self.char_index);

        self.typed[self.word_index].push(c);
        self.counters.add(class);
        self.char_index += 1;
        self.keystrokes.push(Keystroke {
            expected,
            typed: c,
            class,
        });
    }

    pub fn delete_char(&mut self) {
        if self.status != SessionStatus::Running || self.char_index == 0 {
            return;
        }
        let Some(c) = self.typed[self.word_index].pop() else {
            return;
        };
        self.char_index -= 1;
        let class = classify(self.char_index, c, &self.words[self.word_index]);
        self.counters.remove(class);
    }

    /// Move to the next word. Returns false when nothing happened.
    ///
    /// Advancing on an empty word is allowed; it breaks the streak like any
    /// other imperfect word.
    pub fn next_word(&mut self) -> bool {
        if self.status != SessionStatus::Running || self.word_index + 1 >= self.words.len() {
            return false;
        }
        if self.current_word_is_perfect() {
            self.bump_streak();
        } else {
            self.streak = 0;
        }
        self.word_index += 1;
        self.char_index = 0;
        true
    }

    pub fn add_sample(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Polling tick. Captures the per-second sample when one is due and
    /// reports whether the test is complete.
    ///
    /// After a stalled loop the missing seconds are caught up one tick at
    /// a time. Their WPM is the average over the real elapsed time, since
    /// the counters at those earlier seconds were never observed.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        if self.status != SessionStatus::Running {
            return false;
        }
        let elapsed = self.elapsed_secs_at(now);
        if is_sample_due(elapsed, self.samples.len()) {
            let t = (self.samples.len() + 1) as f64;
            let errors = self.counters.errors();
            let sample = Sample::new(
                t,
                calculate_wpm(self.counters.correct, elapsed) as f64,
                errors.saturating_sub(self.errors_at_last_sample) as u32,
            );
            self.errors_at_last_sample = errors;
            self.add_sample(sample);
        }
        self.is_complete_at(now)
    }

    pub fn is_complete_at(&self, now: Instant) -> bool {
        match self.config.mode {
            TestMode::Time => self
                .config
                .duration_secs
                .is_some_and(|limit| self.elapsed_secs_at(now) >= limit as f64),
            TestMode::Words | TestMode::Quote => self.reached_end(),
            TestMode::Zen => false,
        }
    }

    fn reached_end(&self) -> bool {
        let last = self.words.len() - 1;
        self.word_index == last && self.char_index >= self.words[last].chars().count()
    }

    pub fn current_wpm_at(&self, now: Instant) -> u32 {
        calculate_wpm(self.counters.correct, self.elapsed_secs_at(now))
    }

    /// How far along the test is, for progress bars and race broadcasts
    pub fn progress_percent_at(&self, now: Instant) -> u8 {
        let fraction = match (self.config.mode, self.config.duration_secs) {
            (TestMode::Time, Some(limit)) if limit > 0 => {
                self.elapsed_secs_at(now) / limit as f64
            }
            _ => {
                let total: usize = self.words.iter().map(|w| w.chars().count()).sum();
                if total == 0 {
                    0.0
                } else {
                    let done: usize = self.words[..self.word_index]
                        .iter()
                        .map(|w| w.chars().count())
                        .sum::<usize>()
                        + self.char_index.min(self.words[self.word_index].chars().count());
                    done as f64 / total as f64
                }
            }
        };
        (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
    }

    /// Route one input action. A keystroke while idle starts the test.
    pub fn apply_at(&mut self, action: InputAction, now: Instant) -> Applied {
        match action {
            InputAction::Type(c) => {
                self.start_at(now);
                if !self.is_running() {
                    return Applied::Ignored;
                }
                let class = classify(self.char_index, c, &self.words[self.word_index]);
                self.type_char(c);
                Applied::Typed(class)
            }
            InputAction::Delete => {
                if !self.is_running() || self.char_index == 0 {
                    return Applied::Ignored;
                }
                self.delete_char();
                Applied::Deleted
            }
            InputAction::Advance => {
                if !self.is_running() {
                    Applied::Ignored
                } else if self.next_word() {
                    Applied::Advanced
                } else if self.config.mode != TestMode::Zen {
                    Applied::FinishRequested
                } else {
                    Applied::Ignored
                }
            }
        }
    }

    /// End the test and snapshot its result. `None` unless running.
    pub fn finish_at(&mut self, now: Instant, history: &History) -> Option<TestResult> {
        if self.status != SessionStatus::Running {
            return None;
        }
        if self.current_word_is_perfect() {
            self.bump_streak();
        }

        let mut elapsed = self.elapsed_secs_at(now);
        if let (TestMode::Time, Some(limit)) = (self.config.mode, self.config.duration_secs) {
            elapsed = elapsed.min(limit as f64);
        }
        self.status = SessionStatus::Finished;

        let mut result = TestResult::from_session(self, elapsed, Local::now());
        result.is_personal_best = history.is_personal_best(&result);
        debug!(
            "session finished: {} wpm, {}% accuracy over {:.1}s",
            result.wpm, result.accuracy, result.elapsed_secs
        );
        Some(result)
    }

    /// Back to idle with a fresh word stream; also used to abandon a test.
    pub fn reset(&mut self, words: Vec<String>) {
        *self = Session::new(self.config, words);
    }

    pub fn reset_with(&mut self, config: SessionConfig, words: Vec<String>) {
        *self = Session::new(config, words);
    }

    fn current_word_is_perfect(&self) -> bool {
        let target = &self.words[self.word_index];
        let typed = &self.typed[self.word_index];
        typed.len() == target.chars().count() && typed.iter().copied().eq(target.chars())
    }

    fn bump_streak(&mut self) {
        self.streak += 1;
        self.best_streak = self.best_streak.max(self.streak);
    }
}
