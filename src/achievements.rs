use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::result::TestResult;
use crate::session::TestMode;

/// Longest nominal duration offered for timed tests
pub const MARATHON_SECS: u32 = 120;

/// Every achievement the evaluator knows about. Adding one means adding a
/// variant here, so `is_met` and the metadata stay exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Achievement {
    FirstSteps,
    Precise,
    Flawless,
    Centurion,
    Metronome,
    Marathon,
}

impl Achievement {
    pub const ALL: [Achievement; 6] = [
        Achievement::FirstSteps,
        Achievement::Precise,
        Achievement::Flawless,
        Achievement::Centurion,
        Achievement::Metronome,
        Achievement::Marathon,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Achievement::FirstSteps => "First Steps",
            Achievement::Precise => "Precise",
            Achievement::Flawless => "Flawless",
            Achievement::Centurion => "Centurion",
            Achievement::Metronome => "Metronome",
            Achievement::Marathon => "Marathon",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Achievement::FirstSteps => "Finish your first test",
            Achievement::Precise => "Finish a test with at least 98% accuracy",
            Achievement::Flawless => "Finish a test without a single mistake",
            Achievement::Centurion => "Reach 100 wpm",
            Achievement::Metronome => "Finish a test with at least 95% consistency",
            Achievement::Marathon => "Type through a full 120 second test",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Achievement::FirstSteps => "🐣",
            Achievement::Precise => "🎯",
            Achievement::Flawless => "💎",
            Achievement::Centurion => "🚀",
            Achievement::Metronome => "⏱",
            Achievement::Marathon => "🏃",
        }
    }

    pub fn is_met(&self, result: &TestResult) -> bool {
        match self {
            Achievement::FirstSteps => true,
            Achievement::Precise => result.accuracy >= 98,
            Achievement::Flawless => result.accuracy == 100 && result.total_chars() > 0,
            Achievement::Centurion => result.wpm >= 100,
            Achievement::Metronome => result.consistency >= 95,
            Achievement::Marathon => {
                result.mode == TestMode::Time
                    && result.duration_secs == Some(MARATHON_SECS)
                    && result.elapsed_secs >= MARATHON_SECS as f64
            }
        }
    }
}

/// All achievements whose predicate holds for this one result.
pub fn evaluate(result: &TestResult) -> Vec<Achievement> {
    Achievement::ALL
        .into_iter()
        .filter(|a| a.is_met(result))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockedAchievement {
    pub title: String,
    pub description: String,
    pub icon: String,
    pub unlocked_at: DateTime<Local>,
}

/// Append-only record of unlocks, at most one per title.
#[derive(Debug, Clone, Default)]
pub struct AchievementLedger {
    unlocked: Vec<UnlockedAchievement>,
}

impl AchievementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored unlocks; duplicate titles keep the earliest.
    pub fn from_unlocked(mut records: Vec<UnlockedAchievement>) -> Self {
        records.sort_by(|a, b| a.unlocked_at.cmp(&b.unlocked_at));
        let mut ledger = Self::new();
        for record in records {
            if !ledger.is_unlocked(&record.title) {
                ledger.unlocked.push(record);
            }
        }
        ledger
    }

    pub fn is_unlocked(&self, title: &str) -> bool {
        self.unlocked.iter().any(|u| u.title == title)
    }

    pub fn unlocked(&self) -> &[UnlockedAchievement] {
        &self.unlocked
    }

    /// Unlock `achievement` unless its title already is. Returns the new
    /// record only on the first unlock.
    pub fn unlock(
        &mut self,
        achievement: Achievement,
        at: DateTime<Local>,
    ) -> Option<UnlockedAchievement> {
        if self.is_unlocked(achievement.title()) {
            return None;
        }
        let record = UnlockedAchievement {
            title: achievement.title().to_string(),
            description: achievement.description().to_string(),
            icon: achievement.icon().to_string(),
            unlocked_at: at,
        };
        self.unlocked.push(record.clone());
        Some(record)
    }

    /// Evaluate `result` and unlock whatever is new.
    pub fn unlock_all(
        &mut self,
        result: &TestResult,
        at: DateTime<Local>,
    ) -> Vec<UnlockedAchievement> {
        evaluate(result)
            .into_iter()
            .filter_map(|a| self.unlock(a, at))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::fixtures::result;

    fn typed(mut r: TestResult, correct: usize, incorrect: usize) -> TestResult {
        r.correct_chars = correct;
        r.incorrect_chars = incorrect;
        r
    }

    #[test]
    fn evaluate_headline_thresholds() {
        let mut r = typed(result(TestMode::Words, None, 25, 100), 100, 2);
        r.accuracy = 98;
        r.consistency = 94;
        let met = evaluate(&r);
        assert!(met.contains(&Achievement::FirstSteps));
        assert!(met.contains(&Achievement::Precise));
        assert!(met.contains(&Achievement::Centurion));
        assert!(!met.contains(&Achievement::Flawless));
        assert!(!met.contains(&Achievement::Metronome));
        assert!(!met.contains(&Achievement::Marathon));
    }

    #[test]
    fn flawless_needs_something_typed() {
        let empty = result(TestMode::Zen, None, 0, 0);
        assert!(!Achievement::Flawless.is_met(&empty));
        let clean = typed(result(TestMode::Words, None, 10, 40), 50, 0);
        assert!(Achievement::Flawless.is_met(&clean));
    }

    #[test]
    fn marathon_requires_full_maximum_duration() {
        let full = result(TestMode::Time, Some(120), 0, 60);
        assert!(Achievement::Marathon.is_met(&full));

        let mut cut_short = full.clone();
        cut_short.elapsed_secs = 80.0;
        assert!(!Achievement::Marathon.is_met(&cut_short));

        assert!(!Achievement::Marathon.is_met(&result(TestMode::Time, Some(60), 0, 60)));
    }

    #[test]
    fn unlock_is_idempotent() {
        let mut ledger = AchievementLedger::new();
        let now = Local::now();
        assert!(ledger.unlock(Achievement::Centurion, now).is_some());
        assert!(ledger.unlock(Achievement::Centurion, now).is_none());
        assert_eq!(ledger.unlocked().len(), 1);
    }

    #[test]
    fn unlock_all_only_reports_new_titles() {
        let mut ledger = AchievementLedger::new();
        let r = result(TestMode::Words, None, 10, 120);
        let first = ledger.unlock_all(&r, Local::now());
        assert!(first.iter().any(|u| u.title == "Centurion"));

        let second = ledger.unlock_all(&r, Local::now());
        assert!(second.is_empty());
    }

    #[test]
    fn from_unlocked_dedupes_titles() {
        let now = Local::now();
        let record = UnlockedAchievement {
            title: "Precise".into(),
            description: String::new(),
            icon: String::new(),
            unlocked_at: now,
        };
        let ledger = AchievementLedger::from_unlocked(vec![record.clone(), record]);
        assert_eq!(ledger.unlocked().len(), 1);
        assert!(ledger.is_unlocked("Precise"));
    }
}
