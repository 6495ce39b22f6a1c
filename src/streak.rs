use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Consecutive calendar days with at least one finished test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeStreak {
    pub current: u32,
    pub longest: u32,
    pub last_practice_date: Option<NaiveDate>,
}

impl PracticeStreak {
    /// Count practice on `today`. Only the first call per day changes
    /// anything; returns whether it did.
    pub fn record_practice(&mut self, today: NaiveDate) -> bool {
        if self.last_practice_date == Some(today) {
            return false;
        }
        let continues = self
            .last_practice_date
            .is_some_and(|last| last.succ_opt() == Some(today));
        self.current = if continues { self.current + 1 } else { 1 };
        self.longest = self.longest.max(self.current);
        self.last_practice_date = Some(today);
        true
    }

    /// The streak as seen on `today`: zero once a whole day was missed.
    pub fn current_on(&self, today: NaiveDate) -> u32 {
        match self.last_practice_date {
            Some(last) if last == today || last.succ_opt() == Some(today) => self.current,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn first_practice_starts_at_one() {
        let mut streak = PracticeStreak::default();
        assert!(streak.record_practice(date(2024, 5, 1)));
        assert_eq!(streak.current, 1);
        assert_eq!(streak.longest, 1);
    }

    #[test]
    fn once_per_day() {
        let mut streak = PracticeStreak::default();
        streak.record_practice(date(2024, 5, 1));
        assert!(!streak.record_practice(date(2024, 5, 1)));
        assert_eq!(streak.current, 1);
    }

    #[test]
    fn consecutive_days_extend_across_month_boundary() {
        let mut streak = PracticeStreak::default();
        streak.record_practice(date(2024, 4, 29));
        streak.record_practice(date(2024, 4, 30));
        streak.record_practice(date(2024, 5, 1));
        assert_eq!(streak.current, 3);
        assert_eq!(streak.longest, 3);
    }

    #[test]
    fn gap_resets_but_longest_stays() {
        let mut streak = PracticeStreak::default();
        streak.record_practice(date(2024, 5, 1));
        streak.record_practice(date(2024, 5, 2));
        streak.record_practice(date(2024, 5, 4));
        assert_eq!(streak.current, 1);
        assert_eq!(streak.longest, 2);
    }

    #[test]
    fn current_on_reports_broken_streaks() {
        let mut streak = PracticeStreak::default();
        streak.record_practice(date(2024, 5, 1));
        streak.record_practice(date(2024, 5, 2));
        assert_eq!(streak.current_on(date(2024, 5, 3)), 2);
        assert_eq!(streak.current_on(date(2024, 5, 4)), 0);
    }
}
