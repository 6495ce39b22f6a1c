use std::time::Instant;

use chrono::{Local, NaiveDate};
use log::{debug, warn};

use crate::achievements::{AchievementLedger, UnlockedAchievement};
use crate::error::StoreError;
use crate::goals::Goal;
use crate::heatmap::{ActivityCalendar, KeyHeatmap};
use crate::history::History;
use crate::result::TestResult;
use crate::session::{Session, SessionConfig, TestMode};
use crate::stats::PracticeStore;
use crate::streak::PracticeStreak;

/// Everything that changed because one test finished
#[derive(Debug, Clone, PartialEq)]
pub struct FinishReport {
    pub result: TestResult,
    pub unlocked: Vec<UnlockedAchievement>,
    pub completed_goals: Vec<Goal>,
    pub streak_extended: bool,
}

/// Long-lived per-user state fed by finished sessions
pub struct Tracker {
    user_id: String,
    history: History,
    ledger: AchievementLedger,
    goals: Vec<Goal>,
    streak: PracticeStreak,
    heatmap: KeyHeatmap,
    store: Option<Box<dyn PracticeStore>>,
}

impl Tracker {
    /// In-memory only
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            history: History::new(),
            ledger: AchievementLedger::new(),
            goals: Vec::new(),
            streak: PracticeStreak::default(),
            heatmap: KeyHeatmap::new(),
            store: None,
        }
    }

    /// Fresh state that writes through to `store`
    pub fn with_store(user_id: impl Into<String>, store: Box<dyn PracticeStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::new(user_id)
        }
    }

    /// Load everything previously stored for `user_id`.
    pub fn restore(
        user_id: impl Into<String>,
        store: Box<dyn PracticeStore>,
    ) -> Result<Self, StoreError> {
        let user_id = user_id.into();
        let history = store.load_history(&user_id)?;
        let ledger = AchievementLedger::from_unlocked(store.load_achievements(&user_id)?);
        let goals = store.load_goals(&user_id)?;
        let streak = store.load_streak(&user_id)?;
        let heatmap = KeyHeatmap::from_counts(store.load_key_stats(&user_id)?);
        debug!(
            "restored {} results and {} achievements for {user_id}",
            history.len(),
            ledger.unlocked().len()
        );
        Ok(Self {
            user_id,
            history,
            ledger,
            goals,
            streak,
            heatmap,
            store: Some(store),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn achievements(&self) -> &AchievementLedger {
        &self.ledger
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn streak(&self) -> &PracticeStreak {
        &self.streak
    }

    pub fn heatmap(&self) -> &KeyHeatmap {
        &self.heatmap
    }

    pub fn calendar(&self) -> ActivityCalendar {
        ActivityCalendar::from_history(&self.history)
    }

    /// Best previous result in the same configuration, for ghost replay.
    pub fn ghost_source(&self, config: &SessionConfig) -> Option<&TestResult> {
        self.history
            .results()
            .iter()
            .filter(|r| {
                r.mode == config.mode
                    && match config.mode {
                        TestMode::Time => r.duration_secs == config.duration_secs,
                        _ => r.word_count == config.word_count,
                    }
            })
            .max_by_key(|r| r.wpm)
    }

    /// One goal per kind and period. An open goal with the same kind and
    /// period is re-targeted and keeps its progress; a stale one is replaced.
    pub fn add_goal(&mut self, goal: Goal) {
        self.goals.retain(|g| {
            !(g.kind == goal.kind && g.period == goal.period && !g.is_open_on(goal.period_start))
        });
        match self
            .goals
            .iter_mut()
            .find(|g| g.kind == goal.kind && g.period == goal.period)
        {
            Some(open) => {
                open.target = goal.target;
                open.completed = open.completed || open.current >= open.target;
            }
            None => self.goals.push(goal),
        }
        let goals = self.goals.clone();
        self.persist("goals", |store, user| store.save_goals(user, &goals));
    }

    pub fn finish(&mut self, session: &mut Session, now: Instant) -> Option<FinishReport> {
        self.finish_on(session, now, Local::now().date_naive())
    }

    /// Finish `session` and fold its result into history, achievements,
    /// goals, the practice streak and the key heatmap. Persistence is
    /// best effort: a failing store never undoes local state.
    pub fn finish_on(
        &mut self,
        session: &mut Session,
        now: Instant,
        today: NaiveDate,
    ) -> Option<FinishReport> {
        let result = session.finish_at(now, &self.history)?;

        let unlocked = self.ledger.unlock_all(&result, result.timestamp);
        let completed_goals: Vec<Goal> = self
            .goals
            .iter_mut()
            .filter_map(|goal| {
                let was_completed = goal.completed;
                goal.record(&result, today);
                (goal.completed && !was_completed).then(|| goal.clone())
            })
            .collect();
        let streak_extended = self.streak.record_practice(today);
        self.heatmap.record_all(session.keystrokes());
        self.history.record(result.clone());

        let streak = self.streak;
        let goals = self.goals.clone();
        self.persist("result", |store, user| store.save_result(user, &result));
        self.persist("keystrokes", |store, user| {
            store.record_keystrokes(user, session.keystrokes())
        });
        if !unlocked.is_empty() {
            self.persist("achievements", |store, user| store.save_unlocked(user, &unlocked));
        }
        self.persist("goals", |store, user| store.save_goals(user, &goals));
        self.persist("streak", |store, user| store.save_streak(user, &streak));

        Some(FinishReport {
            result,
            unlocked,
            completed_goals,
            streak_extended,
        })
    }

    fn persist<F>(&mut self, what: &str, write: F)
    where
        F: FnOnce(&mut dyn PracticeStore, &str) -> Result<(), StoreError>,
    {
        let Some(store) = self.store.as_deref_mut() else {
            return;
        };
        if let Err(e) = write(store, &self.user_id) {
            warn!("failed to persist {what} for {}: {e}", self.user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::{GoalKind, GoalPeriod};
    use crate::result::fixtures::result;
    use crate::stats::ResultStore;
    use std::time::Duration;

    struct BrokenStore;

    impl ResultStore for BrokenStore {
        fn save_result(&mut self, _user_id: &str, _result: &TestResult) -> Result<(), StoreError> {
            Err(StoreError::MissingAsset("disk gone".into()))
        }

        fn load_history(&self, _user_id: &str) -> Result<History, StoreError> {
            Ok(History::new())
        }
    }

    impl PracticeStore for BrokenStore {
        fn save_streak(&mut self, _user_id: &str, _streak: &PracticeStreak) -> Result<(), StoreError> {
            Err(StoreError::MissingAsset("disk gone".into()))
        }
    }

    fn typed_session(words: &[&str]) -> (Session, Instant) {
        let words: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        let mut session = Session::new(SessionConfig::words(words.len()), words.clone());
        let start = Instant::now();
        session.start_at(start);
        for (i, word) in words.iter().enumerate() {
            word.chars().for_each(|c| session.type_char(c));
            if i + 1 < words.len() {
                session.next_word();
            }
        }
        (session, start)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    #[test]
    fn finish_updates_everything() {
        let mut tracker = Tracker::new("ada");
        tracker.add_goal(Goal::new(GoalKind::Tests, GoalPeriod::Daily, 1, today()));
        let (mut session, start) = typed_session(&["hello", "world"]);

        let report = tracker
            .finish_on(&mut session, start + Duration::from_secs(6), today())
            .unwrap();

        assert!(report.result.is_personal_best);
        assert!(report.streak_extended);
        assert_eq!(report.completed_goals.len(), 1);
        assert!(report.unlocked.iter().any(|u| u.title == "First Steps"));
        assert_eq!(tracker.history().len(), 1);
        assert_eq!(tracker.streak().current, 1);
        assert_eq!(tracker.heatmap().stats('l').hits, 3);
    }

    #[test]
    fn adding_a_goal_twice_retargets_instead_of_duplicating() {
        let mut tracker = Tracker::new("ada");
        tracker.add_goal(Goal::new(GoalKind::Tests, GoalPeriod::Daily, 5, today()));
        let (mut session, start) = typed_session(&["hi"]);
        tracker.finish_on(&mut session, start + Duration::from_secs(2), today());

        tracker.add_goal(Goal::new(GoalKind::Tests, GoalPeriod::Daily, 1, today()));
        assert_eq!(tracker.goals().len(), 1);
        assert_eq!(tracker.goals()[0].target, 1);
        assert_eq!(tracker.goals()[0].current, 1);
        assert!(tracker.goals()[0].completed);

        // yesterday's bucket is replaced by a fresh one
        let tomorrow = today().succ_opt().unwrap();
        tracker.add_goal(Goal::new(GoalKind::Tests, GoalPeriod::Daily, 3, tomorrow));
        assert_eq!(tracker.goals().len(), 1);
        assert_eq!(tracker.goals()[0].current, 0);
        assert_eq!(tracker.goals()[0].period_start, tomorrow);

        tracker.add_goal(Goal::new(GoalKind::Wpm, GoalPeriod::Daily, 60, tomorrow));
        assert_eq!(tracker.goals().len(), 2);
    }

    #[test]
    fn finishing_twice_is_a_noop() {
        let mut tracker = Tracker::new("ada");
        let (mut session, start) = typed_session(&["hi"]);
        assert!(tracker.finish_on(&mut session, start + Duration::from_secs(2), today()).is_some());
        assert!(tracker.finish_on(&mut session, start + Duration::from_secs(3), today()).is_none());
        assert_eq!(tracker.history().len(), 1);
    }

    #[test]
    fn second_test_same_day_does_not_extend_streak_or_reunlock() {
        let mut tracker = Tracker::new("ada");
        let (mut first, start) = typed_session(&["hi"]);
        tracker.finish_on(&mut first, start + Duration::from_secs(2), today());

        let (mut second, start) = typed_session(&["hi"]);
        let report = tracker
            .finish_on(&mut second, start + Duration::from_secs(2), today())
            .unwrap();
        assert!(!report.streak_extended);
        assert!(report.unlocked.is_empty());
        let first_steps = tracker
            .achievements()
            .unlocked()
            .iter()
            .filter(|u| u.title == "First Steps")
            .count();
        assert_eq!(first_steps, 1);
    }

    #[test]
    fn store_failures_keep_local_state() {
        let mut tracker = Tracker::with_store("ada", Box::new(BrokenStore));
        let (mut session, start) = typed_session(&["hi"]);
        let report = tracker.finish_on(&mut session, start + Duration::from_secs(2), today());
        assert!(report.is_some());
        assert_eq!(tracker.history().len(), 1);
        assert_eq!(tracker.streak().current, 1);
    }

    #[test]
    fn ghost_source_picks_best_in_configuration() {
        let mut tracker = Tracker::new("ada");
        for wpm in [40, 70, 55] {
            tracker.history.record(result(TestMode::Words, None, 25, wpm));
        }
        tracker.history.record(result(TestMode::Time, Some(30), 0, 120));

        let best = tracker.ghost_source(&SessionConfig::words(25)).map(|r| r.wpm);
        assert_eq!(best, Some(70));
        assert!(tracker.ghost_source(&SessionConfig::words(50)).is_none());
    }
}
