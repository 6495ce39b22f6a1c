use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::result::TestResult;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GoalKind {
    /// best wpm within the period
    Wpm,
    /// best accuracy within the period
    Accuracy,
    /// number of finished tests within the period
    Tests,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GoalPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl GoalPeriod {
    /// Whether `date` falls in the same bucket as `start`
    pub fn contains(&self, start: NaiveDate, date: NaiveDate) -> bool {
        match self {
            GoalPeriod::Daily => start == date,
            GoalPeriod::Weekly => start.iso_week() == date.iso_week(),
            GoalPeriod::Monthly => start.year() == date.year() && start.month() == date.month(),
        }
    }
}

/// A user-defined target for one period bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub kind: GoalKind,
    pub period: GoalPeriod,
    pub target: u32,
    pub current: u32,
    pub completed: bool,
    /// any date inside the bucket this goal tracks
    pub period_start: NaiveDate,
}

impl Goal {
    pub fn new(kind: GoalKind, period: GoalPeriod, target: u32, period_start: NaiveDate) -> Self {
        Self {
            kind,
            period,
            target,
            current: 0,
            completed: false,
            period_start,
        }
    }

    pub fn is_open_on(&self, date: NaiveDate) -> bool {
        self.period.contains(self.period_start, date)
    }

    /// Fold one finished result into the goal. Results outside the bucket
    /// are ignored. Once completed, a goal stays completed.
    pub fn record(&mut self, result: &TestResult, date: NaiveDate) -> bool {
        if !self.is_open_on(date) {
            return false;
        }
        self.current = match self.kind {
            GoalKind::Wpm => self.current.max(result.wpm),
            GoalKind::Accuracy => self.current.max(result.accuracy),
            GoalKind::Tests => self.current + 1,
        };
        self.completed = self.completed || self.current >= self.target;
        true
    }

    pub fn progress_percent(&self) -> u8 {
        if self.target == 0 {
            return 100;
        }
        ((self.current as f64 / self.target as f64).min(1.0) * 100.0).round() as u8
    }
}

/// A goal as written on the command line: `kind:period:target`,
/// e.g. `tests:daily:5` or `wpm:weekly:80`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalSpec {
    pub kind: GoalKind,
    pub period: GoalPeriod,
    pub target: u32,
}

impl GoalSpec {
    /// A fresh goal whose bucket starts on `today`
    pub fn into_goal(self, today: NaiveDate) -> Goal {
        Goal::new(self.kind, self.period, self.target, today)
    }
}

impl FromStr for GoalSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [kind, period, target] = parts.as_slice() else {
            return Err(format!("expected kind:period:target, got {s:?}"));
        };
        Ok(Self {
            kind: kind
                .parse()
                .map_err(|_| format!("unknown goal kind {kind:?} (wpm, accuracy, tests)"))?,
            period: period
                .parse()
                .map_err(|_| format!("unknown goal period {period:?} (daily, weekly, monthly)"))?,
            target: target
                .parse()
                .map_err(|_| format!("goal target must be a whole number, got {target:?}"))?,
        })
    }
}
