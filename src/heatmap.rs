use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::history::History;
use crate::session::{CharClass, Keystroke};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStats {
    pub hits: u32,
    pub misses: u32,
}

impl KeyStats {
    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }

    pub fn miss_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.misses as f64 / self.total() as f64
        }
    }
}

/// Per expected key hit/miss counts, accumulated across sessions
#[derive(Debug, Clone, Default)]
pub struct KeyHeatmap {
    keys: HashMap<char, KeyStats>,
}

impl KeyHeatmap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from aggregated per-key counts, e.g. loaded from storage.
    pub fn from_counts<I: IntoIterator<Item = (char, KeyStats)>>(counts: I) -> Self {
        Self {
            keys: counts.into_iter().collect(),
        }
    }

    /// Extra characters have no expected key and are not attributed.
    pub fn record(&mut self, keystroke: &Keystroke) {
        let Some(expected) = keystroke.expected else {
            return;
        };
        let stats = self.keys.entry(expected.to_ascii_lowercase()).or_default();
        match keystroke.class {
            CharClass::Correct => stats.hits += 1,
            CharClass::Incorrect | CharClass::Extra => stats.misses += 1,
        }
    }

    pub fn record_all(&mut self, keystrokes: &[Keystroke]) {
        keystrokes.iter().for_each(|k| self.record(k));
    }

    pub fn stats(&self, key: char) -> KeyStats {
        self.keys.get(&key).copied().unwrap_or_default()
    }

    pub fn miss_rate(&self, key: char) -> f64 {
        self.stats(key).miss_rate()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = (char, KeyStats)> + '_ {
        self.keys.iter().map(|(k, s)| (*k, *s))
    }

    /// Keys with the highest miss rate, ties broken by attempts then key.
    pub fn weakest(&self, n: usize) -> Vec<(char, KeyStats)> {
        self.keys
            .iter()
            .filter(|(_, s)| s.misses > 0)
            .map(|(k, s)| (*k, *s))
            .sorted_by(|(ka, a), (kb, b)| {
                b.miss_rate()
                    .total_cmp(&a.miss_rate())
                    .then(b.total().cmp(&a.total()))
                    .then(ka.cmp(kb))
            })
            .take(n)
            .collect()
    }
}

/// Finished tests per calendar day
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityCalendar {
    days: BTreeMap<NaiveDate, u32>,
}

impl ActivityCalendar {
    pub fn from_history(history: &History) -> Self {
        let days = history
            .results()
            .iter()
            .map(|r| r.timestamp.date_naive())
            .counts()
            .into_iter()
            .map(|(day, n)| (day, n as u32))
            .collect();
        Self { days }
    }

    pub fn record(&mut self, day: NaiveDate) {
        *self.days.entry(day).or_insert(0) += 1;
    }

    pub fn tests_on(&self, day: NaiveDate) -> u32 {
        self.days.get(&day).copied().unwrap_or(0)
    }

    pub fn active_days(&self) -> usize {
        self.days.len()
    }

    /// Inclusive range of days, oldest first, with zero-filled gaps.
    pub fn range(&self, from: NaiveDate, to: NaiveDate) -> Vec<(NaiveDate, u32)> {
        from.iter_days()
            .take_while(|d| *d <= to)
            .map(|d| (d, self.tests_on(d)))
            .collect()
    }
}
