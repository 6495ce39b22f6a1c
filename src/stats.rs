use chrono::{DateTime, Local, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::achievements::UnlockedAchievement;
use crate::app_dirs::AppDirs;
use crate::error::StoreError;
use crate::goals::{Goal, GoalKind, GoalPeriod};
use crate::heatmap::KeyStats;
use crate::history::History;
use crate::result::TestResult;
use crate::session::{CharClass, Keystroke, TestMode};
use crate::streak::PracticeStreak;

/// Where finished results go and where history comes back from
pub trait ResultStore {
    fn save_result(&mut self, user_id: &str, result: &TestResult) -> Result<(), StoreError>;
    fn load_history(&self, user_id: &str) -> Result<History, StoreError>;
}

/// Everything else the tracker persists. The defaults make a result-only
/// store usable as-is.
pub trait PracticeStore: ResultStore {
    fn record_keystrokes(&mut self, _user_id: &str, _keys: &[Keystroke]) -> Result<(), StoreError> {
        Ok(())
    }

    fn save_unlocked(
        &mut self,
        _user_id: &str,
        _unlocked: &[UnlockedAchievement],
    ) -> Result<(), StoreError> {
        Ok(())
    }

    fn save_goals(&mut self, _user_id: &str, _goals: &[Goal]) -> Result<(), StoreError> {
        Ok(())
    }

    fn save_streak(&mut self, _user_id: &str, _streak: &PracticeStreak) -> Result<(), StoreError> {
        Ok(())
    }

    fn load_achievements(&self, _user_id: &str) -> Result<Vec<UnlockedAchievement>, StoreError> {
        Ok(Vec::new())
    }

    fn load_goals(&self, _user_id: &str) -> Result<Vec<Goal>, StoreError> {
        Ok(Vec::new())
    }

    fn load_streak(&self, _user_id: &str) -> Result<PracticeStreak, StoreError> {
        Ok(PracticeStreak::default())
    }

    fn load_key_stats(&self, _user_id: &str) -> Result<Vec<(char, KeyStats)>, StoreError> {
        Ok(Vec::new())
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS test_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    mode TEXT NOT NULL,
    duration_secs INTEGER,
    word_count INTEGER NOT NULL,
    wpm INTEGER NOT NULL,
    raw_wpm INTEGER NOT NULL,
    accuracy INTEGER NOT NULL,
    consistency INTEGER NOT NULL,
    correct_chars INTEGER NOT NULL,
    incorrect_chars INTEGER NOT NULL,
    extra_chars INTEGER NOT NULL,
    elapsed_secs REAL NOT NULL,
    best_streak INTEGER NOT NULL,
    samples TEXT NOT NULL,
    words TEXT NOT NULL,
    is_personal_best BOOLEAN NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_test_results_user_time ON test_results(user_id, timestamp);

CREATE TABLE IF NOT EXISTS keystrokes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    expected TEXT,
    typed TEXT NOT NULL,
    class TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_keystrokes_user_expected ON keystrokes(user_id, expected);

CREATE TABLE IF NOT EXISTS achievements (
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    icon TEXT NOT NULL,
    unlocked_at TEXT NOT NULL,
    PRIMARY KEY (user_id, title)
);

CREATE TABLE IF NOT EXISTS goals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    period TEXT NOT NULL,
    target INTEGER NOT NULL,
    current INTEGER NOT NULL,
    completed BOOLEAN NOT NULL,
    period_start TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS practice_streak (
    user_id TEXT PRIMARY KEY,
    current INTEGER NOT NULL,
    longest INTEGER NOT NULL,
    last_practice_date TEXT
);
"#;

/// SQLite-backed store for results and practice data
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
}

/// Row shape before tags and JSON columns are decoded
struct ResultRow {
    timestamp: String,
    mode: String,
    duration_secs: Option<u32>,
    word_count: i64,
    wpm: u32,
    raw_wpm: u32,
    accuracy: u32,
    consistency: u32,
    correct_chars: i64,
    incorrect_chars: i64,
    extra_chars: i64,
    elapsed_secs: f64,
    best_streak: u32,
    samples: String,
    words: String,
    is_personal_best: bool,
}

impl ResultRow {
    fn decode(self) -> Result<TestResult, StoreError> {
        Ok(TestResult {
            timestamp: parse_timestamp(&self.timestamp)?,
            mode: parse_tag::<TestMode>("mode", &self.mode)?,
            duration_secs: self.duration_secs,
            word_count: self.word_count as usize,
            wpm: self.wpm,
            raw_wpm: self.raw_wpm,
            accuracy: self.accuracy,
            consistency: self.consistency,
            correct_chars: self.correct_chars as usize,
            incorrect_chars: self.incorrect_chars as usize,
            extra_chars: self.extra_chars as usize,
            elapsed_secs: self.elapsed_secs,
            best_streak: self.best_streak,
            samples: serde_json::from_str(&self.samples)?,
            words: serde_json::from_str(&self.words)?,
            is_personal_best: self.is_personal_best,
        })
    }
}

impl StatsDb {
    /// Open the database under the state directory, creating it if needed.
    pub fn new() -> Result<Self, StoreError> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("keypace_stats.db"));
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(StatsDb { conn })
    }

    /// Remove everything stored for `user_id`
    pub fn clear_user(&mut self, user_id: &str) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for table in ["test_results", "keystrokes", "achievements", "goals", "practice_streak"] {
            tx.execute(&format!("DELETE FROM {table} WHERE user_id = ?1"), [user_id])?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl ResultStore for StatsDb {
    fn save_result(&mut self, user_id: &str, result: &TestResult) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO test_results
            (user_id, timestamp, mode, duration_secs, word_count, wpm, raw_wpm, accuracy,
             consistency, correct_chars, incorrect_chars, extra_chars, elapsed_secs,
             best_streak, samples, words, is_personal_best)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
            params![
                user_id,
                result.timestamp.to_rfc3339(),
                result.mode.to_string(),
                result.duration_secs,
                result.word_count as i64,
                result.wpm,
                result.raw_wpm,
                result.accuracy,
                result.consistency,
                result.correct_chars as i64,
                result.incorrect_chars as i64,
                result.extra_chars as i64,
                result.elapsed_secs,
                result.best_streak,
                serde_json::to_string(&result.samples)?,
                serde_json::to_string(&result.words)?,
                result.is_personal_best,
            ],
        )?;
        Ok(())
    }

    fn load_history(&self, user_id: &str) -> Result<History, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT timestamp, mode, duration_secs, word_count, wpm, raw_wpm, accuracy,
                   consistency, correct_chars, incorrect_chars, extra_chars, elapsed_secs,
                   best_streak, samples, words, is_personal_best
            FROM test_results
            WHERE user_id = ?1
            ORDER BY timestamp DESC
            "#,
        )?;
        let rows = stmt.query_map([user_id], |row| {
            Ok(ResultRow {
                timestamp: row.get(0)?,
                mode: row.get(1)?,
                duration_secs: row.get(2)?,
                word_count: row.get(3)?,
                wpm: row.get(4)?,
                raw_wpm: row.get(5)?,
                accuracy: row.get(6)?,
                consistency: row.get(7)?,
                correct_chars: row.get(8)?,
                incorrect_chars: row.get(9)?,
                extra_chars: row.get(10)?,
                elapsed_secs: row.get(11)?,
                best_streak: row.get(12)?,
                samples: row.get(13)?,
                words: row.get(14)?,
                is_personal_best: row.get(15)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?.decode()?);
        }
        Ok(History::from_results(results))
    }
}

impl PracticeStore for StatsDb {
    /// Batch insert in one transaction
    fn record_keystrokes(&mut self, user_id: &str, keys: &[Keystroke]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for key in keys {
            tx.execute(
                "INSERT INTO keystrokes (user_id, expected, typed, class) VALUES (?1, ?2, ?3, ?4)",
                params![
                    user_id,
                    key.expected.map(|c| c.to_string()),
                    key.typed.to_string(),
                    class_tag(key.class),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn save_unlocked(
        &mut self,
        user_id: &str,
        unlocked: &[UnlockedAchievement],
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for a in unlocked {
            // the first unlock of a title wins
            tx.execute(
                r#"
                INSERT OR IGNORE INTO achievements (user_id, title, description, icon, unlocked_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![user_id, a.title, a.description, a.icon, a.unlocked_at.to_rfc3339()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Replaces the stored goal set
    fn save_goals(&mut self, user_id: &str, goals: &[Goal]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM goals WHERE user_id = ?1", [user_id])?;
        for goal in goals {
            tx.execute(
                r#"
                INSERT INTO goals (user_id, kind, period, target, current, completed, period_start)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    user_id,
                    goal.kind.to_string(),
                    goal.period.to_string(),
                    goal.target,
                    goal.current,
                    goal.completed,
                    goal.period_start.to_string(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn save_streak(&mut self, user_id: &str, streak: &PracticeStreak) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO practice_streak (user_id, current, longest, last_practice_date)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                user_id,
                streak.current,
                streak.longest,
                streak.last_practice_date.map(|d| d.to_string()),
            ],
        )?;
        Ok(())
    }

    fn load_achievements(&self, user_id: &str) -> Result<Vec<UnlockedAchievement>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT title, description, icon, unlocked_at
            FROM achievements
            WHERE user_id = ?1
            ORDER BY unlocked_at
            "#,
        )?;
        let rows = stmt.query_map([user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut unlocked = Vec::new();
        for row in rows {
            let (title, description, icon, at) = row?;
            unlocked.push(UnlockedAchievement {
                title,
                description,
                icon,
                unlocked_at: parse_timestamp(&at)?,
            });
        }
        Ok(unlocked)
    }

    fn load_goals(&self, user_id: &str) -> Result<Vec<Goal>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT kind, period, target, current, completed, period_start
            FROM goals
            WHERE user_id = ?1
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map([user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut goals = Vec::new();
        for row in rows {
            let (kind, period, target, current, completed, start) = row?;
            goals.push(Goal {
                kind: parse_tag::<GoalKind>("goal kind", &kind)?,
                period: parse_tag::<GoalPeriod>("goal period", &period)?,
                target,
                current,
                completed,
                period_start: parse_date(&start)?,
            });
        }
        Ok(goals)
    }

    fn load_streak(&self, user_id: &str) -> Result<PracticeStreak, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT current, longest, last_practice_date FROM practice_streak WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((current, longest, last)) = row else {
            return Ok(PracticeStreak::default());
        };
        Ok(PracticeStreak {
            current,
            longest,
            last_practice_date: last.as_deref().map(parse_date).transpose()?,
        })
    }

    fn load_key_stats(&self, user_id: &str) -> Result<Vec<(char, KeyStats)>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                LOWER(expected),
                SUM(CASE WHEN class = 'correct' THEN 1 ELSE 0 END) as hits,
                SUM(CASE WHEN class = 'correct' THEN 0 ELSE 1 END) as misses
            FROM keystrokes
            WHERE user_id = ?1 AND expected IS NOT NULL
            GROUP BY LOWER(expected)
            ORDER BY LOWER(expected)
            "#,
        )?;
        let rows = stmt.query_map([user_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?, row.get::<_, u32>(2)?))
        })?;

        let mut stats = Vec::new();
        for row in rows {
            let (key, hits, misses) = row?;
            if let Some(c) = key.chars().next() {
                stats.push((c, KeyStats { hits, misses }));
            }
        }
        Ok(stats)
    }
}

fn class_tag(class: CharClass) -> &'static str {
    match class {
        CharClass::Correct => "correct",
        CharClass::Incorrect => "incorrect",
        CharClass::Extra => "extra",
    }
}

/// Read back an enum stored by its `Display` tag
fn parse_tag<T: FromStr>(kind: &'static str, value: &str) -> Result<T, StoreError> {
    value.parse::<T>().map_err(|_| StoreError::UnknownTag {
        kind,
        value: value.to_string(),
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Local>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Local))
        .map_err(|_| StoreError::UnknownTag {
            kind: "timestamp",
            value: s.to_string(),
        })
}

fn parse_date(s: &str) -> Result<NaiveDate, StoreError> {
    s.parse::<NaiveDate>().map_err(|_| StoreError::UnknownTag {
        kind: "date",
        value: s.to_string(),
    })
}
