//! Realtime race plumbing: publishing our own progress and folding other
//! racers' updates into a roster. Transport is behind [`ProgressChannel`].
//!
//! This is the seam a race service plugs into: call
//! [`ProgressBroadcaster::on_tick`] from the same tick that drives
//! [`Session::tick_at`] and feed incoming updates to [`Roster::apply`].
//! The terminal binary is single-player and wires neither side up.

use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::time::Instant;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub progress_percent: u8,
    pub wpm: u32,
}

impl ProgressUpdate {
    pub fn from_session(session: &Session, now: Instant) -> Self {
        Self {
            progress_percent: session.progress_percent_at(now),
            wpm: session.current_wpm_at(now),
        }
    }
}

pub trait ProgressChannel {
    fn publish(&mut self, update: ProgressUpdate) -> Result<(), SyncError>;
}

impl ProgressChannel for Sender<ProgressUpdate> {
    fn publish(&mut self, update: ProgressUpdate) -> Result<(), SyncError> {
        self.send(update).map_err(|_| SyncError::ChannelClosed)
    }
}

/// Publishes at most once per tick and only when something changed.
/// Failed publishes are logged and dropped; the next tick sends the
/// latest value anyway.
pub struct ProgressBroadcaster<C> {
    channel: C,
    last_sent: Option<ProgressUpdate>,
}

impl<C: ProgressChannel> ProgressBroadcaster<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            last_sent: None,
        }
    }

    /// Returns whether an update was delivered.
    pub fn on_tick(&mut self, session: &Session, now: Instant) -> bool {
        if !session.is_running() {
            return false;
        }
        self.publish(ProgressUpdate::from_session(session, now))
    }

    pub fn publish(&mut self, update: ProgressUpdate) -> bool {
        if self.last_sent == Some(update) {
            return false;
        }
        match self.channel.publish(update) {
            Ok(()) => {
                self.last_sent = Some(update);
                true
            }
            Err(e) => {
                warn!("dropping race progress update: {e}");
                false
            }
        }
    }

    pub fn last_sent(&self) -> Option<ProgressUpdate> {
        self.last_sent
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub user_id: String,
    pub progress: u8,
    pub wpm: u32,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Latest known state of every racer
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: HashMap<String, RosterEntry>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value wins per user.
    pub fn apply(&mut self, entry: RosterEntry) {
        self.entries.insert(entry.user_id.clone(), entry);
    }

    pub fn get(&self, user_id: &str) -> Option<&RosterEntry> {
        self.entries.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finished racers first by finish time, then the rest by progress.
    pub fn standings(&self) -> Vec<&RosterEntry> {
        self.entries
            .values()
            .sorted_by(|a, b| match (a.finished_at, b.finished_at) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => b
                    .progress
                    .cmp(&a.progress)
                    .then(b.wpm.cmp(&a.wpm))
                    .then(a.user_id.cmp(&b.user_id)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use chrono::TimeZone;
    use std::sync::mpsc;
    use std::time::Duration;

    struct Failing;

    impl ProgressChannel for Failing {
        fn publish(&mut self, _update: ProgressUpdate) -> Result<(), SyncError> {
            Err(SyncError::Rejected("offline".into()))
        }
    }

    fn running_session() -> (Session, Instant) {
        let mut session = Session::new(SessionConfig::words(2), vec!["ab".into(), "cd".into()]);
        let start = Instant::now();
        session.start_at(start);
        (session, start)
    }

    #[test]
    fn broadcasts_changes_only() {
        let (tx, rx) = mpsc::channel();
        let mut broadcaster = ProgressBroadcaster::new(tx);
        let (mut session, start) = running_session();

        assert!(broadcaster.on_tick(&session, start + Duration::from_secs(1)));
        assert!(!broadcaster.on_tick(&session, start + Duration::from_secs(1)));

        session.type_char('a');
        session.type_char('b');
        assert!(broadcaster.on_tick(&session, start + Duration::from_secs(2)));

        let sent: Vec<ProgressUpdate> = rx.try_iter().collect();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].progress_percent > sent[0].progress_percent);
    }

    #[test]
    fn idle_session_is_not_broadcast() {
        let (tx, rx) = mpsc::channel();
        let mut broadcaster = ProgressBroadcaster::new(tx);
        let session = Session::new(SessionConfig::words(1), vec!["ab".into()]);
        assert!(!broadcaster.on_tick(&session, Instant::now()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn failures_are_dropped_not_retried() {
        let mut broadcaster = ProgressBroadcaster::new(Failing);
        let update = ProgressUpdate {
            progress_percent: 10,
            wpm: 40,
        };
        assert!(!broadcaster.publish(update));
        assert_eq!(broadcaster.last_sent(), None);
    }

    #[test]
    fn closed_channel_maps_to_sync_error() {
        let (mut tx, rx) = mpsc::channel();
        drop(rx);
        let update = ProgressUpdate {
            progress_percent: 1,
            wpm: 1,
        };
        assert!(matches!(tx.publish(update), Err(SyncError::ChannelClosed)));
    }

    #[test]
    fn roster_last_value_wins() {
        let mut roster = Roster::new();
        let entry = |progress, wpm| RosterEntry {
            user_id: "ada".into(),
            progress,
            wpm,
            finished_at: None,
        };
        roster.apply(entry(40, 60));
        roster.apply(entry(30, 55));
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get("ada").map(|e| e.progress), Some(30));
    }

    #[test]
    fn standings_put_finishers_first() {
        let mut roster = Roster::new();
        let t = |s| Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, s).unwrap();
        roster.apply(RosterEntry {
            user_id: "slow".into(),
            progress: 100,
            wpm: 50,
            finished_at: Some(t(40)),
        });
        roster.apply(RosterEntry {
            user_id: "fast".into(),
            progress: 100,
            wpm: 90,
            finished_at: Some(t(20)),
        });
        roster.apply(RosterEntry {
            user_id: "mid".into(),
            progress: 70,
            wpm: 70,
            finished_at: None,
        });
        roster.apply(RosterEntry {
            user_id: "late".into(),
            progress: 20,
            wpm: 80,
            finished_at: None,
        });
        let order: Vec<&str> = roster.standings().iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(order, vec!["fast", "slow", "mid", "late"]);
    }
}
