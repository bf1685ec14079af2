//! Absolute-time notification plan for a session.
//!
//! A notification center fires on its own schedule while the host is
//! backgrounded, so it cannot watch live phase changes. Instead the whole
//! run is laid out up front from the session's timeline, taken off the
//! schedule while paused, and shifted by the pause length on resume.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;

use crate::error::CoreError;
use crate::timer::{Phase, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Work,
    Rest,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub id: String,
    pub kind: NotificationKind,
    pub round: Option<u32>,
    pub title: String,
    pub body: String,
    pub fire_at: DateTime<Utc>,
}

/// Delivery side of the plan: a platform notification center.
pub trait NotificationSink: Send {
    /// # Errors
    /// Returns an error if the platform refuses the requests.
    fn schedule(&mut self, notifications: &[ScheduledNotification]) -> Result<(), CoreError>;

    /// # Errors
    /// Returns an error if pending requests could not be withdrawn.
    fn cancel_all(&mut self) -> Result<(), CoreError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPlan {
    entries: Vec<ScheduledNotification>,
    paused_at: Option<DateTime<Utc>>,
}

impl NotificationPlan {
    pub fn for_session(session: &Session) -> Self {
        let cfg = session.configuration();
        let origin = session.start_time() + Duration::milliseconds(session.accumulated_pause_ms());

        let entries = cfg
            .timeline()
            .into_iter()
            .filter_map(|span| {
                let fire_at = origin + Duration::milliseconds(span.offset_ms);
                let (kind, round, title, body) = match span.phase {
                    Phase::Work { round, .. } => (
                        NotificationKind::Work,
                        Some(round),
                        format!("Round {round} - WORK"),
                        format!("Time to work! {}", describe(cfg.round_duration)),
                    ),
                    Phase::Rest { round, .. } => (
                        NotificationKind::Rest,
                        Some(round),
                        format!("Round {round} - REST"),
                        format!("Rest time! {}", describe(cfg.rest_duration)),
                    ),
                    Phase::Done => (
                        NotificationKind::Complete,
                        None,
                        "Session Complete!".to_string(),
                        format!("Great work! You completed all {} rounds", cfg.rounds),
                    ),
                    Phase::Idle | Phase::Starting { .. } => return None,
                };
                let id = match round {
                    Some(round) => format!("{kind:?}_{round}_{}", uuid::Uuid::new_v4()),
                    None => format!("{kind:?}_{}", uuid::Uuid::new_v4()),
                }
                .to_lowercase();
                Some(ScheduledNotification {
                    id,
                    kind,
                    round,
                    title,
                    body,
                    fire_at,
                })
            })
            .collect();

        Self {
            entries,
            paused_at: session.paused_at(),
        }
    }

    pub fn entries(&self) -> &[ScheduledNotification] {
        &self.entries
    }

    pub fn is_suspended(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Entries still in the future at `now`. Empty while suspended.
    pub fn pending(&self, now: DateTime<Utc>) -> Vec<ScheduledNotification> {
        if self.is_suspended() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|n| n.fire_at > now)
            .cloned()
            .collect()
    }

    /// Take the plan off the schedule as of `at`.
    pub fn suspend(&mut self, at: DateTime<Utc>) {
        if self.paused_at.is_none() {
            self.paused_at = Some(at);
        }
    }

    /// Push every entry that had not fired by the pause back by `paused_ms`.
    pub fn resume(&mut self, paused_ms: i64) {
        let Some(paused_at) = self.paused_at.take() else {
            return;
        };
        let shift = Duration::milliseconds(paused_ms.max(0));
        for entry in self.entries.iter_mut().filter(|n| n.fire_at > paused_at) {
            entry.fire_at += shift;
        }
    }
}

fn describe(d: StdDuration) -> String {
    let secs = d.as_secs();
    match (secs / 60, secs % 60) {
        (1, 0) => "1 minute".to_string(),
        (m, 0) if m > 0 => format!("{m} minutes"),
        _ => format!("{secs} seconds"),
    }
}
