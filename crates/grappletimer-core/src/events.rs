use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Phase, Session};

/// Every observable change in the engine produces an Event.
/// Listeners registered on the engine receive them synchronously, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A fresh session was created. Carries the session so hosts can plan
    /// ahead (notifications, UI totals) without polling.
    SessionStarted {
        session: Session,
        at: DateTime<Utc>,
    },
    /// The derived phase moved. Fires exactly once per boundary, and once
    /// more (`new == Idle`) when a session ends for any reason.
    PhaseChanged {
        old: Phase,
        new: Phase,
        at: DateTime<Utc>,
    },
    /// Periodic progress sample for the current phase.
    Tick {
        phase: Phase,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// The clapper warning for `round` is due.
    Clapper {
        round: u32,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        phase: Phase,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        /// Length of the pause that just ended.
        paused_ms: i64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn is_tick(&self) -> bool {
        matches!(self, Event::Tick { .. })
    }
}
