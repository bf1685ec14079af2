use std::fmt;

use serde::{Deserialize, Serialize};

/// Stage of a session. Rounds are 1-indexed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    /// Pre-session countdown; `countdown` is whole seconds left and never 0.
    Starting { countdown: u32 },
    Work { round: u32, total_rounds: u32 },
    /// Rest after `round`. Only exists while `round < total_rounds`.
    Rest { round: u32, total_rounds: u32 },
    Done,
}

impl Phase {
    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Idle => "Ready",
            Phase::Starting { .. } => "Get Ready",
            Phase::Work { .. } => "WORK",
            Phase::Rest { .. } => "REST",
            Phase::Done => "DONE",
        }
    }

    /// True while a session is counting down, working or resting.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Phase::Starting { .. } | Phase::Work { .. } | Phase::Rest { .. }
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Starting { countdown } => write!(f, "{} ({countdown})", self.display_name()),
            Phase::Work {
                round,
                total_rounds,
            }
            | Phase::Rest {
                round,
                total_rounds,
            } => write!(f, "{} {round}/{total_rounds}", self.display_name()),
            _ => f.write_str(self.display_name()),
        }
    }
}
