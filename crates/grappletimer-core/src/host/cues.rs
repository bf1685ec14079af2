use serde::{Deserialize, Serialize};

use crate::timer::Phase;

/// Audible/haptic cue a player should produce. What each one sounds or
/// feels like is up to the [`CuePlayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// Round start, rest start, session end.
    Horn,
    /// Warning before a round ends.
    Clapper,
    /// Pre-session countdown began.
    StartCountdown,
}

/// Cue for entering `phase`, if any.
pub fn cue_for_phase(phase: Phase) -> Option<Cue> {
    match phase {
        Phase::Work { .. } | Phase::Rest { .. } | Phase::Done => Some(Cue::Horn),
        Phase::Starting { .. } => Some(Cue::StartCountdown),
        Phase::Idle => None,
    }
}

pub trait CuePlayer: Send {
    fn play(&mut self, cue: Cue);

    /// Called when a session starts; acquire audio/haptic resources here.
    fn prepare(&mut self) {}

    /// Called when a session ends for any reason.
    fn end_session(&mut self) {}
}
