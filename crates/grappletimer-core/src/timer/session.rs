//! One instantiated run of a [`TimerConfiguration`].
//!
//! A session is nothing but a start instant, the configuration, and pause
//! bookkeeping. Every query (`phase_at`, `time_remaining_ms`, `clapper_due`)
//! is a pure function of the instant passed in, so two identical queries
//! always agree and a stalled caller never drifts: the next query simply
//! lands further along the timeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::{ceil_secs, TimerConfiguration};
use super::phase::Phase;
use crate::error::ValidationError;

/// Half-window, in milliseconds, around `clapper_offset` inside which the
/// clapper counts as due. Must stay above half the poll cadence or a tick
/// could step over the whole window.
pub const CLAPPER_TOLERANCE_MS: i64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSession")]
pub struct Session {
    configuration: TimerConfiguration,
    start_time: DateTime<Utc>,
    paused_at: Option<DateTime<Utc>>,
    accumulated_pause_ms: i64,
}

/// Unchecked wire form; deserializing goes through [`Session::try_from`] so
/// an invalid configuration cannot sneak in.
#[derive(Deserialize)]
struct RawSession {
    configuration: TimerConfiguration,
    start_time: DateTime<Utc>,
    paused_at: Option<DateTime<Utc>>,
    #[serde(default)]
    accumulated_pause_ms: i64,
}

impl TryFrom<RawSession> for Session {
    type Error = ValidationError;

    fn try_from(raw: RawSession) -> Result<Self, Self::Error> {
        let mut session = Session::new(raw.configuration, raw.start_time)?;
        session.paused_at = raw.paused_at;
        session.accumulated_pause_ms = raw.accumulated_pause_ms.max(0);
        Ok(session)
    }
}

/// De-duplication token for clapper warnings.
///
/// `second` counts whole seconds of `remaining - clapper_offset`, rounded to
/// the nearest second, so every sample inside one tolerance window maps to
/// the same key while different seconds and rounds never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClapperKey {
    pub round: u32,
    pub second: i64,
}

impl ClapperKey {
    pub fn new(round: u32, remaining_ms: u64, clapper_ms: i64) -> Self {
        let remaining = i64::try_from(remaining_ms).unwrap_or(i64::MAX);
        let offset = remaining.saturating_sub(clapper_ms);
        Self {
            round,
            second: offset.saturating_add(CLAPPER_TOLERANCE_MS).div_euclid(1000),
        }
    }
}

impl Session {
    /// Begin a session at `start_time`.
    ///
    /// # Errors
    ///
    /// Returns the validation failure if `configuration` is invalid.
    pub fn new(
        configuration: TimerConfiguration,
        start_time: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        configuration.validate()?;
        Ok(Self {
            configuration,
            start_time,
            paused_at: None,
            accumulated_pause_ms: 0,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn configuration(&self) -> &TimerConfiguration {
        &self.configuration
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn paused_at(&self) -> Option<DateTime<Utc>> {
        self.paused_at
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn accumulated_pause_ms(&self) -> i64 {
        self.accumulated_pause_ms
    }

    pub fn total_duration_ms(&self) -> i64 {
        self.configuration.total_duration_ms()
    }

    /// Active (pause-free) time since `start_time`.
    ///
    /// While paused this is frozen at the pause instant regardless of `at`.
    /// Negative when queried before the session began.
    pub fn elapsed_active_ms(&self, at: DateTime<Utc>) -> i64 {
        let end = self.paused_at.unwrap_or(at);
        (end - self.start_time)
            .num_milliseconds()
            .saturating_sub(self.accumulated_pause_ms)
    }

    pub fn phase_at(&self, at: DateTime<Utc>) -> Phase {
        let elapsed = self.elapsed_active_ms(at);
        if elapsed < 0 {
            return Phase::Idle;
        }

        let cfg = &self.configuration;
        let delay = cfg.start_delay_ms();
        if elapsed < delay {
            return Phase::Starting {
                countdown: ceil_secs(delay - elapsed),
            };
        }

        let active = elapsed - delay;
        if active >= self.total_duration_ms() - delay {
            return Phase::Done;
        }

        let cycle = cfg.cycle_ms();
        let index = active / cycle;
        let into_cycle = active % cycle;
        let Ok(round) = u32::try_from(index + 1) else {
            return Phase::Done;
        };

        if round > cfg.rounds {
            Phase::Done
        } else if into_cycle < cfg.round_ms() {
            Phase::Work {
                round,
                total_rounds: cfg.rounds,
            }
        } else if round < cfg.rounds {
            Phase::Rest {
                round,
                total_rounds: cfg.rounds,
            }
        } else {
            Phase::Done
        }
    }

    /// Time left in `phase` at `at`, never negative.
    ///
    /// `Starting` reports its whole-second countdown; `Idle` and `Done`
    /// report zero.
    pub fn time_remaining_ms(&self, phase: Phase, at: DateTime<Utc>) -> u64 {
        let active = self.elapsed_active_ms(at) - self.configuration.start_delay_ms();
        let remaining = match phase {
            Phase::Starting { countdown } => i64::from(countdown) * 1000,
            Phase::Work { round, .. } => self.work_end_ms(round) - active,
            Phase::Rest { round, .. } => self.rest_end_ms(round) - active,
            Phase::Idle | Phase::Done => 0,
        };
        remaining.max(0) as u64
    }

    /// True when a work round is within [`CLAPPER_TOLERANCE_MS`] of its
    /// clapper offset.
    pub fn clapper_due(&self, at: DateTime<Utc>) -> bool {
        let phase = self.phase_at(at);
        if !matches!(phase, Phase::Work { .. }) {
            return false;
        }
        let remaining = self.time_remaining_ms(phase, at) as i64;
        (remaining - self.configuration.clapper_ms()).abs() < CLAPPER_TOLERANCE_MS
    }

    /// The phase that structurally follows `after`.
    ///
    /// Only used to check the shape of a run; live state is always derived
    /// from the clock through [`phase_at`](Self::phase_at).
    pub fn next_phase(&self, after: Phase) -> Option<Phase> {
        let rounds = self.configuration.rounds;
        let first_round = Phase::Work {
            round: 1,
            total_rounds: rounds,
        };
        match after {
            Phase::Idle if self.configuration.start_delay_ms() > 0 => Some(Phase::Starting {
                countdown: self.configuration.start_countdown(),
            }),
            Phase::Idle | Phase::Starting { .. } => Some(first_round),
            Phase::Work {
                round,
                total_rounds,
            } => Some(if round < total_rounds {
                Phase::Rest {
                    round,
                    total_rounds,
                }
            } else {
                Phase::Done
            }),
            Phase::Rest {
                round,
                total_rounds,
            } => Some(if round < total_rounds {
                Phase::Work {
                    round: round + 1,
                    total_rounds,
                }
            } else {
                Phase::Done
            }),
            Phase::Done => None,
        }
    }

    // ── Pause bookkeeping ────────────────────────────────────────────

    /// Freeze elapsed time at `at`. Returns false if already paused.
    pub fn pause(&mut self, at: DateTime<Utc>) -> bool {
        if self.paused_at.is_some() {
            return false;
        }
        self.paused_at = Some(at);
        true
    }

    /// Unfreeze, folding the paused interval into the accumulated pause.
    ///
    /// Returns the length of the pause in milliseconds, or `None` if the
    /// session was not paused. A clock that moved backwards during the
    /// pause counts as a zero-length pause.
    pub fn resume(&mut self, at: DateTime<Utc>) -> Option<i64> {
        let paused_at = self.paused_at.take()?;
        let pause_ms = (at - paused_at).num_milliseconds().max(0);
        self.accumulated_pause_ms = self.accumulated_pause_ms.saturating_add(pause_ms);
        Some(pause_ms)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn cycle_start_ms(&self, round: u32) -> i64 {
        i64::from(round.saturating_sub(1)).saturating_mul(self.configuration.cycle_ms())
    }

    fn work_end_ms(&self, round: u32) -> i64 {
        self.cycle_start_ms(round)
            .saturating_add(self.configuration.round_ms())
    }

    fn rest_end_ms(&self, round: u32) -> i64 {
        self.cycle_start_ms(round)
            .saturating_add(self.configuration.cycle_ms())
    }
}
