use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::phase::Phase;
use crate::error::ValidationError;

/// Declarative description of one workout: `rounds` work rounds of
/// `round_duration`, separated by `rest_duration`, with a clapper warning
/// `clapper_offset` before each round ends and an optional countdown first.
///
/// All durations are handled at millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfiguration {
    #[serde(with = "humantime_serde")]
    pub round_duration: Duration,
    #[serde(with = "humantime_serde")]
    pub rest_duration: Duration,
    pub rounds: u32,
    #[serde(with = "humantime_serde")]
    pub clapper_offset: Duration,
    #[serde(with = "humantime_serde", default)]
    pub start_delay: Duration,
}

/// Longest session accepted, start delay included.
pub const MAX_SESSION_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Most work rounds accepted in one session.
pub const MAX_ROUNDS: u32 = 999;

/// One contiguous stretch of a session's timeline, measured in active
/// (pause-free) time from the session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSpan {
    pub phase: Phase,
    pub offset_ms: i64,
    pub duration_ms: i64,
}

impl TimerConfiguration {
    pub fn new(
        round_duration: Duration,
        rest_duration: Duration,
        rounds: u32,
        clapper_offset: Duration,
        start_delay: Duration,
    ) -> Self {
        Self {
            round_duration,
            rest_duration,
            rounds,
            clapper_offset,
            start_delay,
        }
    }

    /// Same configuration with a different start delay.
    pub fn with_start_delay(mut self, start_delay: Duration) -> Self {
        self.start_delay = start_delay;
        self
    }

    /// Check every field.
    ///
    /// # Errors
    ///
    /// Returns the first field that is out of range. A configuration that
    /// fails here can never become a [`Session`](super::Session).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.round_ms() <= 0 {
            return Err(ValidationError::invalid(
                "round_duration",
                "must be at least one millisecond",
            ));
        }
        if self.rest_ms() <= 0 {
            return Err(ValidationError::invalid(
                "rest_duration",
                "must be at least one millisecond",
            ));
        }
        if self.rounds == 0 {
            return Err(ValidationError::invalid("rounds", "must be at least 1"));
        }
        if self.rounds > MAX_ROUNDS {
            return Err(ValidationError::invalid(
                "rounds",
                format!("must be at most {MAX_ROUNDS}"),
            ));
        }
        if self.clapper_ms() >= self.round_ms() {
            return Err(ValidationError::invalid(
                "clapper_offset",
                format!(
                    "must be shorter than the round ({} >= {})",
                    humantime::format_duration(self.clapper_offset),
                    humantime::format_duration(self.round_duration)
                ),
            ));
        }
        if self.total_duration_ms() > duration_ms(MAX_SESSION_DURATION) {
            return Err(ValidationError::invalid(
                "total_duration",
                format!(
                    "session would run longer than {}",
                    humantime::format_duration(MAX_SESSION_DURATION)
                ),
            ));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    // ── Millisecond views ────────────────────────────────────────────

    pub fn round_ms(&self) -> i64 {
        duration_ms(self.round_duration)
    }

    pub fn rest_ms(&self) -> i64 {
        duration_ms(self.rest_duration)
    }

    pub fn clapper_ms(&self) -> i64 {
        duration_ms(self.clapper_offset)
    }

    pub fn start_delay_ms(&self) -> i64 {
        duration_ms(self.start_delay)
    }

    /// Length of one work round plus the rest that follows it.
    pub fn cycle_ms(&self) -> i64 {
        self.round_ms().saturating_add(self.rest_ms())
    }

    /// `start_delay + round * rounds + rest * (rounds - 1)`.
    pub fn total_duration_ms(&self) -> i64 {
        let rounds = i64::from(self.rounds);
        let work = self.round_ms().saturating_mul(rounds);
        let rest = self.rest_ms().saturating_mul((rounds - 1).max(0));
        self.start_delay_ms()
            .saturating_add(work)
            .saturating_add(rest)
    }

    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.total_duration_ms().max(0) as u64)
    }

    /// Countdown value shown when the session opens with a start delay.
    pub fn start_countdown(&self) -> u32 {
        ceil_secs(self.start_delay_ms())
    }

    /// Every phase the session passes through, in order, ending with a
    /// zero-length `Done` span at [`total_duration_ms`](Self::total_duration_ms).
    pub fn timeline(&self) -> Vec<PhaseSpan> {
        let mut spans = Vec::with_capacity(self.rounds as usize * 2 + 1);
        let delay = self.start_delay_ms();
        if delay > 0 {
            spans.push(PhaseSpan {
                phase: Phase::Starting {
                    countdown: self.start_countdown(),
                },
                offset_ms: 0,
                duration_ms: delay,
            });
        }

        let mut offset = delay;
        for round in 1..=self.rounds {
            spans.push(PhaseSpan {
                phase: Phase::Work {
                    round,
                    total_rounds: self.rounds,
                },
                offset_ms: offset,
                duration_ms: self.round_ms(),
            });
            offset = offset.saturating_add(self.round_ms());

            if round < self.rounds {
                spans.push(PhaseSpan {
                    phase: Phase::Rest {
                        round,
                        total_rounds: self.rounds,
                    },
                    offset_ms: offset,
                    duration_ms: self.rest_ms(),
                });
                offset = offset.saturating_add(self.rest_ms());
            }
        }

        spans.push(PhaseSpan {
            phase: Phase::Done,
            offset_ms: offset,
            duration_ms: 0,
        });
        spans
    }
}

impl Default for TimerConfiguration {
    /// Five 5:00 rounds with 1:00 rest and a clapper 10 seconds out.
    fn default() -> Self {
        Self {
            round_duration: Duration::from_secs(300),
            rest_duration: Duration::from_secs(60),
            rounds: 5,
            clapper_offset: Duration::from_secs(10),
            start_delay: Duration::ZERO,
        }
    }
}

pub(crate) fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// Whole seconds, rounded up.
pub(crate) fn ceil_secs(ms: i64) -> u32 {
    if ms <= 0 {
        return 0;
    }
    let secs = ms.saturating_add(999) / 1000;
    u32::try_from(secs).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(round: u64, rest: u64, rounds: u32, clapper: u64, delay: u64) -> TimerConfiguration {
        TimerConfiguration::new(
            Duration::from_secs(round),
            Duration::from_secs(rest),
            rounds,
            Duration::from_secs(clapper),
            Duration::from_secs(delay),
        )
    }

    #[test]
    fn default_is_valid() {
        assert!(TimerConfiguration::default().is_valid());
    }

    #[test]
    fn clapper_must_be_shorter_than_round() {
        let err = config(5, 3, 2, 5, 0).validate().unwrap_err();
        assert_eq!(err.field(), Some("clapper_offset"));
        assert!(config(5, 3, 2, 6, 0).validate().is_err());
        assert!(config(5, 3, 2, 4, 0).is_valid());
    }

    #[test]
    fn zero_fields_are_rejected() {
        assert_eq!(
            config(0, 3, 2, 0, 0).validate().unwrap_err().field(),
            Some("round_duration")
        );
        assert_eq!(
            config(5, 0, 2, 1, 0).validate().unwrap_err().field(),
            Some("rest_duration")
        );
        assert_eq!(
            config(5, 3, 0, 1, 0).validate().unwrap_err().field(),
            Some("rounds")
        );
    }

    #[test]
    fn sub_millisecond_round_counts_as_zero() {
        let mut cfg = config(5, 3, 2, 0, 0);
        cfg.round_duration = Duration::from_micros(400);
        assert!(!cfg.is_valid());
    }

    #[test]
    fn total_duration_includes_delay_and_inner_rests() {
        assert_eq!(config(5, 3, 2, 1, 0).total_duration_ms(), 13_000);
        assert_eq!(config(5, 3, 2, 1, 4).total_duration_ms(), 17_000);
        assert_eq!(config(300, 60, 1, 10, 0).total_duration_ms(), 300_000);
    }

    #[test]
    fn timeline_lists_every_phase_once() {
        let spans = config(5, 3, 2, 1, 3).timeline();
        let phases: Vec<Phase> = spans.iter().map(|s| s.phase).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Starting { countdown: 3 },
                Phase::Work { round: 1, total_rounds: 2 },
                Phase::Rest { round: 1, total_rounds: 2 },
                Phase::Work { round: 2, total_rounds: 2 },
                Phase::Done,
            ]
        );
        assert_eq!(spans[3].offset_ms, 11_000);
        assert_eq!(spans[4].offset_ms, 16_000);
    }

    #[test]
    fn toml_uses_human_durations() {
        let cfg: TimerConfiguration = toml::from_str(
            r#"
            round_duration = "5m"
            rest_duration = "1m"
            rounds = 10
            clapper_offset = "10s"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.round_duration, Duration::from_secs(300));
        assert_eq!(cfg.start_delay, Duration::ZERO);
        assert_eq!(cfg.rounds, 10);
    }

    #[test]
    fn ceil_secs_rounds_up() {
        assert_eq!(ceil_secs(0), 0);
        assert_eq!(ceil_secs(1), 1);
        assert_eq!(ceil_secs(1000), 1);
        assert_eq!(ceil_secs(1001), 2);
        assert_eq!(ceil_secs(i64::MAX), u32::MAX);
    }

    #[test]
    fn oversized_sessions_are_rejected() {
        let huge_delay = config(5, 3, 2, 1, 0).with_start_delay(Duration::from_secs(u64::MAX));
        assert_eq!(huge_delay.validate().unwrap_err().field(), Some("total_duration"));
        assert!(!config(3_600, 3_600, 100, 1, 0).is_valid());
        assert!(config(3_600, 60, 100, 1, 0).is_valid());

        let mut many = config(5, 3, 2, 1, 0);
        many.rounds = MAX_ROUNDS + 1;
        assert_eq!(many.validate().unwrap_err().field(), Some("rounds"));
        many.rounds = MAX_ROUNDS;
        assert!(many.is_valid());
    }
}
