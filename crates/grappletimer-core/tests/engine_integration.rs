//! Integration tests for the timer engine.
//!
//! These drive a full session through the public API with a manual clock
//! and check the properties hosts rely on: phases only move forward, pauses
//! are invisible to the schedule, every round gets exactly one clapper, and
//! ending a session is always clean.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use proptest::prelude::*;

use grappletimer_core::timer::MAX_SESSION_DURATION;
use grappletimer_core::{
    parse_start_link, Config, Engine, Event, ManualClock, NotificationPlan, Phase, Session,
    TimerConfiguration,
};

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-05-10T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn secs(round: u64, rest: u64, rounds: u32, clapper: u64) -> TimerConfiguration {
    TimerConfiguration::new(
        Duration::from_secs(round),
        Duration::from_secs(rest),
        rounds,
        Duration::from_secs(clapper),
        Duration::ZERO,
    )
}

/// Position of a phase along a session; strictly increases across a run.
fn rank(phase: Phase) -> i64 {
    match phase {
        Phase::Idle => i64::MIN,
        Phase::Starting { countdown } => -i64::from(countdown),
        Phase::Work { round, .. } => 2 * i64::from(round) - 1,
        Phase::Rest { round, .. } => 2 * i64::from(round),
        Phase::Done => i64::MAX,
    }
}

struct Recorder {
    engine: Engine,
    clock: ManualClock,
    events: Arc<Mutex<Vec<Event>>>,
}

fn recorder() -> Recorder {
    let clock = ManualClock::new(t0());
    let mut engine = Engine::new(Arc::new(clock.clone()));
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine.subscribe(move |event: &Event| {
        if !event.is_tick() {
            sink.lock().unwrap().push(event.clone());
        }
    });
    Recorder {
        engine,
        clock,
        events,
    }
}

impl Recorder {
    fn run_with_step(&mut self, step: Duration) {
        while self.engine.session().is_some() {
            self.clock.advance(step);
            self.engine.tick();
        }
    }

    fn phase_changes(&self) -> Vec<Phase> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Event::PhaseChanged { new, .. } => Some(*new),
                _ => None,
            })
            .collect()
    }

    fn clappers_per_round(&self) -> BTreeMap<u32, usize> {
        let mut counts = BTreeMap::new();
        for event in self.events.lock().unwrap().iter() {
            if let Event::Clapper { round, .. } = event {
                *counts.entry(*round).or_insert(0) += 1;
            }
        }
        counts
    }
}

fn arb_config() -> impl Strategy<Value = TimerConfiguration> {
    (2u64..=600, 1u64..=120, 1u32..=8, 0u64..=5).prop_flat_map(|(round, rest, rounds, delay)| {
        (1u64..round).prop_map(move |clapper| TimerConfiguration {
            round_duration: Duration::from_secs(round),
            rest_duration: Duration::from_secs(rest),
            rounds,
            clapper_offset: Duration::from_secs(clapper),
            start_delay: Duration::from_secs(delay),
        })
    })
}

/// A configuration plus a poll step shorter than its shortest phase.
fn arb_config_and_step() -> impl Strategy<Value = (TimerConfiguration, u64)> {
    arb_config().prop_flat_map(|cfg| {
        let mut shortest = cfg.round_ms().min(cfg.rest_ms());
        if cfg.start_delay_ms() > 0 {
            shortest = shortest.min(1_000);
        }
        let shortest = shortest as u64;
        (Just(cfg), (shortest / 2).max(1)..shortest)
    })
}

/// Every phase a run must pass through, countdown seconds included.
fn expected_changes(cfg: &TimerConfiguration) -> Vec<Phase> {
    let mut phases: Vec<Phase> = (1..=cfg.start_countdown())
        .rev()
        .map(|countdown| Phase::Starting { countdown })
        .collect();
    for round in 1..=cfg.rounds {
        phases.push(Phase::Work {
            round,
            total_rounds: cfg.rounds,
        });
        if round < cfg.rounds {
            phases.push(Phase::Rest {
                round,
                total_rounds: cfg.rounds,
            });
        }
    }
    phases.extend([Phase::Done, Phase::Idle]);
    phases
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn run_visits_every_phase_at_any_short_step((cfg, step_ms) in arb_config_and_step()) {
        let mut rec = recorder();
        prop_assert!(rec.engine.start(cfg));
        rec.run_with_step(Duration::from_millis(step_ms));
        prop_assert_eq!(rec.phase_changes(), expected_changes(&cfg));
    }
}

proptest! {
    #[test]
    fn phase_is_a_pure_function_of_elapsed_time(cfg in arb_config(), offset_ms in 0i64..5_000_000) {
        let a = Session::new(cfg, t0()).unwrap();
        let b = Session::new(cfg, t0()).unwrap();
        let at = t0() + chrono::Duration::milliseconds(offset_ms);
        prop_assert_eq!(a.phase_at(at), b.phase_at(at));
        prop_assert_eq!(a.phase_at(at), a.phase_at(at));
    }

    #[test]
    fn phases_never_move_backwards(cfg in arb_config(), mut offsets in prop::collection::vec(0i64..5_000_000, 2..40)) {
        let session = Session::new(cfg, t0()).unwrap();
        offsets.sort_unstable();
        let ranks: Vec<i64> = offsets
            .iter()
            .map(|ms| rank(session.phase_at(t0() + chrono::Duration::milliseconds(*ms))))
            .collect();
        prop_assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
        let end = t0() + chrono::Duration::milliseconds(cfg.total_duration_ms());
        prop_assert_eq!(session.phase_at(end), Phase::Done);
    }

    #[test]
    fn pauses_shift_the_schedule_exactly(
        cfg in arb_config(),
        pause_at_ms in 0i64..1_000_000,
        pause_len_ms in 0i64..3_600_000,
        later_ms in 0i64..2_000_000,
    ) {
        let reference = Session::new(cfg, t0()).unwrap();
        let mut paused = Session::new(cfg, t0()).unwrap();

        let pause_start = t0() + chrono::Duration::milliseconds(pause_at_ms);
        let pause_end = pause_start + chrono::Duration::milliseconds(pause_len_ms);
        prop_assert!(paused.pause(pause_start));
        prop_assert_eq!(paused.phase_at(pause_end), reference.phase_at(pause_start));
        prop_assert_eq!(paused.resume(pause_end), Some(pause_len_ms));

        let sample_at = pause_start + chrono::Duration::milliseconds(later_ms);
        let shifted = sample_at + chrono::Duration::milliseconds(pause_len_ms);
        let phase = reference.phase_at(sample_at);
        prop_assert_eq!(paused.phase_at(shifted), phase);
        prop_assert_eq!(
            paused.time_remaining_ms(phase, shifted),
            reference.time_remaining_ms(phase, sample_at)
        );
    }

    #[test]
    fn every_round_gets_exactly_one_clapper(
        round in 2u64..20,
        rest in 1u64..5,
        rounds in 1u32..4,
        step_ms in 50u64..1_000,
    ) {
        let clapper = round / 2;
        prop_assume!(clapper >= 1);
        let mut rec = recorder();
        prop_assert!(rec.engine.start(secs(round, rest, rounds, clapper)));
        rec.run_with_step(Duration::from_millis(step_ms));

        let counts = rec.clappers_per_round();
        prop_assert_eq!(counts.len(), rounds as usize);
        prop_assert!(counts.values().all(|n| *n == 1));
    }
}

#[test]
fn full_run_visits_every_phase_in_order() {
    let mut rec = recorder();
    assert!(rec.engine.start(secs(5, 3, 3, 1)));
    rec.run_with_step(Duration::from_millis(100));

    let work = |round| Phase::Work { round, total_rounds: 3 };
    let rest = |round| Phase::Rest { round, total_rounds: 3 };
    assert_eq!(
        rec.phase_changes(),
        vec![work(1), rest(1), work(2), rest(2), work(3), Phase::Done, Phase::Idle]
    );

    let events = rec.events.lock().unwrap();
    assert!(matches!(events.first(), Some(Event::SessionStarted { .. })));
    let done_at = events
        .iter()
        .find_map(|e| match e {
            Event::PhaseChanged { new: Phase::Done, at, .. } => Some(*at),
            _ => None,
        })
        .unwrap();
    assert_eq!(done_at, t0() + chrono::Duration::seconds(21));
}

#[test]
fn start_delay_counts_down_before_round_one() {
    let mut rec = recorder();
    assert!(rec.engine.start(secs(5, 3, 1, 1).with_start_delay(Duration::from_secs(3))));
    assert_eq!(rec.engine.phase(), Phase::Starting { countdown: 3 });
    rec.run_with_step(Duration::from_millis(100));

    let changes = rec.phase_changes();
    assert_eq!(
        &changes[..4],
        &[
            Phase::Starting { countdown: 3 },
            Phase::Starting { countdown: 2 },
            Phase::Starting { countdown: 1 },
            Phase::Work { round: 1, total_rounds: 1 },
        ]
    );
    assert_eq!(changes.last(), Some(&Phase::Idle));
}

#[test]
fn stalled_host_lands_on_the_right_phase() {
    let mut rec = recorder();
    rec.engine.start(secs(5, 3, 3, 1));

    // Host suspended for 14.5s: one late tick, no replay of missed phases.
    rec.clock.advance(Duration::from_millis(14_500));
    rec.engine.tick();
    assert_eq!(rec.engine.phase(), Phase::Rest { round: 2, total_rounds: 3 });
    assert_eq!(rec.engine.time_remaining_ms(), 1_500);
    assert_eq!(
        rec.phase_changes(),
        vec![
            Phase::Work { round: 1, total_rounds: 3 },
            Phase::Rest { round: 2, total_rounds: 3 },
        ]
    );
}

#[test]
fn pause_freezes_display_and_resume_continues() {
    let mut rec = recorder();
    rec.engine.start(secs(5, 3, 2, 1));
    rec.clock.advance(Duration::from_secs(2));
    rec.engine.tick();
    assert!(rec.engine.pause());
    assert!(!rec.engine.pause());

    rec.clock.advance(Duration::from_secs(600));
    rec.engine.tick();
    assert_eq!(rec.engine.time_remaining_ms(), 3_000);
    assert_eq!(rec.engine.phase(), Phase::Work { round: 1, total_rounds: 2 });

    assert!(rec.engine.resume());
    rec.clock.advance(Duration::from_millis(3_500));
    rec.engine.tick();
    assert_eq!(rec.engine.phase(), Phase::Rest { round: 1, total_rounds: 2 });

    let events = rec.events.lock().unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::SessionResumed { paused_ms: 600_000, .. }
    )));
}

#[test]
fn clock_regression_holds_the_session() {
    let mut rec = recorder();
    rec.engine.start(secs(5, 3, 2, 1));
    rec.clock.advance(Duration::from_secs(4));
    rec.engine.tick();
    let remaining = rec.engine.time_remaining_ms();

    rec.clock.set(t0());
    rec.engine.tick();
    assert_eq!(rec.engine.phase(), Phase::Work { round: 1, total_rounds: 2 });
    assert_eq!(rec.engine.time_remaining_ms(), remaining);
}

#[test]
fn invalid_configuration_is_rejected_without_events() {
    let mut rec = recorder();
    assert!(!rec.engine.start(secs(5, 3, 0, 1)));
    assert!(!rec.engine.start(secs(5, 3, 2, 5)));
    assert!(!rec.engine.start(secs(0, 3, 2, 0)));
    assert!(!rec.engine.start(secs(5, 0, 2, 1)));
    assert_eq!(rec.engine.phase(), Phase::Idle);
    assert!(rec.events.lock().unwrap().is_empty());
}

#[test]
fn stop_is_idempotent_and_ends_with_idle() {
    let mut rec = recorder();
    rec.engine.start(secs(5, 3, 2, 1));
    assert!(rec.engine.stop());
    assert!(!rec.engine.stop());
    rec.clock.advance(Duration::from_secs(5));
    rec.engine.tick();

    assert_eq!(
        rec.phase_changes(),
        vec![Phase::Work { round: 1, total_rounds: 2 }, Phase::Idle]
    );
    assert!(!rec.engine.pause());
    assert!(!rec.engine.resume());
}

#[test]
fn restart_replaces_the_running_session() {
    let mut rec = recorder();
    rec.engine.start(secs(5, 3, 2, 1));
    rec.clock.advance(Duration::from_secs(3));
    rec.engine.tick();
    assert!(rec.engine.start(secs(10, 3, 1, 2)));
    assert_eq!(rec.engine.phase(), Phase::Work { round: 1, total_rounds: 1 });
    assert_eq!(rec.engine.time_remaining_ms(), 10_000);
}

#[test]
fn start_link_runs_with_stored_defaults() {
    let config = Config::default();
    let cfg = parse_start_link(
        "grappletimer://start-timer?round=6&rest=2&rounds=2&clapper=2",
        config.effective_timer(),
    )
    .unwrap();

    let mut rec = recorder();
    assert!(rec.engine.start(cfg));
    rec.run_with_step(Duration::from_millis(250));
    assert_eq!(rec.phase_changes().len(), 5);
    assert_eq!(rec.clappers_per_round().len(), 2);
}

#[test]
fn oversized_configurations_never_start() {
    let mut rec = recorder();
    let huge_delay = secs(5, 3, 2, 1).with_start_delay(Duration::from_secs(u64::MAX));
    assert!(!rec.engine.start(huge_delay));

    let err = parse_start_link(
        "grappletimer://start-timer?delay=1e17",
        TimerConfiguration::default(),
    )
    .unwrap_err();
    assert_eq!(err.field(), Some("total_duration"));

    assert_eq!(rec.engine.phase(), Phase::Idle);
    assert!(rec.events.lock().unwrap().is_empty());
}

#[test]
fn longest_accepted_session_plans_and_runs() {
    let cfg = secs(60, 60, 1, 1).with_start_delay(MAX_SESSION_DURATION - Duration::from_secs(60));
    assert!(cfg.is_valid());

    let session = Session::new(cfg, t0()).unwrap();
    let plan = NotificationPlan::for_session(&session);
    assert_eq!(
        plan.entries().last().map(|n| n.fire_at),
        Some(t0() + chrono::Duration::from_std(MAX_SESSION_DURATION).unwrap())
    );

    let mut rec = recorder();
    assert!(rec.engine.start(cfg));
    assert_eq!(
        rec.engine.phase(),
        Phase::Starting {
            countdown: cfg.start_countdown()
        }
    );
}
