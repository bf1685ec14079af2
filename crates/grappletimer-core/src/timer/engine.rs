//! Timer engine implementation.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads - whoever owns it calls `tick()` on a fixed cadence (see
//! [`spawn_engine`](super::spawn_engine) for a tokio driver that does this).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Starting? -> Work(1) -> Rest(1) -> ... -> Work(n) -> Done -> Idle
//!                \______________ pause/resume anywhere ______________/
//! ```
//!
//! Phase is re-derived from `(start_time, now, accumulated_pause)` on every
//! tick; nothing is decremented. A late or stalled tick therefore lands on
//! the correct phase, it just reports the transition late.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = Engine::new(Arc::new(SystemClock));
//! engine.subscribe(|event: &Event| println!("{event:?}"));
//! engine.start(TimerConfiguration::default());
//! // Every 100ms:
//! engine.tick();
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::config::TimerConfiguration;
use super::phase::Phase;
use super::session::{ClapperKey, Session};
use crate::events::Event;

/// Receives engine events synchronously on the engine's thread of control.
///
/// Handlers must not block: they run inside `start`/`pause`/`resume`/
/// `stop`/`tick`.
pub trait Listener: Send {
    fn on_event(&mut self, event: &Event);
}

impl<F> Listener for F
where
    F: FnMut(&Event) + Send,
{
    fn on_event(&mut self, event: &Event) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(u64);

/// Read-only view of the engine for hosts and status output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub phase: Phase,
    pub remaining_ms: u64,
    pub is_paused: bool,
    pub session: Option<Session>,
    /// 0.0 .. 100.0 progress across the whole session.
    pub progress_pct: f64,
    pub at: DateTime<Utc>,
}

/// Core interval engine.
///
/// Owns at most one [`Session`] at a time. Constructed once, then started
/// and stopped any number of times.
pub struct Engine {
    clock: Arc<dyn Clock>,
    session: Option<Session>,
    /// Last phase observed, used only to detect changes.
    phase: Phase,
    remaining_ms: u64,
    fired_clapper_keys: HashSet<ClapperKey>,
    /// Latest clock sample for the current session. Samples are clamped so
    /// they never run backwards.
    last_sample: Option<DateTime<Utc>>,
    clock_regressed: bool,
    listeners: Vec<(ListenerId, Box<dyn Listener>)>,
    next_listener_id: u64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("clock", &self.clock)
            .field("session", &self.session)
            .field("phase", &self.phase)
            .field("remaining_ms", &self.remaining_ms)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            session: None,
            phase: Phase::Idle,
            remaining_ms: 0,
            fired_clapper_keys: HashSet::new(),
            last_sample: None,
            clock_regressed: false,
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    // ── Listeners ────────────────────────────────────────────────────

    pub fn subscribe(&mut self, listener: impl Listener + 'static) -> ListenerId {
        self.subscribe_boxed(Box::new(listener))
    }

    pub fn subscribe_boxed(&mut self, listener: Box<dyn Listener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns false if `id` was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn time_remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn is_paused(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_paused)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// True while ticks should be evaluated: a session exists and is not paused.
    pub fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_paused())
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let now = self.peek_now();
        let progress_pct = self
            .session
            .as_ref()
            .map(|s| {
                let total = s.total_duration_ms();
                if total <= 0 {
                    return 0.0;
                }
                let elapsed = s.elapsed_active_ms(now).clamp(0, total);
                elapsed as f64 / total as f64 * 100.0
            })
            .unwrap_or(0.0);

        EngineSnapshot {
            phase: self.phase,
            remaining_ms: self.remaining_ms,
            is_paused: self.is_paused(),
            session: self.session.clone(),
            progress_pct,
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a new session, replacing any current one.
    ///
    /// An invalid configuration is ignored and returns false; hosts should
    /// call [`TimerConfiguration::validate`] first to report why.
    pub fn start(&mut self, configuration: TimerConfiguration) -> bool {
        if let Err(err) = configuration.validate() {
            warn!(%err, "ignoring start with invalid timer configuration");
            return false;
        }

        self.stop();

        let now = self.clock.now();
        let session = match Session::new(configuration, now) {
            Ok(session) => session,
            Err(err) => {
                warn!(%err, "ignoring start with invalid timer configuration");
                return false;
            }
        };

        self.last_sample = Some(now);
        self.clock_regressed = false;
        self.fired_clapper_keys.clear();
        self.session = Some(session.clone());

        info!(
            rounds = configuration.rounds,
            round = %humantime::format_duration(configuration.round_duration),
            rest = %humantime::format_duration(configuration.rest_duration),
            "session started"
        );
        self.dispatch(Event::SessionStarted {
            session: session.clone(),
            at: now,
        });

        let phase = session.phase_at(now);
        self.remaining_ms = session.time_remaining_ms(phase, now);
        if phase != self.phase {
            let old = std::mem::replace(&mut self.phase, phase);
            self.dispatch(Event::PhaseChanged {
                old,
                new: phase,
                at: now,
            });
        }
        true
    }

    /// Freeze the session. No-op without a session or when already paused.
    pub fn pause(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        let now = self.sample();
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.pause(now) {
            return false;
        }

        debug!(phase = %self.phase, remaining_ms = self.remaining_ms, "session paused");
        self.dispatch(Event::SessionPaused {
            phase: self.phase,
            remaining_ms: self.remaining_ms,
            at: now,
        });
        true
    }

    /// Unfreeze the session. No-op unless a session exists and is paused.
    pub fn resume(&mut self) -> bool {
        if !self.is_paused() {
            return false;
        }
        let now = self.sample();
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let Some(paused_ms) = session.resume(now) else {
            return false;
        };

        debug!(paused_ms, "session resumed");
        self.dispatch(Event::SessionResumed { paused_ms, at: now });
        true
    }

    /// End the session. Idempotent.
    ///
    /// Emits a final `PhaseChanged { new: Idle }` when the engine was not
    /// already idle, so collaborators can clean up after a manual abort.
    pub fn stop(&mut self) -> bool {
        let had_session = self.session.take().is_some();
        self.fired_clapper_keys.clear();
        self.remaining_ms = 0;
        self.last_sample = None;

        let old = std::mem::replace(&mut self.phase, Phase::Idle);
        if old != Phase::Idle {
            info!(from = %old, "session stopped");
            let at = self.clock.now();
            self.dispatch(Event::PhaseChanged {
                old,
                new: Phase::Idle,
                at,
            });
        }
        had_session || old != Phase::Idle
    }

    /// Re-evaluate the session against the clock. Call on a fixed cadence.
    pub fn tick(&mut self) {
        if !self.is_running() {
            return;
        }
        let now = self.sample();
        let Some(session) = self.session.clone() else {
            return;
        };

        let phase = session.phase_at(now);
        if phase != self.phase {
            let old = std::mem::replace(&mut self.phase, phase);
            debug!(%old, new = %phase, "phase changed");
            self.dispatch(Event::PhaseChanged {
                old,
                new: phase,
                at: now,
            });
            if phase == Phase::Done {
                info!("session complete");
                self.stop();
                return;
            }
        }

        let remaining_ms = session.time_remaining_ms(phase, now);
        self.remaining_ms = remaining_ms;
        self.dispatch(Event::Tick {
            phase,
            remaining_ms,
            at: now,
        });

        if let Phase::Work { round, .. } = phase {
            if session.clapper_due(now) {
                let key = ClapperKey::new(round, remaining_ms, session.configuration().clapper_ms());
                if self.fired_clapper_keys.insert(key) {
                    debug!(round, remaining_ms, "clapper");
                    self.dispatch(Event::Clapper {
                        round,
                        remaining_ms,
                        at: now,
                    });
                }
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Read the clock, never returning an instant earlier than the last
    /// sample taken for this session.
    fn sample(&mut self) -> DateTime<Utc> {
        let now = self.clock.now();
        match self.last_sample {
            Some(last) if now < last => {
                if !self.clock_regressed {
                    warn!(
                        behind_ms = (last - now).num_milliseconds(),
                        "clock moved backwards; holding session time until it catches up"
                    );
                    self.clock_regressed = true;
                }
                last
            }
            _ => {
                self.clock_regressed = false;
                self.last_sample = Some(now);
                now
            }
        }
    }

    fn peek_now(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        match self.last_sample {
            Some(last) if now < last => last,
            _ => now,
        }
    }

    fn dispatch(&mut self, event: Event) {
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_event(&event);
        }
    }
}
