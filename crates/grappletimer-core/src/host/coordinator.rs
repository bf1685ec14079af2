//! Host-side wiring between engine events and side-effecting collaborators.
//!
//! The engine only says *when* something happened. The [`Coordinator`]
//! decides *what* to do about it: which cue to play, what to tell the music
//! service, and how to keep the notification plan in step with pauses.
//! Collaborator failures are logged and swallowed so a flaky music service
//! never disturbs the timer.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::cues::{cue_for_phase, Cue, CuePlayer};
use super::music::{MusicControl, MusicMode};
use super::notifications::{NotificationPlan, NotificationSink};
use crate::events::Event;
use crate::timer::{Engine, Listener, Phase, Session};

pub struct Coordinator {
    cues: Box<dyn CuePlayer>,
    music: Box<dyn MusicControl>,
    notifications: Box<dyn NotificationSink>,
    music_mode: MusicMode,
    plan: Option<NotificationPlan>,
}

impl Coordinator {
    pub fn new(
        cues: Box<dyn CuePlayer>,
        music: Box<dyn MusicControl>,
        notifications: Box<dyn NotificationSink>,
        music_mode: MusicMode,
    ) -> Self {
        Self {
            cues,
            music,
            notifications,
            music_mode,
            plan: None,
        }
    }

    pub fn music_mode(&self) -> &MusicMode {
        &self.music_mode
    }

    pub fn set_music_mode(&mut self, mode: MusicMode) {
        self.music_mode = mode;
    }

    pub fn notification_plan(&self) -> Option<&NotificationPlan> {
        self.plan.as_ref()
    }

    fn on_session_started(&mut self, session: &Session, at: DateTime<Utc>) {
        self.cues.prepare();
        let plan = NotificationPlan::for_session(session);
        self.reschedule(&plan, at);
        self.plan = Some(plan);
    }

    fn on_phase_changed(&mut self, new: Phase) {
        if let Some(cue) = cue_for_phase(new) {
            self.cues.play(cue);
        }

        if let Some(action) = self.music_mode.action_for(new) {
            if let Err(err) = self.music.apply(&action) {
                warn!(%err, ?action, "music control failed");
            }
        }

        if new == Phase::Idle {
            self.plan = None;
            if let Err(err) = self.notifications.cancel_all() {
                warn!(%err, "failed to clear notifications");
            }
            self.cues.end_session();
        }
    }

    fn on_paused(&mut self, at: DateTime<Utc>) {
        if let Some(plan) = self.plan.as_mut() {
            plan.suspend(at);
        }
        if let Err(err) = self.notifications.cancel_all() {
            warn!(%err, "failed to clear notifications on pause");
        }
    }

    fn on_resumed(&mut self, paused_ms: i64, at: DateTime<Utc>) {
        let Some(mut plan) = self.plan.take() else {
            return;
        };
        plan.resume(paused_ms);
        self.reschedule(&plan, at);
        self.plan = Some(plan);
    }

    fn reschedule(&mut self, plan: &NotificationPlan, now: DateTime<Utc>) {
        let pending = plan.pending(now);
        debug!(count = pending.len(), "scheduling notifications");
        let result = self
            .notifications
            .cancel_all()
            .and_then(|()| self.notifications.schedule(&pending));
        if let Err(err) = result {
            warn!(%err, "failed to schedule notifications");
        }
    }
}

impl Listener for Coordinator {
    fn on_event(&mut self, event: &Event) {
        match event {
            Event::SessionStarted { session, at } => self.on_session_started(session, *at),
            Event::PhaseChanged { new, .. } => self.on_phase_changed(*new),
            Event::Clapper { .. } => self.cues.play(Cue::Clapper),
            Event::SessionPaused { at, .. } => self.on_paused(*at),
            Event::SessionResumed { paused_ms, at } => self.on_resumed(*paused_ms, *at),
            Event::Tick { .. } => {}
        }
    }
}

/// An audio-session interruption reported by the platform (phone call,
/// headphones unplugged, another app taking audio focus).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Began,
    Ended { should_resume: bool },
}

/// Pauses a running session when audio is interrupted and resumes it
/// afterwards, but only if the interruption was what paused it.
#[derive(Debug, Default)]
pub struct InterruptionGuard {
    paused_by_interruption: bool,
}

impl InterruptionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `interruption` to `engine`. Returns true if the engine changed.
    pub fn handle(&mut self, engine: &mut Engine, interruption: Interruption) -> bool {
        match interruption {
            Interruption::Began => {
                if engine.phase().is_active() && !engine.is_paused() && engine.pause() {
                    self.paused_by_interruption = true;
                    return true;
                }
                false
            }
            Interruption::Ended { should_resume } => {
                let ours = std::mem::take(&mut self.paused_by_interruption);
                should_resume && ours && engine.is_paused() && engine.resume()
            }
        }
    }
}
