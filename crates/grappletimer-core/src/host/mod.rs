//! Host-side collaborators driven by engine events.
//!
//! None of these touch engine state directly. The [`Coordinator`] is an
//! engine [`Listener`](crate::timer::Listener) that fans events out to a
//! cue player, a music service and a notification center supplied by the
//! host application.

mod coordinator;
mod cues;
mod music;
mod notifications;

pub use coordinator::{Coordinator, Interruption, InterruptionGuard};
pub use cues::{cue_for_phase, Cue, CuePlayer};
pub use music::{MusicAction, MusicControl, MusicMode, NoMusic};
pub use notifications::{NotificationKind, NotificationPlan, NotificationSink, ScheduledNotification};
