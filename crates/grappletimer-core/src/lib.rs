//! # GrappleTimer Core Library
//!
//! This library provides the core logic for GrappleTimer, a round timer for
//! grappling and combat-sports training. A session is a fixed number of work
//! rounds separated by rests, with a clapper warning shortly before each
//! round ends and an optional countdown before the first round.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine. The phase is always
//!   derived from the session start and accumulated pause time, never from
//!   counting ticks, so it survives suspension, throttling and restarts.
//! - **Driver**: A tokio task that owns the engine and polls it on a fixed
//!   cadence while a session runs.
//! - **Host**: Cue, music and notification collaborators driven by engine
//!   events.
//! - **Storage**: TOML-based configuration and saved presets.
//!
//! ## Key Components
//!
//! - [`Engine`]: Core timer state machine
//! - [`EngineHandle`]: Async handle to an engine running on its own task
//! - [`Coordinator`]: Event listener that drives host side effects
//! - [`Config`]: Application configuration management

pub mod timer;
pub mod host;
pub mod storage;
pub mod events;
pub mod error;

pub use timer::{
    format_clock, format_clock_tenths, parse_start_link, spawn_engine, Clock, Engine,
    EngineHandle, EngineSnapshot, Listener, ListenerId, ManualClock, Phase, Session,
    SystemClock, TimerConfiguration,
};
pub use host::{Coordinator, Cue, CuePlayer, MusicControl, MusicMode, NotificationPlan, NotificationSink};
pub use storage::{Config, Preset};
pub use events::Event;
pub use error::{ConfigError, CoreError, DriverError, ValidationError};
