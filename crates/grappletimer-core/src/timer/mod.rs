mod clock;
mod config;
mod deep_link;
mod driver;
mod engine;
mod format;
mod phase;
mod session;

pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use config::{PhaseSpan, TimerConfiguration, MAX_ROUNDS, MAX_SESSION_DURATION};
pub use deep_link::{parse_start_link, LINK_SCHEME, START_TIMER_HOST};
pub use driver::{
    spawn_engine, validate_poll_interval, EngineHandle, DEFAULT_POLL_INTERVAL,
    EVENT_CHANNEL_CAPACITY,
};
pub use engine::{Engine, EngineSnapshot, Listener, ListenerId};
pub use format::{format_clock, format_clock_tenths};
pub use phase::Phase;
pub use session::{ClapperKey, Session, CLAPPER_TOLERANCE_MS};
