//! Tokio driver for [`Engine`].
//!
//! One task owns the engine. Commands arrive over an mpsc channel and the
//! poll interval ticks only while a session is running, so every mutation
//! and every tick is serialized on that task. Commands are polled before
//! ticks (`biased`), which means once `stop()` has been acknowledged no
//! further tick is ever evaluated for that session.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::config::TimerConfiguration;
use super::engine::{Engine, EngineSnapshot, Listener, ListenerId};
use super::session::CLAPPER_TOLERANCE_MS;
use crate::error::{DriverError, ValidationError};
use crate::events::Event;

/// Default poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Capacity of the broadcast channel handed out by [`EngineHandle::subscribe`].
/// Slow receivers see `RecvError::Lagged` rather than blocking the engine.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

enum Command {
    Start {
        configuration: TimerConfiguration,
        reply: oneshot::Sender<bool>,
    },
    Pause {
        reply: oneshot::Sender<bool>,
    },
    Resume {
        reply: oneshot::Sender<bool>,
    },
    Stop {
        reply: Option<oneshot::Sender<bool>>,
    },
    Snapshot {
        reply: oneshot::Sender<EngineSnapshot>,
    },
    AddListener {
        listener: Box<dyn Listener>,
        reply: oneshot::Sender<ListenerId>,
    },
    RemoveListener {
        id: ListenerId,
        reply: oneshot::Sender<bool>,
    },
}

/// Cloneable handle to an engine running on its own task.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<Event>,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}

/// Check that `interval` polls often enough for the clapper window.
///
/// # Errors
///
/// Fails when the interval is zero or when half of it reaches the clapper
/// tolerance, since a tick could then skip the entire window.
pub fn validate_poll_interval(interval: Duration) -> Result<(), ValidationError> {
    let ms = interval.as_millis();
    if ms == 0 {
        return Err(ValidationError::invalid(
            "poll_interval",
            "must be at least one millisecond",
        ));
    }
    if ms >= (2 * CLAPPER_TOLERANCE_MS) as u128 {
        return Err(ValidationError::invalid(
            "poll_interval",
            format!(
                "must be under {}ms so the clapper window cannot be skipped",
                2 * CLAPPER_TOLERANCE_MS
            ),
        ));
    }
    Ok(())
}

/// Move `engine` onto a new tokio task polling every `poll_interval`.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns an error if `poll_interval` fails [`validate_poll_interval`].
pub fn spawn_engine(
    mut engine: Engine,
    poll_interval: Duration,
) -> Result<(EngineHandle, JoinHandle<()>), ValidationError> {
    validate_poll_interval(poll_interval)?;

    let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let forward = events.clone();
    engine.subscribe(move |event: &Event| {
        // No receivers is fine.
        let _ = forward.send(event.clone());
    });

    let (commands, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(engine, rx, poll_interval));
    Ok((EngineHandle { commands, events }, task))
}

async fn run(mut engine: Engine, mut rx: mpsc::UnboundedReceiver<Command>, poll_interval: Duration) {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            command = rx.recv() => {
                let Some(command) = command else { break };
                let was_running = engine.is_running();
                handle(&mut engine, command);
                if !was_running && engine.is_running() {
                    // First tick one full period after (re)starting.
                    interval.reset();
                }
            }

            _ = interval.tick(), if engine.is_running() => {
                engine.tick();
            }
        }
    }

    debug!("engine handle dropped, shutting down");
    engine.stop();
}

fn handle(engine: &mut Engine, command: Command) {
    match command {
        Command::Start {
            configuration,
            reply,
        } => {
            let _ = reply.send(engine.start(configuration));
        }
        Command::Pause { reply } => {
            let _ = reply.send(engine.pause());
        }
        Command::Resume { reply } => {
            let _ = reply.send(engine.resume());
        }
        Command::Stop { reply } => {
            let stopped = engine.stop();
            if let Some(reply) = reply {
                let _ = reply.send(stopped);
            }
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(engine.snapshot());
        }
        Command::AddListener { listener, reply } => {
            let _ = reply.send(engine.subscribe_boxed(listener));
        }
        Command::RemoveListener { id, reply } => {
            let _ = reply.send(engine.unsubscribe(id));
        }
    }
}

impl EngineHandle {
    /// Start a session. Resolves to false if the configuration was invalid.
    pub async fn start(&self, configuration: TimerConfiguration) -> Result<bool, DriverError> {
        self.request(|reply| Command::Start {
            configuration,
            reply,
        })
        .await
    }

    pub async fn pause(&self) -> Result<bool, DriverError> {
        self.request(|reply| Command::Pause { reply }).await
    }

    pub async fn resume(&self) -> Result<bool, DriverError> {
        self.request(|reply| Command::Resume { reply }).await
    }

    /// Stop the session and wait until the engine has done so. No tick is
    /// evaluated after this resolves.
    pub async fn stop(&self) -> Result<bool, DriverError> {
        self.request(|reply| Command::Stop { reply: Some(reply) })
            .await
    }

    /// Queue a stop without waiting. Usable from inside a [`Listener`],
    /// where awaiting would deadlock the engine task; the stop runs right
    /// after the current event dispatch finishes.
    pub fn request_stop(&self) -> Result<(), DriverError> {
        self.commands
            .send(Command::Stop { reply: None })
            .map_err(|_| DriverError::EngineGone)
    }

    pub async fn snapshot(&self) -> Result<EngineSnapshot, DriverError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Register a synchronous listener on the engine task.
    pub async fn add_listener(
        &self,
        listener: impl Listener + 'static,
    ) -> Result<ListenerId, DriverError> {
        let listener: Box<dyn Listener> = Box::new(listener);
        self.request(|reply| Command::AddListener { listener, reply })
            .await
    }

    pub async fn remove_listener(&self, id: ListenerId) -> Result<bool, DriverError> {
        self.request(|reply| Command::RemoveListener { id, reply })
            .await
    }

    /// Receive every event from now on through a broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, DriverError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .map_err(|_| DriverError::EngineGone)?;
        rx.await.map_err(|_| DriverError::EngineGone)
    }
}
