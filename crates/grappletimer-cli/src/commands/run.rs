use std::io::Write;
use std::sync::Arc;

use clap::Args;
use grappletimer_core::error::CoreError;
use grappletimer_core::host::{Cue, CuePlayer, MusicControl, NotificationSink, ScheduledNotification};
use grappletimer_core::{
    format_clock, format_clock_tenths, spawn_engine, Config, Coordinator, Engine, Event, Phase,
    SystemClock, TimerConfiguration,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::TimerArgs;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub timer: TimerArgs,
    /// Print events as JSON lines instead of a live display
    #[arg(long)]
    pub json: bool,
    /// Show tenths of a second
    #[arg(long)]
    pub tenths: bool,
}

/// Terminal bell for cues. Silent in JSON mode.
struct TerminalCues {
    quiet: bool,
}

impl CuePlayer for TerminalCues {
    fn play(&mut self, cue: Cue) {
        debug!(?cue, "cue");
        if !self.quiet && cue != Cue::StartCountdown {
            eprint!("\x07");
        }
    }
}

/// The CLI has no music service; requests are logged.
struct LoggedMusic;

impl MusicControl for LoggedMusic {
    fn resume(&mut self) -> Result<(), CoreError> {
        info!("music: resume playback");
        Ok(())
    }

    fn play(&mut self, uri: &str) -> Result<(), CoreError> {
        info!(uri, "music: play");
        Ok(())
    }

    fn pause(&mut self) -> Result<(), CoreError> {
        info!("music: pause playback");
        Ok(())
    }
}

/// The CLI has no notification center; the plan is logged.
struct LoggedNotifications;

impl NotificationSink for LoggedNotifications {
    fn schedule(&mut self, notifications: &[ScheduledNotification]) -> Result<(), CoreError> {
        for n in notifications {
            debug!(id = %n.id, fire_at = %n.fire_at, title = %n.title, "notification scheduled");
        }
        Ok(())
    }

    fn cancel_all(&mut self) -> Result<(), CoreError> {
        debug!("notifications cleared");
        Ok(())
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let timer = args.timer.resolve(&config)?;
    let show_tenths = args.tenths || config.settings.show_tenths;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(drive(config, timer, args.json, show_tenths))
}

async fn drive(
    config: Config,
    timer: TimerConfiguration,
    json: bool,
    show_tenths: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::new(Arc::new(SystemClock));
    let (handle, task) = spawn_engine(engine, config.engine.poll_interval())?;

    handle
        .add_listener(Coordinator::new(
            Box::new(TerminalCues { quiet: json }),
            Box::new(LoggedMusic),
            Box::new(LoggedNotifications),
            config.settings.music_mode.clone(),
        ))
        .await?;

    let mut events = handle.subscribe();
    if !handle.start(timer).await? {
        return Err("timer configuration was rejected".into());
    }
    if !json {
        eprintln!("controls: p = pause, r = resume, s = status, q = quit");
    }

    let mut display = Display::new(json, show_tenths);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    display.show(&event)?;
                    if matches!(event, Event::PhaseChanged { new: Phase::Idle, .. }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "display fell behind"),
                Err(RecvError::Closed) => break,
            },

            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match line.trim() {
                    "p" | "pause" => {
                        handle.pause().await?;
                    }
                    "r" | "resume" => {
                        handle.resume().await?;
                    }
                    "q" | "quit" | "stop" => {
                        handle.stop().await?;
                    }
                    "s" | "status" => {
                        let snapshot = handle.snapshot().await?;
                        println!("\r\x1b[2K{}", serde_json::to_string(&snapshot)?);
                    }
                    "" => {}
                    other => eprintln!("unknown command: {other}"),
                },
                Ok(None) | Err(_) => stdin_open = false,
            },

            // A resolved future must not be polled again.
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                handle.stop().await?;
            }
        }
    }

    drop(handle);
    let _ = task.await;
    Ok(())
}

/// Renders events either as a single live status line or as JSON lines.
struct Display {
    json: bool,
    show_tenths: bool,
    last_line: String,
}

impl Display {
    fn new(json: bool, show_tenths: bool) -> Self {
        Self {
            json,
            show_tenths,
            last_line: String::new(),
        }
    }

    fn show(&mut self, event: &Event) -> Result<(), Box<dyn std::error::Error>> {
        let mut out = std::io::stdout().lock();
        if self.json {
            if !event.is_tick() {
                writeln!(out, "{}", serde_json::to_string(event)?)?;
            }
            return Ok(());
        }

        match event {
            Event::Tick {
                phase,
                remaining_ms,
                ..
            } => {
                let clock = if self.show_tenths {
                    format_clock_tenths(*remaining_ms)
                } else {
                    format_clock(*remaining_ms)
                };
                let line = format!("{phase}  {clock}");
                if line != self.last_line {
                    write!(out, "\r\x1b[2K{line}")?;
                    out.flush()?;
                    self.last_line = line;
                }
            }
            Event::SessionStarted { session, .. } => {
                let cfg = session.configuration();
                writeln!(
                    out,
                    "{} rounds of {} with {} rest, clapper at {}",
                    cfg.rounds,
                    format_clock(duration_ms(cfg.round_duration)),
                    format_clock(duration_ms(cfg.rest_duration)),
                    format_clock(duration_ms(cfg.clapper_offset)),
                )?;
            }
            Event::PhaseChanged { new, .. } => {
                self.last_line.clear();
                match new {
                    Phase::Done => writeln!(out, "\r\x1b[2KSession complete!")?,
                    Phase::Idle => writeln!(out)?,
                    Phase::Starting { .. } => {}
                    other => writeln!(out, "\r\x1b[2K>> {other}")?,
                }
            }
            Event::Clapper { round, .. } => {
                writeln!(out, "\r\x1b[2K** clapper, round {round}")?;
                self.last_line.clear();
            }
            Event::SessionPaused { .. } => {
                writeln!(out, "\r\x1b[2K|| paused")?;
                self.last_line.clear();
            }
            Event::SessionResumed { paused_ms, .. } => {
                let paused = format_clock(u64::try_from(*paused_ms).unwrap_or(0));
                writeln!(out, "\r\x1b[2K>  resumed after {paused}")?;
                self.last_line.clear();
            }
        }
        Ok(())
    }
}

fn duration_ms(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
