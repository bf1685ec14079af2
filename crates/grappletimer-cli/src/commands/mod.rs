pub mod config;
pub mod plan;
pub mod preset;
pub mod run;

use clap::Args;
use grappletimer_core::{parse_start_link, Config, TimerConfiguration};

/// Session shape shared by `run` and `plan`.
///
/// Precedence: `--link`, then `--preset`, then the stored default; explicit
/// flags are applied on top.
#[derive(Args, Debug, Default)]
pub struct TimerArgs {
    /// Preset name or id
    #[arg(long, short)]
    pub preset: Option<String>,
    /// Round length (e.g. "5m", "90s")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub round: Option<std::time::Duration>,
    /// Rest length
    #[arg(long, value_parser = humantime::parse_duration)]
    pub rest: Option<std::time::Duration>,
    /// Number of work rounds
    #[arg(long)]
    pub rounds: Option<u32>,
    /// Clapper warning before each round ends
    #[arg(long, value_parser = humantime::parse_duration)]
    pub clapper: Option<std::time::Duration>,
    /// Countdown before the first round (overrides the start-delay setting)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub delay: Option<std::time::Duration>,
    /// grappletimer://start-timer?... link
    #[arg(long, conflicts_with = "preset")]
    pub link: Option<String>,
}

impl TimerArgs {
    pub fn resolve(&self, config: &Config) -> Result<TimerConfiguration, Box<dyn std::error::Error>> {
        let base = match (&self.link, &self.preset) {
            (Some(link), _) => parse_start_link(link, config.timer)?,
            (None, Some(key)) => config
                .find_preset(key)
                .map(|p| p.configuration)
                .ok_or_else(|| grappletimer_core::ConfigError::UnknownPreset(key.clone()))?,
            (None, None) => config.timer,
        };

        let mut cfg = config.apply_settings(base);
        if let Some(d) = self.round {
            cfg.round_duration = d;
        }
        if let Some(d) = self.rest {
            cfg.rest_duration = d;
        }
        if let Some(n) = self.rounds {
            cfg.rounds = n;
        }
        if let Some(d) = self.clapper {
            cfg.clapper_offset = d;
        }
        if let Some(d) = self.delay {
            cfg.start_delay = d;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
