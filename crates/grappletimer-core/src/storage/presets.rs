use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::{format_clock, TimerConfiguration};

/// A named, saved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub id: Uuid,
    pub name: String,
    pub configuration: TimerConfiguration,
    #[serde(default)]
    pub is_default: bool,
}

impl Preset {
    pub fn new(name: impl Into<String>, configuration: TimerConfiguration) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            configuration,
            is_default: false,
        }
    }

    /// Name in the `10×5:00/1:00` style used by the built-in presets.
    pub fn label_for(configuration: &TimerConfiguration) -> String {
        format!(
            "{}×{}/{}",
            configuration.rounds,
            clock(configuration.round_duration),
            clock(configuration.rest_duration)
        )
    }

    /// True if `key` is this preset's id or (case-insensitively) its name.
    pub fn matches(&self, key: &str) -> bool {
        self.name.eq_ignore_ascii_case(key) || self.id.to_string() == key.to_ascii_lowercase()
    }

    pub fn defaults() -> Vec<Preset> {
        let mk = |round: u64, rest: u64, rounds: u32| {
            let cfg = TimerConfiguration::new(
                Duration::from_secs(round),
                Duration::from_secs(rest),
                rounds,
                Duration::from_secs(10),
                Duration::ZERO,
            );
            Preset::new(Preset::label_for(&cfg), cfg)
        };
        let mut presets = vec![mk(300, 60, 10), mk(180, 60, 15), mk(600, 120, 5)];
        presets[0].is_default = true;
        presets
    }
}

fn clock(d: Duration) -> String {
    format_clock(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
