//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - The default timer configuration
//! - Start delay, display and music settings
//! - Engine poll cadence
//! - Saved presets
//!
//! Configuration is stored at `~/.config/grappletimer/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use super::presets::Preset;
use crate::error::ConfigError;
use crate::host::MusicMode;
use crate::timer::{validate_poll_interval, TimerConfiguration, DEFAULT_POLL_INTERVAL};

/// User-facing settings that shape how a configuration is run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Prepend a countdown of `start_delay` to every session.
    #[serde(default)]
    pub enable_start_delay: bool,
    #[serde(with = "humantime_serde", default = "default_start_delay")]
    pub start_delay: Duration,
    #[serde(default)]
    pub show_tenths: bool,
    #[serde(default)]
    pub music_mode: MusicMode,
}

/// Engine driver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/grappletimer/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfiguration,
    #[serde(default)]
    pub settings: AppSettings,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default = "Preset::defaults")]
    pub presets: Vec<Preset>,
}

// Default functions
fn default_start_delay() -> Duration {
    Duration::from_secs(3)
}
fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            enable_start_delay: false,
            start_delay: default_start_delay(),
            show_tenths: false,
            music_mode: MusicMode::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer: TimerConfiguration::default(),
            settings: AppSettings::default(),
            engine: EngineConfig::default(),
            presets: Preset::defaults(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, fails
    /// validation, or the defaults cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Check the timer, every preset, and the poll cadence.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timer
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                key: format!("timer.{}", e.field().unwrap_or("")),
                message: e.to_string(),
            })?;
        for preset in &self.presets {
            preset
                .configuration
                .validate()
                .map_err(|e| ConfigError::InvalidValue {
                    key: format!("presets.{}", preset.name),
                    message: e.to_string(),
                })?;
        }
        validate_poll_interval(self.engine.poll_interval()).map_err(|e| {
            ConfigError::InvalidValue {
                key: "engine.poll_interval_ms".into(),
                message: e.to_string(),
            }
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. The change only sticks if the resulting
    /// configuration still validates; call [`save`](Self::save) to persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// The default timer with the start-delay setting applied.
    pub fn effective_timer(&self) -> TimerConfiguration {
        self.apply_settings(self.timer)
    }

    /// `configuration` with the start-delay setting applied.
    pub fn apply_settings(&self, configuration: TimerConfiguration) -> TimerConfiguration {
        if self.settings.enable_start_delay {
            configuration.with_start_delay(self.settings.start_delay)
        } else {
            configuration
        }
    }

    // ── Presets ──────────────────────────────────────────────────────

    pub fn find_preset(&self, key: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.matches(key))
    }

    /// # Errors
    ///
    /// Fails if a preset with the same name exists or the configuration
    /// is invalid.
    pub fn add_preset(&mut self, preset: Preset) -> Result<(), ConfigError> {
        if self
            .presets
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(&preset.name))
        {
            return Err(ConfigError::DuplicatePreset(preset.name));
        }
        preset
            .configuration
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                key: format!("presets.{}", preset.name),
                message: e.to_string(),
            })?;
        self.presets.push(preset);
        Ok(())
    }

    /// Replace the preset with the same id.
    ///
    /// # Errors
    ///
    /// Fails if no preset has that id.
    pub fn update_preset(&mut self, preset: Preset) -> Result<(), ConfigError> {
        let slot = self
            .presets
            .iter_mut()
            .find(|p| p.id == preset.id)
            .ok_or_else(|| ConfigError::UnknownPreset(preset.id.to_string()))?;
        *slot = preset;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails if no preset matches `key`.
    pub fn remove_preset(&mut self, key: &str) -> Result<Preset, ConfigError> {
        let index = self
            .presets
            .iter()
            .position(|p| p.matches(key))
            .ok_or_else(|| ConfigError::UnknownPreset(key.to_string()))?;
        Ok(self.presets.remove(index))
    }

    /// Make the matching preset the default timer configuration.
    ///
    /// # Errors
    ///
    /// Fails if no preset matches `key`.
    pub fn select_preset(&mut self, key: &str) -> Result<TimerConfiguration, ConfigError> {
        let configuration = self
            .find_preset(key)
            .map(|p| p.configuration)
            .ok_or_else(|| ConfigError::UnknownPreset(key.to_string()))?;
        self.timer = configuration;
        Ok(configuration)
    }
}
