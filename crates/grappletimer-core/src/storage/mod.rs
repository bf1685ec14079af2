mod config;
mod presets;

pub use config::{AppSettings, Config, EngineConfig};
pub use presets::Preset;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/grappletimer[-dev]/` based on GRAPPLETIMER_ENV.
///
/// Set GRAPPLETIMER_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("GRAPPLETIMER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("grappletimer-dev")
    } else {
        base_dir.join("grappletimer")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
