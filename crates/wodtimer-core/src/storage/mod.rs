mod config;
pub mod workout_db;

pub use config::{Config, CountdownConfig, DeviceConfig, DisplayConfig, StopwatchConfig};
pub use workout_db::WorkoutDb;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/wodtimer[-dev]/` based on WODTIMER_ENV.
///
/// Set WODTIMER_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("WODTIMER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("wodtimer-dev")
    } else {
        base_dir.join("wodtimer")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
