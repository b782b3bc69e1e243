use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use shared::{domain::parse_bound, error::BoundField};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_SETTINGS_FILE: &str = "counter.toml";
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub tick_interval_ms: u64,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            min: None,
            max: None,
        }
    }
}

impl Settings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Applies command-line overrides; `None` leaves the loaded value in place.
    pub fn apply_overrides(
        &mut self,
        tick_interval_ms: Option<u64>,
        min: Option<i64>,
        max: Option<i64>,
    ) {
        if let Some(v) = tick_interval_ms {
            self.tick_interval_ms = v;
        }
        if min.is_some() {
            self.min = min;
        }
        if max.is_some() {
            self.max = max;
        }
        self.sanitize();
    }

    fn sanitize(&mut self) {
        if self.tick_interval_ms == 0 {
            warn!(
                default = DEFAULT_TICK_INTERVAL_MS,
                "tick interval of 0ms is not allowed; using default"
            );
            self.tick_interval_ms = DEFAULT_TICK_INTERVAL_MS;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    tick_interval_ms: Option<u64>,
    min: Option<i64>,
    max: Option<i64>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Defaults, then the settings file, then the environment.
///
/// Without `path`, `counter.toml` in the working directory is read if it
/// exists; an explicit `path` must exist.
pub fn load_settings_from(path: Option<&Path>) -> Result<Settings, SettingsError> {
    let mut settings = Settings::default();
    match path {
        Some(path) => apply_file(&mut settings, path, true)?,
        None => apply_file(&mut settings, Path::new(DEFAULT_SETTINGS_FILE), false)?,
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings.sanitize();
    Ok(settings)
}

fn apply_file(settings: &mut Settings, path: &Path, required: bool) -> Result<(), SettingsError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if !required && err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let file_cfg: FileSettings = toml::from_str(&raw).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(v) = file_cfg.tick_interval_ms {
        settings.tick_interval_ms = v;
    }
    if file_cfg.min.is_some() {
        settings.min = file_cfg.min;
    }
    if file_cfg.max.is_some() {
        settings.max = file_cfg.max;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    for key in ["COUNTER_TICK_MS", "APP__TICK_INTERVAL_MS"] {
        if let Some(raw) = lookup(key) {
            match raw.trim().parse::<u64>() {
                Ok(v) => settings.tick_interval_ms = v,
                Err(_) => warn!(key, value = %raw, "ignoring unparseable tick interval"),
            }
        }
    }

    for (key, field) in [("APP__MIN", BoundField::Min), ("APP__MAX", BoundField::Max)] {
        let Some(raw) = lookup(key) else {
            continue;
        };
        match parse_bound(field, &raw) {
            Ok(v) => match field {
                BoundField::Min => settings.min = v,
                BoundField::Max => settings.max = v,
            },
            Err(err) => warn!(key, %err, "ignoring unparseable bound"),
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
