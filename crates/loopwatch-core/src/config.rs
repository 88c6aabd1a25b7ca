//! Player configuration.
//!
//! Settings are resolved in three layers, highest priority first:
//!
//! 1. Command-line flags (and their `LOOPWATCH_*` environment fallbacks)
//! 2. TOML file (`--config`, or `config.toml` in the platform config dir)
//! 3. Built-in defaults
//!
//! This module owns layers 2 and 3; the binary applies layer 1 on top.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::{Error, Result};

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Output stream settings requested from the audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
        }
    }
}

/// Top-level player configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerConfig {
    /// Period of the non-real-time tick that polls the source file.
    pub tick_interval_ms: u64,
    /// Requested output stream format.
    pub output: OutputSettings,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            output: OutputSettings::default(),
            log_filter: "loopwatch=info,loopwatch_audio=info".to_string(),
        }
    }
}

impl PlayerConfig {
    /// Parse a configuration from TOML text. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::Config(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file that must exist.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Location of the default configuration file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "loopwatch").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Reject settings the player cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be positive".to_string()));
        }
        if self.output.sample_rate == 0 {
            return Err(Error::Config("output.sample_rate must be positive".to_string()));
        }
        if self.output.channels == 0 {
            return Err(Error::Config("output.channels must be positive".to_string()));
        }
        Ok(())
    }

    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Where a [`PlayerConfig`] is read from.
///
/// Resolved before logging is set up (the config carries the log filter), so
/// callers report it once their subscriber is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl ConfigSource {
    /// `explicit` when given, else the platform `config.toml` if it exists,
    /// else the built-in defaults.
    pub fn locate(explicit: Option<&Path>) -> Self {
        if let Some(path) = explicit {
            return Self::File(path.to_path_buf());
        }
        match PlayerConfig::default_path() {
            Some(path) if path.is_file() => Self::File(path),
            _ => Self::Defaults,
        }
    }

    pub fn load(&self) -> Result<PlayerConfig> {
        match self {
            Self::File(path) => PlayerConfig::load(path),
            Self::Defaults => Ok(PlayerConfig::default()),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Defaults => f.write_str("built-in defaults"),
        }
    }
}
