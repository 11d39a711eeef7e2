//! Configuration management
//!
//! Layered: built-in defaults, then an optional TOML file, then environment
//! variables such as `INCALL__SESSION__MAX_CALLS=2`.

use crate::domain::audio_route::AudioRoute;
use crate::domain::presentation::Capabilities;
use crate::domain::shared::error::{DomainError, Result};
use config::{Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub audio: AudioConfig,
    pub logging: LoggingConfig,
    pub events: EventsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_calls: usize,
    pub transfer_allowed: bool,
    pub options_disabled: bool,
    pub speaker_supported: bool,
    /// 0 disables auto-hide
    pub controls_hide_delay_ms: u64,
    pub command_queue_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub initial_route: AudioRoute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_calls: 4,
            transfer_allowed: true,
            options_disabled: false,
            speaker_supported: true,
            controls_hide_delay_ms: 3000,
            command_queue_depth: 64,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            initial_route: AudioRoute::Earpiece,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

impl Config {
    /// Load defaults, the optional file, then `INCALL__*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("INCALL")
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| DomainError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(document: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(document).map_err(|e| DomainError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session.max_calls == 0 {
            return Err(DomainError::Config(
                "session.max_calls must be at least 1".to_string(),
            ));
        }
        if self.session.command_queue_depth == 0 {
            return Err(DomainError::Config(
                "session.command_queue_depth must be at least 1".to_string(),
            ));
        }
        if self.events.capacity == 0 {
            return Err(DomainError::Config(
                "events.capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            max_calls: self.session.max_calls,
            transfer_allowed: self.session.transfer_allowed,
            options_disabled: self.session.options_disabled,
            speaker_supported: self.session.speaker_supported,
        }
    }

    pub fn controls_hide_delay(&self) -> Option<Duration> {
        match self.session.controls_hide_delay_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}
