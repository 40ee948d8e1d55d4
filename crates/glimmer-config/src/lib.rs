//! Configuration for the glimmer binary.
//!
//! TOML file + environment overrides, with translation to the tuned
//! runtime types in `glimmer_core`. Every field has a sensible default,
//! so a missing config file is a valid configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use glimmer_core::{DispatchConfig, MatcherConfig, SamplerConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Identifier of a known strip, skipping discovery on startup.
    pub device: Option<String>,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub dispatch: DispatchSettings,

    #[serde(default)]
    pub sampler: SamplerSettings,

    #[serde(default)]
    pub scan: ScanSettings,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServerSettings {
    /// HTTP listen address.
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8124".into()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DispatchSettings {
    /// Per-command race window in milliseconds.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// Age in milliseconds past which an in-flight command is presumed
    /// stuck and its gate force-opened.
    #[serde(default = "default_staleness_threshold_ms")]
    pub staleness_threshold_ms: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            command_timeout_ms: default_command_timeout_ms(),
            staleness_threshold_ms: default_staleness_threshold_ms(),
        }
    }
}

fn default_command_timeout_ms() -> u64 {
    500
}
fn default_staleness_threshold_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SamplerSettings {
    /// Sampling cadence in Hz.
    #[serde(default = "default_cadence_hz")]
    pub cadence_hz: u32,

    /// Approximate pixels examined per frame.
    #[serde(default = "default_pixel_target")]
    pub pixel_target: usize,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            cadence_hz: default_cadence_hz(),
            pixel_target: default_pixel_target(),
        }
    }
}

fn default_cadence_hz() -> u32 {
    30
}
fn default_pixel_target() -> usize {
    1000
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ScanSettings {
    /// Short service id identifying the target strip.
    #[serde(default = "default_target_service")]
    pub target_service: String,

    /// Observation window in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Refresh candidate signal strength on repeat advertisements.
    #[serde(default)]
    pub relaxed_duplicates: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            target_service: default_target_service(),
            window_secs: default_window_secs(),
            relaxed_duplicates: false,
        }
    }
}

fn default_target_service() -> String {
    "fff0".into()
}
fn default_window_secs() -> u64 {
    10
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "glimmer", "glimmer").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("glimmer");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the canonical path plus `GLIMMER_`-prefixed environment
/// overrides (e.g. `GLIMMER_DISPATCH__COMMAND_TIMEOUT_MS=250`).
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("GLIMMER_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Translation to runtime types ────────────────────────────────────

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch.command_timeout_ms == 0 {
            return Err(ConfigError::Validation {
                field: "dispatch.command_timeout_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.sampler.cadence_hz == 0 || self.sampler.cadence_hz > 1000 {
            return Err(ConfigError::Validation {
                field: "sampler.cadence_hz".into(),
                reason: format!("expected 1..=1000, got {}", self.sampler.cadence_hz),
            });
        }
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .listen
            .parse()
            .map_err(|_| ConfigError::Validation {
                field: "server.listen".into(),
                reason: format!("invalid socket address: {}", self.server.listen),
            })
    }

    #[must_use]
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            command_timeout: Duration::from_millis(self.dispatch.command_timeout_ms),
            staleness_threshold: Duration::from_millis(self.dispatch.staleness_threshold_ms),
        }
    }

    #[must_use]
    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig::from_cadence_hz(self.sampler.cadence_hz, self.sampler.pixel_target)
    }

    #[must_use]
    pub fn matcher_config(&self) -> MatcherConfig {
        MatcherConfig {
            target_service: self.scan.target_service.clone(),
            window: Duration::from_secs(self.scan.window_secs),
            relaxed_duplicates: self.scan.relaxed_duplicates,
        }
    }
}
