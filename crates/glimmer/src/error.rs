//! CLI error types with miette diagnostics.
//!
//! Maps transport and core errors into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use glimmer_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Device selection ─────────────────────────────────────────────

    #[error("No strip configured")]
    #[diagnostic(
        code(glimmer::no_device),
        help(
            "Pass --device <identifier>, set GLIMMER_DEVICE, or add\n\
             device = \"<identifier>\" to {path}.\n\
             Run: glimmer scan to find nearby strips."
        )
    )]
    NoDevice { path: String },

    #[error("Strip '{identifier}' was not seen while scanning")]
    #[diagnostic(
        code(glimmer::device_not_found),
        help("Check that the strip is powered and in range, then run: glimmer scan")
    )]
    DeviceNotFound { identifier: String },

    // ── Transport ────────────────────────────────────────────────────

    #[error("No Bluetooth adapter is available")]
    #[diagnostic(
        code(glimmer::no_adapter),
        help("Check that Bluetooth is enabled and this process may use it.")
    )]
    AdapterUnavailable,

    #[error("Bluetooth error: {0}")]
    #[diagnostic(code(glimmer::bluetooth))]
    Bluetooth(glimmer_ble::Error),

    #[error("Command timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(glimmer::timeout),
        help("The strip did not acknowledge in time. It may be out of range.")
    )]
    Timeout { timeout_ms: u64 },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(glimmer::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(glimmer::config))]
    Config(#[from] glimmer_config::ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(glimmer::json))]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    #[diagnostic(code(glimmer::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoDevice { .. } | Self::Validation { .. } => exit_code::USAGE,
            Self::DeviceNotFound { .. } => exit_code::NOT_FOUND,
            Self::AdapterUnavailable | Self::Bluetooth(_) => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Error mappings ───────────────────────────────────────────────────

impl From<glimmer_ble::Error> for CliError {
    fn from(err: glimmer_ble::Error) -> Self {
        match err {
            glimmer_ble::Error::AdapterUnavailable => Self::AdapterUnavailable,
            glimmer_ble::Error::DeviceNotFound { identifier } => {
                Self::DeviceNotFound { identifier }
            }
            other => Self::Bluetooth(other),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CommandTimeout { timeout_ms } => Self::Timeout { timeout_ms },
            CoreError::Transport(err) => Self::from(err),
            CoreError::SourceUnavailable { reason } => Self::Validation {
                field: "source".into(),
                reason,
            },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}
