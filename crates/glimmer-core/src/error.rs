//! Core error types.
//!
//! The split matters for recovery policy: `Transport` and `CommandTimeout`
//! resolve a single intent and leave the dispatcher healthy, while
//! `SourceUnavailable` is fatal to the component's current attempt and is
//! surfaced to the caller without retry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A frame or advertisement source could not be acquired (or went
    /// away). Fatal to that component's current attempt; no auto-retry.
    #[error("source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    /// The strip rejected or failed a command. The dispatcher recovers to
    /// idle on its own; this is reported per-intent.
    #[error("strip transport failed: {0}")]
    Transport(#[from] glimmer_ble::Error),

    /// The strip did not answer within the race window. Recovery-wise the
    /// same as `Transport`, but logged distinctly: a timeout usually means
    /// the link is stalling, not refusing.
    #[error("strip command did not complete within {timeout_ms}ms")]
    CommandTimeout { timeout_ms: u64 },

    #[error("{0}")]
    Internal(String),
}
