use serde::{Deserialize, Serialize};

use crate::model::color::Rgb;

/// A requested device-state change.
///
/// Intents are idempotent with respect to the strip's actual state:
/// re-sending the same intent is always safe, which is what makes
/// drop-under-load an acceptable admission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    SetColor(Rgb),
    SetPower { on: bool },
    /// Brightness percentage; values above 100 are clamped at dispatch.
    SetBrightness { level: u8 },
}

/// How a submitted intent resolved. `Skipped` is a normal outcome, not an
/// error: the dispatcher was busy and the frame was dropped by design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Delivered,
    Skipped,
}
