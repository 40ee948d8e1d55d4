use serde::Serialize;

/// One advertisement event as the matcher sees it.
///
/// BLE advertisement payloads are unreliable: the service list may be
/// empty in some packets from a device that does advertise the target
/// service, and names come and go. The matcher is built around that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub identifier: String,
    pub display_name: Option<String>,
    /// Advertised service UUIDs in short form (e.g. `"fff0"`).
    pub service_ids: Vec<String>,
    pub connectable: bool,
    /// Signal strength in dBm; stronger is closer to zero.
    pub signal_strength: i16,
}

/// A plausible target retained by the matcher, one per unique identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateDevice {
    pub identifier: String,
    pub display_name: Option<String>,
    pub signal_strength: i16,
}

/// Result of an observation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ScanReport {
    /// An advertisement carried the target service id — unambiguous.
    Definite { identifier: String },
    /// No definite match before the window elapsed; ranked best guesses
    /// (possibly empty) for a human to pick from.
    Candidates(Vec<CandidateDevice>),
}
