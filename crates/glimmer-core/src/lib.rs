//! Domain layer between `glimmer-ble` and the ingress surfaces (CLI / HTTP).
//!
//! The hard problem this crate solves is rate mismatch: color producers run
//! at up to ~30 samples/second while the strip accepts one slow, stalling
//! command at a time. Three components cover it:
//!
//! - **[`Dispatcher`]** — the command admission controller. Serializes
//!   writes behind a single-flight gate, drops excess color intents under
//!   load, races every admitted command against a timeout, and self-heals
//!   from a stuck in-flight state via a staleness watchdog.
//!
//! - **[`Sampler`]** — turns a live frame source into a bounded-rate stream
//!   of averaged [`Rgb`] samples, delivered through a single-slot `watch`
//!   channel so a slow consumer only ever sees the newest sample.
//!
//! - **[`Matcher`]** — classifies a noisy advertisement stream into a
//!   definite match (early exit) or a ranked candidate list after a fixed
//!   observation window.
//!
//! The strip itself is consumed through the [`Strip`] capability trait;
//! `glimmer-ble`'s [`BledomStrip`](glimmer_ble::BledomStrip) implements it.

pub mod convert;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod matcher;
pub mod model;
pub mod sampler;

// ── Primary re-exports ──────────────────────────────────────────────
pub use device::Strip;
pub use dispatch::{DispatchConfig, Dispatcher};
pub use error::CoreError;
pub use matcher::{Classification, Matcher, MatcherConfig, Observation, run_scan};
pub use model::{Advertisement, CandidateDevice, Intent, Outcome, Rgb, ScanReport};
pub use sampler::{
    Frame, FrameSource, Sampler, SamplerConfig, SamplerHandle, WatchFrameSource, average_frame,
};
