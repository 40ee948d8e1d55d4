//! Domain model: color samples, device-state intents, and discovery types.

pub mod color;
pub mod discovery;
pub mod intent;

pub use color::Rgb;
pub use discovery::{Advertisement, CandidateDevice, ScanReport};
pub use intent::{Intent, Outcome};
