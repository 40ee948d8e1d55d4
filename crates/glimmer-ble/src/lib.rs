//! BLE transport for ELK-BLEDOM ("LotusLantern") LED strips.
//!
//! This crate owns everything that touches the radio:
//!
//! - **[`Scanner`]** — wraps the system Bluetooth adapter and exposes the
//!   advertisement firehose as a stream of [`DiscoveredPeripheral`]s. The
//!   scanner waits for the adapter to report powered-on before scanning.
//!
//! - **[`BledomStrip`]** — a connected peripheral handle. Resolves the
//!   control service (`0xFFF0`) and its write characteristic (`0xFFF3`),
//!   then issues color / power / brightness command frames.
//!
//! - **[`protocol`]** — the 9-byte `0x7E … 0xEF` command frame layouts.
//!
//! Consumers (the `glimmer-core` crate) treat the strip as an opaque slow
//! capability: every write here can take hundreds of milliseconds and may
//! stall entirely. Pacing, admission, and timeouts are the caller's job.

pub mod error;
pub mod protocol;
pub mod scanner;
pub mod strip;

pub use error::Error;
pub use scanner::{DiscoveredPeripheral, Scanner};
pub use strip::BledomStrip;
