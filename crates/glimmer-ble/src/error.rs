//! BLE transport error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No Bluetooth adapter, or the adapter never reported powered-on.
    #[error("no Bluetooth adapter is available")]
    AdapterUnavailable,

    /// The target peripheral was never seen while scanning.
    #[error("peripheral '{identifier}' was not discovered within the scan window")]
    DeviceNotFound { identifier: String },

    /// Connected, but the ELK-BLEDOM control service (0xFFF0) is absent.
    #[error("peripheral '{identifier}' does not expose the ELK-BLEDOM control service")]
    ServiceNotFound { identifier: String },

    /// The control service is missing its write characteristic (0xFFF3).
    #[error("control service on '{identifier}' is missing the write characteristic")]
    CharacteristicNotFound { identifier: String },

    /// Underlying platform Bluetooth failure (connect, discovery, write).
    #[error("bluetooth operation failed: {0}")]
    Bluetooth(#[from] bluest::Error),
}
