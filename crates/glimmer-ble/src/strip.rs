// ── Connected strip handle ──
//
// Connection flow mirrors how the strip actually behaves in the field:
// scan until the target identifier shows up, connect, resolve the 0xFFF0
// control service and its 0xFFF3 write characteristic, then write fixed
// command frames without response. Writes are slow (hundreds of ms) and
// can stall; callers enforce their own timeouts.

use std::time::Duration;

use bluest::{Adapter, Characteristic, Device};
use futures_util::StreamExt;
use tracing::{debug, info, trace, warn};

use crate::error::Error;
use crate::protocol;
use crate::scanner::Scanner;

/// A connected ELK-BLEDOM strip.
pub struct BledomStrip {
    adapter: Adapter,
    device: Device,
    write: Characteristic,
    identifier: String,
}

impl BledomStrip {
    /// Scan for the peripheral with `identifier`, connect, and resolve its
    /// control characteristic.
    ///
    /// Acquisition is scoped: if characteristic resolution fails after the
    /// link came up, the connection is torn down before the error returns.
    pub async fn connect(identifier: &str, discovery_timeout: Duration) -> Result<Self, Error> {
        let scanner = Scanner::new().await?;
        let adapter = scanner.adapter().clone();

        let device = tokio::time::timeout(discovery_timeout, find_device(&scanner, identifier))
            .await
            .map_err(|_| Error::DeviceNotFound {
                identifier: identifier.to_owned(),
            })??;

        debug!(identifier, "peripheral discovered; connecting");
        adapter.connect_device(&device).await?;

        match resolve_write_characteristic(&device, identifier).await {
            Ok(write) => {
                info!(identifier, "connected to strip");
                Ok(Self {
                    adapter,
                    device,
                    write,
                    identifier: identifier.to_owned(),
                })
            }
            Err(err) => {
                warn!(identifier, error = %err, "service resolution failed; disconnecting");
                let _ = adapter.disconnect_device(&device).await;
                Err(err)
            }
        }
    }

    /// The identifier this strip was connected with.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Set a static color.
    pub async fn set_color(&self, r: u8, g: u8, b: u8) -> Result<(), Error> {
        trace!(r, g, b, "writing color frame");
        self.write
            .write_without_response(&protocol::color_frame(r, g, b))
            .await?;
        Ok(())
    }

    /// Switch the strip on or off.
    pub async fn set_power(&self, on: bool) -> Result<(), Error> {
        debug!(on, "writing power frame");
        self.write
            .write_without_response(&protocol::power_frame(on))
            .await?;
        Ok(())
    }

    /// Set brightness as a percentage (clamped to 100).
    pub async fn set_brightness(&self, level: u8) -> Result<(), Error> {
        debug!(level, "writing brightness frame");
        self.write
            .write_without_response(&protocol::brightness_frame(level))
            .await?;
        Ok(())
    }

    /// Tear down the connection. Called explicitly at shutdown; any command
    /// still in flight on the link is abandoned, not awaited.
    pub async fn disconnect(&self) -> Result<(), Error> {
        debug!(identifier = %self.identifier, "disconnecting strip");
        self.adapter.disconnect_device(&self.device).await?;
        Ok(())
    }
}

/// Scan until an advertisement with a matching identifier arrives.
async fn find_device(scanner: &Scanner, identifier: &str) -> Result<Device, Error> {
    let mut advertisements = scanner.advertisements().await?;
    while let Some(peripheral) = advertisements.next().await {
        if peripheral.identifier.eq_ignore_ascii_case(identifier) {
            return Ok(peripheral.device);
        }
    }
    Err(Error::DeviceNotFound {
        identifier: identifier.to_owned(),
    })
}

async fn resolve_write_characteristic(
    device: &Device,
    identifier: &str,
) -> Result<Characteristic, Error> {
    let services = device.discover_services().await?;
    let service = services
        .into_iter()
        .find(|s| s.uuid() == protocol::SERVICE_UUID)
        .ok_or_else(|| Error::ServiceNotFound {
            identifier: identifier.to_owned(),
        })?;

    let characteristics = service.discover_characteristics().await?;
    characteristics
        .into_iter()
        .find(|c| c.uuid() == protocol::WRITE_CHARACTERISTIC_UUID)
        .ok_or_else(|| Error::CharacteristicNotFound {
            identifier: identifier.to_owned(),
        })
}
