// ── Advertisement scanner ──
//
// Wraps the system adapter and turns the platform advertisement callbacks
// into a plain `Stream`. No filtering or dedup happens here — that is the
// matcher's job in glimmer-core. The scanner only normalizes the payload.

use bluest::{Adapter, AdvertisingDevice, Device};
use futures_util::{Stream, StreamExt};
use tracing::{debug, info};

use crate::error::Error;
use crate::protocol::short_uuid;

/// One normalized advertisement event.
///
/// Keeps the platform [`Device`] handle alive so a scan hit can be promoted
/// straight to a connection without a second discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoveredPeripheral {
    /// Platform-stable peripheral identifier (MAC on Linux, opaque UUID on macOS).
    pub identifier: String,
    /// Advertised local name, when the packet carried one.
    pub local_name: Option<String>,
    /// Advertised service UUIDs in short form (`"fff0"` style where possible).
    pub service_ids: Vec<String>,
    pub connectable: bool,
    /// Received signal strength in dBm, when the platform reports it.
    pub rssi: Option<i16>,
    /// Live handle for connecting to this peripheral.
    pub device: Device,
}

impl From<AdvertisingDevice> for DiscoveredPeripheral {
    fn from(adv: AdvertisingDevice) -> Self {
        Self {
            identifier: adv.device.id().to_string(),
            local_name: adv.adv_data.local_name.clone(),
            service_ids: adv.adv_data.services.iter().map(short_uuid).collect(),
            connectable: adv.adv_data.is_connectable,
            rssi: adv.rssi,
            device: adv.device,
        }
    }
}

/// Owns the Bluetooth adapter and vends advertisement streams.
pub struct Scanner {
    adapter: Adapter,
}

impl Scanner {
    /// Acquire the default adapter and wait until it reports powered-on.
    ///
    /// Scanning before the power-on signal yields nothing on most
    /// platforms, so acquisition blocks until the radio is actually up.
    pub async fn new() -> Result<Self, Error> {
        let adapter = Adapter::default().await.ok_or(Error::AdapterUnavailable)?;
        adapter.wait_available().await?;
        info!("bluetooth adapter available; ready to scan");
        Ok(Self { adapter })
    }

    /// Start an unfiltered scan.
    ///
    /// Duplicates are delivered as the platform reports them — repeat
    /// advertisements from one peripheral carry refreshed signal strength.
    pub async fn advertisements(
        &self,
    ) -> Result<impl Stream<Item = DiscoveredPeripheral> + Send + Unpin + '_, Error> {
        debug!("starting advertisement scan");
        let scan = self.adapter.scan(&[]).await?;
        Ok(scan.map(DiscoveredPeripheral::from))
    }

    /// The underlying adapter, for connection management.
    pub(crate) fn adapter(&self) -> &Adapter {
        &self.adapter
    }
}
