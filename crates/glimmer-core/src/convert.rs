// ── Transport-to-model conversions ──

use glimmer_ble::DiscoveredPeripheral;

use crate::model::Advertisement;

impl From<&DiscoveredPeripheral> for Advertisement {
    fn from(peripheral: &DiscoveredPeripheral) -> Self {
        Self {
            identifier: peripheral.identifier.clone(),
            display_name: peripheral.local_name.clone(),
            service_ids: peripheral.service_ids.clone(),
            connectable: peripheral.connectable,
            // Missing signal strength ranks last rather than being guessed.
            signal_strength: peripheral.rssi.unwrap_or(i16::MIN),
        }
    }
}
