// ── Strip capability trait ──
//
// The dispatcher is written against this trait, not against a concrete
// BLE handle: every call may take hundreds of milliseconds and may stall
// forever, and the underlying transport is not reentrant. Tests substitute
// scripted fakes.

use std::future::Future;
use std::sync::Arc;

use crate::error::CoreError;
use crate::model::Rgb;

/// The peripheral as consumed by the core: three slow, possibly-hanging
/// state setters. Implementations must not be assumed to have bounded
/// latency — the dispatcher races its own timeout around every call.
pub trait Strip: Send + Sync + 'static {
    fn set_color(&self, color: Rgb) -> impl Future<Output = Result<(), CoreError>> + Send;
    fn set_power(&self, on: bool) -> impl Future<Output = Result<(), CoreError>> + Send;
    fn set_brightness(&self, level: u8) -> impl Future<Output = Result<(), CoreError>> + Send;
}

impl<S: Strip> Strip for Arc<S> {
    fn set_color(&self, color: Rgb) -> impl Future<Output = Result<(), CoreError>> + Send {
        S::set_color(self, color)
    }

    fn set_power(&self, on: bool) -> impl Future<Output = Result<(), CoreError>> + Send {
        S::set_power(self, on)
    }

    fn set_brightness(&self, level: u8) -> impl Future<Output = Result<(), CoreError>> + Send {
        S::set_brightness(self, level)
    }
}

impl Strip for glimmer_ble::BledomStrip {
    fn set_color(&self, color: Rgb) -> impl Future<Output = Result<(), CoreError>> + Send {
        async move {
            glimmer_ble::BledomStrip::set_color(self, color.r, color.g, color.b)
                .await
                .map_err(CoreError::from)
        }
    }

    fn set_power(&self, on: bool) -> impl Future<Output = Result<(), CoreError>> + Send {
        async move {
            glimmer_ble::BledomStrip::set_power(self, on)
                .await
                .map_err(CoreError::from)
        }
    }

    fn set_brightness(&self, level: u8) -> impl Future<Output = Result<(), CoreError>> + Send {
        async move {
            glimmer_ble::BledomStrip::set_brightness(self, level)
                .await
                .map_err(CoreError::from)
        }
    }
}
