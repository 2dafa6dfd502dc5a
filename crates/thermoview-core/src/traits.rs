//! Trait seams between the link manager and the Bluetooth stack.
//!
//! [`DeviceProvider`] stands in for the platform device picker and
//! [`ThermalPeripheral`] for one GATT connection. The btleplug-backed
//! implementations live in [`crate::scan`] and [`crate::device`]; the
//! in-memory ones in [`crate::mock`].

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use uuid::Uuid;

use thermoview_types::uuid::{DEVICE_NAME, THERMAL_SERVICE};

use crate::error::Result;

/// Raw notification payloads for one characteristic, in arrival order.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// Selects which advertising peripheral to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    /// Exact advertised local name.
    pub name: String,
    /// Primary service the peripheral must expose.
    pub service: Uuid,
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self {
            name: DEVICE_NAME.to_string(),
            service: THERMAL_SERVICE,
        }
    }
}

impl DeviceFilter {
    /// Filter for a peripheral named `name` that exposes the thermal service.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether an advertised name satisfies the filter.
    ///
    /// Names compare exactly, like a browser device-picker name filter.
    pub fn matches_name(&self, advertised: Option<&str>) -> bool {
        advertised == Some(self.name.as_str())
    }
}

/// One GATT connection to a thermal peripheral.
///
/// # Example
///
/// ```ignore
/// use thermoview_core::{ThermalPeripheral, Result};
/// use thermoview_types::uuid::{THERMAL_SERVICE, RAW_GRID};
///
/// async fn first_grid<P: ThermalPeripheral>(peripheral: &P) -> Result<Option<Vec<u8>>> {
///     use futures::StreamExt;
///     peripheral.connect().await?;
///     peripheral.resolve_service(THERMAL_SERVICE).await?;
///     peripheral.resolve_characteristic(THERMAL_SERVICE, RAW_GRID).await?;
///     let mut stream = peripheral.subscribe(RAW_GRID).await?;
///     Ok(stream.next().await)
/// }
/// ```
#[async_trait]
pub trait ThermalPeripheral: Send + Sync {
    /// Advertised name, if known.
    fn name(&self) -> Option<&str>;

    /// Platform address or identifier.
    ///
    /// On Linux/Windows this is typically the MAC address.
    /// On macOS this is a UUID since MAC addresses are not exposed.
    fn address(&self) -> &str;

    /// Open the GATT connection.
    async fn connect(&self) -> Result<()>;

    /// Close the GATT connection. Ends every notification stream.
    async fn disconnect(&self) -> Result<()>;

    /// Check if the GATT connection is up.
    async fn is_connected(&self) -> bool;

    /// Confirm the primary service is exposed.
    async fn resolve_service(&self, service: Uuid) -> Result<()>;

    /// Confirm `characteristic` exists inside `service`.
    async fn resolve_characteristic(&self, service: Uuid, characteristic: Uuid) -> Result<()>;

    /// Enable notifications and return the raw payload stream.
    ///
    /// The characteristic must have been resolved first.
    async fn subscribe(&self, characteristic: Uuid) -> Result<NotificationStream>;

    /// Disable notifications on a characteristic.
    async fn unsubscribe(&self, characteristic: Uuid) -> Result<()>;
}

/// Source of peripherals, the equivalent of a device picker.
#[async_trait]
pub trait DeviceProvider: Send + Sync {
    /// Peripheral type handed out by this provider.
    type Peripheral: ThermalPeripheral + 'static;

    /// Find a peripheral matching `filter`.
    async fn request_device(&self, filter: &DeviceFilter) -> Result<Arc<Self::Peripheral>>;
}
