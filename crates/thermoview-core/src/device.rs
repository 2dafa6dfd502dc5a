//! btleplug-backed thermal peripheral.
//!
//! [`BlePeripheral`] wraps one btleplug [`Peripheral`] and implements
//! [`ThermalPeripheral`] on top of it. Every BLE round trip is bounded by a
//! timeout from [`ConnectionConfig`].

use std::collections::HashMap;
use std::future::ready;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{CharPropFlags, Characteristic, Peripheral as _};
use btleplug::platform::{Adapter, Peripheral};
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use thermoview_types::uuid::characteristic_name;

use crate::error::{ConnectionFailureReason, Error, Result};
use crate::traits::{NotificationStream, ThermalPeripheral};
use crate::util::{create_identifier, format_peripheral_id};

/// Default timeout for establishing the GATT connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for service discovery after connecting.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for enabling or disabling notifications.
const DEFAULT_SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for BLE connection timeouts.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use thermoview_core::device::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .connection_timeout(Duration::from_secs(20))
///     .subscribe_timeout(Duration::from_secs(8));
/// assert_eq!(config.connection_timeout, Duration::from_secs(20));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Timeout for establishing a BLE connection.
    pub connection_timeout: Duration,
    /// Timeout for service discovery after connection.
    pub discovery_timeout: Duration,
    /// Timeout for subscribe and unsubscribe operations.
    pub subscribe_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            subscribe_timeout: DEFAULT_SUBSCRIBE_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// Create a new connection config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the subscribe/unsubscribe timeout.
    #[must_use]
    pub fn subscribe_timeout(mut self, timeout: Duration) -> Self {
        self.subscribe_timeout = timeout;
        self
    }
}

/// A thermal peripheral reached through the platform BLE stack.
pub struct BlePeripheral {
    /// Keeps the adapter alive for the lifetime of the peripheral.
    #[allow(dead_code)]
    adapter: Adapter,
    peripheral: Peripheral,
    name: Option<String>,
    address: String,
    /// Characteristics resolved during the handshake, keyed by UUID.
    characteristics: RwLock<HashMap<Uuid, Characteristic>>,
    config: ConnectionConfig,
}

impl std::fmt::Debug for BlePeripheral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlePeripheral")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BlePeripheral {
    /// Wrap a discovered peripheral. Does not connect.
    pub async fn new(
        adapter: Adapter,
        peripheral: Peripheral,
        config: ConnectionConfig,
    ) -> Result<Self> {
        let properties = peripheral.properties().await?;
        let name = properties.as_ref().and_then(|p| p.local_name.clone());

        // On macOS the address is 00:00:00:00:00:00, so fall back to the peripheral ID.
        let address = properties
            .as_ref()
            .map(|p| create_identifier(&p.address.to_string(), &peripheral.id()))
            .unwrap_or_else(|| format_peripheral_id(&peripheral.id()));

        Ok(Self {
            adapter,
            peripheral,
            name,
            address,
            characteristics: RwLock::new(HashMap::new()),
            config,
        })
    }

    /// The timeouts this peripheral applies.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Number of characteristics resolved so far.
    pub async fn resolved_characteristic_count(&self) -> usize {
        self.characteristics.read().await.len()
    }

    async fn cached_characteristic(&self, uuid: Uuid) -> Result<Characteristic> {
        self.characteristics
            .read()
            .await
            .get(&uuid)
            .cloned()
            .ok_or_else(|| {
                Error::characteristic_not_found(uuid.to_string(), self.peripheral.services().len())
            })
    }
}

/// Error for a failed GATT connect. `None` means the attempt timed out.
fn connect_failure(address: &str, cause: Option<btleplug::Error>) -> Error {
    let reason = match cause {
        Some(e) => ConnectionFailureReason::BleError(e.to_string()),
        None => ConnectionFailureReason::Timeout,
    };
    Error::connection_failed(Some(address.to_string()), reason)
}

#[async_trait]
impl ThermalPeripheral for BlePeripheral {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn address(&self) -> &str {
        &self.address
    }

    #[tracing::instrument(level = "info", skip(self), fields(device_name = ?self.name))]
    async fn connect(&self) -> Result<()> {
        info!("Connecting to device...");
        match timeout(self.config.connection_timeout, self.peripheral.connect()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(connect_failure(&self.address, Some(e))),
            Err(_) => return Err(connect_failure(&self.address, None)),
        }
        info!("Connected!");

        debug!("Discovering services...");
        timeout(
            self.config.discovery_timeout,
            self.peripheral.discover_services(),
        )
        .await
        .map_err(|_| Error::timeout("discover services", self.config.discovery_timeout))??;
        debug!("Found {} services", self.peripheral.services().len());
        Ok(())
    }

    #[tracing::instrument(level = "info", skip(self), fields(device_name = ?self.name))]
    async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from device...");
        self.characteristics.write().await.clear();
        self.peripheral.disconnect().await?;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn resolve_service(&self, service: Uuid) -> Result<()> {
        let services = self.peripheral.services();
        if services.iter().any(|s| s.uuid == service) {
            debug!("Resolved service {}", service);
            Ok(())
        } else {
            Err(Error::service_not_found(service.to_string(), services.len()))
        }
    }

    async fn resolve_characteristic(&self, service: Uuid, characteristic: Uuid) -> Result<()> {
        let services = self.peripheral.services();
        let service_count = services.len();
        let found = services
            .into_iter()
            .find(|s| s.uuid == service)
            .ok_or_else(|| Error::service_not_found(service.to_string(), service_count))?
            .characteristics
            .into_iter()
            .find(|c| c.uuid == characteristic)
            .ok_or_else(|| Error::characteristic_not_found(characteristic.to_string(), service_count))?;

        if !found
            .properties
            .intersects(CharPropFlags::NOTIFY | CharPropFlags::INDICATE)
        {
            warn!(
                "{} ({}) does not advertise notify support",
                characteristic_name(&characteristic),
                characteristic
            );
        }

        debug!(
            "Resolved {} characteristic {}",
            characteristic_name(&characteristic),
            characteristic
        );
        self.characteristics
            .write()
            .await
            .insert(characteristic, found);
        Ok(())
    }

    async fn subscribe(&self, characteristic: Uuid) -> Result<NotificationStream> {
        let resolved = self.cached_characteristic(characteristic).await?;

        // Open the notification stream first so the first payload after
        // enabling notify is not missed.
        let notifications = self.peripheral.notifications().await?;

        timeout(
            self.config.subscribe_timeout,
            self.peripheral.subscribe(&resolved),
        )
        .await
        .map_err(|_| Error::timeout("subscribe", self.config.subscribe_timeout))?
        .map_err(|e| Error::subscription_failed(characteristic.to_string(), e.to_string()))?;

        debug!(
            "Subscribed to {} ({})",
            characteristic_name(&characteristic),
            characteristic
        );

        Ok(notifications
            .filter_map(move |n| ready((n.uuid == characteristic).then_some(n.value)))
            .boxed())
    }

    async fn unsubscribe(&self, characteristic: Uuid) -> Result<()> {
        let resolved = self.cached_characteristic(characteristic).await?;
        timeout(
            self.config.subscribe_timeout,
            self.peripheral.unsubscribe(&resolved),
        )
        .await
        .map_err(|_| Error::timeout("unsubscribe", self.config.subscribe_timeout))??;
        debug!("Unsubscribed from {}", characteristic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_timeout_is_connection_failure() {
        let err = connect_failure("AA:BB:CC:DD:EE:FF", None);
        match err {
            Error::ConnectionFailed { device_id, reason } => {
                assert_eq!(device_id.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
                assert_eq!(reason, ConnectionFailureReason::Timeout);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_connect_ble_error_keeps_message() {
        let err = connect_failure("AA:BB:CC:DD:EE:FF", Some(btleplug::Error::NotConnected));
        assert!(matches!(
            err,
            Error::ConnectionFailed {
                reason: ConnectionFailureReason::BleError(_),
                ..
            }
        ));
        assert!(err.to_string().starts_with("Connection failed: BLE error: "));
    }

    #[test]
    fn test_connection_config_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.connection_timeout, Duration::from_secs(15));
        assert_eq!(config.discovery_timeout, Duration::from_secs(10));
        assert_eq!(config.subscribe_timeout, Duration::from_secs(5));
        assert_eq!(config, ConnectionConfig::new());
    }

    #[test]
    fn test_connection_config_builder() {
        let config = ConnectionConfig::new()
            .connection_timeout(Duration::from_secs(30))
            .discovery_timeout(Duration::from_secs(12))
            .subscribe_timeout(Duration::from_millis(750));
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
        assert_eq!(config.discovery_timeout, Duration::from_secs(12));
        assert_eq!(config.subscribe_timeout, Duration::from_millis(750));
    }
}
