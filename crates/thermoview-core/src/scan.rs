//! Device discovery and scanning.
//!
//! [`BleProvider`] is the native stand-in for a browser device picker: it
//! scans for a peripheral advertising the configured name and hands it out
//! as a [`BlePeripheral`]. [`scan_with_options`] lists everything nearby for
//! the `scan` command.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use thermoview_types::uuid::THERMAL_SERVICE;

use crate::device::{BlePeripheral, ConnectionConfig};
use crate::error::{DeviceNotFoundReason, Error, Result};
use crate::traits::{DeviceFilter, DeviceProvider};
use crate::util::create_identifier;

/// How often discovered peripherals are checked while a targeted scan runs.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Information about a discovered peripheral.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// The advertised name (e.g., "SL2MetaBLE_Test").
    pub name: Option<String>,
    /// The peripheral ID for connecting.
    pub id: PeripheralId,
    /// The BLE address as a string (may be zeros on macOS, use `id` instead).
    pub address: String,
    /// A connection identifier (peripheral ID on macOS, address on other platforms).
    pub identifier: String,
    /// RSSI signal strength.
    pub rssi: Option<i16>,
    /// Whether the thermal service UUID appears in the advertisement.
    pub advertises_thermal_service: bool,
}

/// Options for scanning.
///
/// Scans never filter on the service UUID: a peripheral only has to accept
/// connections to the thermal service, not list it in its advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// How long to scan for devices.
    pub duration: Duration,
    /// Only return peripherals advertising exactly this name.
    pub device_name: Option<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(10),
            device_name: None,
        }
    }
}

impl ScanOptions {
    /// Create new scan options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set scan duration in seconds.
    #[must_use]
    pub fn duration_secs(mut self, secs: u64) -> Self {
        self.duration = Duration::from_secs(secs);
        self
    }

    /// Only keep peripherals whose advertised name equals `name`.
    #[must_use]
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    /// Keep every peripheral in range.
    #[must_use]
    pub fn all_devices(mut self) -> Self {
        self.device_name = None;
        self
    }

    /// Whether a peripheral advertising `name` belongs in the results.
    pub fn accepts(&self, name: Option<&str>) -> bool {
        match &self.device_name {
            Some(wanted) => name == Some(wanted.as_str()),
            None => true,
        }
    }
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters
        .into_iter()
        .next()
        .ok_or(Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter))
}

/// Scan for peripherals in range.
///
/// An empty list means nothing was found; it is not an error.
///
/// # Errors
///
/// Returns an error if no Bluetooth adapter is available or the scan could
/// not be started or stopped.
pub async fn scan_with_options(options: ScanOptions) -> Result<Vec<DiscoveredDevice>> {
    let adapter = get_adapter().await?;
    scan_with_adapter(&adapter, options).await
}

/// Scan for peripherals using a specific adapter.
pub async fn scan_with_adapter(
    adapter: &Adapter,
    options: ScanOptions,
) -> Result<Vec<DiscoveredDevice>> {
    info!(
        "Starting BLE scan for {} seconds...",
        options.duration.as_secs()
    );

    adapter.start_scan(discovery_filter()).await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;

    let mut discovered = Vec::new();
    for peripheral in adapter.peripherals().await? {
        match describe_peripheral(&peripheral).await {
            Ok(Some(device)) if options.accepts(device.name.as_deref()) => {
                info!("Found device: {:?}", device.name);
                discovered.push(device);
            }
            Ok(_) => {}
            Err(e) => debug!("Error processing peripheral: {}", e),
        }
    }

    info!("Scan complete. Found {} device(s)", discovered.len());
    Ok(discovered)
}

async fn describe_peripheral(peripheral: &Peripheral) -> Result<Option<DiscoveredDevice>> {
    let Some(properties) = peripheral.properties().await? else {
        return Ok(None);
    };

    let id = peripheral.id();
    let address = properties.address.to_string();
    let identifier = create_identifier(&address, &id);

    Ok(Some(DiscoveredDevice {
        advertises_thermal_service: advertises_service(&properties, THERMAL_SERVICE),
        name: properties.local_name,
        id,
        address,
        identifier,
        rssi: properties.rssi,
    }))
}

fn advertises_service(properties: &PeripheralProperties, service: uuid::Uuid) -> bool {
    properties.services.contains(&service) || properties.service_data.contains_key(&service)
}

/// Scan filter used for every discovery. Peripherals are matched by name
/// afterwards; name-only advertisers never pass a service filter.
fn discovery_filter() -> ScanFilter {
    ScanFilter::default()
}

/// Scan until a peripheral matching `filter` appears or `scan_timeout` elapses.
///
/// Peripherals the adapter already knows about are checked before scanning.
pub async fn find_device(
    filter: &DeviceFilter,
    scan_timeout: Duration,
) -> Result<(Adapter, Peripheral)> {
    let adapter = get_adapter().await?;
    info!("Looking for device: {}", filter.name);

    if let Some(peripheral) = find_matching_peripheral(&adapter, filter).await? {
        info!("Found device in cache (no scan needed)");
        return Ok((adapter, peripheral));
    }

    adapter.start_scan(discovery_filter()).await?;

    let deadline = Instant::now() + scan_timeout;
    let found = loop {
        if let Some(peripheral) = find_matching_peripheral(&adapter, filter).await? {
            break Some(peripheral);
        }
        if Instant::now() >= deadline {
            break None;
        }
        sleep(POLL_INTERVAL).await;
    };

    if let Err(e) = adapter.stop_scan().await {
        warn!("Failed to stop scan: {}", e);
    }

    match found {
        Some(peripheral) => Ok((adapter, peripheral)),
        None => {
            warn!("Device '{}' not found within {:?}", filter.name, scan_timeout);
            Err(Error::DeviceNotFound(DeviceNotFoundReason::ScanTimeout {
                duration: scan_timeout,
            }))
        }
    }
}

async fn find_matching_peripheral(
    adapter: &Adapter,
    filter: &DeviceFilter,
) -> Result<Option<Peripheral>> {
    for peripheral in adapter.peripherals().await? {
        if let Ok(Some(props)) = peripheral.properties().await
            && filter.matches_name(props.local_name.as_deref())
        {
            debug!("Matched by name: {}", filter.name);
            return Ok(Some(peripheral));
        }
    }
    Ok(None)
}

/// Device provider backed by the platform Bluetooth adapter.
#[derive(Debug, Clone)]
pub struct BleProvider {
    scan_timeout: Duration,
    connection: ConnectionConfig,
}

impl Default for BleProvider {
    fn default() -> Self {
        Self::new(ScanOptions::default().duration, ConnectionConfig::default())
    }
}

impl BleProvider {
    /// Provider with the given scan budget and connection timeouts.
    pub fn new(scan_timeout: Duration, connection: ConnectionConfig) -> Self {
        Self {
            scan_timeout,
            connection,
        }
    }

    /// How long a device request may scan.
    pub fn scan_timeout(&self) -> Duration {
        self.scan_timeout
    }
}

#[async_trait]
impl DeviceProvider for BleProvider {
    type Peripheral = BlePeripheral;

    #[tracing::instrument(level = "info", skip_all, fields(name = %filter.name))]
    async fn request_device(&self, filter: &DeviceFilter) -> Result<Arc<BlePeripheral>> {
        let (adapter, peripheral) = find_device(filter, self.scan_timeout).await?;
        let peripheral = BlePeripheral::new(adapter, peripheral, self.connection.clone()).await?;
        Ok(Arc::new(peripheral))
    }
}
