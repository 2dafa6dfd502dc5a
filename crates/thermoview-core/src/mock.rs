//! Mock peripheral implementation for testing.
//!
//! This module provides an in-memory peripheral and provider that can be
//! used without BLE hardware. Tests push text payloads exactly as the
//! firmware would send them and observe what the link manager does.
//!
//! # Features
//!
//! - **Failure injection**: fail the handshake at any [`FailurePoint`]
//! - **Latency simulation**: delay `connect` to exercise concurrent callers
//! - **Call recording**: inspect which characteristics were (un)subscribed
//! - **Synthetic feed**: a moving hot spot for demos

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use thermoview_types::uuid::{
    AVERAGE_TEMPERATURE, DATA_CHARACTERISTICS, DEVICE_NAME, MAX_TEMPERATURE, RAW_GRID,
    THERMAL_SERVICE,
};
use thermoview_types::{GRID_SIZE, ThermalGrid};

use crate::error::{ConnectionFailureReason, Error, Result};
use crate::traits::{DeviceFilter, DeviceProvider, NotificationStream, ThermalPeripheral};

/// Handshake step at which a mock peripheral should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    /// The provider finds no device.
    RequestDevice,
    /// GATT connect is rejected.
    Connect,
    /// The thermal service is missing.
    ResolveService,
    /// One characteristic is missing.
    ResolveCharacteristic(Uuid),
    /// Enabling notify on one characteristic fails.
    Subscribe(Uuid),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A mock thermal peripheral for testing.
///
/// # Example
///
/// ```
/// use thermoview_core::{MockPeripheral, ThermalPeripheral};
/// use thermoview_types::uuid::{THERMAL_SERVICE, AVERAGE_TEMPERATURE};
///
/// #[tokio::main]
/// async fn main() {
///     let peripheral = MockPeripheral::new("SL2MetaBLE_Test");
///     peripheral.connect().await.unwrap();
///     peripheral.resolve_characteristic(THERMAL_SERVICE, AVERAGE_TEMPERATURE).await.unwrap();
///     let _stream = peripheral.subscribe(AVERAGE_TEMPERATURE).await.unwrap();
///     assert!(peripheral.push_text(AVERAGE_TEMPERATURE, "23.5"));
/// }
/// ```
pub struct MockPeripheral {
    name: String,
    address: String,
    connected: AtomicBool,
    failures: Mutex<HashSet<FailurePoint>>,
    characteristics: Vec<Uuid>,
    resolved: Mutex<HashSet<Uuid>>,
    senders: Mutex<HashMap<Uuid, mpsc::UnboundedSender<Vec<u8>>>>,
    subscribe_log: Mutex<Vec<Uuid>>,
    unsubscribe_log: Mutex<Vec<Uuid>>,
    connect_count: AtomicU32,
    disconnect_count: AtomicU32,
    /// Simulated connect latency in milliseconds (0 = no delay).
    connect_latency_ms: AtomicU64,
}

impl std::fmt::Debug for MockPeripheral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPeripheral")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockPeripheral {
    fn default() -> Self {
        Self::new(DEVICE_NAME)
    }
}

impl MockPeripheral {
    /// Create a mock exposing the thermal service and all three characteristics.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            address: "MOCK-THERMAL".to_string(),
            connected: AtomicBool::new(false),
            failures: Mutex::new(HashSet::new()),
            characteristics: DATA_CHARACTERISTICS.to_vec(),
            resolved: Mutex::new(HashSet::new()),
            senders: Mutex::new(HashMap::new()),
            subscribe_log: Mutex::new(Vec::new()),
            unsubscribe_log: Mutex::new(Vec::new()),
            connect_count: AtomicU32::new(0),
            disconnect_count: AtomicU32::new(0),
            connect_latency_ms: AtomicU64::new(0),
        }
    }

    /// Make the handshake fail at `point`.
    pub fn fail_at(&self, point: FailurePoint) {
        lock(&self.failures).insert(point);
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    fn should_fail(&self, point: FailurePoint) -> bool {
        lock(&self.failures).contains(&point)
    }

    /// Set simulated connect latency.
    pub fn set_connect_latency(&self, latency: Duration) {
        self.connect_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Deliver a raw payload to the subscriber of `characteristic`.
    ///
    /// Returns `false` if nobody is subscribed.
    pub fn push_notification(&self, characteristic: Uuid, payload: impl Into<Vec<u8>>) -> bool {
        lock(&self.senders)
            .get(&characteristic)
            .is_some_and(|tx| tx.unbounded_send(payload.into()).is_ok())
    }

    /// Deliver a text payload.
    pub fn push_text(&self, characteristic: Uuid, text: &str) -> bool {
        self.push_notification(characteristic, text.as_bytes())
    }

    /// Deliver a grid formatted the way the firmware sends it.
    pub fn push_grid(&self, grid: &ThermalGrid) -> bool {
        self.push_text(RAW_GRID, &format_grid_payload(grid))
    }

    /// Whether notifications are currently enabled on `characteristic`.
    pub fn is_subscribed(&self, characteristic: Uuid) -> bool {
        lock(&self.senders).contains_key(&characteristic)
    }

    /// Characteristics subscribed to, in call order.
    pub fn subscribe_calls(&self) -> Vec<Uuid> {
        lock(&self.subscribe_log).clone()
    }

    /// Characteristics unsubscribed from, in call order.
    pub fn unsubscribe_calls(&self) -> Vec<Uuid> {
        lock(&self.unsubscribe_log).clone()
    }

    /// Number of connect calls.
    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::Relaxed)
    }

    /// Number of disconnect calls.
    pub fn disconnect_count(&self) -> u32 {
        self.disconnect_count.load(Ordering::Relaxed)
    }

    /// Check connection state without awaiting.
    pub fn is_connected_sync(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn require_connected(&self) -> Result<()> {
        if self.is_connected_sync() {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }
}

#[async_trait]
impl ThermalPeripheral for MockPeripheral {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn address(&self) -> &str {
        &self.address
    }

    async fn connect(&self) -> Result<()> {
        let latency = self.connect_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        self.connect_count.fetch_add(1, Ordering::Relaxed);
        if self.should_fail(FailurePoint::Connect) {
            return Err(Error::connection_failed(
                Some(self.address.clone()),
                ConnectionFailureReason::Other("mock connect failure".into()),
            ));
        }
        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnect_count.fetch_add(1, Ordering::Relaxed);
        self.connected.store(false, Ordering::Relaxed);
        // Dropping the senders ends every notification stream.
        lock(&self.senders).clear();
        lock(&self.resolved).clear();
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.is_connected_sync()
    }

    async fn resolve_service(&self, service: Uuid) -> Result<()> {
        self.require_connected()?;
        if service != THERMAL_SERVICE || self.should_fail(FailurePoint::ResolveService) {
            return Err(Error::service_not_found(service.to_string(), 0));
        }
        Ok(())
    }

    async fn resolve_characteristic(&self, service: Uuid, characteristic: Uuid) -> Result<()> {
        self.resolve_service(service).await?;
        if !self.characteristics.contains(&characteristic)
            || self.should_fail(FailurePoint::ResolveCharacteristic(characteristic))
        {
            return Err(Error::characteristic_not_found(characteristic.to_string(), 1));
        }
        lock(&self.resolved).insert(characteristic);
        Ok(())
    }

    async fn subscribe(&self, characteristic: Uuid) -> Result<NotificationStream> {
        self.require_connected()?;
        if !lock(&self.resolved).contains(&characteristic) {
            return Err(Error::characteristic_not_found(characteristic.to_string(), 1));
        }

        lock(&self.subscribe_log).push(characteristic);
        if self.should_fail(FailurePoint::Subscribe(characteristic)) {
            return Err(Error::subscription_failed(
                characteristic.to_string(),
                "mock subscribe failure",
            ));
        }

        let (tx, rx) = mpsc::unbounded();
        lock(&self.senders).insert(characteristic, tx);
        Ok(rx.boxed())
    }

    async fn unsubscribe(&self, characteristic: Uuid) -> Result<()> {
        lock(&self.unsubscribe_log).push(characteristic);
        lock(&self.senders).remove(&characteristic);
        Ok(())
    }
}

/// Provider that always hands out the same mock peripheral.
#[derive(Debug, Clone)]
pub struct MockProvider {
    peripheral: Arc<MockPeripheral>,
    requests: Arc<AtomicU32>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(Arc::new(MockPeripheral::default()))
    }
}

impl MockProvider {
    /// Provider wrapping `peripheral`.
    pub fn new(peripheral: Arc<MockPeripheral>) -> Self {
        Self {
            peripheral,
            requests: Arc::new(AtomicU32::new(0)),
        }
    }

    /// The peripheral this provider hands out.
    pub fn peripheral(&self) -> &Arc<MockPeripheral> {
        &self.peripheral
    }

    /// Number of `request_device` calls so far.
    pub fn request_count(&self) -> u32 {
        self.requests.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DeviceProvider for MockProvider {
    type Peripheral = MockPeripheral;

    async fn request_device(&self, filter: &DeviceFilter) -> Result<Arc<MockPeripheral>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if self.peripheral.should_fail(FailurePoint::RequestDevice)
            || !filter.matches_name(self.peripheral.name())
        {
            return Err(Error::device_not_found(&filter.name));
        }
        Ok(Arc::clone(&self.peripheral))
    }
}

/// Format a grid as the firmware's comma-separated text.
pub fn format_grid_payload(grid: &ThermalGrid) -> String {
    grid.values()
        .map(|v| format!("{v:.2}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Synthetic frame with a warm spot orbiting the centre.
///
/// Returns the grid with its average and maximum, as the firmware would
/// report them.
pub fn synthetic_frame(tick: u64) -> (ThermalGrid, f64, f64) {
    let phase = tick as f64 * 0.15;
    let centre = (GRID_SIZE as f64 - 1.0) / 2.0;
    let (hx, hy) = (centre + 2.5 * phase.cos(), centre + 2.5 * phase.sin());

    let mut rows = [[0.0; GRID_SIZE]; GRID_SIZE];
    for (y, row) in rows.iter_mut().enumerate() {
        for (x, cell) in row.iter_mut().enumerate() {
            let d2 = (x as f64 - hx).powi(2) + (y as f64 - hy).powi(2);
            *cell = 22.0 + 12.0 * (-d2 / 4.0).exp();
        }
    }

    let grid = ThermalGrid::new(rows);
    let average = grid.values().sum::<f64>() / (GRID_SIZE * GRID_SIZE) as f64;
    let maximum = grid.values().fold(f64::MIN, f64::max);
    (grid, average, maximum)
}

/// Push [`synthetic_frame`]s into `peripheral` every `period` until cancelled.
pub fn spawn_synthetic_feed(
    peripheral: Arc<MockPeripheral>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        let mut tick = 0u64;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let (grid, average, maximum) = synthetic_frame(tick);
                    peripheral.push_grid(&grid);
                    peripheral.push_text(AVERAGE_TEMPERATURE, &format!("{average:.2}"));
                    peripheral.push_text(MAX_TEMPERATURE, &format!("{maximum:.2}"));
                    tick += 1;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn resolved(peripheral: &MockPeripheral) {
        peripheral.connect().await.unwrap();
        for uuid in DATA_CHARACTERISTICS {
            peripheral
                .resolve_characteristic(THERMAL_SERVICE, uuid)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_mock_peripheral_delivers_payloads() {
        let peripheral = MockPeripheral::default();
        resolved(&peripheral).await;

        let mut stream = peripheral.subscribe(AVERAGE_TEMPERATURE).await.unwrap();
        assert!(peripheral.push_text(AVERAGE_TEMPERATURE, "23.5"));
        assert_eq!(stream.next().await, Some(b"23.5".to_vec()));

        // Nobody listens on the max characteristic yet.
        assert!(!peripheral.push_text(MAX_TEMPERATURE, "41.0"));
    }

    #[tokio::test]
    async fn test_mock_subscribe_requires_resolution() {
        let peripheral = MockPeripheral::default();
        peripheral.connect().await.unwrap();
        assert!(matches!(
            peripheral.subscribe(RAW_GRID).await,
            Err(Error::CharacteristicNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let peripheral = MockPeripheral::default();
        peripheral.fail_at(FailurePoint::Connect);
        assert!(peripheral.connect().await.is_err());
        assert!(!peripheral.is_connected().await);

        peripheral.clear_failures();
        peripheral.fail_at(FailurePoint::ResolveCharacteristic(MAX_TEMPERATURE));
        peripheral.connect().await.unwrap();
        assert!(
            peripheral
                .resolve_characteristic(THERMAL_SERVICE, RAW_GRID)
                .await
                .is_ok()
        );
        assert!(
            peripheral
                .resolve_characteristic(THERMAL_SERVICE, MAX_TEMPERATURE)
                .await
                .is_err()
        );
        assert_eq!(peripheral.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_disconnect_ends_streams() {
        let peripheral = MockPeripheral::default();
        resolved(&peripheral).await;
        let mut stream = peripheral.subscribe(RAW_GRID).await.unwrap();

        peripheral.disconnect().await.unwrap();
        assert_eq!(stream.next().await, None);
        assert!(!peripheral.is_subscribed(RAW_GRID));
        assert_eq!(peripheral.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_provider_filters_by_name() {
        let provider = MockProvider::default();
        assert!(provider.request_device(&DeviceFilter::default()).await.is_ok());
        assert!(matches!(
            provider.request_device(&DeviceFilter::new("Other")).await,
            Err(Error::DeviceNotFound(_))
        ));
        assert_eq!(provider.request_count(), 2);
    }

    #[test]
    fn test_format_grid_payload_round_trips() {
        let (grid, _, _) = synthetic_frame(3);
        let text = format_grid_payload(&grid);
        assert_eq!(text.split(',').count(), 64);
        let parsed = ThermalGrid::from_payload(text.as_bytes()).unwrap();
        for (a, b) in parsed.values().zip(grid.values()) {
            assert!((a - b).abs() < 0.006);
        }
    }

    #[test]
    fn test_synthetic_frame_stats() {
        let (grid, average, maximum) = synthetic_frame(0);
        let (lo, hi) = grid.min_max().unwrap();
        assert_eq!(hi, maximum);
        assert!(lo >= 22.0 && hi <= 34.0);
        assert!(average > lo && average < hi);
    }
}
