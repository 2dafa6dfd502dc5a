//! Single-session BLE link management.
//!
//! [`LinkManager`] runs the connect handshake against a [`DeviceProvider`]:
//! request a matching peripheral, connect, resolve the thermal service and
//! all three characteristics, then subscribe to raw grid, average and max in
//! that order. Decoded notifications are written to a shared
//! [`ThermalState`]; lifecycle steps are published as [`LinkEvent`]s.
//!
//! # Partial failure
//!
//! All characteristics are resolved before any subscription, so a missing
//! characteristic never leaves listeners behind. A subscribe failure part
//! way through is handled according to [`SubscribePolicy`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use futures::StreamExt;
use thermoview_types::uuid::{DATA_CHARACTERISTICS, characteristic_name};
use thermoview_types::{SessionState, ThermalUpdate};

use crate::error::{Error, Result};
use crate::events::{
    DeviceId, DisconnectReason, EventDispatcher, EventReceiver, HandshakeStage, LinkEvent,
};
use crate::state::{ThermalSnapshot, ThermalState};
use crate::subscription::{Subscription, decode_update};
use crate::traits::{DeviceFilter, DeviceProvider, NotificationStream, ThermalPeripheral};

/// What to do with subscriptions already enabled when a later one fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubscribePolicy {
    /// Cancel and unsubscribe everything, then disconnect.
    #[default]
    Rollback,
    /// Leave earlier subscriptions delivering data while the session stays
    /// `Disconnected`. They are released by the next connect or disconnect.
    KeepPartial,
}

impl std::fmt::Display for SubscribePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rollback => write!(f, "rollback"),
            Self::KeepPartial => write!(f, "keep-partial"),
        }
    }
}

impl std::str::FromStr for SubscribePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rollback" => Ok(Self::Rollback),
            "keep-partial" => Ok(Self::KeepPartial),
            other => Err(Error::invalid_config(format!(
                "unknown subscribe policy '{other}' (expected rollback or keep-partial)"
            ))),
        }
    }
}

/// Configuration for a [`LinkManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Which peripheral to request.
    pub filter: DeviceFilter,
    /// Partial-subscription handling.
    pub policy: SubscribePolicy,
    /// Capacity of the link event channel.
    pub event_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            filter: DeviceFilter::default(),
            policy: SubscribePolicy::default(),
            event_capacity: 100,
        }
    }
}

impl LinkConfig {
    /// Create a new link config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request peripherals advertising `name`.
    #[must_use]
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.filter.name = name.into();
        self
    }

    /// Set the partial-subscription policy.
    #[must_use]
    pub fn policy(mut self, policy: SubscribePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.filter.name.trim().is_empty() {
            return Err(Error::invalid_config("device name must not be empty"));
        }
        if self.event_capacity == 0 {
            return Err(Error::invalid_config("event capacity must be at least 1"));
        }
        Ok(())
    }
}

/// A running notification pump for one characteristic.
struct ActiveSubscription {
    characteristic: Uuid,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ActiveSubscription {
    async fn stop(mut self) {
        self.token.cancel();
        if let Err(e) = (&mut self.handle).await
            && e.is_panic()
        {
            warn!("Notification pump for {} panicked", self.characteristic);
        }
    }
}

impl Drop for ActiveSubscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct Session<P> {
    peripheral: Arc<P>,
    subscriptions: Vec<ActiveSubscription>,
}

struct HandshakeFailure {
    stage: HandshakeStage,
    error: Error,
}

fn at(stage: HandshakeStage) -> impl FnOnce(Error) -> HandshakeFailure {
    move |error| HandshakeFailure { stage, error }
}

/// Owns the single connection to the thermal peripheral.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use thermoview_core::{LinkConfig, LinkManager, MockPeripheral, MockProvider};
/// use thermoview_types::SessionState;
///
/// #[tokio::main]
/// async fn main() {
///     let provider = MockProvider::new(Arc::new(MockPeripheral::default()));
///     let link = LinkManager::new(provider, LinkConfig::default());
///     assert_eq!(link.connect().await, SessionState::Connected);
///     link.disconnect().await.unwrap();
/// }
/// ```
pub struct LinkManager<D: DeviceProvider> {
    provider: D,
    config: LinkConfig,
    state: ThermalState,
    events: EventDispatcher,
    session: Mutex<Option<Session<D::Peripheral>>>,
    /// Leftovers of a failed handshake under [`SubscribePolicy::KeepPartial`].
    partial: Mutex<Option<Session<D::Peripheral>>>,
}

impl<D: DeviceProvider> LinkManager<D> {
    /// Create a manager with fresh shared state.
    pub fn new(provider: D, config: LinkConfig) -> Self {
        Self::with_state(provider, config, ThermalState::new())
    }

    /// Create a manager writing into an existing state container.
    pub fn with_state(provider: D, config: LinkConfig, state: ThermalState) -> Self {
        let events = EventDispatcher::new(config.event_capacity.max(1));
        Self {
            provider,
            config,
            state,
            events,
            session: Mutex::new(None),
            partial: Mutex::new(None),
        }
    }

    /// The link configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Handle to the shared sensor state.
    pub fn state(&self) -> &ThermalState {
        &self.state
    }

    /// Copy of the current sensor values.
    pub fn snapshot(&self) -> ThermalSnapshot {
        self.state.snapshot()
    }

    /// Receiver notified on every sensor or session change.
    pub fn watch(&self) -> watch::Receiver<ThermalSnapshot> {
        self.state.subscribe()
    }

    /// Subscribe to link events.
    pub fn events(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Current session state.
    pub fn session_state(&self) -> SessionState {
        self.state.session()
    }

    /// Identity of the connected peripheral, if any.
    pub async fn connected_device(&self) -> Option<DeviceId> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| DeviceId::new(s.peripheral.address(), s.peripheral.name()))
    }

    /// Characteristics with a live notification pump, in subscription order.
    pub async fn active_subscriptions(&self) -> Vec<Uuid> {
        let mut active = Vec::new();
        for slot in [&self.session, &self.partial] {
            if let Some(session) = slot.lock().await.as_ref() {
                active.extend(
                    session
                        .subscriptions
                        .iter()
                        .filter(|s| !s.token.is_cancelled())
                        .map(|s| s.characteristic),
                );
            }
        }
        active
    }

    /// Connect, logging any failure instead of returning it.
    ///
    /// Returns the session state after the attempt.
    pub async fn connect(&self) -> SessionState {
        if let Err(e) = self.try_connect().await {
            error!("BLE connection error: {}", e);
        }
        self.state.session()
    }

    /// Connect and report the failure cause.
    ///
    /// A no-op when already connected. Concurrent calls are serialized; the
    /// second one observes the first one's session.
    #[tracing::instrument(level = "info", skip_all, fields(device = %self.config.filter.name))]
    pub async fn try_connect(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            debug!("Already connected, ignoring connect request");
            return Ok(());
        }

        if let Some(stale) = self.partial.lock().await.take() {
            info!("Releasing partial session from previous attempt");
            teardown(stale).await;
        }

        self.events.send(LinkEvent::Connecting {
            device_name: self.config.filter.name.clone(),
        });

        match self.handshake().await {
            Ok(established) => {
                let device = DeviceId::new(
                    established.peripheral.address(),
                    established.peripheral.name(),
                );
                info!("Connected to {:?} ({})", device.name, device.id);
                *session = Some(established);
                self.state.set_session(SessionState::Connected);
                self.events.send(LinkEvent::Connected { device });
                Ok(())
            }
            Err(HandshakeFailure { stage, error }) => {
                warn!("Handshake failed during {}: {}", stage, error);
                self.state.set_session(SessionState::Disconnected);
                self.events.send(LinkEvent::ConnectFailed {
                    stage,
                    error: error.to_string(),
                });
                Err(error)
            }
        }
    }

    async fn handshake(&self) -> std::result::Result<Session<D::Peripheral>, HandshakeFailure> {
        let filter = &self.config.filter;

        let peripheral = self
            .provider
            .request_device(filter)
            .await
            .map_err(at(HandshakeStage::RequestDevice))?;

        peripheral
            .connect()
            .await
            .map_err(at(HandshakeStage::Connect))?;

        if let Err(failure) = self.resolve_all(peripheral.as_ref()).await {
            self.abandon(peripheral, Vec::new()).await;
            return Err(failure);
        }

        let mut subscriptions = Vec::with_capacity(DATA_CHARACTERISTICS.len());
        for characteristic in DATA_CHARACTERISTICS {
            match peripheral.subscribe(characteristic).await {
                Ok(notifications) => {
                    debug!("Subscribed to {}", characteristic_name(&characteristic));
                    subscriptions.push(self.spawn_pump(characteristic, notifications));
                }
                Err(error) => {
                    self.abandon(peripheral, subscriptions).await;
                    return Err(HandshakeFailure {
                        stage: HandshakeStage::Subscribe,
                        error,
                    });
                }
            }
        }

        Ok(Session {
            peripheral,
            subscriptions,
        })
    }

    async fn resolve_all(
        &self,
        peripheral: &D::Peripheral,
    ) -> std::result::Result<(), HandshakeFailure> {
        let service = self.config.filter.service;
        peripheral
            .resolve_service(service)
            .await
            .map_err(at(HandshakeStage::ResolveService))?;
        for characteristic in DATA_CHARACTERISTICS {
            peripheral
                .resolve_characteristic(service, characteristic)
                .await
                .map_err(at(HandshakeStage::ResolveCharacteristics))?;
        }
        Ok(())
    }

    /// Clean up after a failed handshake according to the policy.
    async fn abandon(&self, peripheral: Arc<D::Peripheral>, subscriptions: Vec<ActiveSubscription>) {
        let leftover = Session {
            peripheral,
            subscriptions,
        };
        match self.config.policy {
            SubscribePolicy::Rollback => {
                teardown(leftover).await;
                self.events.send(LinkEvent::Disconnected {
                    reason: DisconnectReason::HandshakeAbandoned,
                });
            }
            SubscribePolicy::KeepPartial => {
                if !leftover.subscriptions.is_empty() {
                    warn!(
                        "Keeping {} partial subscription(s) after failed handshake",
                        leftover.subscriptions.len()
                    );
                }
                *self.partial.lock().await = Some(leftover);
            }
        }
    }

    fn spawn_pump(&self, characteristic: Uuid, notifications: NotificationStream) -> ActiveSubscription {
        let events = self.events.clone();
        let mut subscription = Subscription::new(characteristic, notifications, move |payload| {
            decode_or_report(characteristic, payload, &events)
        });
        let token = subscription.cancellation_token();
        let state = self.state.clone();

        let handle = tokio::spawn(async move {
            while let Some(update) = subscription.next().await {
                state.apply(update);
            }
            debug!(
                "Notification stream for {} ended",
                characteristic_name(&characteristic)
            );
        });

        ActiveSubscription {
            characteristic,
            token,
            handle,
        }
    }

    /// Stop delivery from one characteristic without ending the session.
    ///
    /// Returns `false` if no live subscription exists for it.
    pub async fn cancel_subscription(&self, characteristic: Uuid) -> bool {
        let guard = self.session.lock().await;
        let Some(session) = guard.as_ref() else {
            return false;
        };
        let Some(active) = session
            .subscriptions
            .iter()
            .find(|s| s.characteristic == characteristic && !s.token.is_cancelled())
        else {
            return false;
        };

        active.token.cancel();
        if let Err(e) = session.peripheral.unsubscribe(characteristic).await {
            warn!("Failed to unsubscribe from {}: {}", characteristic, e);
        }
        true
    }

    /// Tear down the session. Idempotent.
    ///
    /// Every subscription is cancelled before the peripheral disconnects, so
    /// no value is applied to the state afterwards.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn disconnect(&self) -> Result<()> {
        let session = self.session.lock().await.take();
        if let Some(partial) = self.partial.lock().await.take() {
            teardown(partial).await;
        }

        let Some(session) = session else {
            debug!("Not connected, nothing to disconnect");
            self.state.set_session(SessionState::Disconnected);
            return Ok(());
        };

        let peripheral = Arc::clone(&session.peripheral);
        stop_all(&*peripheral, session.subscriptions).await;
        let result = peripheral.disconnect().await;

        self.state.set_session(SessionState::Disconnected);
        let reason = match &result {
            Ok(()) => DisconnectReason::UserRequested,
            Err(e) => DisconnectReason::BleError(e.to_string()),
        };
        self.events.send(LinkEvent::Disconnected { reason });
        info!("Disconnected");
        result
    }
}

fn decode_or_report(
    characteristic: Uuid,
    payload: &[u8],
    events: &EventDispatcher,
) -> Option<ThermalUpdate> {
    match decode_update(&characteristic, payload)? {
        Ok(update) => Some(update),
        Err(e) => {
            debug!("Discarding payload from {}: {}", characteristic, e);
            events.send(LinkEvent::PayloadDiscarded {
                characteristic: characteristic.to_string(),
                reason: e.to_string(),
            });
            None
        }
    }
}

async fn stop_all<P: ThermalPeripheral + ?Sized>(
    peripheral: &P,
    subscriptions: Vec<ActiveSubscription>,
) {
    for active in subscriptions {
        let characteristic = active.characteristic;
        active.stop().await;
        if let Err(e) = peripheral.unsubscribe(characteristic).await {
            debug!("Unsubscribe from {} failed: {}", characteristic, e);
        }
    }
}

async fn teardown<P: ThermalPeripheral>(session: Session<P>) {
    stop_all(&*session.peripheral, session.subscriptions).await;
    if let Err(e) = session.peripheral.disconnect().await {
        debug!("Best-effort disconnect failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FailurePoint, MockPeripheral, MockProvider};
    use thermoview_types::uuid::{AVERAGE_TEMPERATURE, MAX_TEMPERATURE, RAW_GRID};

    fn manager(policy: SubscribePolicy) -> (Arc<MockPeripheral>, LinkManager<MockProvider>) {
        let peripheral = Arc::new(MockPeripheral::default());
        let provider = MockProvider::new(Arc::clone(&peripheral));
        let link = LinkManager::new(provider, LinkConfig::new().policy(policy));
        (peripheral, link)
    }

    #[test]
    fn test_subscribe_policy_parse() {
        assert_eq!("rollback".parse::<SubscribePolicy>().unwrap(), SubscribePolicy::Rollback);
        assert_eq!(
            "keep-partial".parse::<SubscribePolicy>().unwrap(),
            SubscribePolicy::KeepPartial
        );
        assert!("sometimes".parse::<SubscribePolicy>().is_err());
        assert_eq!(SubscribePolicy::KeepPartial.to_string(), "keep-partial");
    }

    #[test]
    fn test_link_config_validate() {
        assert!(LinkConfig::default().validate().is_ok());
        assert!(LinkConfig::new().device_name("  ").validate().is_err());
        assert!(LinkConfig::new().event_capacity(0).validate().is_err());
    }

    #[tokio::test]
    async fn test_connect_subscribes_in_order() {
        let (peripheral, link) = manager(SubscribePolicy::Rollback);
        assert_eq!(link.connect().await, SessionState::Connected);
        assert_eq!(
            peripheral.subscribe_calls(),
            vec![RAW_GRID, AVERAGE_TEMPERATURE, MAX_TEMPERATURE]
        );
        assert_eq!(
            link.active_subscriptions().await,
            vec![RAW_GRID, AVERAGE_TEMPERATURE, MAX_TEMPERATURE]
        );
        assert!(link.connected_device().await.is_some());
    }

    #[tokio::test]
    async fn test_missing_characteristic_subscribes_nothing() {
        let (peripheral, link) = manager(SubscribePolicy::KeepPartial);
        peripheral.fail_at(FailurePoint::ResolveCharacteristic(MAX_TEMPERATURE));

        let err = link.try_connect().await.unwrap_err();
        assert!(matches!(err, Error::CharacteristicNotFound { .. }));
        assert!(peripheral.subscribe_calls().is_empty());
        assert_eq!(link.session_state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_cancel_single_subscription() {
        let (peripheral, link) = manager(SubscribePolicy::Rollback);
        link.connect().await;

        assert!(link.cancel_subscription(AVERAGE_TEMPERATURE).await);
        assert!(!link.cancel_subscription(AVERAGE_TEMPERATURE).await);
        assert_eq!(peripheral.unsubscribe_calls(), vec![AVERAGE_TEMPERATURE]);
        assert_eq!(
            link.active_subscriptions().await,
            vec![RAW_GRID, MAX_TEMPERATURE]
        );
        assert_eq!(link.session_state(), SessionState::Connected);
    }
}
