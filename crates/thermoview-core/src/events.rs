//! Link event system for connection and payload notifications.
//!
//! The link manager publishes a [`LinkEvent`] at every step of a session's
//! life. Front-ends subscribe through an [`EventDispatcher`] for status
//! lines and diagnostics; sensor values travel separately through
//! [`crate::ThermalState`].

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Identity of the connected peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Platform address or identifier.
    pub id: String,
    /// Advertised name if known.
    pub name: Option<String>,
}

impl DeviceId {
    /// Create a device ID with an optional name.
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string),
        }
    }
}

/// Step of the connect handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeStage {
    /// Asking the provider for a matching peripheral.
    RequestDevice,
    /// Opening the GATT connection.
    Connect,
    /// Resolving the thermal service.
    ResolveService,
    /// Resolving the three data characteristics.
    ResolveCharacteristics,
    /// Enabling notifications.
    Subscribe,
}

impl std::fmt::Display for HandshakeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::RequestDevice => "request device",
            Self::Connect => "connect",
            Self::ResolveService => "resolve service",
            Self::ResolveCharacteristics => "resolve characteristics",
            Self::Subscribe => "subscribe",
        };
        f.write_str(text)
    }
}

/// Events published by the link manager.
///
/// All events are serializable for logging and `watch --format json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum LinkEvent {
    /// A connect attempt started.
    Connecting { device_name: String },
    /// Handshake completed, all characteristics subscribed.
    Connected { device: DeviceId },
    /// Handshake failed at `stage`.
    ConnectFailed { stage: HandshakeStage, error: String },
    /// Session torn down.
    Disconnected { reason: DisconnectReason },
    /// A notification payload could not be decoded and was dropped.
    PayloadDiscarded { characteristic: String, reason: String },
}

/// Reason for disconnection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DisconnectReason {
    /// Normal disconnection requested by user.
    UserRequested,
    /// Partial session from a failed handshake was released.
    HandshakeAbandoned,
    /// BLE error occurred.
    BleError(String),
}

/// Sender for link events.
pub type EventSender = broadcast::Sender<LinkEvent>;

/// Receiver for link events.
pub type EventReceiver = broadcast::Receiver<LinkEvent>;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: LinkEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}
