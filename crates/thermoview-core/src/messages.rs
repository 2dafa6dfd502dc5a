//! Message types for UI/worker communication.
//!
//! ```text
//! +------------------+     Command      +------------------+
//! |    UI Thread     | --------------> |   LinkWorker     |
//! |    (ratatui)     |                 |  (tokio runtime) |
//! |                  | <-------------- |                  |
//! +------------------+    UiEvent      +------------------+
//! ```
//!
//! Sensor values do not travel through these channels; the UI reads them
//! from [`crate::ThermalState`]. Only user actions and their outcomes do.

use crate::events::{DeviceId, LinkEvent};

/// Commands sent from the UI thread to the background worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the connect handshake.
    Connect,
    /// Tear down the session.
    Disconnect,
    /// Disconnect and stop the worker.
    Shutdown,
}

/// Events sent from the worker back to the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// A connect attempt started.
    Connecting,
    /// Connected to the peripheral.
    Connected { device: DeviceId },
    /// Connect attempt failed.
    ConnectionError { error: String },
    /// Session ended.
    Disconnected,
    /// A lower-level link event worth showing in the status line.
    Link(LinkEvent),
}
