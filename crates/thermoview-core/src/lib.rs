//! BLE link manager and heat-map renderer for thermal camera peripherals.
//!
//! This crate talks to a peripheral that exposes an 8x8 thermopile grid plus
//! average and maximum temperatures as text-encoded notify characteristics,
//! and turns each grid into an interpolated, elliptically clipped heat-map.
//!
//! # Features
//!
//! - **Link management**: one session, a fixed connect handshake, explicit
//!   partial-failure policy ([`LinkManager`], [`SubscribePolicy`])
//! - **Shared state**: latest grid and scalars with change notification
//!   ([`ThermalState`])
//! - **Cancellable subscriptions**: decoded notification streams
//!   ([`Subscription`])
//! - **Rendering**: bilinear upsampling, HSL colour scale, RGBA canvas
//!   ([`render`])
//! - **Testing**: an in-memory peripheral with failure injection ([`mock`])
//!
//! # Platform Differences
//!
//! - **macOS**: peripherals are identified by a CoreBluetooth UUID rather
//!   than a MAC address.
//! - **Linux/Windows**: peripherals are identified by their Bluetooth MAC
//!   address (e.g., `AA:BB:CC:DD:EE:FF`).
//!
//! # Quick Start
//!
//! ```no_run
//! use thermoview_core::{BleProvider, LinkConfig, LinkManager, SessionState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let link = LinkManager::new(BleProvider::default(), LinkConfig::default());
//!     link.try_connect().await?;
//!
//!     let mut updates = link.watch();
//!     while updates.changed().await.is_ok() {
//!         let snapshot = updates.borrow_and_update().clone();
//!         println!("avg {:.2} °C, max {:.2} °C", snapshot.average, snapshot.maximum);
//!         if snapshot.session != SessionState::Connected {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod device;
pub mod error;
pub mod events;
pub mod link;
pub mod messages;
pub mod mock;
pub mod render;
pub mod scan;
pub mod state;
pub mod subscription;
pub mod traits;
pub mod util;

// Re-export the platform-agnostic types crate modules.
pub use thermoview_types::{payload, types, uuid};
pub use thermoview_types::{ParseError, SessionState, ThermalGrid, ThermalUpdate};

// Core exports
pub use device::{BlePeripheral, ConnectionConfig};
pub use error::{ConnectionFailureReason, DeviceNotFoundReason, Error, Result};
pub use events::{
    DeviceId, DisconnectReason, EventDispatcher, EventReceiver, HandshakeStage, LinkEvent,
};
pub use link::{LinkConfig, LinkManager, SubscribePolicy};
pub use messages::{Command, UiEvent};
pub use mock::{FailurePoint, MockPeripheral, MockProvider};
pub use render::{Canvas, RenderOptions, Renderer, Rgba};
pub use scan::{BleProvider, DiscoveredDevice, ScanOptions};
pub use state::{ThermalSnapshot, ThermalState};
pub use subscription::Subscription;
pub use traits::{DeviceFilter, DeviceProvider, NotificationStream, ThermalPeripheral};
