//! Application state for the TUI dashboard.
//!
//! [`App`] holds everything the draw pass needs: the latest sensor snapshot,
//! the renderer and its canvas, and a transient status message. Sensor values
//! arrive through a `watch` receiver; command outcomes arrive as [`UiEvent`]s.

use std::time::{Duration, Instant};

use ratatui::layout::Rect;
use thermoview_core::{
    Canvas, Command, DeviceId, LinkEvent, Renderer, ThermalSnapshot, UiEvent,
};
use tokio::sync::{mpsc, watch};
use tracing::trace;

use crate::format::{format_average, format_maximum};

/// How long a status message stays visible.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(5);

/// Main application state for the TUI.
pub struct App {
    /// Whether the application should exit.
    pub should_quit: bool,
    /// Latest sensor values and session state.
    pub snapshot: ThermalSnapshot,
    /// Connected peripheral, if any.
    pub device: Option<DeviceId>,
    /// Whether a connect attempt is in flight.
    pub connecting: bool,
    /// Transient status message and when it was posted.
    pub status_message: Option<(String, Instant)>,
    /// Number of notification payloads dropped for a bad value count.
    pub discarded_payloads: u64,
    /// Whether the dashboard is fed by the simulated sensor.
    pub demo: bool,
    /// Screen area of the connect button, recorded by the last draw.
    pub button_area: Option<Rect>,
    /// Sender for commands to the background worker.
    pub command_tx: mpsc::Sender<Command>,
    /// Receiver for events from the background worker.
    pub event_rx: mpsc::Receiver<UiEvent>,
    state_rx: watch::Receiver<ThermalSnapshot>,
    renderer: Renderer,
    rendered_revision: u64,
}

impl App {
    /// Create a new application and paint the current grid, which is all
    /// zeros before the first notification.
    pub fn new(
        command_tx: mpsc::Sender<Command>,
        event_rx: mpsc::Receiver<UiEvent>,
        mut state_rx: watch::Receiver<ThermalSnapshot>,
        mut renderer: Renderer,
        demo: bool,
    ) -> Self {
        let snapshot = state_rx.borrow_and_update().clone();
        renderer.render(&snapshot.grid);
        let rendered_revision = snapshot.grid_revision;
        Self {
            should_quit: false,
            snapshot,
            device: None,
            connecting: false,
            status_message: None,
            discarded_payloads: 0,
            demo,
            button_area: None,
            command_tx,
            event_rx,
            state_rx,
            renderer,
            rendered_revision,
        }
    }

    /// Check if the app should quit.
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Whether the session is connected.
    pub fn is_connected(&self) -> bool {
        self.snapshot.session.is_connected()
    }

    /// Button label: `Connected` while a session is up, `Connect BLE` otherwise.
    pub fn button_label(&self) -> &'static str {
        if self.is_connected() {
            "Connected"
        } else {
            "Connect BLE"
        }
    }

    /// `Average: 23.50 °C`
    pub fn average_text(&self) -> String {
        format_average(self.snapshot.average)
    }

    /// `Max: 41.00 °C`
    pub fn maximum_text(&self) -> String {
        format_maximum(self.snapshot.maximum)
    }

    /// The heat-map canvas, if one is attached.
    pub fn canvas(&self) -> Option<&Canvas> {
        self.renderer.canvas()
    }

    /// Number of heat-map frames drawn.
    pub fn frames_rendered(&self) -> u64 {
        self.renderer.frames_rendered()
    }

    /// Pull the latest snapshot and repaint the heat-map if the grid changed.
    ///
    /// Returns `true` when anything changed.
    pub fn refresh(&mut self) -> bool {
        if !self.state_rx.has_changed().unwrap_or(false) {
            return false;
        }
        self.snapshot = self.state_rx.borrow_and_update().clone();

        if self.snapshot.session.is_connected() {
            self.connecting = false;
        }
        if self.snapshot.grid_revision != self.rendered_revision {
            trace!(revision = self.snapshot.grid_revision, "Repainting heat-map");
            self.renderer.render(&self.snapshot.grid);
            self.rendered_revision = self.snapshot.grid_revision;
        }
        true
    }

    /// Apply an event from the background worker.
    pub fn handle_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Connecting => {
                self.connecting = true;
                self.push_status_message("Connecting...".to_string());
            }
            UiEvent::Connected { device } => {
                self.connecting = false;
                let label = device.name.clone().unwrap_or_else(|| device.id.clone());
                self.push_status_message(format!("Connected to {}", label));
                self.device = Some(device);
            }
            UiEvent::ConnectionError { error } => {
                self.connecting = false;
                self.push_status_message(format!("Connection failed: {}", error));
            }
            UiEvent::Disconnected => {
                self.connecting = false;
                self.device = None;
                self.push_status_message("Disconnected".to_string());
            }
            UiEvent::Link(LinkEvent::PayloadDiscarded { .. }) => {
                self.discarded_payloads += 1;
            }
            UiEvent::Link(_) => {}
        }
    }

    /// Show a status message for a few seconds.
    pub fn push_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Drop the status message once it has expired.
    pub fn clean_expired_messages(&mut self) {
        if let Some((_, posted)) = &self.status_message
            && posted.elapsed() >= STATUS_MESSAGE_TTL
        {
            self.status_message = None;
        }
    }

    /// The current status message text.
    pub fn status_text(&self) -> Option<&str> {
        self.status_message.as_ref().map(|(m, _)| m.as_str())
    }
}
