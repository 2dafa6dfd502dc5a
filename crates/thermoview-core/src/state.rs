//! Shared sensor state.
//!
//! [`ThermalState`] owns the latest grid, average, maximum and session
//! state. Writers replace values wholesale; readers either take a
//! [`ThermalSnapshot`] or hold a `watch` receiver and wake on every change.
//! Each field carries its own revision counter so a consumer can tell which
//! value changed since it last looked.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::trace;

use thermoview_types::{SessionState, ThermalGrid, ThermalUpdate};

/// Point-in-time copy of everything the display shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThermalSnapshot {
    /// Latest complete grid. All zeros until the first grid arrives.
    pub grid: ThermalGrid,
    /// Latest average temperature. Zero until the first value arrives.
    pub average: f64,
    /// Latest maximum temperature. Zero until the first value arrives.
    pub maximum: f64,
    /// Current session state.
    pub session: SessionState,
    /// Bumped on every grid replacement.
    pub grid_revision: u64,
    /// Bumped on every average update.
    pub average_revision: u64,
    /// Bumped on every maximum update.
    pub maximum_revision: u64,
}

impl Default for ThermalSnapshot {
    fn default() -> Self {
        Self {
            grid: ThermalGrid::default(),
            average: 0.0,
            maximum: 0.0,
            session: SessionState::Disconnected,
            grid_revision: 0,
            average_revision: 0,
            maximum_revision: 0,
        }
    }
}

impl ThermalSnapshot {
    /// Whether any sensor value has been received.
    pub fn has_data(&self) -> bool {
        self.grid_revision + self.average_revision + self.maximum_revision > 0
    }
}

/// Cloneable handle to the shared sensor state.
#[derive(Debug, Clone)]
pub struct ThermalState {
    sender: Arc<watch::Sender<ThermalSnapshot>>,
}

impl Default for ThermalState {
    fn default() -> Self {
        Self::new()
    }
}

impl ThermalState {
    /// Fresh state: zero grid, zero scalars, disconnected.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(ThermalSnapshot::default());
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Copy of the current values.
    pub fn snapshot(&self) -> ThermalSnapshot {
        self.sender.borrow().clone()
    }

    /// Receiver that is notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<ThermalSnapshot> {
        self.sender.subscribe()
    }

    /// Current session state.
    pub fn session(&self) -> SessionState {
        self.sender.borrow().session
    }

    /// Replace the whole grid.
    pub fn replace_grid(&self, grid: ThermalGrid) {
        self.sender.send_modify(|s| {
            s.grid = grid;
            s.grid_revision += 1;
        });
        trace!("Grid replaced");
    }

    /// Store a new average temperature.
    pub fn set_average(&self, value: f64) {
        self.sender.send_modify(|s| {
            s.average = value;
            s.average_revision += 1;
        });
    }

    /// Store a new maximum temperature.
    pub fn set_maximum(&self, value: f64) {
        self.sender.send_modify(|s| {
            s.maximum = value;
            s.maximum_revision += 1;
        });
    }

    /// Update the session state. Returns whether it changed.
    pub fn set_session(&self, session: SessionState) -> bool {
        self.sender.send_if_modified(|s| {
            let changed = s.session != session;
            s.session = session;
            changed
        })
    }

    /// Apply one decoded notification.
    pub fn apply(&self, update: ThermalUpdate) {
        match update {
            ThermalUpdate::Grid(grid) => self.replace_grid(grid),
            ThermalUpdate::Average(value) => self.set_average(value),
            ThermalUpdate::Maximum(value) => self.set_maximum(value),
        }
    }
}
