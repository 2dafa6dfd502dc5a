//! Background worker for BLE link operations.
//!
//! The [`LinkWorker`] owns the [`LinkManager`] and runs every connect and
//! disconnect in a background task, keeping the UI thread responsive. It
//! communicates with the UI thread via channels:
//!
//! - Receives [`Command`]s from the UI to perform operations
//! - Sends [`UiEvent`]s back to report results and status updates
//!
//! Sensor values bypass the channels: the link manager publishes them into a
//! shared [`thermoview_core::ThermalState`] that the UI watches directly.

use std::sync::Arc;

use thermoview_core::{Command, DeviceProvider, LinkEvent, LinkManager, UiEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Background worker that handles the BLE session.
pub struct LinkWorker<D: DeviceProvider> {
    /// The link manager, shared so callers can inspect it in tests.
    link: Arc<LinkManager<D>>,
    /// Receiver for commands from the UI thread.
    command_rx: mpsc::Receiver<Command>,
    /// Sender for events back to the UI thread.
    event_tx: mpsc::Sender<UiEvent>,
}

impl<D: DeviceProvider + 'static> LinkWorker<D> {
    /// Create a new link worker.
    pub fn new(
        link: Arc<LinkManager<D>>,
        command_rx: mpsc::Receiver<Command>,
        event_tx: mpsc::Sender<UiEvent>,
    ) -> Self {
        Self {
            link,
            command_rx,
            event_tx,
        }
    }

    /// Run the worker's main loop.
    ///
    /// This method consumes the worker and runs until a [`Command::Shutdown`]
    /// is received or the command channel is closed. The session is torn
    /// down on the way out.
    pub async fn run(mut self) {
        info!("LinkWorker started");
        let mut link_events = self.link.events();

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(Command::Shutdown) => {
                            info!("LinkWorker received shutdown command");
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            info!("Command channel closed, shutting down worker");
                            break;
                        }
                    }
                }
                event = link_events.recv() => {
                    match event {
                        Ok(event @ LinkEvent::PayloadDiscarded { .. }) => {
                            self.send_event(UiEvent::Link(event)).await;
                        }
                        Ok(other) => debug!(?other, "Link event"),
                        Err(RecvError::Lagged(n)) => debug!("Missed {} link events", n),
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }

        if let Err(e) = self.link.disconnect().await {
            warn!(error = %e, "Disconnect during shutdown failed");
        }
        info!("LinkWorker stopped");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect => self.handle_connect().await,
            Command::Disconnect => self.handle_disconnect().await,
            Command::Shutdown => {}
        }
    }

    async fn handle_connect(&self) {
        if self.link.session_state().is_connected() {
            debug!("Already connected, ignoring connect command");
            return;
        }

        self.send_event(UiEvent::Connecting).await;
        match self.link.try_connect().await {
            Ok(()) => {
                if let Some(device) = self.link.connected_device().await {
                    info!(device = %device.id, "Connected");
                    self.send_event(UiEvent::Connected { device }).await;
                }
            }
            Err(e) => {
                error!("BLE connection error: {}", e);
                self.send_event(UiEvent::ConnectionError {
                    error: e.to_string(),
                })
                .await;
            }
        }
    }

    async fn handle_disconnect(&self) {
        if let Err(e) = self.link.disconnect().await {
            warn!(error = %e, "Disconnect failed");
        }
        self.send_event(UiEvent::Disconnected).await;
    }

    async fn send_event(&self, event: UiEvent) {
        if let Err(e) = self.event_tx.send(event).await {
            debug!("UI event channel closed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use thermoview_core::uuid::MAX_TEMPERATURE;
    use thermoview_core::{
        FailurePoint, LinkConfig, MockPeripheral, MockProvider, SessionState,
    };
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    struct Harness {
        peripheral: Arc<MockPeripheral>,
        link: Arc<LinkManager<MockProvider>>,
        command_tx: mpsc::Sender<Command>,
        event_rx: mpsc::Receiver<UiEvent>,
        handle: JoinHandle<()>,
    }

    fn spawn_worker() -> Harness {
        let peripheral = Arc::new(MockPeripheral::default());
        let link = Arc::new(LinkManager::new(
            MockProvider::new(Arc::clone(&peripheral)),
            LinkConfig::default(),
        ));
        let (command_tx, command_rx) = mpsc::channel(8);
        let (event_tx, event_rx) = mpsc::channel(8);
        let worker = LinkWorker::new(Arc::clone(&link), command_rx, event_tx);
        Harness {
            peripheral,
            link,
            command_tx,
            event_rx,
            handle: tokio::spawn(worker.run()),
        }
    }

    async fn next_event(rx: &mut mpsc::Receiver<UiEvent>) -> UiEvent {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("no event")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_connect_reports_device() {
        let mut h = spawn_worker();
        h.command_tx.send(Command::Connect).await.unwrap();

        assert_eq!(next_event(&mut h.event_rx).await, UiEvent::Connecting);
        match next_event(&mut h.event_rx).await {
            UiEvent::Connected { device } => assert_eq!(device.id, "MOCK-THERMAL"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(h.link.session_state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let mut h = spawn_worker();
        h.peripheral
            .fail_at(FailurePoint::ResolveCharacteristic(MAX_TEMPERATURE));
        h.command_tx.send(Command::Connect).await.unwrap();

        assert_eq!(next_event(&mut h.event_rx).await, UiEvent::Connecting);
        assert!(matches!(
            next_event(&mut h.event_rx).await,
            UiEvent::ConnectionError { .. }
        ));
        assert_eq!(h.link.session_state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_discarded_payload_is_forwarded() {
        let mut h = spawn_worker();
        h.command_tx.send(Command::Connect).await.unwrap();
        next_event(&mut h.event_rx).await;
        next_event(&mut h.event_rx).await;

        h.peripheral
            .push_text(thermoview_core::uuid::RAW_GRID, "1,2,3");
        assert!(matches!(
            next_event(&mut h.event_rx).await,
            UiEvent::Link(LinkEvent::PayloadDiscarded { .. })
        ));
    }

    #[tokio::test]
    async fn test_shutdown_disconnects() {
        let mut h = spawn_worker();
        h.command_tx.send(Command::Connect).await.unwrap();
        next_event(&mut h.event_rx).await;
        next_event(&mut h.event_rx).await;

        h.command_tx.send(Command::Shutdown).await.unwrap();
        timeout(Duration::from_secs(1), h.handle)
            .await
            .unwrap()
            .unwrap();
        assert!(!h.peripheral.is_connected_sync());
        assert_eq!(h.link.session_state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_command() {
        let mut h = spawn_worker();
        h.command_tx.send(Command::Connect).await.unwrap();
        next_event(&mut h.event_rx).await;
        next_event(&mut h.event_rx).await;

        h.command_tx.send(Command::Disconnect).await.unwrap();
        assert_eq!(next_event(&mut h.event_rx).await, UiEvent::Disconnected);
        assert_eq!(h.peripheral.disconnect_count(), 1);
    }
}
