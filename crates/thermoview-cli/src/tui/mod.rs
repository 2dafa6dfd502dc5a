//! Main entry point for the TUI dashboard.
//!
//! This module ties together all the TUI components and provides the main
//! event loop for the terminal user interface. It handles:
//!
//! - Terminal setup and restoration
//! - Channel creation for worker communication
//! - The main event loop with input handling and rendering
//! - Graceful shutdown coordination
//!
//! With `demo` set, the dashboard connects to an in-memory peripheral fed by
//! a synthetic moving hot spot instead of BLE hardware.

pub mod app;
pub mod input;
pub mod ui;
pub mod worker;

pub use app::App;
pub use worker::LinkWorker;

use std::io::{self, stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    ExecutableCommand,
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use thermoview_core::mock::spawn_synthetic_feed;
use thermoview_core::{
    BleProvider, Command, LinkManager, MockPeripheral, MockProvider, Renderer, ThermalState,
    UiEvent,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;

/// Interval between synthetic frames in demo mode.
const DEMO_FRAME_PERIOD: Duration = Duration::from_millis(150);

/// Set up the terminal for TUI rendering.
///
/// Enables raw mode, mouse capture, and switches to the alternate screen buffer.
pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to its original state.
///
/// Disables mouse capture, raw mode and returns to the main screen buffer.
pub fn restore_terminal() -> Result<()> {
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

/// Run the TUI application.
///
/// 1. Creates the shared state and the UI/worker channels
/// 2. Spawns the background link worker (BLE or simulated)
/// 3. Runs the main event loop
/// 4. Shuts the worker down and restores the terminal
pub async fn run(config: Config, demo: bool) -> Result<()> {
    let state = ThermalState::new();
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(32);
    let (event_tx, event_rx) = mpsc::channel::<UiEvent>(32);
    let feed_cancel = CancellationToken::new();

    let (worker_handle, feed_handle) =
        spawn_worker(&config, demo, state.clone(), cmd_rx, event_tx, &feed_cancel);

    let side = config.render.canvas_size;
    let renderer = Renderer::with_canvas(config.render_options(), side, side)
        .context("Failed to create heat-map canvas")?;
    let mut app = App::new(cmd_tx.clone(), event_rx, state.subscribe(), renderer, demo);

    let mut terminal = setup_terminal()?;
    let result = run_event_loop(&mut terminal, &mut app, &cmd_tx).await;

    // Send shutdown command to worker
    let _ = cmd_tx.try_send(Command::Shutdown);

    restore_terminal()?;

    let _ = worker_handle.await;
    feed_cancel.cancel();
    if let Some(handle) = feed_handle {
        let _ = handle.await;
    }

    result
}

/// Spawn the link worker, plus the synthetic feed in demo mode.
fn spawn_worker(
    config: &Config,
    demo: bool,
    state: ThermalState,
    cmd_rx: mpsc::Receiver<Command>,
    event_tx: mpsc::Sender<UiEvent>,
    feed_cancel: &CancellationToken,
) -> (JoinHandle<()>, Option<JoinHandle<()>>) {
    let link_config = config.link_config();
    if demo {
        info!("Starting dashboard with simulated sensor");
        let peripheral = Arc::new(MockPeripheral::new(&config.device_name));
        let feed = spawn_synthetic_feed(
            Arc::clone(&peripheral),
            DEMO_FRAME_PERIOD,
            feed_cancel.clone(),
        );
        let link = LinkManager::with_state(MockProvider::new(peripheral), link_config, state);
        let worker = LinkWorker::new(Arc::new(link), cmd_rx, event_tx);
        (tokio::spawn(worker.run()), Some(feed))
    } else {
        let provider = BleProvider::new(config.scan_timeout(), config.connection_config());
        let link = LinkManager::with_state(provider, link_config, state);
        let worker = LinkWorker::new(Arc::new(link), cmd_rx, event_tx);
        (tokio::spawn(worker.run()), None)
    }
}

/// Main event loop for the TUI.
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    command_tx: &mpsc::Sender<Command>,
) -> Result<()> {
    while !app.should_quit() {
        app.clean_expired_messages();
        app.refresh();

        terminal.draw(|f| ui::draw(f, app))?;

        // Poll for keyboard and mouse events with timeout
        if event::poll(Duration::from_millis(50))? {
            let action = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key(key.code),
                Event::Mouse(mouse_event) => input::handle_mouse(mouse_event),
                _ => input::Action::None,
            };
            if let Some(cmd) = input::apply_action(app, action) {
                let _ = command_tx.try_send(cmd);
            }
        }

        // Non-blocking receive of worker events
        while let Ok(event) = app.event_rx.try_recv() {
            app.handle_ui_event(event);
        }

        tokio::task::yield_now().await;
    }

    Ok(())
}
