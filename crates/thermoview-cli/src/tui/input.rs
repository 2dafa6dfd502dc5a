//! Keyboard and mouse input handling for the TUI.
//!
//! # Key Bindings
//!
//! | Key                 | Action     |
//! |---------------------|------------|
//! | `q` / `Esc`         | Quit       |
//! | `c` / `Enter` / `Space` | Connect (press the button) |
//! | `d`                 | Disconnect |
//!
//! A left click on the connect button behaves like `c`.

use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};

use thermoview_core::Command;

use super::app::App;

/// User actions that can be triggered by input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Quit the application.
    Quit,
    /// Press the connect button.
    Connect,
    /// Tear down the session.
    Disconnect,
    /// Mouse click at the given terminal cell.
    MouseClick { x: u16, y: u16 },
    /// Nothing to do.
    None,
}

/// Map a key press to an action.
pub fn handle_key(key: KeyCode) -> Action {
    match key {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('c') | KeyCode::Enter | KeyCode::Char(' ') => Action::Connect,
        KeyCode::Char('d') => Action::Disconnect,
        _ => Action::None,
    }
}

/// Map a mouse event to an action.
pub fn handle_mouse(event: MouseEvent) -> Action {
    match event.kind {
        MouseEventKind::Down(MouseButton::Left) => Action::MouseClick {
            x: event.column,
            y: event.row,
        },
        _ => Action::None,
    }
}

/// Apply an action to the application state.
///
/// Returns `Some(Command)` if the background worker has to act, `None` if the
/// action was handled entirely within the UI.
pub fn apply_action(app: &mut App, action: Action) -> Option<Command> {
    match action {
        Action::Quit => {
            app.should_quit = true;
            None
        }
        Action::Connect => {
            // The button does nothing while connected or mid-handshake.
            if app.is_connected() || app.connecting {
                None
            } else {
                Some(Command::Connect)
            }
        }
        Action::Disconnect => Some(Command::Disconnect),
        Action::MouseClick { x, y } => {
            let on_button = app.button_area.is_some_and(|area| {
                x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
            });
            if on_button {
                apply_action(app, Action::Connect)
            } else {
                None
            }
        }
        Action::None => None,
    }
}
