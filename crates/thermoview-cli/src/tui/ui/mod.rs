//! Rendering for the TUI dashboard.
//!
//! ```text
//! ┌ thermoview ─────────────────────────────┐
//! │ ┌─────────────┐                         │
//! │ │ Connect BLE │  status message         │
//! │ └─────────────┘                         │
//! │            ▀▀▀▀▀▀▀▀▀▀▀▀▀▀               │
//! │          heat-map (circular)            │
//! │            ▀▀▀▀▀▀▀▀▀▀▀▀▀▀               │
//! │  Average: 23.50 °C    Max: 41.00 °C     │
//! └ c connect  d disconnect  q quit ────────┘
//! ```

pub mod heatmap;

use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use super::app::App;
use heatmap::HeatmapWidget;

/// Width of the connect button including borders.
const BUTTON_WIDTH: u16 = 17;

/// Draw the whole dashboard and record the button position for mouse hits.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let title = if app.demo {
        " thermoview (demo) "
    } else {
        " thermoview "
    };
    let outer = Block::default()
        .title(title)
        .title_bottom(Line::from(" c connect  d disconnect  q quit ").dim())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = outer.inner(frame.area());
    frame.render_widget(outer, frame.area());

    let [top, map, readouts] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(4),
        Constraint::Length(1),
    ])
    .areas(inner);

    draw_header(frame, app, top);
    frame.render_widget(HeatmapWidget::new(app.canvas()), map);
    draw_readouts(frame, app, readouts);
}

fn draw_header(frame: &mut Frame, app: &mut App, area: Rect) {
    let [button, status] =
        Layout::horizontal([Constraint::Length(BUTTON_WIDTH), Constraint::Min(0)]).areas(area);

    let button_style = if app.is_connected() {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else if app.connecting {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };
    let label = Paragraph::new(app.button_label())
        .alignment(Alignment::Center)
        .style(button_style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(button_style),
        );
    frame.render_widget(label, button);
    app.button_area = Some(button);

    let mut spans = Vec::new();
    if let Some(message) = app.status_text() {
        spans.push(Span::raw(message.to_string()));
    }
    if app.discarded_payloads > 0 {
        if !spans.is_empty() {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(
            format!("{} payload(s) discarded", app.discarded_payloads),
            Style::default().fg(Color::Yellow),
        ));
    }
    let status_area = Rect {
        y: status.y + status.height / 2,
        height: 1,
        x: status.x + 1,
        width: status.width.saturating_sub(1),
    };
    frame.render_widget(Paragraph::new(Line::from(spans)), status_area);
}

fn draw_readouts(frame: &mut Frame, app: &App, area: Rect) {
    let line = Line::from(vec![
        Span::raw(app.average_text()).bold(),
        Span::raw("    "),
        Span::raw(app.maximum_text()).bold(),
    ]);
    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}
