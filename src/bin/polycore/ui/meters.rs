//! Peak meters per channel and for the master bus

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Gauge},
    Frame,
};

use polycore::patch::params::gain_to_db;

/// Meter floor in dB.
const FLOOR_DB: f32 = -60.0;

/// Peak gain as a `0..=1` meter position on a dB scale.
pub fn meter_ratio(peak: f32) -> f64 {
    let db = gain_to_db(peak).max(FLOOR_DB);
    ((db - FLOOR_DB) / -FLOOR_DB).clamp(0.0, 1.0) as f64
}

fn meter_color(peak: f32) -> Color {
    if peak >= 1.0 {
        Color::Red
    } else if peak >= 0.5 {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// One labelled row per entry: `(name, selected, left, right)`.
pub fn render_meters(frame: &mut Frame, area: Rect, rows: &[(String, bool, f32, f32)]) {
    let block = Block::default().title(" Levels ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(rows.iter().map(|_| Constraint::Length(1)).collect::<Vec<_>>())
        .split(inner);

    for ((name, selected, left, right), chunk) in rows.iter().zip(chunks.iter()) {
        let peak = left.max(*right);
        let label = format!(
            "{}{:<6} {:>6.1} dB",
            if *selected { ">" } else { " " },
            name,
            gain_to_db(peak).max(FLOOR_DB)
        );
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(meter_color(peak)))
            .ratio(meter_ratio(peak))
            .label(label);
        frame.render_widget(gauge, *chunk);
    }
}
