//! TUI module for polycore
//!
//! A computer-keyboard piano over the engine, with level meters and an
//! output scope. Terminals report key presses but not releases, so every
//! note is held for a fixed time and then released.

mod meters;
mod waveform;

use std::time::{Duration, Instant};

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::Consumer;

use polycore::SynthController;

use super::app::DEMO_CHANNELS;
use meters::render_meters;
use waveform::render_waveform;

/// Samples kept for the scope.
pub const SCOPE_LEN: usize = 1024;

/// How long a key press holds its note.
const NOTE_LENGTH: Duration = Duration::from_millis(350);

/// Home row and the row above, laid out like a piano from C.
const KEY_MAP: [(char, u8); 13] = [
    ('a', 0),
    ('w', 1),
    ('s', 2),
    ('e', 3),
    ('d', 4),
    ('f', 5),
    ('t', 6),
    ('g', 7),
    ('y', 8),
    ('h', 9),
    ('u', 10),
    ('j', 11),
    ('k', 12),
];

/// Note for a key, if the key is part of the keyboard.
pub fn key_to_note(key: char, octave: u8) -> Option<u8> {
    let offset = KEY_MAP.iter().find(|(k, _)| *k == key)?.1;
    let note = (octave as u16 + 1) * 12 + offset as u16;
    u8::try_from(note).ok().filter(|&n| n <= 127)
}

struct HeldNote {
    channel: u8,
    note: u8,
    until: Instant,
}

pub struct UiApp {
    controller: SynthController,
    scope_rx: Consumer<f32>,
    scope: Vec<f32>,
    sample_rate: f32,
    octave: u8,
    channel: u8,
    held: Vec<HeldNote>,
    status: String,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        controller: SynthController,
        scope_rx: Consumer<f32>,
        sample_rate: f32,
        octave: u8,
    ) -> Self {
        Self {
            controller,
            scope_rx,
            scope: vec![0.0; SCOPE_LEN],
            sample_rate,
            octave,
            channel: 0,
            held: Vec::new(),
            status: String::new(),
            should_quit: false,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_scope();
            self.release_expired();
            self.controller.collect_garbage();

            terminal.draw(|frame| self.render(frame))?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        self.controller.stop_all()?;
        Ok(())
    }

    fn poll_scope(&mut self) {
        let available = self.scope_rx.slots();
        if available == 0 {
            return;
        }
        if let Ok(chunk) = self.scope_rx.read_chunk(available) {
            self.scope.extend(chunk);
        }
        if self.scope.len() > SCOPE_LEN {
            let excess = self.scope.len() - SCOPE_LEN;
            self.scope.drain(0..excess);
        }
    }

    fn release_expired(&mut self) {
        let now = Instant::now();
        let controller = &mut self.controller;
        self.held.retain(|held| {
            if held.until > now {
                return true;
            }
            // A full queue keeps the note for the next pass.
            controller.note_off(held.channel, held.note).is_err()
        });
    }

    fn play(&mut self, note: u8) {
        match self.controller.note_on(self.channel, note, 100) {
            Ok(()) => self.held.push(HeldNote {
                channel: self.channel,
                note,
                until: Instant::now() + NOTE_LENGTH,
            }),
            Err(e) => self.status = e.to_string(),
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(' ') => {
                if let Err(e) = self.controller.stop_all() {
                    self.status = e.to_string();
                }
            }
            KeyCode::Char('z') => self.octave = self.octave.saturating_sub(1),
            KeyCode::Char('x') => self.octave = (self.octave + 1).min(8),
            KeyCode::Up => self.channel = self.channel.saturating_sub(1),
            KeyCode::Down => {
                self.channel = (self.channel + 1).min(DEMO_CHANNELS.len() as u8 - 1)
            }
            KeyCode::Char(c @ '1'..='5') => {
                let program = c as u8 - b'1';
                if let Err(e) = self.controller.program_change(self.channel, program) {
                    self.status = e.to_string();
                }
            }
            KeyCode::Char(c) => {
                if let Some(note) = key_to_note(c, self.octave) {
                    self.play(note);
                }
            }
            _ => {}
        }
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(DEMO_CHANNELS.len() as u16 + 3), // Meters
                Constraint::Min(6),                                  // Scope
                Constraint::Length(1),                               // Status
                Constraint::Length(1),                               // Help bar
            ])
            .split(frame.area());

        let mut rows: Vec<(String, bool, f32, f32)> = DEMO_CHANNELS
            .iter()
            .enumerate()
            .map(|(i, (name, _))| {
                let (left, right) = self.controller.query_levels(i as u8).unwrap_or((0.0, 0.0));
                (name.to_string(), i as u8 == self.channel, left, right)
            })
            .collect();
        let (left, right) = self.controller.master_levels();
        rows.push(("master".to_string(), false, left, right));
        render_meters(frame, chunks[0], &rows);

        render_waveform(frame, chunks[1], &self.scope);

        let status = format!(
            " {:.1} kHz  octave {}  {}",
            self.sample_rate / 1000.0,
            self.octave,
            self.status
        );
        frame.render_widget(
            Paragraph::new(status).style(Style::default().fg(Color::Cyan)),
            chunks[2],
        );

        let help = Paragraph::new(
            " [A-K] Play  [Z/X] Octave  [Up/Down] Channel  [1-5] Program  [Space] Stop  [Q] Quit",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_notes() {
        assert_eq!(key_to_note('a', 4), Some(60));
        assert_eq!(key_to_note('k', 4), Some(72));
        assert_eq!(key_to_note('w', 0), Some(13));
        assert_eq!(key_to_note('p', 4), None);
        assert_eq!(key_to_note('k', 9), None);
    }
}
