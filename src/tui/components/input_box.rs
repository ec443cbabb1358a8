//! # InputBox Component
//!
//! Single-paragraph question editor. Enter submits, so pasted newlines are
//! folded into spaces. Long questions wrap by display width and scroll once
//! they exceed [`MAX_VISIBLE_LINES`].

use std::ops::Range;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Padding, Paragraph};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

/// Border (2) + padding (2) consumed horizontally by the bordered block
const HORIZONTAL_OVERHEAD: u16 = 4;
/// Top + bottom borders consumed vertically
const VERTICAL_OVERHEAD: u16 = 2;
/// Maximum visible content lines before internal scrolling kicks in
pub const MAX_VISIBLE_LINES: u16 = 5;

/// High-level events emitted by the InputBox
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// User submitted the text (Enter pressed)
    Submit(String),
    ContentChanged,
}

pub struct InputBox {
    buffer: String,
    /// Cursor as a byte offset into `buffer` (always on a char boundary).
    cursor: usize,
    /// First visible wrapped row.
    scroll: u16,
    /// Prop: a turn is in flight.
    pub busy: bool,
}

impl Default for InputBox {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBox {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            cursor: 0,
            scroll: 0,
            busy: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Put a rejected submission back, cursor at the end.
    pub fn restore(&mut self, text: String) {
        self.cursor = text.len();
        self.buffer = text;
    }

    /// Height for the current buffer at `width`, borders included.
    pub fn calculate_height(&self, width: u16) -> u16 {
        let inner = width.saturating_sub(HORIZONTAL_OVERHEAD);
        let rows = self.row_count(inner);
        rows.clamp(1, MAX_VISIBLE_LINES) + VERTICAL_OVERHEAD
    }

    fn row_count(&self, inner: u16) -> u16 {
        let rows = wrap_rows(&self.buffer, inner).len() as u16;
        let (cursor_row, _) = cursor_cell(&self.buffer, self.cursor, inner);
        rows.max(cursor_row + 1)
    }

    fn insert(&mut self, text: &str) {
        let folded: String = text
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        self.buffer.insert_str(self.cursor, &folded);
        self.cursor += folded.len();
    }

    fn title(&self) -> &'static str {
        if self.busy {
            "Answering... (Esc to cancel)"
        } else {
            "Ask a question (Enter to send, Esc to quit)"
        }
    }
}

impl Component for InputBox {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let inner = area.width.saturating_sub(HORIZONTAL_OVERHEAD);
        let visible = area.height.saturating_sub(VERTICAL_OVERHEAD).max(1);
        let (cursor_row, cursor_col) = cursor_cell(&self.buffer, self.cursor, inner);

        // Keep the cursor row on screen.
        if cursor_row < self.scroll {
            self.scroll = cursor_row;
        } else if cursor_row >= self.scroll + visible {
            self.scroll = cursor_row + 1 - visible;
        }

        let lines: Vec<Line> = wrap_rows(&self.buffer, inner)
            .into_iter()
            .skip(self.scroll as usize)
            .take(visible as usize)
            .map(|range| Line::from(&self.buffer[range]))
            .collect();

        let border = if self.busy { Color::DarkGray } else { Color::Green };
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border))
            .padding(Padding::horizontal(1))
            .title(self.title());
        frame.render_widget(
            Paragraph::new(lines)
                .block(block)
                .style(Style::default().fg(Color::Green)),
            area,
        );

        frame.set_cursor_position((
            area.x + 2 + cursor_col,
            area.y + 1 + (cursor_row - self.scroll),
        ));
    }
}

impl EventHandler for InputBox {
    type Event = InputEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::InputChar(c) => {
                let mut tmp = [0u8; 4];
                self.insert(c.encode_utf8(&mut tmp));
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Paste(text) => {
                self.insert(text);
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Backspace => {
                let prev = prev_char_boundary(&self.buffer, self.cursor)?;
                self.buffer.drain(prev..self.cursor);
                self.cursor = prev;
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Delete => {
                let next = next_char_boundary(&self.buffer, self.cursor)?;
                self.buffer.drain(self.cursor..next);
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::CursorLeft => {
                self.cursor = prev_char_boundary(&self.buffer, self.cursor)?;
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::CursorRight => {
                self.cursor = next_char_boundary(&self.buffer, self.cursor)?;
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::CursorHome => (self.cursor != 0).then(|| {
                self.cursor = 0;
                InputEvent::ContentChanged
            }),
            TuiEvent::CursorEnd => (self.cursor != self.buffer.len()).then(|| {
                self.cursor = self.buffer.len();
                InputEvent::ContentChanged
            }),
            TuiEvent::Submit => {
                if self.buffer.trim().is_empty() {
                    return None;
                }
                let text = std::mem::take(&mut self.buffer);
                self.cursor = 0;
                self.scroll = 0;
                Some(InputEvent::Submit(text))
            }
            _ => None,
        }
    }
}

/// Split `text` into rows of at most `width` display columns.
fn wrap_rows(text: &str, width: u16) -> Vec<Range<usize>> {
    let width = usize::from(width.max(1));
    let mut rows = Vec::new();
    let mut start = 0;
    let mut used = 0;
    for (i, c) in text.char_indices() {
        let w = c.width().unwrap_or(0);
        if used + w > width && i > start {
            rows.push(start..i);
            start = i;
            used = 0;
        }
        used += w;
    }
    rows.push(start..text.len());
    rows
}

/// Row and column of the cursor. A cursor right after a full row sits at
/// the start of the next one.
fn cursor_cell(text: &str, cursor: usize, width: u16) -> (u16, u16) {
    let rows = wrap_rows(text, width);
    let last = rows.len() - 1;
    for (row, range) in rows.iter().enumerate() {
        if cursor < range.end || row == last {
            let col = text[range.start..cursor].width() as u16;
            if col >= width.max(1) {
                return (row as u16 + 1, 0);
            }
            return (row as u16, col);
        }
    }
    (0, 0)
}

fn prev_char_boundary(text: &str, pos: usize) -> Option<usize> {
    text[..pos].char_indices().next_back().map(|(i, _)| i)
}

fn next_char_boundary(text: &str, pos: usize) -> Option<usize> {
    text[pos..].chars().next().map(|c| pos + c.len_utf8())
}
