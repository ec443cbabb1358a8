//! # TitleBar Component
//!
//! One-line status bar: avatar, the API endpoint answers come from, the
//! current status, and a "↓ New" hint when the conversation has grown below
//! the visible area.
//!
//! Purely presentational: every field is a prop.
//!
//! ```text
//! 🎓 Lecture Tutor (http://localhost:8000) | Answering... | ↓ New
//! ```

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use super::AVATAR;
use crate::tui::component::Component;

pub struct TitleBar {
    pub endpoint: String,
    pub status_message: String,
    pub has_unseen_content: bool,
}

impl TitleBar {
    pub fn new(endpoint: &str, status_message: &str, has_unseen_content: bool) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            status_message: status_message.to_string(),
            has_unseen_content,
        }
    }

    fn text(&self) -> String {
        let mut text = format!("{AVATAR} Lecture Tutor ({})", self.endpoint);
        if !self.status_message.is_empty() {
            text.push_str(" | ");
            text.push_str(&self.status_message);
        }
        if self.has_unseen_content {
            text.push_str(" | ↓ New");
        }
        text
    }
}

impl Component for TitleBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let line = Line::from(Span::styled(
            self.text(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(line, area);
    }
}
