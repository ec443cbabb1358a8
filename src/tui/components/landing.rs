//! # Landing Page Component
//!
//! Shown in place of the message list until the first question is asked.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use super::AVATAR;
use crate::tui::component::Component;

pub struct LandingPage {
    pub endpoint: String,
}

impl LandingPage {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
        }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let dim = Style::default().fg(Color::DarkGray);
        vec![
            Line::from(Span::styled(
                format!("{AVATAR}  Lecture Tutor"),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from("Ask anything about your course lectures."),
            Line::from(Span::styled(
                "Answers cite the lecture and timestamp they came from.",
                dim,
            )),
            Line::default(),
            Line::from(Span::styled(
                format!("v{} · {}", env!("CARGO_PKG_VERSION"), self.endpoint),
                dim,
            )),
        ]
    }
}

impl Component for LandingPage {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let lines = self.lines();
        let [middle] = Layout::vertical([Constraint::Length(lines.len() as u16)])
            .flex(Flex::Center)
            .areas(area);
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, middle);
    }
}
