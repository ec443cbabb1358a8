use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Padding, Paragraph, Widget, Wrap};

use super::AVATAR;
use crate::core::transcript::{Message as TranscriptMessage, Role};
use crate::tui::component::Component;
use crate::tui::markdown;

/// Horizontal padding (per side) between the border and text content.
const CONTENT_PAD_H: u16 = 1;
/// Total horizontal space consumed by borders (1 left + 1 right) and padding.
const HORIZONTAL_OVERHEAD: u16 = 2 + CONTENT_PAD_H * 2;
/// Total vertical space consumed by borders (1 top + 1 bottom).
const VERTICAL_OVERHEAD: u16 = 2;

/// Renders one transcript message in a bordered box.
///
/// Transient: built each frame from a borrowed message. Assistant answers are
/// rendered as markdown; their sources, once attached, are listed underneath.
///
/// [`calculate_height`](Self::calculate_height) predicts the rendered height
/// with the same `Paragraph` that is later drawn, so the parent `MessageList`
/// can lay out its scroll canvas without rendering.
#[derive(Clone, Copy)]
pub struct Message<'a> {
    pub message: &'a TranscriptMessage,
    /// The answer is still being revealed.
    pub is_streaming: bool,
}

impl<'a> Message<'a> {
    pub fn new(message: &'a TranscriptMessage, is_streaming: bool) -> Self {
        Self {
            message,
            is_streaming,
        }
    }

    pub fn calculate_height(message: &TranscriptMessage, width: u16) -> u16 {
        let content_width = width.saturating_sub(HORIZONTAL_OVERHEAD);
        if content_width == 0 {
            return 1;
        }
        let lines = paragraph(body(message)).line_count(content_width);
        (lines as u16).max(1) + VERTICAL_OVERHEAD
    }
}

fn role_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::Green),
        Role::Assistant => Style::default().fg(Color::Blue),
    }
}

fn title(role: Role) -> String {
    match role {
        Role::User => "you".to_string(),
        Role::Assistant => format!("{AVATAR} tutor"),
    }
}

fn paragraph(text: Text<'static>) -> Paragraph<'static> {
    Paragraph::new(text).wrap(Wrap { trim: false })
}

/// Message text plus, for answers, the sources section.
fn body(message: &TranscriptMessage) -> Text<'static> {
    let style = role_style(message.role);
    let mut text = match message.role {
        Role::User => Text::styled(message.content.trim().to_string(), style),
        Role::Assistant => markdown::render(message.content.trim_end(), Color::Blue),
    };

    if !message.sources.is_empty() {
        let dim = Style::default().fg(Color::DarkGray);
        if !text.lines.is_empty() {
            text.lines.push(Line::default());
        }
        text.lines.push(Line::from(Span::styled(
            "Sources",
            dim.add_modifier(Modifier::BOLD),
        )));
        for source in &message.sources {
            text.lines.push(Line::from(vec![
                Span::styled("  • ", dim),
                Span::styled(source.label(), Style::default().fg(Color::Gray)),
            ]));
            if let Some(excerpt) = source.excerpt() {
                text.lines.push(Line::from(Span::styled(
                    format!("    “{excerpt}”"),
                    dim.add_modifier(Modifier::ITALIC),
                )));
            }
        }
    }
    text
}

impl<'a> Widget for Message<'a> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let style = role_style(self.message.role);
        let border_style = if self.is_streaming {
            style.add_modifier(Modifier::BOLD)
        } else {
            style.add_modifier(Modifier::DIM)
        };

        let block = Block::bordered()
            .title(title(self.message.role))
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title_style(border_style)
            .padding(Padding::horizontal(CONTENT_PAD_H));
        let inner = block.inner(area);
        block.render(area, buf);
        paragraph(body(self.message)).render(inner, buf);
    }
}

impl<'a> Component for Message<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(*self, area);
    }
}
