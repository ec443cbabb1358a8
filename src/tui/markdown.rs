//! Markdown → ratatui `Text`.
//!
//! Answers are markdown and are rendered while they are still being revealed,
//! so the input is often a prefix of a document (an unterminated code fence,
//! half a list). `pulldown_cmark` tolerates that; this module maps its events
//! to styled lines: headings, emphasis, inline code, fenced code (highlighted
//! with syntect), lists, block quotes and links.

use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME: LazyLock<Option<Theme>> = LazyLock::new(|| {
    ThemeSet::load_defaults()
        .themes
        .remove("base16-ocean.dark")
});

const TAB: &str = "    ";

fn frame_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

/// Render `content` with `base_fg` as the body color.
pub fn render(content: &str, base_fg: Color) -> Text<'static> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut renderer = Renderer::new(base_fg);
    for event in Parser::new_ext(content, options) {
        renderer.event(event);
    }
    renderer.finish()
}

enum Code {
    Highlighted(HighlightLines<'static>),
    Plain,
}

struct Renderer {
    lines: Vec<Line<'static>>,
    base: Style,
    /// Inline styles; each entry is already composed with its parent.
    styles: Vec<Style>,
    /// Prefixes repeated at the start of every line (quote bars, code gutter).
    gutters: Vec<Span<'static>>,
    /// `None` for bullets, `Some(next)` for numbered lists.
    lists: Vec<Option<u64>>,
    code: Option<Code>,
    link: Option<String>,
    gap_pending: bool,
}

impl Renderer {
    fn new(base_fg: Color) -> Self {
        Self {
            lines: Vec::new(),
            base: Style::default().fg(base_fg),
            styles: Vec::new(),
            gutters: Vec::new(),
            lists: Vec::new(),
            code: None,
            link: None,
            gap_pending: false,
        }
    }

    fn finish(self) -> Text<'static> {
        Text::from(self.lines)
    }

    fn current(&self) -> Style {
        self.styles.last().copied().unwrap_or(self.base)
    }

    fn with_style(&mut self, overlay: Style) {
        self.styles.push(self.current().patch(overlay));
    }

    fn new_line(&mut self) {
        let mut line = Line::default();
        line.spans.extend(self.gutters.iter().cloned());
        self.lines.push(line);
    }

    fn append(&mut self, span: Span<'static>) {
        if self.lines.is_empty() {
            self.new_line();
        }
        if let Some(line) = self.lines.last_mut() {
            line.push_span(span);
        }
    }

    /// Separate block elements with one blank line.
    fn gap(&mut self) {
        if self.gap_pending {
            self.new_line();
            self.gap_pending = false;
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.append(Span::styled(
                code.to_string(),
                Style::default().fg(Color::White).bg(Color::DarkGray),
            )),
            Event::SoftBreak => self.append(Span::raw(" ")),
            Event::HardBreak => self.new_line(),
            Event::Rule => {
                self.gap();
                self.new_line();
                self.append(Span::styled("─".repeat(40), frame_style()));
                self.gap_pending = true;
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.gap();
                self.new_line();
            }
            Tag::Heading { level, .. } => {
                self.gap();
                self.new_line();
                let style = heading_style(self.base, level);
                self.append(Span::styled(format!("{} ", "#".repeat(level as usize)), style));
                self.styles.push(style);
            }
            Tag::BlockQuote(_) => {
                self.gap();
                self.gutters.push(Span::styled("│ ", frame_style()));
                self.with_style(Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM));
            }
            Tag::CodeBlock(kind) => self.open_code(kind),
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.gap();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                self.new_line();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{indent}{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => format!("{indent}• "),
                };
                self.append(Span::styled(marker, frame_style()));
            }
            Tag::Emphasis => self.with_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.with_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.with_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { dest_url, .. } => {
                self.link = Some(dest_url.to_string());
                self.with_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.gap_pending = true,
            TagEnd::Heading(_) => {
                self.styles.pop();
                self.gap_pending = true;
            }
            TagEnd::BlockQuote(_) => {
                self.gutters.pop();
                self.styles.pop();
                self.gap_pending = true;
            }
            TagEnd::CodeBlock => {
                self.code = None;
                self.gutters.pop();
                self.new_line();
                self.append(Span::styled("╰──", frame_style()));
                self.gap_pending = true;
            }
            TagEnd::List(_) => {
                self.lists.pop();
                self.gap_pending = true;
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Link => {
                self.styles.pop();
                if let Some(url) = self.link.take() {
                    self.append(Span::styled(format!(" <{url}>"), frame_style()));
                }
            }
            _ => {}
        }
    }

    fn open_code(&mut self, kind: CodeBlockKind<'_>) {
        if !self.lines.is_empty() {
            self.new_line();
        }
        let lang = match &kind {
            CodeBlockKind::Fenced(lang) => lang.split_whitespace().next().unwrap_or(""),
            CodeBlockKind::Indented => "",
        };

        self.new_line();
        self.append(Span::styled("╭──", frame_style()));
        if !lang.is_empty() {
            self.append(Span::styled(
                format!(" {lang} "),
                frame_style().add_modifier(Modifier::BOLD),
            ));
        }
        self.gutters.push(Span::styled("│ ", frame_style()));

        let syntax = (!lang.is_empty())
            .then(|| SYNTAXES.find_syntax_by_token(lang))
            .flatten();
        self.code = match (syntax, THEME.as_ref()) {
            (Some(syntax), Some(theme)) => Some(Code::Highlighted(HighlightLines::new(syntax, theme))),
            _ => Some(Code::Plain),
        };
    }

    fn text(&mut self, text: &str) {
        let text = text.replace('\t', TAB);
        match self.code.take() {
            Some(Code::Highlighted(mut highlighter)) => {
                for line in LinesWithEndings::from(&text) {
                    let spans = match highlighter.highlight_line(line, &SYNTAXES) {
                        Ok(ranges) => ranges
                            .into_iter()
                            .map(|(style, fragment)| {
                                let fg = style.foreground;
                                Span::styled(
                                    fragment.trim_end_matches('\n').to_string(),
                                    Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b)),
                                )
                            })
                            .filter(|span| !span.content.is_empty())
                            .collect(),
                        Err(e) => {
                            log::debug!("Highlighting failed, falling back to plain: {}", e);
                            vec![Span::raw(line.trim_end_matches('\n').to_string())]
                        }
                    };
                    self.new_line();
                    for span in spans {
                        self.append(span);
                    }
                }
                self.code = Some(Code::Highlighted(highlighter));
            }
            Some(Code::Plain) => {
                for line in text.lines() {
                    self.new_line();
                    self.append(Span::styled(line.to_string(), Style::default().fg(Color::White)));
                }
                self.code = Some(Code::Plain);
            }
            None => {
                let style = self.current();
                self.append(Span::styled(text, style));
            }
        }
    }
}

fn heading_style(base: Style, level: HeadingLevel) -> Style {
    let modifier = match level {
        HeadingLevel::H1 => Modifier::BOLD | Modifier::UNDERLINED,
        HeadingLevel::H2 => Modifier::BOLD,
        _ => Modifier::BOLD | Modifier::ITALIC,
    };
    base.add_modifier(modifier)
}
