use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::chat::{Author, ChatMessage, Entry, RequestState, WELCOME_TEXT};
use crate::tui::app::ChatApp;

const MAX_INPUT_LINES: u16 = 6;
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Render the main UI
pub fn render_ui(f: &mut Frame, app: &ChatApp) {
    let input_lines = app.controller().input().text().split('\n').count();
    let input_lines = u16::try_from(input_lines).unwrap_or(MAX_INPUT_LINES);
    let input_height = input_lines.clamp(1, MAX_INPUT_LINES) + 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Status bar
            Constraint::Min(5),               // Transcript
            Constraint::Length(3),            // Template
            Constraint::Length(input_height), // Input box
        ])
        .split(f.size());

    render_status_bar(f, app, chunks[0]);
    render_transcript(f, app, chunks[1]);
    render_template(f, app, chunks[2]);
    render_input_box(f, app, chunks[3]);
}

fn render_status_bar(f: &mut Frame, app: &ChatApp, area: Rect) {
    let controller = app.controller();
    let config = controller.config();

    let mut spans = vec![
        Span::styled("Model: ", Style::default().fg(Color::Gray)),
        Span::styled(config.model.as_str(), Style::default().fg(Color::Green)),
        Span::styled(" | Provider: ", Style::default().fg(Color::Gray)),
        Span::styled(
            config.provider.as_str(),
            Style::default().fg(Color::Green),
        ),
    ];

    // Loading indicator
    if controller.state() == RequestState::Sending {
        let frame = (chrono::Local::now().timestamp_subsec_millis() / 250) as usize % SPINNER.len();
        spans.push(Span::styled(
            format!("  {} Thinking...", SPINNER[frame]),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let status_bar = Paragraph::new(Text::from(vec![Line::from(spans)]))
        .block(Block::default().borders(Borders::ALL).title("Homework Helper"));

    f.render_widget(status_bar, area);
}

fn message_lines(message: &ChatMessage) -> Vec<Line<'_>> {
    let (label, color) = match message.author {
        Author::User => ("You", Color::Cyan),
        Author::Assistant => ("Assistant", Color::Green),
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("{} ", label),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            message.created_at.format("%H:%M").to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    ])];
    lines.extend(message.text.split('\n').map(Line::from));
    lines.push(Line::from(""));
    lines
}

fn transcript_lines(entries: &[Entry]) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    for entry in entries {
        match entry {
            Entry::Welcome => {
                lines.push(Line::from(Span::styled(
                    WELCOME_TEXT,
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )));
                lines.push(Line::from(""));
            }
            Entry::Message(message) => lines.extend(message_lines(message)),
            Entry::Error(banner) => {
                lines.push(Line::from(Span::styled(
                    banner.as_str(),
                    Style::default().fg(Color::Red),
                )));
                lines.push(Line::from(""));
            }
        }
    }
    lines
}

/// Break one logical line into rows of at most `width` display columns.
///
/// Words move to the next row whole when they fit on one; longer runs are
/// split by character. Whitespace at a soft break is dropped.
fn wrap_line(line: &Line<'_>, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut rows = Vec::new();
    let mut row: Vec<Span<'static>> = Vec::new();
    let mut row_width = 0;

    for span in &line.spans {
        for (token, is_space) in tokens(&span.content) {
            let token_width = token.width();
            if row_width + token_width <= width {
                row.push(Span::styled(token.to_string(), span.style));
                row_width += token_width;
            } else if is_space {
                rows.push(Line::from(std::mem::take(&mut row)));
                row_width = 0;
            } else if token_width <= width {
                rows.push(Line::from(std::mem::take(&mut row)));
                row.push(Span::styled(token.to_string(), span.style));
                row_width = token_width;
            } else {
                let mut piece = String::new();
                for c in token.chars() {
                    let char_width = c.width().unwrap_or(0);
                    if row_width > 0 && row_width + char_width > width {
                        if !piece.is_empty() {
                            row.push(Span::styled(std::mem::take(&mut piece), span.style));
                        }
                        rows.push(Line::from(std::mem::take(&mut row)));
                        row_width = 0;
                    }
                    piece.push(c);
                    row_width += char_width;
                }
                if !piece.is_empty() {
                    row.push(Span::styled(piece, span.style));
                }
            }
        }
    }
    rows.push(Line::from(row));
    rows
}

/// Runs of whitespace and non-whitespace, flagged by which they are.
fn tokens(text: &str) -> Vec<(&str, bool)> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut current: Option<bool> = None;
    for (i, c) in text.char_indices() {
        let is_space = c.is_whitespace();
        match current {
            Some(kind) if kind != is_space => {
                out.push((&text[start..i], kind));
                start = i;
            }
            _ => {}
        }
        current = Some(is_space);
    }
    if let Some(kind) = current {
        out.push((&text[start..], kind));
    }
    out
}

/// Rows for the whole transcript once wrapped to `width` columns.
pub fn wrap_lines(lines: &[Line<'_>], width: u16) -> Vec<Line<'static>> {
    lines
        .iter()
        .flat_map(|line| wrap_line(line, width as usize))
        .collect()
}

fn render_transcript(f: &mut Frame, app: &ChatApp, area: Rect) {
    let lines = transcript_lines(app.controller().transcript().entries());

    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let rows = wrap_lines(&lines, inner_width);
    let total = u16::try_from(rows.len()).unwrap_or(u16::MAX);

    // Pin to the bottom unless the user has scrolled back
    let bottom = total.saturating_sub(inner_height);
    let offset = bottom.saturating_sub(app.scroll_back());

    let title = if offset < bottom {
        "Conversation (scrolled, PgDn to follow)"
    } else {
        "Conversation"
    };

    let transcript = Paragraph::new(Text::from(rows))
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((offset, 0));

    f.render_widget(transcript, area);
}

fn render_template(f: &mut Frame, app: &ChatApp, area: Rect) {
    let template = Paragraph::new(app.controller().config().template.as_str())
        .style(Style::default().fg(Color::Gray))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Template (Ctrl+T to use)"),
        );

    f.render_widget(template, area);
}

fn render_input_box(f: &mut Frame, app: &ChatApp, area: Rect) {
    let controller = app.controller();
    let input = controller.input();
    let enabled = controller.is_input_enabled();

    let (line, col) = input.cursor_position();
    let line = u16::try_from(line).unwrap_or(u16::MAX);
    let col = u16::try_from(col).unwrap_or(u16::MAX);
    let inner_height = area.height.saturating_sub(2).max(1);
    let scroll = line.saturating_sub(inner_height - 1);

    let title = if enabled {
        "Input (Enter to send, Shift+Enter for newline, Esc to quit)"
    } else {
        "Input (waiting for response...)"
    };

    let paragraph = Paragraph::new(input.text())
        .scroll((scroll, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .style(Style::default().fg(if enabled {
                    Color::White
                } else {
                    Color::DarkGray
                })),
        );

    f.render_widget(paragraph, area);

    // Show cursor only while the input accepts text
    if enabled && input.is_focused() {
        let max_x = area.x + area.width.saturating_sub(2);
        f.set_cursor(
            area.x.saturating_add(1).saturating_add(col).min(max_x),
            area.y.saturating_add(1).saturating_add(line - scroll),
        );
    }
}
