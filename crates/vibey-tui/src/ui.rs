use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use vibey_core::{ChatMessage, ChatRole, MatchMode, MatchingStatus};
use crate::app::{App, InputMode};

/// Accent color per mode, standing in for the web widget's gradients
fn accent(mode: MatchMode) -> Color {
    match mode {
        MatchMode::Product => Color::Blue,
        MatchMode::Style => Color::Magenta,
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let attachment_height = if app.attachment.is_some() { 1 } else { 0 };

    // Main layout: header, chat, attachment line, input, footer
    let [header_area, chat_area, attachment_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
        Constraint::Length(attachment_height),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    if attachment_height > 0 {
        render_attachment(app, frame, attachment_area);
    }
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.input_mode == InputMode::Attaching {
        render_attach_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mode = app.mode();
    let color = accent(mode);

    let title = Line::from(vec![
        Span::styled(" Vibey.AI ", Style::default().fg(Color::White).bg(color).bold()),
        Span::raw(" "),
        Span::styled(mode.title(), Style::default().fg(color).bold()),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    let subtitle = Line::from(Span::styled(
        format!(" {}", mode.subtitle()),
        Style::default().fg(Color::Gray),
    ));

    frame.render_widget(Paragraph::new(vec![title, subtitle]), area);
}

fn empty_state(mode: MatchMode) -> Text<'static> {
    let examples: Vec<Span> = mode
        .examples()
        .iter()
        .flat_map(|e| {
            [
                Span::styled(format!(" {} ", e), Style::default().bg(Color::DarkGray).fg(Color::White)),
                Span::raw(" "),
            ]
        })
        .collect();

    Text::from(vec![
        Line::default(),
        Line::from(Span::styled(
            format!("AI-Powered {}", mode.title()),
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .centered(),
        Line::from(Span::styled(mode.subtitle(), Style::default().fg(Color::DarkGray))).centered(),
        Line::default(),
        Line::from(examples).centered(),
    ])
}

fn message_lines(msg: &ChatMessage, mode: MatchMode, status: MatchingStatus, frame_no: u8) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let color = accent(mode);

    match msg.role {
        ChatRole::User => {
            lines.push(Line::from(Span::styled(
                "You:",
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
            if !msg.content.is_empty() {
                lines.push(Line::from(msg.content.clone()));
            }
            if let Some(image) = &msg.image {
                lines.push(Line::from(Span::styled(
                    format!("[image] {}", image),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
        ChatRole::Assistant => {
            lines.push(Line::from(Span::styled(
                "Vibey:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            if msg.loading {
                // Animated ellipsis: cycles through ".", "..", "..."
                let dots = ".".repeat((frame_no as usize) + 1);
                let label = match status.label(mode) {
                    "" => "Thinking",
                    label => label,
                };
                lines.push(Line::from(Span::styled(
                    format!("{}{}", label, dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            } else {
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }

            for product in &msg.products {
                let mut spans = vec![
                    Span::styled("  • ", Style::default().fg(color)),
                    Span::styled(product.name.clone(), Style::default().bold()),
                    Span::raw("  "),
                    Span::styled(format!("${}", product.price), Style::default().fg(Color::Green).bold()),
                ];
                if let Some(category) = &product.category {
                    spans.push(Span::styled(
                        format!("  [{}]", category),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                lines.push(Line::from(spans));
                lines.push(Line::from(Span::styled(
                    format!("    {}", product.image_url),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
    }

    lines.push(Line::default());
    lines
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let mode = app.mode();

    // Store chat area for mouse hit-testing and scroll calculations
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let border_color = if app.input_mode == InputMode::Normal {
        accent(mode)
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", mode.title()));

    let text = if app.session.messages().is_empty() {
        empty_state(mode)
    } else {
        let status = app.session.status();
        let run_mode = app.session.active_mode();
        let lines: Vec<Line> = app
            .session
            .messages()
            .iter()
            .flat_map(|msg| message_lines(msg, run_mode, status, app.animation_frame))
            .collect();
        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_attachment(app: &App, frame: &mut Frame, area: Rect) {
    let Some(attachment) = &app.attachment else {
        return;
    };

    let line = Line::from(vec![
        Span::styled(" [image] ", Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::raw(format!(" {} ready to send ", attachment.path)),
        Span::styled("(x to remove)", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let mode = app.mode();
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let title = if app.session.is_loading() {
        " Ask (a reply is in progress, sending again replaces it) "
    } else {
        " Ask "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.query.cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.query.is_empty() && !editing {
        Paragraph::new(Span::styled(mode.placeholder(), Style::default().fg(Color::DarkGray)))
    } else {
        let visible: String = app
            .query
            .text
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(input.block(block), area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" EDIT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        InputMode::Attaching => (" ATTACH ", Style::default().bg(Color::Cyan).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::styled(" ", label_style)];

    if let Some(notice) = &app.notice {
        spans.push(Span::styled(notice.clone(), Style::default().bg(Color::Black).fg(Color::Red)));
    } else {
        let hints: &[(&str, &str)] = match app.input_mode {
            InputMode::Normal => &[
                ("i", "type"),
                ("Tab", "mode"),
                ("a", "attach"),
                ("j/k", "scroll"),
                ("C", "clear"),
                ("q", "quit"),
            ],
            InputMode::Editing => &[
                ("Enter", "send"),
                ("Tab", "mode"),
                ("Ctrl-o", "attach"),
                ("Esc", "stop typing"),
            ],
            InputMode::Attaching => &[("Enter", "attach"), ("Esc", "cancel")],
        };

        for (key, label) in hints {
            spans.push(Span::styled(format!(" {} ", key), key_style));
            spans.push(Span::styled(format!(" {} ", label), label_style));
        }
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_attach_prompt(app: &App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 64.min(area.width.saturating_sub(4));
    let popup_height = 6.min(area.height);

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Attach an image ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    // Too short to hold the input row
    if inner.height < 3 {
        return;
    }

    let instructions = Paragraph::new("Path to an image file. Enter to attach, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let width = input_area.width as usize;
    let offset = app.attach_path.cursor.saturating_sub(width.saturating_sub(1));
    let visible: String = app.attach_path.text.chars().skip(offset).take(width).collect();

    frame.render_widget(Paragraph::new(visible).style(Style::default().fg(Color::Cyan)), input_area);

    let cursor_x = (app.attach_path.cursor - offset) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}
