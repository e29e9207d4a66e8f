use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{AppState, EditorField, FocusPane, LoginField, OverlayState, TextField};
use crate::app::Dashboard;
use crate::highlight::{query_matcher, segments};
use crate::remote::Tag;
use crate::session::{SessionInfo, View};

/// Borrowed view of everything a frame needs.
pub struct Screen<'a> {
    pub view: View,
    pub session: Option<&'a SessionInfo>,
    pub dashboard: Option<&'a Dashboard>,
    pub state: &'a AppState,
}

pub fn draw_app(frame: &mut Frame, screen: &Screen<'_>, list_state: &mut ListState) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(2)])
        .split(frame.size());

    match (screen.view, screen.dashboard) {
        (View::Dashboard, Some(dashboard)) => {
            draw_dashboard(frame, vertical[0], dashboard, screen.state, list_state)
        }
        _ => draw_landing(frame, vertical[0]),
    }

    let status = build_status_line(screen);
    frame.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::Gray)),
        vertical[1],
    );

    render_overlay(frame, screen.state);
    render_alert(frame, screen.state);
}

fn draw_landing(frame: &mut Frame, area: Rect) {
    let inner = centered_rect(60, 50, area);
    let text = vec![
        Line::from(Span::styled(
            "notedash",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Write, tag, search and archive your notes."),
        Line::from(""),
        Line::from(Span::styled(
            "Enter to sign in • q to quit",
            Style::default().fg(Color::Gray),
        )),
    ];
    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn draw_dashboard(
    frame: &mut Frame,
    area: Rect,
    dashboard: &Dashboard,
    state: &AppState,
    list_state: &mut ListState,
) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let list_column = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(columns[0]);

    draw_search_box(frame, list_column[0], dashboard, state);
    draw_note_list(frame, list_column[1], dashboard, state, list_state);
    draw_editor(frame, columns[1], dashboard, state);
}

fn draw_search_box(frame: &mut Frame, area: Rect, dashboard: &Dashboard, state: &AppState) {
    let style = if state.is_search_active() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let mut title = String::from("Search");
    if dashboard.list.search_pending() || dashboard.list.is_loading() {
        title.push_str(" …");
    }
    let paragraph = Paragraph::new(state.search.as_str())
        .block(Block::default().title(title).borders(Borders::ALL).border_style(style));
    frame.render_widget(paragraph, area);
    if state.is_search_active() {
        let (x, y) = cursor_in(area, &state.search);
        frame.set_cursor(x, y);
    }
}

fn draw_note_list(
    frame: &mut Frame,
    area: Rect,
    dashboard: &Dashboard,
    state: &AppState,
    list_state: &mut ListState,
) {
    let border = if state.focus == FocusPane::List && !state.is_search_active() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let matcher = query_matcher(state.search.as_str());
    let highlight_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let notes = dashboard.visible();
    let mut items: Vec<ListItem> = notes
        .iter()
        .map(|note| {
            let mut title_spans = Vec::new();
            if dashboard.selected_id() == Some(note.id.as_str()) {
                title_spans.push(Span::styled(
                    "✎ ",
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                ));
            }
            title_spans.extend(highlight_line(
                &note.title,
                matcher.as_ref(),
                highlight_style,
                Style::default().add_modifier(Modifier::BOLD),
            ));
            let mut lines = vec![
                Line::from(title_spans),
                Line::from(Span::styled(
                    format!("Updated {}", format_relative_time(note.updated_at)),
                    Style::default().fg(Color::Gray),
                )),
            ];
            if let Some(tag_line) = render_tag_line(&note.tags, matcher.as_ref(), highlight_style) {
                lines.push(tag_line);
            }
            lines.push(Line::from(highlight_line(
                &dashboard.list.preview(note).replace('\n', " "),
                matcher.as_ref(),
                highlight_style,
                Style::default(),
            )));
            ListItem::new(lines)
        })
        .collect();
    if items.is_empty() {
        items.push(ListItem::new(dashboard.list.empty_message()));
    }

    let title = format!(
        "{} ({}) • by {}",
        if dashboard.list.show_archived() {
            "Archived"
        } else {
            "Notes"
        },
        notes.len(),
        dashboard.list.sort()
    );
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, list_state);
}

fn draw_editor(frame: &mut Frame, area: Rect, dashboard: &Dashboard, state: &AppState) {
    let editor = &dashboard.editor;
    let focused = state.focus == FocusPane::Editor;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area);

    let field_style = |field: EditorField| {
        if focused && state.field == field {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        }
    };

    let mut heading = editor.mode_label().to_string();
    if let Some(note) = editor.selected() {
        if note.archived {
            heading.push_str(" [archived]");
        }
    }
    if editor.is_loading() {
        heading.push_str(" …");
    }

    frame.render_widget(
        Paragraph::new(state.title.as_str()).block(
            Block::default()
                .title(format!("{heading} • Title"))
                .borders(Borders::ALL)
                .border_style(field_style(EditorField::Title)),
        ),
        rows[0],
    );
    frame.render_widget(
        Paragraph::new(state.content.as_str()).block(
            Block::default()
                .title("Content")
                .borders(Borders::ALL)
                .border_style(field_style(EditorField::Content)),
        ),
        rows[1],
    );

    let tags: Vec<Tag> = editor.tags().cloned().collect();
    let tag_line = render_tag_line(&tags, None, Style::default())
        .unwrap_or_else(|| Line::from(Span::styled("no tags", Style::default().fg(Color::Gray))));
    frame.render_widget(
        Paragraph::new(tag_line).block(Block::default().title("Tags").borders(Borders::ALL)),
        rows[2],
    );
    frame.render_widget(
        Paragraph::new(state.tag_input.as_str()).block(
            Block::default()
                .title("Add tag (Enter)")
                .borders(Borders::ALL)
                .border_style(field_style(EditorField::Tags)),
        ),
        rows[3],
    );

    if focused && !state.is_search_active() && state.overlay().is_none() {
        let (field, area) = match state.field {
            EditorField::Title => (&state.title, rows[0]),
            EditorField::Content => (&state.content, rows[1]),
            EditorField::Tags => (&state.tag_input, rows[3]),
        };
        let (x, y) = cursor_in(area, field);
        frame.set_cursor(x, y);
    }
}

fn build_status_line(screen: &Screen<'_>) -> Text<'static> {
    let mut spans = Vec::new();
    match screen.session {
        Some(info) => {
            spans.push(Span::raw("Signed in: "));
            spans.push(Span::styled(
                info.email.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        }
        None => spans.push(Span::raw("Signed out")),
    }
    if let Some(dashboard) = screen.dashboard {
        spans.push(Span::raw(format!(" | {} cached", dashboard.list.cached().len())));
        if dashboard.is_busy() {
            spans.push(Span::styled(" | working…", Style::default().fg(Color::Yellow)));
        }
    }
    let mut lines = vec![Line::from(spans)];
    let hint = match (screen.view, screen.state.focus) {
        (View::Landing, _) => "Enter sign in • q quit",
        (View::Dashboard, FocusPane::List) => {
            "j/k move • Enter open • n new • / search • a archive • A archived view • d delete • s sort • L logout"
        }
        (View::Dashboard, FocusPane::Editor) => "Tab next field • Ctrl-s save • Esc list",
    };
    let message = screen.state.status_message().unwrap_or(hint).to_string();
    lines.push(Line::from(message));
    Text::from(lines)
}

fn render_overlay(frame: &mut Frame, state: &AppState) {
    match state.overlay() {
        Some(OverlayState::Login(form)) => {
            let area = centered_rect(60, 40, frame.size());
            frame.render_widget(Clear, area);
            let block = Block::default()
                .title("Sign in")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan));
            let inner = block.inner(area);
            frame.render_widget(block, area);

            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Min(1),
                ])
                .split(inner);
            let field_style = |field: LoginField| {
                if form.field == field {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default()
                }
            };
            frame.render_widget(
                Paragraph::new(form.email.as_str()).block(
                    Block::default()
                        .title("Email")
                        .borders(Borders::ALL)
                        .border_style(field_style(LoginField::Email)),
                ),
                rows[0],
            );
            let masked = "•".repeat(form.password.as_str().graphemes(true).count());
            frame.render_widget(
                Paragraph::new(masked).block(
                    Block::default()
                        .title("Password")
                        .borders(Borders::ALL)
                        .border_style(field_style(LoginField::Password)),
                ),
                rows[1],
            );
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "Enter sign in • Tab switch field • Esc cancel",
                    Style::default().fg(Color::Gray),
                )),
                rows[2],
            );
            let (field, row) = match form.field {
                LoginField::Email => (&form.email, rows[0]),
                LoginField::Password => (&form.password, rows[1]),
            };
            let (x, y) = cursor_in(row, field);
            frame.set_cursor(x, y);
        }
        Some(OverlayState::ConfirmDelete(confirm)) => {
            let area = centered_rect(50, 25, frame.size());
            frame.render_widget(Clear, area);
            let paragraph = Paragraph::new(vec![
                Line::from(Span::styled(
                    "Delete this note?",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(confirm.title.clone()),
                Line::from(""),
                Line::from(Span::styled(
                    "y/Enter delete • n/Esc keep",
                    Style::default().fg(Color::Gray),
                )),
            ])
            .block(
                Block::default()
                    .title("Delete Note")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red)),
            )
            .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
        None => {}
    }
}

fn render_alert(frame: &mut Frame, state: &AppState) {
    let Some(message) = state.current_alert() else {
        return;
    };
    let area = centered_rect(50, 20, frame.size());
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled("Enter to dismiss", Style::default().fg(Color::Gray))),
    ])
    .block(
        Block::default()
            .title("Alert")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    )
    .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn highlight_line(
    text: &str,
    matcher: Option<&Regex>,
    highlight_style: Style,
    base_style: Style,
) -> Vec<Span<'static>> {
    segments(text, matcher)
        .into_iter()
        .map(|(segment, hit)| {
            let style = if hit { highlight_style } else { base_style };
            Span::styled(segment.to_string(), style)
        })
        .collect()
}

fn render_tag_line(
    tags: &[Tag],
    matcher: Option<&Regex>,
    highlight_style: Style,
) -> Option<Line<'static>> {
    if tags.is_empty() {
        return None;
    }
    let base_style = Style::default().fg(Color::Green);
    let mut spans = Vec::new();
    for (idx, tag) in tags.iter().enumerate() {
        let token = format!("#{}", tag.name);
        spans.extend(highlight_line(&token, matcher, highlight_style, base_style));
        if idx + 1 < tags.len() {
            spans.push(Span::raw(" "));
        }
    }
    Some(Line::from(spans))
}

// Screen position of a field's cursor inside a bordered box, clamped to it.
fn cursor_in(area: Rect, field: &TextField) -> (u16, u16) {
    let (line, _) = field.cursor_position();
    let text = field.as_str();
    let start = text[..field.cursor()].rfind('\n').map_or(0, |idx| idx + 1);
    let width = UnicodeWidthStr::width(&text[start..field.cursor()]) as u16;
    let max_x = area.width.saturating_sub(2);
    let max_y = area.height.saturating_sub(2);
    let x = area.x + 1 + width.min(max_x.saturating_sub(1));
    let y = area.y + 1 + (line as u16).min(max_y.saturating_sub(1));
    (x, y)
}

fn format_relative_time(dt: OffsetDateTime) -> String {
    let diff = OffsetDateTime::now_utc() - dt;
    if diff < Duration::seconds(45) {
        return "just now".to_string();
    }
    if diff < Duration::minutes(90) {
        return format!("{}m ago", diff.whole_minutes().max(1));
    }
    if diff < Duration::hours(36) {
        return format!("{}h ago", diff.whole_hours().max(1));
    }
    if diff < Duration::days(10) {
        return format!("{}d ago", diff.whole_days().max(1));
    }
    let date = dt.date();
    format!("{}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
