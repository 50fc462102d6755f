use std::borrow::Cow;
use std::time::Instant;

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::Frame;
use time::{macros::format_description, OffsetDateTime, UtcOffset};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::state::{AppState, InputLine, OverlayState, Panel, Speaker};
use crate::config::ThemeName;
use crate::journal::Entry;
use crate::wellness::{BreathPhase, Mood, QuizProgress};

#[derive(Debug, Clone, Copy)]
struct Palette {
    text: Color,
    muted: Color,
    accent: Color,
    warning: Color,
}

impl Palette {
    fn for_theme(theme: ThemeName) -> Self {
        match theme {
            ThemeName::Dark => Self {
                text: Color::White,
                muted: Color::DarkGray,
                accent: Color::Cyan,
                warning: Color::Yellow,
            },
            ThemeName::Light => Self {
                text: Color::Black,
                muted: Color::Gray,
                accent: Color::Blue,
                warning: Color::Red,
            },
        }
    }
}

pub fn draw_app(
    frame: &mut Frame,
    state: &AppState,
    list_state: &mut ListState,
    offset: UtcOffset,
) {
    let palette = Palette::for_theme(state.theme);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(frame.size());

    let titles = Panel::all()
        .into_iter()
        .enumerate()
        .map(|(idx, panel)| format!("{} {}", idx + 1, panel))
        .collect::<Vec<_>>();
    let tabs = Tabs::new(titles)
        .select(state.panel.index())
        .block(Block::default().borders(Borders::ALL).title("MindMend"))
        .style(Style::default().fg(palette.muted))
        .highlight_style(
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, vertical[0]);

    let body = vertical[1];
    match state.panel {
        Panel::Home => draw_home(frame, state, body, palette),
        Panel::Mood => draw_mood(frame, state, body, palette),
        Panel::Breathe => draw_breathe(frame, state, body, palette),
        Panel::Quiz => draw_quiz(frame, state, body, palette),
        Panel::Chat => draw_chat(frame, state, body, palette),
        Panel::Journal => draw_journal(frame, state, list_state, offset, body, palette),
    }

    let status = build_status_line(state, palette);
    frame.render_widget(Paragraph::new(status), vertical[2]);

    render_overlay(frame, state, palette);
}

fn draw_home(frame: &mut Frame, state: &AppState, area: Rect, palette: Palette) {
    let mut lines = vec![
        Line::from(Span::styled(
            "A quiet corner for your mind.",
            Style::default()
                .fg(palette.text)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Check in with your mood, slow your breathing, take a quick stress"),
        Line::from("quiz, talk it through, or write it down in your journal."),
        Line::from(""),
    ];
    if let Some(quote) = state.quote {
        lines.push(Line::from(Span::styled(
            format!("“{quote}”"),
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::ITALIC),
        )));
    }
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Home"))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn draw_mood(frame: &mut Frame, state: &AppState, area: Rect, palette: Palette) {
    let mut spans = Vec::new();
    for (idx, mood) in Mood::all().into_iter().enumerate() {
        let mut style = Style::default().fg(palette.text);
        if idx == state.mood_cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        if state.selected_mood == Some(mood) {
            style = style.fg(palette.accent).add_modifier(Modifier::BOLD);
        }
        spans.push(Span::styled(format!(" {} {} ", mood.emoji(), mood), style));
        spans.push(Span::raw(" "));
    }
    let lines = vec![
        Line::from("How are you feeling?"),
        Line::from(""),
        Line::from(spans),
        Line::from(""),
        Line::from(Span::styled(
            state.mood_message.clone(),
            Style::default().fg(palette.accent),
        )),
    ];
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Mood"))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn draw_breathe(frame: &mut Frame, state: &AppState, area: Rect, palette: Palette) {
    let block = Block::default().borders(Borders::ALL).title("Breathe");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let now = Instant::now();
    let phase = state.breathing.phase_at(now);
    let percent = (40.0 * phase.scale()).round() as u16;
    let circle_area = centered_rect(percent.min(100), percent.min(100), inner);
    let circle_style = match phase {
        BreathPhase::Inhale => Style::default().fg(palette.accent),
        BreathPhase::Exhale => Style::default().fg(palette.text),
        BreathPhase::Idle => Style::default().fg(palette.muted),
    };
    let mut lines = vec![Line::from(Span::styled(
        phase.label(),
        circle_style.add_modifier(Modifier::BOLD),
    ))];
    if state.breathing.is_running() {
        lines.push(Line::from(format!(
            "cycles completed: {}",
            state.breathing.cycles_at(now)
        )));
    }
    let circle = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(circle_style),
        );
    frame.render_widget(circle, circle_area);
}

fn draw_quiz(frame: &mut Frame, state: &AppState, area: Rect, palette: Palette) {
    let lines = match state.quiz.progress() {
        QuizProgress::NotStarted => vec![
            Line::from("Five quick yes/no questions about the last few weeks."),
            Line::from(""),
            Line::from(Span::styled(
                "Press s to start.",
                Style::default().fg(palette.muted),
            )),
        ],
        QuizProgress::Asking(question) => vec![
            Line::from(Span::styled(
                format!("Question {} of 5", state.quiz.question_number()),
                Style::default().fg(palette.muted),
            )),
            Line::from(""),
            Line::from(Span::styled(
                question,
                Style::default()
                    .fg(palette.text)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("y yes • n no"),
        ],
        QuizProgress::Finished(result) => vec![
            Line::from(Span::styled(
                result.to_string(),
                Style::default().fg(palette.accent),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press s to take it again.",
                Style::default().fg(palette.muted),
            )),
        ],
    };
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Stress check"))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn draw_chat(frame: &mut Frame, state: &AppState, area: Rect, palette: Palette) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let mut lines = Vec::with_capacity(state.chat_log.len() * 2);
    for line in &state.chat_log {
        let label_style = match line.speaker {
            Speaker::You => Style::default().fg(palette.muted),
            Speaker::Companion => Style::default().fg(palette.accent),
        };
        lines.push(Line::from(Span::styled(line.speaker.label(), label_style)));
        lines.push(Line::from(display_text(&line.text).into_owned()));
    }
    if state.has_pending_reply() {
        lines.push(Line::from(Span::styled(
            "MindMend is typing…",
            Style::default().fg(palette.muted),
        )));
    }
    let visible = rows[0].height.saturating_sub(2) as usize;
    let skip = lines.len().saturating_sub(visible);
    let log = Paragraph::new(Text::from(lines.into_iter().skip(skip).collect::<Vec<_>>()))
        .block(Block::default().borders(Borders::ALL).title("Comfort chat"))
        .wrap(Wrap { trim: false });
    frame.render_widget(log, rows[0]);

    draw_input(frame, &state.chat_input, "Say something • Enter send", rows[1], palette);
}

fn draw_journal(
    frame: &mut Frame,
    state: &AppState,
    list_state: &mut ListState,
    offset: UtcOffset,
    area: Rect,
    palette: Palette,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    draw_input(
        frame,
        &state.journal_input,
        "New entry • Enter save • Ctrl-x clear all",
        rows[0],
        palette,
    );

    let width = rows[1].width.saturating_sub(4) as usize;
    let items = state
        .entries
        .iter()
        .map(|entry| {
            ListItem::new(vec![
                Line::from(Span::styled(
                    format_entry_time(entry, offset),
                    Style::default().fg(palette.muted),
                )),
                Line::from(truncate_to_width(&display_text(&entry.text), width)),
            ])
        })
        .collect::<Vec<_>>();
    let title = format!("Journal ({})", state.entries.len());
    let list = if items.is_empty() {
        List::new(vec![ListItem::new(Span::styled(
            "No entries yet.",
            Style::default().fg(palette.muted),
        ))])
    } else {
        List::new(items)
    };
    let list = list
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("› ");
    frame.render_stateful_widget(list, rows[1], list_state);
}

fn draw_input(frame: &mut Frame, input: &InputLine, title: &str, area: Rect, palette: Palette) {
    let paragraph = Paragraph::new(input.as_str().to_owned())
        .style(Style::default().fg(palette.text))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent))
                .title(title.to_owned()),
        );
    frame.render_widget(paragraph, area);
    let before_cursor = &input.as_str()[..input.cursor()];
    let x = area.x + 1 + before_cursor.width() as u16;
    if x < area.x + area.width.saturating_sub(1) {
        frame.set_cursor(x, area.y + 1);
    }
}

fn build_status_line(state: &AppState, palette: Palette) -> Text<'static> {
    let mut first = Vec::new();
    if let Some(warning) = state.storage_warning {
        first.push(Span::styled(
            warning,
            Style::default()
                .fg(palette.warning)
                .add_modifier(Modifier::BOLD),
        ));
    }
    if let Some(message) = &state.status_message {
        if Some(message.as_str()) != state.storage_warning {
            if !first.is_empty() {
                first.push(Span::raw(" | "));
            }
            first.push(Span::styled(
                message.clone(),
                Style::default().fg(palette.accent),
            ));
        }
    }

    let hints = match state.panel {
        Panel::Home => "g quote • m motivation • 1-6 panels • Tab next • q quit",
        Panel::Mood => "←/→ choose • Enter pick • s save to journal • g quote",
        Panel::Breathe => "s start • x stop",
        Panel::Quiz => "s start • y yes • n no",
        Panel::Chat => "Enter send • Tab next panel • Esc clear/leave",
        Panel::Journal => "Enter save • ↑/↓ browse • Ctrl-x clear • Esc clear/leave",
    };
    let keys = Line::from(vec![
        Span::styled(
            "Keys: ",
            Style::default()
                .fg(palette.muted)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(hints, Style::default().fg(palette.muted)),
    ]);
    Text::from(vec![Line::from(first), keys])
}

fn render_overlay(frame: &mut Frame, state: &AppState, palette: Palette) {
    let Some(OverlayState::ConfirmClear) = state.overlay() else {
        return;
    };
    let area = centered_rect(50, 25, frame.size());
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(
            "Clear all journal entries?",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "y to clear • n or Esc to keep",
            Style::default().fg(palette.muted),
        )),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .title("Confirm")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.warning)),
    )
    .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

/// Local wall-clock rendering of an entry's timestamp.
pub fn format_entry_time(entry: &Entry, offset: UtcOffset) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    entry
        .recorded_at()
        .map(|at: OffsetDateTime| at.to_offset(offset))
        .and_then(|at| at.format(format).ok())
        .unwrap_or_else(|| entry.timestamp.to_string())
}

/// Neutralises control characters so stored text cannot drive the terminal.
pub fn display_text(text: &str) -> Cow<'_, str> {
    if !text.chars().any(char::is_control) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|ch| match ch {
                '\n' | '\r' | '\t' => ' ',
                ch if ch.is_control() => '\u{fffd}',
                ch => ch,
            })
            .collect(),
    )
}

pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_owned();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
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
