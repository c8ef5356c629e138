use chrono::DateTime;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9), // Stats + Due problems row
            Constraint::Min(0),    // Recent attempts
        ])
        .split(area);

    // Top row: Stats and Due Problems side by side
    let top_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    draw_stats(f, app, top_chunks[0]);
    draw_due_problems(f, app, top_chunks[1]);
    draw_recent_attempts(f, app, chunks[1]);
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let stats = &app.stats;

    let text = vec![
        Line::from(vec![
            Span::styled("Problems: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", stats.total_problems),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Attempts: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", stats.total_attempts),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Mastered: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", stats.mastered),
                Style::default().fg(Color::Green),
            ),
        ]),
        Line::from(vec![
            Span::styled("Due: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", stats.due_now),
                Style::default().fg(if stats.due_now > 0 {
                    Color::Yellow
                } else {
                    Color::White
                }),
            ),
        ]),
        Line::from(vec![
            Span::styled("Avg Mastery: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:.2}", stats.avg_mastery),
                Style::default().fg(Color::Cyan),
            ),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Stats ")
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}

fn draw_due_problems(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .due_problems
        .iter()
        .enumerate()
        .map(|(i, pwr)| {
            let mastery = pwr.record.as_ref().map(|r| r.mastery_level).unwrap_or(0.0);
            let mastery_bar = create_mastery_bar(mastery);
            let style = if mastery < 0.2 {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Yellow)
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!("{}. ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(truncate(&pwr.problem.title, 20), style),
                Span::raw(" "),
                Span::styled(mastery_bar, Style::default().fg(Color::Green)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Due Problems ")
        .title_style(Style::default().fg(Color::Yellow));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}

fn draw_recent_attempts(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .recent_attempts
        .iter()
        .map(|(attempt, title)| {
            let date = format_date(&attempt.practiced_at);
            let (outcome_text, outcome_color) = if attempt.success {
                ("Success", Color::Green)
            } else {
                ("Fail", Color::Red)
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<10}", date),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{:<22}", truncate(title, 20)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(outcome_text, Style::default().fg(outcome_color)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Recent Attempts ")
        .title_style(Style::default().fg(Color::Magenta));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}

fn create_mastery_bar(level: f64) -> String {
    let filled = ((level * 10.0).round() as usize).min(10);
    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}

fn format_date(date_str: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        dt.format("%b %d").to_string()
    } else {
        date_str.chars().take(10).collect()
    }
}
