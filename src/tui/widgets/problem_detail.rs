use chrono::DateTime;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::models::ProblemWithRecord;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(pwr) = &app.selected_problem else {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Problem Detail ");
        let paragraph = Paragraph::new("No problem selected").block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Header info
            Constraint::Length(4), // Practice record
            Constraint::Length(6), // Solutions
            Constraint::Min(0),    // Attempt history
        ])
        .split(area);

    draw_header(f, pwr, chunks[0]);
    draw_practice(f, pwr, chunks[1]);
    draw_solutions(f, app, chunks[2]);
    draw_attempts(f, app, chunks[3]);
}

fn draw_header(f: &mut Frame, pwr: &ProblemWithRecord, area: Rect) {
    let tags = if pwr.problem.tags.is_empty() {
        "None".to_string()
    } else {
        pwr.problem.tags.join(", ")
    };

    let mut text = vec![
        Line::from(vec![
            Span::styled("Difficulty: ", Style::default().fg(Color::Gray)),
            Span::styled(
                pwr.problem.difficulty.label(),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("  "),
            Span::styled("Tags: ", Style::default().fg(Color::Gray)),
            Span::styled(tags, Style::default().fg(Color::Cyan)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            pwr.problem.description.clone(),
            Style::default().fg(Color::White),
        )),
    ];

    if let Some(url) = &pwr.problem.source_url {
        text.push(Line::from(""));
        text.push(Line::from(vec![
            Span::styled("Source: ", Style::default().fg(Color::Gray)),
            Span::styled(url.clone(), Style::default().fg(Color::Blue)),
        ]));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", pwr.problem.title))
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_practice(f: &mut Frame, pwr: &ProblemWithRecord, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Practice ")
        .title_style(Style::default().fg(Color::Cyan));

    let Some(record) = &pwr.record else {
        let paragraph = Paragraph::new("Not practiced yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let mastery_bar = create_mastery_bar(record.mastery_level);
    let success_rate = record.success_rate();
    let next_review = format_long_date(&record.next_review_date);

    let text = vec![
        Line::from(vec![
            Span::styled("Mastery: ", Style::default().fg(Color::Gray)),
            Span::styled(mastery_bar, Style::default().fg(Color::Green)),
            Span::styled(
                format!(" {:.1} ({})", record.mastery_level, record.mastery_label()),
                Style::default().fg(Color::Yellow),
            ),
        ]),
        Line::from(vec![
            Span::styled("Attempts: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", record.times_practiced),
                Style::default().fg(Color::White),
            ),
            Span::raw("  "),
            Span::styled("Success: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} ({:.0}%)", record.times_succeeded, success_rate),
                Style::default().fg(if success_rate >= 70.0 {
                    Color::Green
                } else if success_rate >= 50.0 {
                    Color::Yellow
                } else {
                    Color::Red
                }),
            ),
            Span::raw("  "),
            Span::styled("Next: ", Style::default().fg(Color::Gray)),
            Span::styled(next_review, Style::default().fg(Color::White)),
        ]),
    ];

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}

fn draw_solutions(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .selected_problem_solutions
        .iter()
        .take(3)
        .map(|solution| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("#{:<4}", solution.id),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{:<12}", solution.language),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    format_date(&solution.created_at),
                    Style::default().fg(Color::Gray),
                ),
            ]))
        })
        .collect();

    let title = if app.selected_problem_solutions.is_empty() {
        " Solutions (none) ".to_string()
    } else {
        format!(" Solutions ({}) ", app.selected_problem_solutions.len())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Green));

    if items.is_empty() {
        let paragraph = Paragraph::new("No solutions recorded yet.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
    } else {
        let list = List::new(items).block(block);
        f.render_widget(list, area);
    }
}

fn draw_attempts(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .selected_problem_attempts
        .iter()
        .take(10)
        .map(|attempt| {
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
                Span::styled(outcome_text, Style::default().fg(outcome_color)),
            ]))
        })
        .collect();

    let title = if app.selected_problem_attempts.is_empty() {
        " Attempts (none) ".to_string()
    } else {
        format!(" Attempts ({}) ", app.selected_problem_attempts.len())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Magenta));

    if items.is_empty() {
        let paragraph = Paragraph::new("No attempts yet. Time to practice!")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
    } else {
        let list = List::new(items).block(block);
        f.render_widget(list, area);
    }
}

fn create_mastery_bar(level: f64) -> String {
    let filled = ((level * 10.0).round() as usize).min(10);
    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

fn format_date(date_str: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        dt.format("%b %d").to_string()
    } else {
        date_str.chars().take(10).collect()
    }
}

fn format_long_date(date_str: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        dt.format("%b %d, %Y").to_string()
    } else {
        "Unknown".to_string()
    }
}
