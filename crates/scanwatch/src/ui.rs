//! Ratatui drawing for the watch screen.

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph};
use ratatui::Frame;

use scanwatch_core::RenderState;

use crate::app::{App, Phase};
use crate::session::SessionEnd;

pub fn draw(frame: &mut Frame<'_>, app: &App, state: &RenderState) {
    frame.render_widget(Clear, frame.area());

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, app, layout[0]);
    draw_gauge(frame, state, layout[1]);

    let summary = Paragraph::new(render_summary(state)).block(
        Block::default()
            .title(phase_title(app.phase))
            .borders(Borders::ALL),
    );
    frame.render_widget(summary, layout[2]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(layout[3]);

    let steps = render_steps(state, body[0].width);
    let steps_block = Block::default().title("Steps").borders(Borders::ALL);
    frame.render_widget(steps.block(steps_block), body[0]);

    let logs = render_logs(state.log(), body[1].width, body[1].height);
    let logs_block = Block::default().title(log_title(state)).borders(Borders::ALL);
    frame.render_widget(Paragraph::new(logs).block(logs_block), body[1]);

    let footer = Paragraph::new(footer_text(app))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, layout[4]);
}

fn draw_header(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let width = area.width as usize;
    let endpoint = truncate_to_width(&app.endpoint, width.saturating_sub(app.scan_id.len() + 24));
    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("Scan {}", app.scan_id),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  {}  {endpoint}", app.source)),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(title, area);
}

fn draw_gauge(frame: &mut Frame<'_>, state: &RenderState, area: Rect) {
    let ratio = state.progress().map(|progress| progress.ratio()).unwrap_or(0.0);
    let label = state
        .progress_text()
        .or(state.progress_width())
        .unwrap_or("waiting for progress")
        .to_string();
    let gauge = Gauge::default()
        .block(Block::default().title("Progress").borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio)
        .label(label);
    frame.render_widget(gauge, area);
}

fn phase_title(phase: Phase) -> Line<'static> {
    let (label, color) = match phase {
        Phase::Streaming => ("Streaming", Color::Yellow),
        Phase::Finished(SessionEnd::Completed) => ("Completed", Color::Green),
        Phase::Finished(SessionEnd::Interrupted) => ("Stopped", Color::Gray),
        Phase::Finished(end) => (end.label(), Color::Red),
    };
    Line::from(Span::styled(
        label.to_string(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn render_summary(state: &RenderState) -> Text<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![Line::from(vec![
        Span::styled("Status: ", bold),
        Span::raw(state.status().unwrap_or("-").to_string()),
    ])];
    if let Some(step) = state.current_step() {
        lines.push(Line::from(vec![
            Span::styled("Stage: ", bold),
            Span::raw(step.to_string()),
        ]));
    }
    if let Some(result) = state.result() {
        let mut spans = vec![Span::styled("Result: ", bold)];
        if let Some(grade) = &result.grade {
            spans.push(Span::styled(
                format!("grade {grade}"),
                Style::default().fg(Color::Cyan),
            ));
        }
        if let Some(score) = result.risk_score {
            if spans.len() > 1 {
                spans.push(Span::raw(", "));
            }
            spans.push(Span::raw(format!("risk score {score}")));
        }
        lines.push(Line::from(spans));
    }
    Text::from(lines)
}

fn render_steps(state: &RenderState, width: u16) -> List<'static> {
    let inner_width = width.saturating_sub(2) as usize;
    let items = state
        .steps()
        .map(|(id, text)| {
            let name = format!("{id}: ");
            let available = inner_width.saturating_sub(name.chars().count());
            let value = if text.is_empty() { "-" } else { text };
            ListItem::new(Line::from(vec![
                Span::styled(
                    truncate_to_width(&name, inner_width),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    truncate_to_width(value, available),
                    step_style(value),
                ),
            ]))
        })
        .collect::<Vec<_>>();

    List::new(items)
}

fn step_style(value: &str) -> Style {
    let lower = value.to_ascii_lowercase();
    if lower.contains("fail") || lower.contains("error") {
        Style::default().fg(Color::Red)
    } else if lower.contains("done") || lower.contains("complete") {
        Style::default().fg(Color::Green)
    } else if lower.contains("run") || lower.contains("progress") {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn log_title(state: &RenderState) -> String {
    match state.dropped_log_lines() {
        0 => "Log".to_string(),
        dropped => format!("Log ({dropped} older lines dropped)"),
    }
}

/// Wrap the log and keep only the newest rows that fit, so the view stays
/// pinned to the latest entry.
fn render_logs(logs: &[String], width: u16, height: u16) -> Text<'static> {
    let inner_width = width.saturating_sub(2) as usize;
    let inner_height = height.saturating_sub(2) as usize;
    let mut rows = Vec::new();
    for line in logs.iter().rev() {
        if rows.len() >= inner_height {
            break;
        }
        let wrapped = wrap_line(line, inner_width);
        for row in wrapped.into_iter().rev() {
            rows.push(truncate_to_width(&row, inner_width));
        }
    }
    rows.truncate(inner_height);
    rows.reverse();
    Text::from(rows.into_iter().map(Line::from).collect::<Vec<_>>())
}

fn footer_text(app: &App) -> &'static str {
    match app.phase {
        Phase::Streaming => "Q / Esc = stop watching",
        Phase::Finished(_) => "Press any key to exit",
    }
}

fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![String::new()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let sanitized = line.replace('\t', " ");

    for word in sanitized.split_whitespace() {
        let word_width = word.chars().count();
        if word_width > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.extend(break_long_word(word, width));
            continue;
        }

        let next_len = if current.is_empty() {
            word_width
        } else {
            current.chars().count() + 1 + word_width
        };

        if next_len > width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }

    lines
}

fn break_long_word(word: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![String::new()];
    }

    // Chunk by chars so UTF-8 is never split mid-codepoint.
    let chars = word.chars().collect::<Vec<_>>();
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= 3 {
        return text.chars().take(width).collect();
    }
    let mut out = text.chars().take(width - 3).collect::<String>();
    out.push_str("...");
    out
}
