//! Screen layout.

use crate::app::App;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Stylize;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

pub fn render(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),  // header
            Constraint::Length(3),  // input
            Constraint::Length(3),  // last question
            Constraint::Min(8),     // answer
            Constraint::Length(8),  // sources
            Constraint::Length(1),  // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_input(f, app, chunks[1]);
    render_last_submitted(f, app, chunks[2]);
    render_answer(f, app, chunks[3]);
    render_sources(f, app, chunks[4]);
    render_footer(f, app, chunks[5]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let courses = if app.course_titles.is_empty() {
        "no courses indexed".to_string()
    } else {
        format!("{} courses: {}", app.course_titles.len(), app.course_titles.join(", "))
    };
    let guide = vec![
        Line::from("Course materials assistant".bold()),
        Line::from("Type a question, Enter to ask / Esc or Ctrl+C to quit"),
        Line::from(courses),
    ];
    let widget = Paragraph::new(guide).block(Block::default().borders(Borders::ALL).title("Guide"));
    f.render_widget(widget, area);
}

fn render_input(f: &mut Frame, app: &App, area: Rect) {
    let mut current = app.input.clone();
    current.push('_'); // cursor
    let widget = Paragraph::new(current).block(Block::default().borders(Borders::ALL).title("Question"));
    f.render_widget(widget, area);
}

fn render_last_submitted(f: &mut Frame, app: &App, area: Rect) {
    let widget = Paragraph::new(app.last_submitted.clone())
        .block(Block::default().borders(Borders::ALL).title("Last Question"));
    f.render_widget(widget, area);
}

fn render_answer(f: &mut Frame, app: &App, area: Rect) {
    let body = if app.pending {
        "Searching course materials...".to_string()
    } else if let Some(err) = &app.error {
        format!("Error: {err}")
    } else if let Some(ans) = &app.answer {
        ans.clone()
    } else {
        "(no answer yet)".to_string()
    };
    let widget = Paragraph::new(body)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Answer"));
    f.render_widget(widget, area);
}

fn render_sources(f: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = app
        .sources
        .iter()
        .map(|s| match &s.url {
            Some(url) => Line::from(format!("[{}] {} - {}", s.citation_num, s.title, url)),
            None => Line::from(format!("[{}] {}", s.citation_num, s.title)),
        })
        .collect();
    let widget = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Sources"));
    f.render_widget(widget, area);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let elapsed = app.elapsed_time().as_secs_f32();
    let footer = Paragraph::new(Line::from(vec![Span::raw(format!("elapsed: {elapsed:.1}s"))]));
    f.render_widget(footer, area);
}
