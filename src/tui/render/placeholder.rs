use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::model::PageKey;
use crate::tui::app::App;

/// Pages that exist in the menu but have no screen yet
pub fn render_placeholder(frame: &mut Frame, app: &App, page: PageKey, area: Rect) {
    render_message(
        frame,
        app,
        area,
        page.label(),
        "This page is not available yet.",
    );
}

/// Shown when the signed-in user holds no page permissions
pub fn render_no_access(frame: &mut Frame, app: &App, area: Rect) {
    render_message(
        frame,
        app,
        area,
        "You don't have access to any pages.",
        "Press L to sign out or q to quit.",
    );
}

fn render_message(frame: &mut Frame, app: &App, area: Rect, heading: &str, body: &str) {
    let bg = app.theme.background;
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!(" {}", heading),
            Style::default()
                .fg(app.theme.text_bright)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" {}", body),
            Style::default().fg(app.theme.dim).bg(bg),
        )),
    ];
    frame.render_widget(Paragraph::new(lines).style(Style::default().bg(bg)), area);
}
