use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::tui::app::{App, LoginField};
use crate::util::unicode;

use super::helpers::centered_rect_fixed;

const FIELD_W: usize = 28;

/// Render the sign-in form
pub fn render_login_view(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let form = &app.login;
    let header_style = Style::default()
        .fg(app.theme.text_bright)
        .bg(bg)
        .add_modifier(Modifier::BOLD);
    let label_style = Style::default().fg(app.theme.text).bg(bg);
    let dim_style = Style::default().fg(app.theme.dim).bg(bg);

    let masked = "*".repeat(form.password.chars().count());
    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(" Drawing Management System", header_style)),
        Line::from(""),
        field_line(app, "Username", &form.username, form.focus == LoginField::Username),
        field_line(app, "Password", &masked, form.focus == LoginField::Password),
        Line::from(""),
    ];

    if form.pending.is_some() {
        lines.push(Line::from(Span::styled(" Signing in\u{2026}", dim_style)));
    } else if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            Style::default().fg(app.theme.red).bg(bg),
        )));
    } else {
        lines.push(Line::from(""));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled(" Tab", Style::default().fg(app.theme.highlight).bg(bg)),
        Span::styled(" switch field  ", label_style),
        Span::styled("Enter", Style::default().fg(app.theme.highlight).bg(bg)),
        Span::styled(" sign in  ", label_style),
        Span::styled("Esc", Style::default().fg(app.theme.highlight).bg(bg)),
        Span::styled(" quit", label_style),
    ]));

    let popup_h = lines.len() as u16 + 2;
    let popup = centered_rect_fixed(46, popup_h, area);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.selection_border).bg(bg))
        .style(Style::default().bg(bg));
    frame.render_widget(
        Paragraph::new(lines).block(block).style(Style::default().bg(bg)),
        popup,
    );
}

fn field_line<'a>(app: &App, label: &'a str, value: &str, focused: bool) -> Line<'a> {
    let bg = app.theme.background;
    let (label_fg, value_bg) = if focused {
        (app.theme.highlight, app.theme.selection_bg)
    } else {
        (app.theme.text, bg)
    };
    // Keep the tail visible while typing
    let chars: Vec<char> = value.chars().collect();
    let shown: String = if unicode::display_width(value) >= FIELD_W {
        chars[chars.len().saturating_sub(FIELD_W - 1)..].iter().collect()
    } else {
        value.to_string()
    };
    let mut spans = vec![
        Span::styled(format!(" {:<10}", label), Style::default().fg(label_fg).bg(bg)),
        Span::styled(
            unicode::fit_to_width(&shown, FIELD_W - 1),
            Style::default().fg(app.theme.text_bright).bg(value_bg),
        ),
    ];
    if focused {
        spans.push(Span::styled(
            "\u{258C}",
            Style::default().fg(app.theme.highlight).bg(bg),
        ));
    }
    Line::from(spans)
}
