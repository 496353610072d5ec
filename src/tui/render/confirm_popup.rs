use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::tui::app::App;

use super::helpers::{centered_rect_fixed, wrap_text};

const POPUP_W: u16 = 50;

/// Yes/no prompt for destructive row actions
pub fn render_confirm_popup(frame: &mut Frame, app: &App, area: Rect) {
    let Some(confirm) = &app.confirm_state else {
        return;
    };
    let bg = app.theme.background;
    let inner_w = POPUP_W.saturating_sub(2) as usize;

    let mut lines: Vec<Line> = vec![Line::from("")];
    for text in wrap_text(" ", &confirm.prompt, inner_w.saturating_sub(1)) {
        lines.push(Line::from(Span::styled(
            text,
            Style::default().fg(app.theme.text_bright).bg(bg),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled(" y", Style::default().fg(app.theme.highlight).bg(bg)),
        Span::styled(" confirm  ", Style::default().fg(app.theme.dim).bg(bg)),
        Span::styled("n/Esc", Style::default().fg(app.theme.highlight).bg(bg)),
        Span::styled(" cancel", Style::default().fg(app.theme.dim).bg(bg)),
    ]));

    let height = lines.len() as u16 + 2;
    let popup = centered_rect_fixed(POPUP_W, height, area);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            " Confirm ",
            Style::default()
                .fg(app.theme.red)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(app.theme.dim).bg(bg))
        .style(Style::default().bg(bg));
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}
