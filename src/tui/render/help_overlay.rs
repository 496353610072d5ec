use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::model::PageKey;
use crate::tui::app::App;

/// Render the help overlay (toggled with ?)
pub fn render_help_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let overlay_area = centered_rect(60, 80, area);
    frame.render_widget(Clear, overlay_area);

    let bg = app.theme.background;
    let key_style = Style::default()
        .fg(app.theme.highlight)
        .bg(bg)
        .add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(app.theme.text).bg(bg);
    let header_style = Style::default()
        .fg(app.theme.text_bright)
        .bg(bg)
        .add_modifier(Modifier::BOLD);

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(" Key Bindings", header_style)));
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled(" Navigation", header_style)));
    let nav: &[(&str, &str)] = &[
        (" \u{2191}\u{2193}/jk", "Move cursor"),
        (" \u{2190}\u{2192}/hl", "Previous/next page of records"),
        (" 1-5", "Open page by permission code"),
        (" Tab", "Next page"),
        (" R/F5", "Reload from the database"),
        (" /", "Filter records"),
        (" Esc", "Clear filter"),
    ];
    for (key, desc) in nav {
        add_binding(&mut lines, key, desc, key_style, desc_style);
    }
    lines.push(Line::from(""));

    // Page-specific actions
    if let Some(table) = app.table() {
        lines.push(Line::from(Span::styled(
            format!(" {}", table.title()),
            header_style,
        )));
        for action in table.actions() {
            add_binding(
                &mut lines,
                &format!(" {}", action.key()),
                action.label(),
                key_style,
                desc_style,
            );
        }
        if table.key() == PageKey::UserManagement {
            add_binding(&mut lines, " a", "Add user", key_style, desc_style);
        }
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(" Global", header_style)));
    add_binding(&mut lines, " ?", "Toggle this help", key_style, desc_style);
    add_binding(&mut lines, " L", "Sign out", key_style, desc_style);
    add_binding(&mut lines, " q", "Quit", key_style, desc_style);
    add_binding(&mut lines, " Ctrl+C", "Quit (immediate)", key_style, desc_style);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.dim).bg(bg))
        .style(Style::default().bg(bg));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(bg));

    frame.render_widget(paragraph, overlay_area);
}

fn add_binding(
    lines: &mut Vec<Line<'static>>,
    key: &str,
    desc: &str,
    key_style: Style,
    desc_style: Style,
) {
    let padded_key = format!("{:<width$}", key, width = 14);
    lines.push(Line::from(vec![
        Span::styled(padded_key, key_style),
        Span::styled(desc.to_string(), desc_style),
    ]));
}

/// Create a centered rectangle of the given percentage of the parent
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
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
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::test_helpers::*;

    #[test]
    fn lists_page_actions() {
        let app = signed_in_app(&[2], Some(PageKey::DrawingIssuance));
        let out = render_to_string(TERM_W, 40, |frame, area| {
            render_help_overlay(frame, &app, area)
        });
        assert!(out.contains("Key Bindings"));
        assert!(out.contains("Drawing Issuance"));
        assert!(out.contains("Issue"));
        assert!(out.contains("Reject"));
        assert!(out.contains("Sign out"));
        assert!(!out.contains("Add user"));
    }

    #[test]
    fn user_page_lists_add() {
        let app = signed_in_app(&[5], Some(PageKey::UserManagement));
        let out = render_to_string(TERM_W, 40, |frame, area| {
            render_help_overlay(frame, &app, area)
        });
        assert!(out.contains("Add user"));
        assert!(out.contains("Delete"));
    }
}
