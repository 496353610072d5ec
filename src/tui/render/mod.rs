pub mod confirm_popup;
pub mod help_overlay;
pub mod helpers;
pub mod login_view;
pub mod placeholder;
pub mod status_row;
pub mod table_view;
pub mod top_bar;
pub mod user_dialog;

#[cfg(test)]
pub mod test_helpers;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::text::Span;
use ratatui::widgets::Block;
use regex::Regex;

use super::app::{App, Mode, Screen};

/// Main render function — dispatches to sub-renderers
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Background fill
    let bg_style = Style::default().bg(app.theme.background);
    frame.render_widget(Block::default().style(bg_style), area);

    if app.screen == Screen::Login {
        login_view::render_login_view(frame, app, area);
        return;
    }

    // Layout: top bar (2 rows) | content | status row (1 row)
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // page tabs + separator
            Constraint::Min(1),    // content area
            Constraint::Length(1), // status row
        ])
        .split(area);

    top_bar::render_top_bar(frame, app, chunks[0]);

    match app.page {
        None => placeholder::render_no_access(frame, app, chunks[1]),
        Some(page) if app.table().is_none() => {
            placeholder::render_placeholder(frame, app, page, chunks[1])
        }
        Some(_) => table_view::render_table_view(frame, app, chunks[1]),
    }

    status_row::render_status_row(frame, app, chunks[2]);

    // Overlays (rendered on top of everything)
    if app.mode == Mode::Confirm && app.confirm_state.is_some() {
        confirm_popup::render_confirm_popup(frame, app, area);
    }
    if app.mode == Mode::Dialog && app.dialog.is_some() {
        user_dialog::render_user_dialog(frame, app, area);
    }
    if app.show_help {
        help_overlay::render_help_overlay(frame, app, area);
    }
}

/// Push spans for text with regex match highlighting. If no regex or no matches,
/// pushes a single span with `base_style`. Otherwise splits text at match boundaries.
pub(super) fn push_highlighted_spans<'a>(
    spans: &mut Vec<Span<'a>>,
    text: &str,
    base_style: Style,
    highlight_style: Style,
    search_re: Option<&Regex>,
) {
    let re = match search_re {
        Some(r) => r,
        None => {
            spans.push(Span::styled(text.to_string(), base_style));
            return;
        }
    };

    let mut last_end = 0;
    for m in re.find_iter(text) {
        if m.start() > last_end {
            spans.push(Span::styled(
                text[last_end..m.start()].to_string(),
                base_style,
            ));
        }
        spans.push(Span::styled(
            text[m.start()..m.end()].to_string(),
            highlight_style,
        ));
        last_end = m.end();
    }
    if last_end < text.len() || last_end == 0 {
        spans.push(Span::styled(text[last_end..].to_string(), base_style));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageKey;
    use crate::tui::render::test_helpers::*;

    #[test]
    fn highlighted_spans_split_at_matches() {
        let re = Regex::new("(?i)drw").unwrap();
        let mut spans = Vec::new();
        push_highlighted_spans(
            &mut spans,
            "MDI-DRW-101",
            Style::default(),
            Style::default(),
            Some(&re),
        );
        let parts: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(parts, vec!["MDI-", "DRW", "-101"]);
    }

    #[test]
    fn highlighted_spans_without_match_keep_text() {
        let re = Regex::new("zzz").unwrap();
        let mut spans = Vec::new();
        push_highlighted_spans(&mut spans, "abc", Style::default(), Style::default(), Some(&re));
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].content, "abc");
    }

    #[test]
    fn main_screen_without_access() {
        let app = signed_in_app(&[], None);
        let out = render_to_string(TERM_W, TERM_H, |frame, _| render(frame, &app));
        assert!(out.contains("You don't have access to any pages"));
    }

    #[test]
    fn placeholder_page_shows_its_title() {
        let app = signed_in_app(&[3, 4], Some(PageKey::Reports));
        let out = render_to_string(TERM_W, TERM_H, |frame, _| render(frame, &app));
        assert!(out.contains("Reports"));
        assert!(out.contains("not available yet"));
    }
}
