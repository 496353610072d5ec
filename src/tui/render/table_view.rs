use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::model::DrawingStatus;
use crate::ops::list_view::{Column, TableView};
use crate::tui::app::App;
use crate::util::unicode;

use super::helpers::{notice_style, spans_width};
use super::push_highlighted_spans;

/// Cells between columns
const GAP: usize = 2;

/// Render the current page's table with its pager
pub fn render_table_view(frame: &mut Frame, app: &App, area: Rect) {
    let Some(table) = app.table() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(1), // column headers
            Constraint::Min(1),    // rows
            Constraint::Length(1), // notice
            Constraint::Length(1), // pager
            Constraint::Length(1), // action hints
        ])
        .split(area);

    render_title(frame, app, table, chunks[0]);
    let widths = column_widths(table.columns(), area.width as usize);
    render_header(frame, app, table.columns(), &widths, chunks[1]);
    render_rows(frame, app, table, &widths, chunks[2]);
    if let Some(notice) = table.notice() {
        frame.render_widget(
            Paragraph::new(format!(" {}", notice.text)).style(notice_style(&app.theme, notice)),
            chunks[3],
        );
    }
    render_pager(frame, app, table, chunks[4]);
    render_hints(frame, app, table, chunks[5]);
}

/// Fixed widths for every column but the last, which takes the rest
pub(super) fn column_widths(columns: &[Column], total: usize) -> Vec<usize> {
    let Some((last, fixed)) = columns.split_last() else {
        return Vec::new();
    };
    let mut widths: Vec<usize> = fixed.iter().map(|c| c.width as usize).collect();
    // one cell of row marker in front
    let used: usize = 1 + widths.iter().sum::<usize>() + GAP * columns.len();
    widths.push(total.saturating_sub(used).max(last.width.min(8) as usize));
    widths
}

fn render_title(frame: &mut Frame, app: &App, table: &dyn TableView, area: Rect) {
    let bg = app.theme.background;
    let mut spans = vec![Span::styled(
        format!(" {}", table.title()),
        Style::default()
            .fg(app.theme.text_bright)
            .bg(bg)
            .add_modifier(Modifier::BOLD),
    )];
    if table.is_loading() {
        spans.push(Span::styled(
            "  Loading\u{2026}",
            Style::default().fg(app.theme.dim).bg(bg),
        ));
    }
    if !table.filter_text().is_empty() {
        spans.push(Span::styled(
            "  filter: ",
            Style::default().fg(app.theme.purple).bg(bg),
        ));
        spans.push(Span::styled(
            table.filter_text().to_string(),
            Style::default().fg(app.theme.text).bg(bg),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(bg)),
        area,
    );
}

fn render_header(frame: &mut Frame, app: &App, columns: &[Column], widths: &[usize], area: Rect) {
    let style = Style::default()
        .fg(app.theme.purple)
        .bg(app.theme.background)
        .add_modifier(Modifier::BOLD);
    let mut text = String::from(" ");
    for (column, width) in columns.iter().zip(widths) {
        text.push_str(&unicode::fit_to_width(column.title, *width));
        text.push_str(&" ".repeat(GAP));
    }
    frame.render_widget(Paragraph::new(text.trim_end().to_string()).style(style), area);
}

fn render_rows(frame: &mut Frame, app: &App, table: &dyn TableView, widths: &[usize], area: Rect) {
    let bg = app.theme.background;
    let rows = table.window_cells();

    if rows.is_empty() {
        let message = if table.is_loading() {
            String::new()
        } else if table.filter_text().is_empty() {
            " No records".to_string()
        } else {
            format!(" No records match \u{201c}{}\u{201d}", table.filter_text())
        };
        frame.render_widget(
            Paragraph::new(message).style(Style::default().fg(app.theme.dim).bg(bg)),
            area,
        );
        return;
    }

    let search_re = app.active_search_re();
    let status_col = table.columns().iter().position(|c| c.title == "Status");
    let match_style = Style::default()
        .fg(app.theme.search_match_fg)
        .bg(app.theme.search_match_bg);
    let width = area.width as usize;

    let mut lines: Vec<Line> = Vec::new();
    for (i, cells) in rows.iter().enumerate() {
        let selected = i == table.cursor();
        let row_bg = if selected { app.theme.selection_bg } else { bg };
        let mut spans: Vec<Span> = vec![Span::styled(
            if selected { "\u{258E}" } else { " " },
            Style::default().fg(app.theme.selection_border).bg(row_bg),
        )];
        for (col, (cell, cell_w)) in cells.iter().zip(widths).enumerate() {
            let fg = match (status_col, cell.parse::<DrawingStatus>()) {
                (Some(sc), Ok(status)) if sc == col => app.theme.status_color(status),
                _ if selected => app.theme.text_bright,
                _ => app.theme.text,
            };
            let base = Style::default().fg(fg).bg(row_bg);
            let fitted = unicode::fit_to_width(cell, *cell_w);
            push_highlighted_spans(&mut spans, &fitted, base, match_style, search_re.as_ref());
            spans.push(Span::styled(" ".repeat(GAP), Style::default().bg(row_bg)));
        }
        let used = spans_width(&spans);
        if selected && used < width {
            spans.push(Span::styled(
                " ".repeat(width - used),
                Style::default().bg(row_bg),
            ));
        }
        lines.push(Line::from(spans));
    }

    frame.render_widget(Paragraph::new(lines).style(Style::default().bg(bg)), area);
}

fn render_pager(frame: &mut Frame, app: &App, table: &dyn TableView, area: Rect) {
    let bg = app.theme.background;
    let left = format!(" {}", table.records_label());
    let right = format!("\u{2190} {} \u{2192} ", table.page_label());
    let width = area.width as usize;
    let used = unicode::display_width(&left) + unicode::display_width(&right);
    let mut spans = vec![Span::styled(left, Style::default().fg(app.theme.text).bg(bg))];
    if used < width {
        spans.push(Span::styled(" ".repeat(width - used), Style::default().bg(bg)));
        spans.push(Span::styled(right, Style::default().fg(app.theme.text).bg(bg)));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(bg)),
        area,
    );
}

fn render_hints(frame: &mut Frame, app: &App, table: &dyn TableView, area: Rect) {
    let bg = app.theme.background;
    let key_style = Style::default().fg(app.theme.highlight).bg(bg);
    let desc_style = Style::default().fg(app.theme.dim).bg(bg);
    let mut spans: Vec<Span> = vec![Span::styled(" ", desc_style)];
    for action in table.actions() {
        spans.push(Span::styled(action.key().to_string(), key_style));
        spans.push(Span::styled(format!(" {}  ", action.label()), desc_style));
    }
    if table.key() == crate::model::PageKey::UserManagement {
        spans.push(Span::styled("a", key_style));
        spans.push(Span::styled(" Add  ", desc_style));
    }
    for (key, desc) in [("/", "search"), ("R", "refresh"), ("?", "help")] {
        spans.push(Span::styled(key, key_style));
        spans.push(Span::styled(format!(" {}  ", desc), desc_style));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(bg)),
        area,
    );
}
