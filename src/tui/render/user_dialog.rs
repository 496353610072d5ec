use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::model::PAGE_TABLE;
use crate::tui::app::{App, DialogField, UserDialog};
use crate::util::unicode;

use super::helpers::centered_rect_fixed;

const DIALOG_W: u16 = 60;
const LABEL_W: usize = 13;
const VALUE_W: usize = 30;

/// Add/edit user form
pub fn render_user_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let Some(dialog) = &app.dialog else {
        return;
    };
    let bg = app.theme.background;
    let dim_style = Style::default().fg(app.theme.dim).bg(bg);
    let key_style = Style::default().fg(app.theme.highlight).bg(bg);

    let masked = "*".repeat(dialog.form.password.chars().count());
    let mut lines: Vec<Line> = vec![
        Line::from(""),
        text_field(app, dialog, DialogField::Username, "Username", &dialog.form.username),
        text_field(app, dialog, DialogField::Password, "Password", &masked),
    ];
    if dialog.form.is_edit() {
        lines.push(Line::from(Span::styled(
            format!(" {}(leave blank to keep)", " ".repeat(LABEL_W)),
            dim_style,
        )));
    }
    lines.push(text_field(
        app,
        dialog,
        DialogField::Department,
        "Department",
        &dialog.form.department,
    ));
    lines.push(Line::from(""));
    lines.extend(permission_lines(app, dialog));
    lines.push(Line::from(""));

    if dialog.saving {
        lines.push(Line::from(Span::styled(" Saving\u{2026}", dim_style)));
    } else if let Some(error) = &dialog.error {
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            Style::default().fg(app.theme.red).bg(bg),
        )));
    } else {
        lines.push(Line::from(""));
    }
    lines.push(Line::from(vec![
        Span::styled(" Tab", key_style),
        Span::styled(" next field  ", dim_style),
        Span::styled("Space", key_style),
        Span::styled(" toggle  ", dim_style),
        Span::styled("Enter", key_style),
        Span::styled(" save  ", dim_style),
        Span::styled("Esc", key_style),
        Span::styled(" cancel", dim_style),
    ]));

    let height = lines.len() as u16 + 2;
    let popup = centered_rect_fixed(DIALOG_W, height, area);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {} ", dialog.title()),
            Style::default()
                .fg(app.theme.text_bright)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(app.theme.selection_border).bg(bg))
        .style(Style::default().bg(bg));
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn text_field<'a>(
    app: &App,
    dialog: &UserDialog,
    field: DialogField,
    label: &str,
    value: &str,
) -> Line<'a> {
    let bg = app.theme.background;
    let focused = dialog.focus == field;
    let (label_fg, value_bg) = if focused {
        (app.theme.highlight, app.theme.selection_bg)
    } else {
        (app.theme.text, bg)
    };
    let mut shown = unicode::fit_to_width(value, VALUE_W - 1);
    shown.push(if focused { '\u{258C}' } else { ' ' });
    Line::from(vec![
        Span::styled(
            format!(" {:<width$}", label, width = LABEL_W),
            Style::default().fg(label_fg).bg(bg),
        ),
        Span::styled(
            shown,
            Style::default().fg(app.theme.text_bright).bg(value_bg),
        ),
    ])
}

/// One checkbox per page, in permission-code order
fn permission_lines<'a>(app: &App, dialog: &UserDialog) -> Vec<Line<'a>> {
    let bg = app.theme.background;
    let focused = dialog.focus == DialogField::Permissions;
    let label_fg = if focused {
        app.theme.highlight
    } else {
        app.theme.text
    };
    let mut lines = vec![Line::from(Span::styled(
        " Permissions",
        Style::default().fg(label_fg).bg(bg),
    ))];
    for (i, (code, page)) in PAGE_TABLE.iter().enumerate() {
        let mark = if dialog.form.permissions.contains(*code) {
            'x'
        } else {
            ' '
        };
        let row_bg = if focused && i == dialog.perm_cursor {
            app.theme.selection_bg
        } else {
            bg
        };
        lines.push(Line::from(Span::styled(
            format!("   [{}] {} {}", mark, code, page.label()),
            Style::default().fg(app.theme.text).bg(row_bg),
        )));
    }
    lines
}
