use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::model::PAGE_TABLE;
use crate::tui::app::{App, DialogField, UserDialog};

pub(super) fn handle_dialog(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => return app.close_dialog(),
        KeyCode::Enter => return app.submit_dialog(),
        _ => {}
    }

    let Some(dialog) = &mut app.dialog else {
        return;
    };
    if dialog.saving {
        return;
    }
    dialog.error = None;

    match (key.modifiers, key.code) {
        (_, KeyCode::Tab | KeyCode::Down) => dialog.focus = dialog.focus.next(),
        (_, KeyCode::BackTab | KeyCode::Up) => dialog.focus = dialog.focus.prev(),
        (_, code) if dialog.focus == DialogField::Permissions => match code {
            KeyCode::Left | KeyCode::Char('h') => {
                dialog.perm_cursor = dialog.perm_cursor.saturating_sub(1);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                dialog.perm_cursor = (dialog.perm_cursor + 1).min(PAGE_TABLE.len() - 1);
            }
            KeyCode::Char(' ') | KeyCode::Char('x') => {
                let (code, _) = PAGE_TABLE[dialog.perm_cursor];
                dialog.form.permissions.toggle(code);
            }
            KeyCode::Char(c @ '1'..='5') => {
                if let Some(d) = c.to_digit(10) {
                    dialog.form.permissions.toggle(i64::from(d));
                }
            }
            _ => {}
        },
        (_, KeyCode::Backspace) => {
            if let Some(text) = focused_text(dialog) {
                text.pop();
            }
        }
        (KeyModifiers::NONE, KeyCode::Char(c)) => {
            if let Some(text) = focused_text(dialog) {
                text.push(c);
            }
        }
        _ => {}
    }
}

fn focused_text(dialog: &mut UserDialog) -> Option<&mut String> {
    match dialog.focus {
        DialogField::Username => Some(&mut dialog.form.username),
        DialogField::Password => Some(&mut dialog.form.password),
        DialogField::Department => Some(&mut dialog.form.department),
        DialogField::Permissions => None,
    }
}
