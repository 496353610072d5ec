use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::tui::app::{App, LoginField, LoginForm};

pub(super) fn handle_login(app: &mut App, key: KeyEvent) {
    match (key.modifiers, key.code) {
        (_, KeyCode::Esc) => app.should_quit = true,
        (_, KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down) => {
            app.login.focus = match app.login.focus {
                LoginField::Username => LoginField::Password,
                LoginField::Password => LoginField::Username,
            };
        }
        (_, KeyCode::Enter) => {
            if app.login.focus == LoginField::Username && app.login.password.is_empty() {
                app.login.focus = LoginField::Password;
            } else {
                app.submit_login();
            }
        }
        (_, KeyCode::Backspace) => {
            focused_field(&mut app.login).pop();
        }
        (KeyModifiers::NONE, KeyCode::Char(c)) => {
            if app.login.pending.is_none() {
                focused_field(&mut app.login).push(c);
            }
        }
        _ => {}
    }
}

fn focused_field(form: &mut LoginForm) -> &mut String {
    match form.focus {
        LoginField::Username => &mut form.username,
        LoginField::Password => &mut form.password,
    }
}
