use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::model::PageKey;
use crate::ops::list_view::RowAction;
use crate::tui::app::{App, Mode};

pub(super) fn handle_navigate(app: &mut App, key: KeyEvent) {
    app.status_message = None;

    match (key.modifiers, key.code) {
        (KeyModifiers::NONE, KeyCode::Char('q')) => app.should_quit = true,
        (KeyModifiers::NONE, KeyCode::Char('?')) => app.show_help = true,
        (KeyModifiers::NONE, KeyCode::Char('L')) => app.logout(),

        // Pages
        (KeyModifiers::NONE, KeyCode::Char(c @ '1'..='5')) => {
            if let Some(page) = c.to_digit(10).and_then(|d| PageKey::from_code(i64::from(d))) {
                app.switch_page(page);
            }
        }
        (_, KeyCode::Tab) => app.next_page(),
        (KeyModifiers::NONE, KeyCode::Char('R')) | (_, KeyCode::F(5)) => app.reload_current(),

        // Table navigation
        (_, KeyCode::Up) | (KeyModifiers::NONE, KeyCode::Char('k')) => {
            if let Some(table) = app.table_mut() {
                table.cursor_up();
            }
        }
        (_, KeyCode::Down) | (KeyModifiers::NONE, KeyCode::Char('j')) => {
            if let Some(table) = app.table_mut() {
                table.cursor_down();
            }
        }
        (_, KeyCode::Left | KeyCode::PageUp) | (KeyModifiers::NONE, KeyCode::Char('h')) => {
            if let Some(table) = app.table_mut() {
                table.goto_prev();
            }
        }
        (_, KeyCode::Right | KeyCode::PageDown) | (KeyModifiers::NONE, KeyCode::Char('l')) => {
            if let Some(table) = app.table_mut() {
                table.goto_next();
            }
        }

        // Search
        (KeyModifiers::NONE, KeyCode::Char('/')) => {
            if let Some(table) = app.table() {
                app.search_input = table.filter_text().to_string();
                app.mode = Mode::Search;
            }
        }
        (_, KeyCode::Esc) => {
            app.search_input.clear();
            if let Some(table) = app.table_mut()
                && !table.filter_text().is_empty()
            {
                table.set_filter("");
            }
        }

        (KeyModifiers::NONE, KeyCode::Char('a')) => app.open_add_user(),

        // Row actions
        (KeyModifiers::NONE, KeyCode::Char(c)) => {
            if let Some(action) = RowAction::from_key(c) {
                app.request_action(action);
            }
        }
        _ => {}
    }
}
