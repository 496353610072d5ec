use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::tui::app::{App, Mode};

/// Live filter: every edit re-filters the current table
pub(super) fn handle_search(app: &mut App, key: KeyEvent) {
    match (key.modifiers, key.code) {
        // Cancel: drop the filter
        (_, KeyCode::Esc) => {
            app.search_input.clear();
            apply_filter(app);
            app.mode = Mode::Navigate;
        }
        // Keep the filter
        (_, KeyCode::Enter) => {
            app.mode = Mode::Navigate;
        }
        (_, KeyCode::Backspace) => {
            if app.search_input.pop().is_none() {
                app.mode = Mode::Navigate;
            }
            apply_filter(app);
        }
        (KeyModifiers::NONE, KeyCode::Char(c)) => {
            app.search_input.push(c);
            apply_filter(app);
        }
        _ => {}
    }
}

fn apply_filter(app: &mut App) {
    let text = app.search_input.clone();
    if let Some(table) = app.table_mut() {
        table.set_filter(&text);
    }
}
