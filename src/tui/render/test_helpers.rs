use std::sync::Arc;

use chrono::NaiveDate;
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;

use crate::model::{AppConfig, Drawing, DrawingStatus, PageKey, PermissionSet};
use crate::ops::session::Session;
use crate::store::{MemoryStore, Store};
use crate::tui::app::{App, Screen};

pub const TERM_W: u16 = 80;
pub const TERM_H: u16 = 24;

/// Render into an in-memory buffer and return plain text (no styles).
pub fn render_to_string<F>(w: u16, h: u16, f: F) -> String
where
    F: FnOnce(&mut ratatui::Frame, Rect),
{
    let backend = TestBackend::new(w, h);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|frame| {
            let area = frame.area();
            f(frame, area);
        })
        .unwrap();

    let buf = terminal.backend().buffer().clone();
    let w = buf.area.width as usize;
    let lines: Vec<String> = buf
        .content
        .chunks(w)
        .map(|row| {
            let s: String = row.iter().map(|cell| cell.symbol()).collect();
            s.trim_end().to_string()
        })
        .collect();

    // Trim trailing blank lines
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}

/// An App on the login screen backed by an empty in-memory store
pub fn login_app() -> App {
    App::new(Store::memory(Arc::new(MemoryStore::new())), AppConfig::default())
}

/// An App signed in as `clerk` on `page`, without any worker round trip
pub fn signed_in_app(codes: &[i64], page: Option<PageKey>) -> App {
    let mut app = login_app();
    let permissions: PermissionSet = codes.iter().copied().collect();
    app.session = Some(Session::new("clerk", permissions));
    app.screen = Screen::Main;
    app.page = page;
    app
}

/// `n` drawings, the odd ones requested by jdoe
pub fn drawings(n: usize) -> Vec<Drawing> {
    let at = NaiveDate::from_ymd_opt(2026, 2, 3).and_then(|d| d.and_hms_opt(10, 15, 0));
    (1..=n as i64)
        .map(|id| {
            let requested = id % 2 == 1;
            Drawing {
                id,
                number: format!("DRW-{:03}", id),
                title: format!("Sheet {}", id),
                revision: "A".into(),
                approved_on: None,
                status: if requested {
                    DrawingStatus::Requested
                } else {
                    DrawingStatus::Approved
                },
                requested_by: requested.then(|| "jdoe".to_string()),
                requested_at: if requested { at } else { None },
            }
        })
        .collect()
}
