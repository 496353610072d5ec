//! End-to-end flows through the UI state machine: key events in, store
//! changes out, against a SQLite database in a temp directory.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tempfile::TempDir;

use drawmgr::model::{AppConfig, DrawingStatus, NewDrawing, PageKey};
use drawmgr::ops::list_view::NoticeLevel;
use drawmgr::ops::user_admin::{UserForm, save_user};
use drawmgr::store::Store;
use drawmgr::tui::app::{App, Mode, Screen};
use drawmgr::tui::input::handle_key;

const FAST: u32 = 1_000;

fn setup() -> (TempDir, Store, AppConfig) {
    let tmp = TempDir::new().unwrap();
    let store = Store::open_sqlite(&tmp.path().join("flow.db")).unwrap();
    for (name, perms) in [("clerk", vec![1, 2]), ("admin", vec![1, 2, 3, 4, 5])] {
        let form = UserForm {
            username: name.into(),
            password: "pw".into(),
            permissions: perms.into_iter().collect(),
            ..UserForm::default()
        };
        save_user(store.users.as_ref(), &form, FAST).unwrap();
    }
    for number in ["D-1", "D-2", "D-3"] {
        store
            .drawings
            .insert(&NewDrawing {
                number: number.into(),
                revision: "A".into(),
                ..NewDrawing::default()
            })
            .unwrap();
    }
    let mut config = AppConfig::default();
    config.auth.pbkdf2_iterations = FAST;
    (tmp, store, config)
}

fn press(app: &mut App, code: KeyCode) {
    handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        press(app, KeyCode::Char(c));
    }
}

/// Apply worker messages until `done` holds
fn pump_until(app: &mut App, done: impl Fn(&App) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done(app) {
        assert!(Instant::now() < deadline, "timed out waiting for the app");
        app.pump(Duration::from_millis(50));
    }
}

fn sign_in(app: &mut App, username: &str, password: &str) {
    type_text(app, username);
    press(app, KeyCode::Tab);
    type_text(app, password);
    press(app, KeyCode::Enter);
    pump_until(app, |a| a.login.pending.is_none());
}

#[test]
fn clerk_requests_then_issues_a_drawing() {
    let (_tmp, store, config) = setup();
    let mut app = App::new(store.clone(), config);

    sign_in(&mut app, "clerk", "pw");
    assert_eq!(app.screen, Screen::Main);
    assert_eq!(app.page, Some(PageKey::DrawingRequests));
    pump_until(&mut app, |a| !a.requests.is_loading());
    assert_eq!(app.requests.filtered_len(), 3);

    // Request the first drawing
    press(&mut app, KeyCode::Char('r'));
    pump_until(&mut app, |a| a.requests.pending_action().is_none());
    let notice = app.requests.notice.clone().unwrap();
    assert_eq!(notice.level, NoticeLevel::Info);
    assert_eq!(notice.text, "Request submitted for D-1");
    assert_eq!(app.requests.working_set()[0].requested_by.as_deref(), Some("clerk"));
    assert_eq!(store.drawings.get(1).unwrap().status, DrawingStatus::Requested);

    // Requesting it again is refused
    press(&mut app, KeyCode::Char('r'));
    pump_until(&mut app, |a| a.requests.pending_action().is_none());
    let notice = app.requests.notice.clone().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.text.contains("already requested by clerk"));

    // Issue it from the issuance page, declining once first
    press(&mut app, KeyCode::Char('2'));
    assert_eq!(app.page, Some(PageKey::DrawingIssuance));
    pump_until(&mut app, |a| !a.issuance.is_loading());
    assert_eq!(app.issuance.filtered_len(), 1);

    press(&mut app, KeyCode::Char('i'));
    assert_eq!(app.mode, Mode::Confirm);
    press(&mut app, KeyCode::Char('n'));
    assert_eq!(app.mode, Mode::Navigate);
    assert_eq!(app.issuance.pending_action(), None);

    press(&mut app, KeyCode::Char('i'));
    press(&mut app, KeyCode::Char('y'));
    pump_until(&mut app, |a| a.issuance.pending_action().is_none());
    assert_eq!(app.issuance.filtered_len(), 0);
    assert_eq!(
        app.issuance.notice.as_ref().map(|n| n.text.as_str()),
        Some("D-1 has been issued")
    );
    assert_eq!(store.drawings.get(1).unwrap().status, DrawingStatus::Issued);
}

#[test]
fn wrong_password_stays_on_login() {
    let (_tmp, store, config) = setup();
    let mut app = App::new(store, config);
    sign_in(&mut app, "clerk", "nope");
    assert_eq!(app.screen, Screen::Login);
    assert_eq!(app.login.error.as_deref(), Some("Invalid username or password"));
    assert!(app.login.password.is_empty());
    assert!(app.session.is_none());
}

#[test]
fn navigation_without_permission_is_refused() {
    let (_tmp, store, config) = setup();
    let mut app = App::new(store, config);
    sign_in(&mut app, "clerk", "pw");

    press(&mut app, KeyCode::Char('5'));
    assert_eq!(app.page, Some(PageKey::DrawingRequests));
    let message = app.status_message.clone().unwrap();
    assert_eq!(message.level, NoticeLevel::Error);
    assert!(message.text.contains("User Management"));
}

#[test]
fn filter_narrows_the_table() {
    let (_tmp, store, config) = setup();
    let mut app = App::new(store, config);
    sign_in(&mut app, "clerk", "pw");
    pump_until(&mut app, |a| !a.requests.is_loading());

    press(&mut app, KeyCode::Char('/'));
    assert_eq!(app.mode, Mode::Search);
    type_text(&mut app, "d-2");
    assert_eq!(app.requests.filtered_len(), 1);
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.mode, Mode::Navigate);
    assert_eq!(app.requests.filter_text(), "d-2");

    press(&mut app, KeyCode::Esc);
    assert_eq!(app.requests.filtered_len(), 3);
}

#[test]
fn admin_adds_a_user_through_the_dialog() {
    let (_tmp, store, config) = setup();
    let mut app = App::new(store.clone(), config);
    sign_in(&mut app, "admin", "pw");

    press(&mut app, KeyCode::Char('5'));
    pump_until(&mut app, |a| !a.users.is_loading());
    assert_eq!(app.users.filtered_len(), 2);

    press(&mut app, KeyCode::Char('a'));
    assert_eq!(app.mode, Mode::Dialog);
    type_text(&mut app, "drafter");
    press(&mut app, KeyCode::Tab);
    type_text(&mut app, "secret");
    press(&mut app, KeyCode::Tab);
    type_text(&mut app, "Drafting");
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Char('1'));
    press(&mut app, KeyCode::Enter);

    pump_until(&mut app, |a| a.dialog.is_none());
    pump_until(&mut app, |a| !a.users.is_loading());
    assert_eq!(app.mode, Mode::Navigate);
    assert_eq!(app.users.filtered_len(), 3);

    let added = store
        .users
        .list()
        .unwrap()
        .into_iter()
        .find(|u| u.username == "drafter")
        .unwrap();
    assert_eq!(added.department, "Drafting");
    assert_eq!(added.permissions.iter().collect::<Vec<_>>(), vec![1]);
}

#[test]
fn duplicate_username_keeps_the_dialog_open() {
    let (_tmp, store, config) = setup();
    let mut app = App::new(store, config);
    sign_in(&mut app, "admin", "pw");
    press(&mut app, KeyCode::Char('5'));
    pump_until(&mut app, |a| !a.users.is_loading());

    press(&mut app, KeyCode::Char('a'));
    type_text(&mut app, "clerk");
    press(&mut app, KeyCode::Tab);
    type_text(&mut app, "pw");
    press(&mut app, KeyCode::Enter);
    pump_until(&mut app, |a| a.dialog.as_ref().is_some_and(|d| !d.saving));

    assert_eq!(app.mode, Mode::Dialog);
    let error = app.dialog.as_ref().and_then(|d| d.error.clone());
    assert_eq!(error.as_deref(), Some("Username 'clerk' already exists"));
}

#[test]
fn logout_returns_to_login_with_username_kept() {
    let (_tmp, store, config) = setup();
    let mut app = App::new(store, config);
    sign_in(&mut app, "clerk", "pw");
    press(&mut app, KeyCode::Char('L'));
    assert_eq!(app.screen, Screen::Login);
    assert_eq!(app.login.username, "clerk");
    assert!(app.session.is_none());
    assert_eq!(app.requests.filtered_len(), 0);
}
