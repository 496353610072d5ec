use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use regex::Regex;

use crate::io::state::{UiState, read_ui_state, write_ui_state};
use crate::model::{AppConfig, PageKey, RecordId};
use crate::ops::auth::AuthOutcome;
use crate::ops::list_view::{ActionContext, ListView, Notice, RowAction, TableView};
use crate::ops::pages::{IssuancePage, RequestsPage, UsersPage};
use crate::ops::session::{AccessDenied, Session};
use crate::ops::user_admin::{SaveError, UserForm};
use crate::store::Store;

use super::input;
use super::render;
use super::theme::Theme;
use super::worker::{self, ListEvent, Message, Routed};

/// Which screen is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Main,
}

/// Current interaction mode on the main screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Navigate,
    Search,
    Confirm,
    Dialog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Username,
    Password,
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub focus: LoginField,
    pub error: Option<String>,
    /// Generation and start time of the sign-in attempt in flight
    pub pending: Option<(u64, Instant)>,
}

impl Default for LoginForm {
    fn default() -> Self {
        LoginForm {
            username: String::new(),
            password: String::new(),
            focus: LoginField::Username,
            error: None,
            pending: None,
        }
    }
}

/// A row action waiting for y/n
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmState {
    pub page: PageKey,
    pub action: RowAction,
    pub id: RecordId,
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogField {
    Username,
    Password,
    Department,
    Permissions,
}

impl DialogField {
    pub fn next(self) -> Self {
        match self {
            DialogField::Username => DialogField::Password,
            DialogField::Password => DialogField::Department,
            DialogField::Department => DialogField::Permissions,
            DialogField::Permissions => DialogField::Username,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            DialogField::Username => DialogField::Permissions,
            DialogField::Password => DialogField::Username,
            DialogField::Department => DialogField::Password,
            DialogField::Permissions => DialogField::Department,
        }
    }
}

/// The add/edit user dialog
#[derive(Debug, Clone)]
pub struct UserDialog {
    pub form: UserForm,
    pub focus: DialogField,
    /// Index into the page table while the permission list has focus
    pub perm_cursor: usize,
    pub error: Option<String>,
    pub saving: bool,
}

impl UserDialog {
    pub fn new(form: UserForm) -> Self {
        UserDialog {
            form,
            focus: DialogField::Username,
            perm_cursor: 0,
            error: None,
            saving: false,
        }
    }

    pub fn title(&self) -> &'static str {
        if self.form.is_edit() {
            "Edit User"
        } else {
            "Add User"
        }
    }
}

/// Ties a page to its controller inside [`App`]
pub trait Hosted: Routed {
    fn view_mut(app: &mut App) -> &mut ListView<Self>;
}

impl Routed for RequestsPage {
    fn wrap(event: ListEvent<Self::Row>) -> Message {
        Message::Requests(event)
    }
}

impl Hosted for RequestsPage {
    fn view_mut(app: &mut App) -> &mut ListView<Self> {
        &mut app.requests
    }
}

impl Routed for IssuancePage {
    fn wrap(event: ListEvent<Self::Row>) -> Message {
        Message::Issuance(event)
    }
}

impl Hosted for IssuancePage {
    fn view_mut(app: &mut App) -> &mut ListView<Self> {
        &mut app.issuance
    }
}

impl Routed for UsersPage {
    fn wrap(event: ListEvent<Self::Row>) -> Message {
        Message::Users(event)
    }
}

impl Hosted for UsersPage {
    fn view_mut(app: &mut App) -> &mut ListView<Self> {
        &mut app.users
    }
}

/// Main application state
pub struct App {
    pub store: Store,
    pub config: AppConfig,
    pub theme: Theme,
    pub screen: Screen,
    pub mode: Mode,
    pub should_quit: bool,
    /// Help overlay visible
    pub show_help: bool,
    pub login: LoginForm,
    pub session: Option<Session>,
    /// Page on display; `None` while signed in means no access at all
    pub page: Option<PageKey>,
    pub requests: ListView<RequestsPage>,
    pub issuance: ListView<IssuancePage>,
    pub users: ListView<UsersPage>,
    /// Search mode: filter text being typed
    pub search_input: String,
    pub confirm_state: Option<ConfirmState>,
    pub dialog: Option<UserDialog>,
    /// Transient message for the status row
    pub status_message: Option<Notice>,
    auth_generation: u64,
    /// Generation and start time of the user save in flight
    save_pending: Option<(u64, Instant)>,
    save_generation: u64,
    last_page: Option<PageKey>,
    /// Page to reopen if the same user signs in again
    resume: Option<(String, PageKey)>,
    state_path: Option<PathBuf>,
    tx: Sender<Message>,
    rx: Receiver<Message>,
}

impl App {
    pub fn new(store: Store, config: AppConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        let page_size = config.ui.page_size;
        App {
            store,
            theme: Theme::from_config(&config.ui),
            config,
            screen: Screen::Login,
            mode: Mode::Navigate,
            should_quit: false,
            show_help: false,
            login: LoginForm::default(),
            session: None,
            page: None,
            requests: ListView::new(page_size),
            issuance: ListView::new(page_size),
            users: ListView::new(page_size),
            search_input: String::new(),
            confirm_state: None,
            dialog: None,
            status_message: None,
            auth_generation: 0,
            save_pending: None,
            save_generation: 0,
            last_page: None,
            resume: None,
            state_path: None,
            tx,
            rx,
        }
    }

    /// Restore the sign-in name and last page from the state file
    pub fn restore_state(&mut self, path: PathBuf) {
        if let Some(state) = read_ui_state(&path) {
            if let Some(username) = state.last_username {
                self.resume = state.last_page.map(|page| (username.clone(), page));
                self.login.username = username;
                self.login.focus = LoginField::Password;
            }
        }
        self.state_path = Some(path);
    }

    pub fn save_state(&self) {
        let Some(path) = &self.state_path else {
            return;
        };
        let username = match &self.session {
            Some(session) => session.username.clone(),
            None => self.login.username.trim().to_string(),
        };
        let state = UiState {
            last_username: (!username.is_empty()).then_some(username),
            last_page: self
                .last_page
                .or_else(|| self.resume.as_ref().map(|(_, page)| *page)),
        };
        if let Err(e) = write_ui_state(path, &state) {
            tracing::warn!(path = %path.display(), error = %e, "could not save UI state");
        }
    }

    pub fn timeout(&self) -> Duration {
        self.config.worker.timeout()
    }

    /// The table behind the current page, if it has one
    pub fn table(&self) -> Option<&dyn TableView> {
        match self.page? {
            PageKey::DrawingRequests => Some(&self.requests),
            PageKey::DrawingIssuance => Some(&self.issuance),
            PageKey::UserManagement => Some(&self.users),
            PageKey::Return | PageKey::Reports => None,
        }
    }

    pub fn table_mut(&mut self) -> Option<&mut dyn TableView> {
        match self.page? {
            PageKey::DrawingRequests => Some(&mut self.requests),
            PageKey::DrawingIssuance => Some(&mut self.issuance),
            PageKey::UserManagement => Some(&mut self.users),
            PageKey::Return | PageKey::Reports => None,
        }
    }

    /// Regex for highlighting filter matches in table cells
    pub fn active_search_re(&self) -> Option<Regex> {
        let text = match self.mode {
            Mode::Search => self.search_input.trim(),
            _ => self.table()?.filter_text(),
        };
        if text.is_empty() {
            return None;
        }
        Regex::new(&format!("(?i){}", regex::escape(text))).ok()
    }

    // -----------------------------------------------------------------------
    // Sign-in
    // -----------------------------------------------------------------------

    pub fn submit_login(&mut self) {
        if self.login.pending.is_some() {
            return;
        }
        if self.login.username.trim().is_empty() || self.login.password.is_empty() {
            self.login.error = Some("Enter a username and password".into());
            return;
        }
        self.auth_generation += 1;
        self.login.pending = Some((self.auth_generation, Instant::now()));
        self.login.error = None;
        worker::spawn_auth(
            self.store.users.clone(),
            self.tx.clone(),
            self.auth_generation,
            self.login.username.clone(),
            self.login.password.clone(),
        );
    }

    fn finish_login(&mut self, generation: u64, username: String, outcome: AuthOutcome) {
        if self.login.pending.map(|(g, _)| g) != Some(generation) {
            tracing::debug!(generation, "discarding stale sign-in result");
            return;
        }
        self.login.pending = None;
        if outcome.ok {
            self.sign_in(Session::new(username, outcome.permissions));
        } else {
            self.login.error = Some("Invalid username or password".into());
            self.login.password.clear();
            self.login.focus = LoginField::Password;
        }
    }

    /// Enter the main screen on the first allowed page. A user signing in
    /// again returns to the page they last used, if still allowed.
    pub fn sign_in(&mut self, session: Session) {
        let page = self
            .resume
            .take()
            .filter(|(user, page)| *user == session.username && session.can_access(*page))
            .map(|(_, page)| page)
            .or_else(|| session.landing_page());
        self.login.password.clear();
        self.login.error = None;
        self.session = Some(session);
        self.screen = Screen::Main;
        self.mode = Mode::Navigate;
        self.page = page;
        self.last_page = page;
        self.save_state();
        self.reload_current();
    }

    pub fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(user = %session.username, "signed out");
            self.resume = self.last_page.map(|page| (session.username.clone(), page));
            self.login.username = session.username;
        }
        self.save_state();
        self.last_page = None;
        self.save_pending = None;
        self.page = None;
        self.screen = Screen::Login;
        self.mode = Mode::Navigate;
        self.show_help = false;
        self.confirm_state = None;
        self.dialog = None;
        self.search_input.clear();
        self.status_message = None;
        self.requests.reset();
        self.issuance.reset();
        self.users.reset();
        self.login.password.clear();
        self.login.focus = if self.login.username.is_empty() {
            LoginField::Username
        } else {
            LoginField::Password
        };
    }

    // -----------------------------------------------------------------------
    // Pages
    // -----------------------------------------------------------------------

    /// Navigate to a page. Refused (with a notice) without permission.
    pub fn switch_page(&mut self, page: PageKey) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        if let Err(denied) = session.check(page) {
            tracing::info!(user = %session.username, %page, "navigation refused");
            self.status_message = Some(Notice::error(denied.to_string()));
            return false;
        }
        if self.page == Some(page) {
            return true;
        }
        self.page = Some(page);
        self.last_page = Some(page);
        self.search_input.clear();
        self.reload_current();
        true
    }

    /// Cycle through the allowed pages
    pub fn next_page(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let allowed = session.allowed_pages();
        if allowed.is_empty() {
            return;
        }
        let next = match self.page.and_then(|p| allowed.iter().position(|a| *a == p)) {
            Some(i) => allowed[(i + 1) % allowed.len()],
            None => allowed[0],
        };
        self.switch_page(next);
    }

    pub fn reload_current(&mut self) {
        match self.page {
            Some(PageKey::DrawingRequests) => self.reload::<RequestsPage>(),
            Some(PageKey::DrawingIssuance) => self.reload::<IssuancePage>(),
            Some(PageKey::UserManagement) => self.reload::<UsersPage>(),
            Some(PageKey::Return | PageKey::Reports) | None => {}
        }
    }

    fn reload<P: Hosted>(&mut self) {
        let generation = P::view_mut(self).begin_load(Instant::now());
        tracing::debug!(page = %P::KEY, generation, "loading");
        worker::spawn_load::<P>(self.store.clone(), self.tx.clone(), generation);
    }

    // -----------------------------------------------------------------------
    // Row actions
    // -----------------------------------------------------------------------

    /// Start a row action on the selected row: open a form, ask for
    /// confirmation, or write through directly.
    pub fn request_action(&mut self, action: RowAction) {
        let Some(page) = self.page else {
            return;
        };
        let Some(table) = self.table() else {
            return;
        };
        if !table.actions().contains(&action) {
            return;
        }
        let selected = table.selected_ref();
        if let Some(session) = &self.session
            && let Err(denied) = session.check(page)
        {
            self.status_message = Some(Notice::error(denied.to_string()));
            return;
        }
        let Some((id, name)) = selected else {
            self.status_message = Some(Notice::error("No row selected"));
            return;
        };
        if action.opens_form() {
            self.open_edit_user(id);
        } else if action.needs_confirm() {
            self.confirm_state = Some(ConfirmState {
                page,
                action,
                id,
                prompt: confirm_prompt(action, &name),
            });
            self.mode = Mode::Confirm;
        } else {
            self.dispatch(page, action, id);
        }
    }

    pub fn confirm_accept(&mut self) {
        self.mode = Mode::Navigate;
        if let Some(state) = self.confirm_state.take() {
            self.dispatch(state.page, state.action, state.id);
        }
    }

    pub fn confirm_decline(&mut self) {
        self.mode = Mode::Navigate;
        self.confirm_state = None;
    }

    fn dispatch(&mut self, page: PageKey, action: RowAction, id: RecordId) {
        match page {
            PageKey::DrawingRequests => self.dispatch_for::<RequestsPage>(action, id),
            PageKey::DrawingIssuance => self.dispatch_for::<IssuancePage>(action, id),
            PageKey::UserManagement => self.dispatch_for::<UsersPage>(action, id),
            PageKey::Return | PageKey::Reports => {}
        }
    }

    fn dispatch_for<P: Hosted>(&mut self, action: RowAction, id: RecordId) {
        let Some(session) = &self.session else {
            return;
        };
        if let Err(denied) = session.check(P::KEY) {
            self.status_message = Some(Notice::error(denied.to_string()));
            return;
        }
        let ctx = ActionContext {
            username: session.username.clone(),
            now: Local::now().naive_local(),
        };
        let store = self.store.clone();
        let tx = self.tx.clone();
        let view = P::view_mut(self);
        let Some(row) = view.find(id).cloned() else {
            return;
        };
        if let Err(busy) = view.begin_action(action, id, Instant::now()) {
            view.notice = Some(Notice::error(busy.to_string()));
            return;
        }
        tracing::debug!(page = %P::KEY, ?action, id, "dispatching row action");
        worker::spawn_action::<P>(store, tx, ctx, action, row);
    }

    // -----------------------------------------------------------------------
    // User dialog
    // -----------------------------------------------------------------------

    fn can_manage_users(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.can_access(PageKey::UserManagement))
    }

    pub fn open_add_user(&mut self) {
        if self.page != Some(PageKey::UserManagement) || !self.can_manage_users() {
            return;
        }
        self.dialog = Some(UserDialog::new(UserForm::for_new()));
        self.mode = Mode::Dialog;
    }

    fn open_edit_user(&mut self, id: RecordId) {
        let Some(account) = self.users.find(id) else {
            return;
        };
        self.dialog = Some(UserDialog::new(UserForm::for_edit(account)));
        self.mode = Mode::Dialog;
    }

    pub fn submit_dialog(&mut self) {
        let allowed = self.can_manage_users();
        let Some(dialog) = &mut self.dialog else {
            return;
        };
        if dialog.saving {
            return;
        }
        if !allowed {
            dialog.error = Some(AccessDenied(PageKey::UserManagement).to_string());
            return;
        }
        if let Err(e) = dialog.form.validate() {
            dialog.error = Some(e.to_string());
            return;
        }
        dialog.saving = true;
        dialog.error = None;
        self.save_generation += 1;
        self.save_pending = Some((self.save_generation, Instant::now()));
        worker::spawn_save_user(
            self.store.users.clone(),
            self.tx.clone(),
            self.save_generation,
            dialog.form.clone(),
            self.config.auth.pbkdf2_iterations,
        );
    }

    pub fn close_dialog(&mut self) {
        self.dialog = None;
        self.mode = Mode::Navigate;
    }

    fn finish_save(&mut self, generation: u64, result: Result<RecordId, SaveError>) {
        if self.save_pending.map(|(g, _)| g) != Some(generation) {
            tracing::debug!(generation, "discarding stale user save result");
            return;
        }
        self.save_pending = None;
        match result {
            Ok(_) => {
                if self.dialog.take().is_some() && self.mode == Mode::Dialog {
                    self.mode = Mode::Navigate;
                }
                self.status_message = Some(Notice::info("User saved"));
                if self.page == Some(PageKey::UserManagement) {
                    self.reload::<UsersPage>();
                }
            }
            Err(e) => {
                tracing::info!(error = %e, "user save rejected");
                match &mut self.dialog {
                    Some(dialog) => {
                        dialog.saving = false;
                        dialog.error = Some(e.to_string());
                    }
                    None => self.status_message = Some(Notice::error(e.to_string())),
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    pub fn handle_message(&mut self, msg: Message) {
        match msg {
            Message::Auth {
                generation,
                username,
                outcome,
            } => self.finish_login(generation, username, outcome),
            Message::Requests(event) => self.apply_event::<RequestsPage>(event),
            Message::Issuance(event) => self.apply_event::<IssuancePage>(event),
            Message::Users(event) => self.apply_event::<UsersPage>(event),
            Message::UserSaved { generation, result } => self.finish_save(generation, result),
        }
    }

    fn apply_event<P: Hosted>(&mut self, event: ListEvent<P::Row>) {
        let view = P::view_mut(self);
        match event {
            ListEvent::Loaded { generation, result } => {
                view.finish_load(generation, result);
            }
            ListEvent::ActionDone { action, id, result } => {
                // A load started before the write may still return the old row
                let stale_load = view.is_loading();
                if view.finish_action(action, id, result) && stale_load {
                    self.reload::<P>();
                }
            }
        }
    }

    /// Apply every message already waiting
    pub fn drain_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            self.handle_message(msg);
        }
    }

    /// Wait up to `timeout` for one message and apply it
    pub fn pump(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => {
                self.handle_message(msg);
                true
            }
            Err(_) => false,
        }
    }

    /// Abandon work that has been pending longer than the configured timeout
    pub fn tick(&mut self, now: Instant) {
        let timeout = self.timeout();
        if let Some((_, since)) = self.login.pending
            && now.saturating_duration_since(since) >= timeout
        {
            tracing::warn!(?timeout, "sign-in timed out");
            self.login.pending = None;
            self.login.error = Some(format!("Sign-in timed out after {}s", timeout.as_secs()));
        }
        if let Some((_, since)) = self.save_pending
            && now.saturating_duration_since(since) >= timeout
        {
            tracing::warn!(?timeout, "user save timed out");
            self.save_pending = None;
            let message = format!(
                "Saving timed out after {}s; reload to see the current state",
                timeout.as_secs()
            );
            match &mut self.dialog {
                Some(dialog) => {
                    dialog.saving = false;
                    dialog.error = Some(message);
                }
                None => self.status_message = Some(Notice::error(message)),
            }
        }
        self.requests.check_timeout(now, timeout);
        self.issuance.check_timeout(now, timeout);
        self.users.check_timeout(now, timeout);
    }
}

fn confirm_prompt(action: RowAction, name: &str) -> String {
    match action {
        RowAction::Issue => format!("Issue drawing {}?", name),
        RowAction::Reject => format!("Reject the request for {}?", name),
        RowAction::Delete => format!("Delete user {}? This cannot be undone.", name),
        _ => format!("{} {}?", action.label(), name),
    }
}

/// Run the TUI application
pub fn run(
    store: Store,
    config: AppConfig,
    state_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new(store, config);
    if let Some(path) = state_path {
        app.restore_state(path);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Restore the terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = run_event_loop(&mut terminal, &mut app);

    app.save_state();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|frame| render::render(frame, app))?;

        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            input::handle_key(app, key);
        }

        app.drain_messages();
        app.tick(Instant::now());

        if app.should_quit {
            break;
        }
    }
    Ok(())
}
