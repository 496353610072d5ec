//! The list view controller shared by every table page.
//!
//! A controller owns its page's working set, the filter text and the page
//! offset. Concrete pages are configurations of it (see [`ListPage`]): a
//! column set, a search projection, row actions, a loader and an action
//! handler.

use std::marker::PhantomData;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;

use crate::model::{PageKey, Record, RecordId};
use crate::store::{Store, StoreError};

/// A table column: header text and preferred width in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub title: &'static str,
    pub width: u16,
}

/// Row-level actions a page can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowAction {
    Request,
    Issue,
    Reject,
    Edit,
    Delete,
}

impl RowAction {
    pub fn label(self) -> &'static str {
        match self {
            RowAction::Request => "Request",
            RowAction::Issue => "Issue",
            RowAction::Reject => "Reject",
            RowAction::Edit => "Edit",
            RowAction::Delete => "Delete",
        }
    }

    pub fn key(self) -> char {
        match self {
            RowAction::Request => 'r',
            RowAction::Issue => 'i',
            RowAction::Reject => 'x',
            RowAction::Edit => 'e',
            RowAction::Delete => 'd',
        }
    }

    pub fn from_key(c: char) -> Option<Self> {
        [
            RowAction::Request,
            RowAction::Issue,
            RowAction::Reject,
            RowAction::Edit,
            RowAction::Delete,
        ]
        .into_iter()
        .find(|a| a.key() == c)
    }

    /// Destructive or irreversible actions ask first
    pub fn needs_confirm(self) -> bool {
        matches!(self, RowAction::Issue | RowAction::Reject | RowAction::Delete)
    }

    /// Edit opens a form instead of writing through directly
    pub fn opens_form(self) -> bool {
        self == RowAction::Edit
    }
}

/// Who is acting, and when
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub username: String,
    pub now: NaiveDateTime,
}

/// What a successful write-through does to the working set
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome<R> {
    Remove,
    Replace(R),
    Keep,
}

/// Configuration of one table page
pub trait ListPage: 'static {
    type Row: Record + Clone + Send + 'static;

    const KEY: PageKey;
    const TITLE: &'static str;

    fn columns() -> &'static [Column];

    /// Display cells, one per column
    fn cells(row: &Self::Row) -> Vec<String>;

    /// Fields the filter text is matched against
    fn search_fields(row: &Self::Row) -> Vec<String>;

    fn actions() -> &'static [RowAction];

    /// Short name of a row for prompts and notices
    fn describe(row: &Self::Row) -> String;

    fn load(store: &Store) -> Result<Vec<Self::Row>, StoreError>;

    /// Write an action through to the store
    fn perform(
        store: &Store,
        ctx: &ActionContext,
        action: RowAction,
        row: &Self::Row,
    ) -> Result<RowOutcome<Self::Row>, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A non-fatal message overlaid on a view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading { generation: u64, since: Instant },
    Ready,
}

/// Another action is still being written through
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0} is still in progress")]
pub struct ActionBusy(pub &'static str);

pub struct ListView<P: ListPage> {
    working_set: Vec<P::Row>,
    /// Normalized (trimmed, lowercased) filter text
    filter_text: String,
    /// Indices into `working_set`, in order
    filtered: Vec<usize>,
    page_index: usize,
    page_size: usize,
    /// Selected row within the page window
    cursor: usize,
    phase: Phase,
    generation: u64,
    /// The write-through in flight and when it was dispatched
    pending_action: Option<(RowAction, RecordId, Instant)>,
    pub notice: Option<Notice>,
    _page: PhantomData<P>,
}

impl<P: ListPage> ListView<P> {
    pub fn new(page_size: usize) -> Self {
        ListView {
            working_set: Vec::new(),
            filter_text: String::new(),
            filtered: Vec::new(),
            page_index: 0,
            page_size: page_size.max(1),
            cursor: 0,
            phase: Phase::Ready,
            generation: 0,
            pending_action: None,
            notice: None,
            _page: PhantomData,
        }
    }

    pub fn working_set(&self) -> &[P::Row] {
        &self.working_set
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    pub fn pending_action(&self) -> Option<(RowAction, RecordId)> {
        self.pending_action.map(|(action, id, _)| (action, id))
    }

    /// The Filtered View, in working-set order
    pub fn filtered(&self) -> Vec<&P::Row> {
        self.filtered.iter().map(|&i| &self.working_set[i]).collect()
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn total_pages(&self) -> usize {
        self.filtered.len().div_ceil(self.page_size).max(1)
    }

    /// Rows of the current page
    pub fn page_window(&self) -> Vec<&P::Row> {
        let start = self.page_index * self.page_size;
        self.filtered
            .iter()
            .skip(start)
            .take(self.page_size)
            .map(|&i| &self.working_set[i])
            .collect()
    }

    pub fn selected(&self) -> Option<&P::Row> {
        let index = self.page_index * self.page_size + self.cursor;
        self.filtered.get(index).map(|&i| &self.working_set[i])
    }

    pub fn find(&self, id: RecordId) -> Option<&P::Row> {
        self.working_set.iter().find(|r| r.id() == id)
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Enter Loading and return the generation the result must carry
    pub fn begin_load(&mut self, now: Instant) -> u64 {
        self.generation += 1;
        self.phase = Phase::Loading {
            generation: self.generation,
            since: now,
        };
        self.generation
    }

    /// Apply a load result. Returns false (and changes nothing) when the
    /// result is stale: a newer load was started, or this one timed out.
    pub fn finish_load(
        &mut self,
        generation: u64,
        result: Result<Vec<P::Row>, StoreError>,
    ) -> bool {
        match self.phase {
            Phase::Loading { generation: g, .. } if g == generation => {}
            _ => {
                tracing::debug!(page = %P::KEY, generation, "discarding stale load result");
                return false;
            }
        }
        self.phase = Phase::Ready;
        match result {
            Ok(rows) => {
                self.set_rows(rows);
                self.notice = None;
            }
            Err(e) => {
                tracing::warn!(page = %P::KEY, error = %e, "load failed");
                self.set_rows(Vec::new());
                self.notice = Some(Notice::error(format!("Could not load {}: {}", P::TITLE, e)));
            }
        }
        true
    }

    /// Abandon a load or write-through that has been pending longer than
    /// `timeout`. Its late result is discarded.
    pub fn check_timeout(&mut self, now: Instant, timeout: Duration) -> bool {
        let mut expired = false;
        if let Phase::Loading { since, .. } = self.phase
            && now.saturating_duration_since(since) >= timeout
        {
            tracing::warn!(page = %P::KEY, ?timeout, "load timed out");
            self.generation += 1;
            self.phase = Phase::Ready;
            self.notice = Some(Notice::error(format!(
                "Loading {} timed out after {}s",
                P::TITLE,
                timeout.as_secs()
            )));
            expired = true;
        }
        if let Some((action, id, since)) = self.pending_action
            && now.saturating_duration_since(since) >= timeout
        {
            tracing::warn!(page = %P::KEY, ?action, id, ?timeout, "row action timed out");
            self.pending_action = None;
            self.notice = Some(Notice::error(format!(
                "{} timed out after {}s; reload to see the current state",
                action.label(),
                timeout.as_secs()
            )));
            expired = true;
        }
        expired
    }

    /// Forget everything loaded (sign-out). Results still in flight become stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.phase = Phase::Ready;
        self.pending_action = None;
        self.notice = None;
        self.filter_text.clear();
        self.set_rows(Vec::new());
    }

    /// Replace the working set (keeps the filter, returns to the first page)
    pub fn set_rows(&mut self, rows: Vec<P::Row>) {
        self.working_set = rows;
        self.recompute();
        self.page_index = 0;
        self.cursor = 0;
    }

    // -----------------------------------------------------------------------
    // Filter and paging
    // -----------------------------------------------------------------------

    pub fn set_filter(&mut self, text: &str) {
        self.filter_text = text.trim().to_lowercase();
        self.recompute();
        self.page_index = 0;
        self.cursor = 0;
    }

    fn recompute(&mut self) {
        let needle = self.filter_text.as_str();
        self.filtered = self
            .working_set
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                needle.is_empty()
                    || P::search_fields(row)
                        .iter()
                        .any(|field| field.to_lowercase().contains(needle))
            })
            .map(|(i, _)| i)
            .collect();
    }

    /// Previous page; no-op on the first page
    pub fn goto_prev(&mut self) -> bool {
        if self.page_index == 0 {
            return false;
        }
        self.page_index -= 1;
        self.cursor = 0;
        true
    }

    /// Next page; no-op on the last page
    pub fn goto_next(&mut self) -> bool {
        if self.page_index + 1 >= self.total_pages() {
            return false;
        }
        self.page_index += 1;
        self.cursor = 0;
        true
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self) {
        let len = self.page_window().len();
        if self.cursor + 1 < len {
            self.cursor += 1;
        }
    }

    fn clamp(&mut self) {
        self.page_index = self.page_index.min(self.total_pages() - 1);
        let len = self.page_window().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    // -----------------------------------------------------------------------
    // Row actions
    // -----------------------------------------------------------------------

    /// Mark an action as dispatched. Only one may be in flight.
    pub fn begin_action(
        &mut self,
        action: RowAction,
        id: RecordId,
        now: Instant,
    ) -> Result<(), ActionBusy> {
        if let Some((pending, _, _)) = self.pending_action {
            return Err(ActionBusy(pending.label()));
        }
        self.pending_action = Some((action, id, now));
        Ok(())
    }

    /// Apply a write-through result. On failure the working set is untouched.
    pub fn finish_action(
        &mut self,
        action: RowAction,
        id: RecordId,
        result: Result<RowOutcome<P::Row>, StoreError>,
    ) -> bool {
        if self.pending_action() != Some((action, id)) {
            tracing::debug!(page = %P::KEY, ?action, id, "discarding stale action result");
            return false;
        }
        self.pending_action = None;
        match result {
            Ok(outcome) => {
                let name = self.find(id).map(P::describe).unwrap_or_default();
                match outcome {
                    RowOutcome::Remove => {
                        self.remove_record(id);
                    }
                    RowOutcome::Replace(row) => {
                        self.replace_record(row);
                    }
                    RowOutcome::Keep => {}
                }
                self.notice = Some(Notice::info(done_message(action, &name)));
                true
            }
            Err(e) => {
                tracing::warn!(page = %P::KEY, ?action, id, error = %e, "row action failed");
                self.notice = Some(Notice::error(format!("{} failed: {}", action.label(), e)));
                false
            }
        }
    }

    /// Drop the record with this id, keeping the page in range
    pub fn remove_record(&mut self, id: RecordId) -> bool {
        let Some(pos) = self.working_set.iter().position(|r| r.id() == id) else {
            return false;
        };
        self.working_set.remove(pos);
        self.recompute();
        self.clamp();
        true
    }

    /// Swap in a new version of a record, matched by id
    pub fn replace_record(&mut self, row: P::Row) -> bool {
        let id = row.id();
        let Some(slot) = self.working_set.iter_mut().find(|r| r.id() == id) else {
            return false;
        };
        *slot = row;
        self.recompute();
        self.clamp();
        true
    }

    // -----------------------------------------------------------------------
    // Labels
    // -----------------------------------------------------------------------

    pub fn page_label(&self) -> String {
        format!("Page {} of {}", self.page_index + 1, self.total_pages())
    }

    pub fn records_label(&self) -> String {
        let total = self.filtered.len();
        if total == 0 {
            return "Showing 0 to 0 of 0".to_string();
        }
        let start = self.page_index * self.page_size;
        let end = (start + self.page_size).min(total);
        format!("Showing {}\u{2013}{} of {} records", start + 1, end, total)
    }
}

/// Page-agnostic view of a controller, for rendering and key handling
pub trait TableView {
    fn key(&self) -> PageKey;
    fn title(&self) -> &'static str;
    fn columns(&self) -> &'static [Column];
    fn actions(&self) -> &'static [RowAction];
    /// Display cells of the current page window
    fn window_cells(&self) -> Vec<Vec<String>>;
    fn cursor(&self) -> usize;
    fn cursor_up(&mut self);
    fn cursor_down(&mut self);
    fn goto_prev(&mut self) -> bool;
    fn goto_next(&mut self) -> bool;
    fn filter_text(&self) -> &str;
    fn set_filter(&mut self, text: &str);
    fn is_loading(&self) -> bool;
    fn is_busy(&self) -> bool;
    fn notice(&self) -> Option<&Notice>;
    fn page_label(&self) -> String;
    fn records_label(&self) -> String;
    /// Id and display name of the selected row
    fn selected_ref(&self) -> Option<(RecordId, String)>;
}

impl<P: ListPage> TableView for ListView<P> {
    fn key(&self) -> PageKey {
        P::KEY
    }

    fn title(&self) -> &'static str {
        P::TITLE
    }

    fn columns(&self) -> &'static [Column] {
        P::columns()
    }

    fn actions(&self) -> &'static [RowAction] {
        P::actions()
    }

    fn window_cells(&self) -> Vec<Vec<String>> {
        self.page_window().into_iter().map(P::cells).collect()
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn cursor_up(&mut self) {
        ListView::cursor_up(self)
    }

    fn cursor_down(&mut self) {
        ListView::cursor_down(self)
    }

    fn goto_prev(&mut self) -> bool {
        ListView::goto_prev(self)
    }

    fn goto_next(&mut self) -> bool {
        ListView::goto_next(self)
    }

    fn filter_text(&self) -> &str {
        &self.filter_text
    }

    fn set_filter(&mut self, text: &str) {
        ListView::set_filter(self, text)
    }

    fn is_loading(&self) -> bool {
        ListView::is_loading(self)
    }

    fn is_busy(&self) -> bool {
        self.pending_action.is_some()
    }

    fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    fn page_label(&self) -> String {
        ListView::page_label(self)
    }

    fn records_label(&self) -> String {
        ListView::records_label(self)
    }

    fn selected_ref(&self) -> Option<(RecordId, String)> {
        self.selected().map(|row| (row.id(), P::describe(row)))
    }
}

fn done_message(action: RowAction, name: &str) -> String {
    match action {
        RowAction::Request => format!("Request submitted for {}", name),
        RowAction::Issue => format!("{} has been issued", name),
        RowAction::Reject => format!("Request for {} rejected", name),
        RowAction::Edit => format!("{} updated", name),
        RowAction::Delete => format!("{} deleted", name),
    }
}
