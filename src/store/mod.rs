//! Records store: repository interfaces for drawings and users.
//!
//! Callers never build SQL. Every repository call is its own unit of work;
//! nothing spans two calls.

pub mod memory;
pub mod sqlite;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::model::{
    Credentials, Drawing, DrawingStatus, NewDrawing, NewUser, RecordId, UserAccount, UserUpdate,
};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Error type for records store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not open database {path}: {source}")]
    Connection {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("query failed: {0}")]
    Query(#[from] rusqlite::Error),
    #[error("{0} already exists")]
    Duplicate(String),
    #[error("{0}")]
    Conflict(String),
    #[error("record {0} not found")]
    NotFound(RecordId),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub trait DrawingRepo: Send + Sync {
    /// Drawings whose status is one of `statuses`, ordered by id
    fn list_by_status(&self, statuses: &[DrawingStatus]) -> Result<Vec<Drawing>, StoreError>;

    fn list_all(&self) -> Result<Vec<Drawing>, StoreError>;

    fn get(&self, id: RecordId) -> Result<Drawing, StoreError>;

    /// Mark an approved drawing as requested by `username`.
    /// Fails with `Conflict` when the drawing is not currently approved.
    fn request(
        &self,
        id: RecordId,
        username: &str,
        at: NaiveDateTime,
    ) -> Result<Drawing, StoreError>;

    /// Move a drawing from `from` to `to`. Fails with `Conflict` when the
    /// drawing is not in `from`. Moving back to Approved clears the requester.
    fn transition(
        &self,
        id: RecordId,
        from: DrawingStatus,
        to: DrawingStatus,
    ) -> Result<Drawing, StoreError>;

    fn insert(&self, new: &NewDrawing) -> Result<Drawing, StoreError>;

    /// Outstanding requests (status Requested) naming `username`
    fn count_requested_by(&self, username: &str) -> Result<usize, StoreError>;
}

pub trait UserRepo: Send + Sync {
    /// All users ordered by id
    fn list(&self) -> Result<Vec<UserAccount>, StoreError>;

    fn find_credentials(&self, username: &str) -> Result<Option<Credentials>, StoreError>;

    /// Whether `username` is taken by any user other than `except`
    fn exists(&self, username: &str, except: Option<RecordId>) -> Result<bool, StoreError>;

    fn create(&self, new: &NewUser) -> Result<RecordId, StoreError>;

    fn update(&self, update: &UserUpdate) -> Result<(), StoreError>;

    fn delete(&self, id: RecordId) -> Result<(), StoreError>;
}

/// Process-wide handle to the records store, cloned into worker threads.
#[derive(Clone)]
pub struct Store {
    pub drawings: Arc<dyn DrawingRepo>,
    pub users: Arc<dyn UserRepo>,
}

impl Store {
    /// Open (and bootstrap) a SQLite database file
    pub fn open_sqlite(path: &Path) -> Result<Self, StoreError> {
        let store = Arc::new(SqliteStore::open(path)?);
        Ok(Store {
            drawings: store.clone(),
            users: store,
        })
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Store {
            drawings: store.clone(),
            users: store,
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}
