use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params, params_from_iter};

use super::{DrawingRepo, StoreError, UserRepo};
use crate::model::{
    Credentials, Drawing, DrawingStatus, NewDrawing, NewUser, PermissionSet, RecordId,
    UserAccount, UserUpdate,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    department    TEXT NOT NULL DEFAULT '',
    permissions   TEXT NOT NULL DEFAULT '[]'
);
CREATE TABLE IF NOT EXISTS drawings (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    drawing_no   TEXT NOT NULL UNIQUE,
    title        TEXT NOT NULL DEFAULT '',
    revision     TEXT NOT NULL DEFAULT '',
    approved_on  TEXT,
    status       TEXT NOT NULL DEFAULT 'Approved',
    requested_by TEXT,
    requested_at TEXT
);
CREATE INDEX IF NOT EXISTS drawings_status ON drawings (status);
";

const DRAWING_COLUMNS: &str =
    "id, drawing_no, title, revision, approved_on, status, requested_by, requested_at";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite-backed records store.
///
/// Holds one long-lived connection; each repository call locks it for the
/// duration of a single statement (or check-and-write pair).
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteStore {
    /// Open the database file, creating the tables if they are missing
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Connection {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::bootstrap(conn, path.to_path_buf())
    }

    /// A private in-memory database (tests)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Connection {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        Self::bootstrap(conn, PathBuf::from(":memory:"))
    }

    fn bootstrap(conn: Connection, path: PathBuf) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = %path.display(), "database ready");
        Ok(SqliteStore {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("database handle poisoned".into()))
    }

    fn get_with(conn: &Connection, id: RecordId) -> Result<Drawing, StoreError> {
        let sql = format!("SELECT {} FROM drawings WHERE id = ?1", DRAWING_COLUMNS);
        conn.query_row(&sql, params![id], drawing_from_row)
            .optional()?
            .ok_or(StoreError::NotFound(id))
    }
}

fn drawing_from_row(row: &Row<'_>) -> rusqlite::Result<Drawing> {
    let status_text: String = row.get(5)?;
    let status = status_text
        .parse::<DrawingStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    let approved_on: Option<String> = row.get(4)?;
    let requested_at: Option<String> = row.get(7)?;
    Ok(Drawing {
        id: row.get(0)?,
        number: row.get(1)?,
        title: row.get(2)?,
        revision: row.get(3)?,
        approved_on: approved_on.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()),
        status,
        requested_by: row.get(6)?,
        requested_at: requested_at
            .and_then(|s| NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).ok()),
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserAccount> {
    let permissions: Option<String> = row.get(3)?;
    Ok(UserAccount {
        id: row.get(0)?,
        username: row.get(1)?,
        department: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        permissions: permissions
            .as_deref()
            .map(PermissionSet::from_stored)
            .unwrap_or_default(),
    })
}

/// Map a UNIQUE violation to `Duplicate`, everything else to `Query`
fn map_constraint(err: rusqlite::Error, what: &str) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::Duplicate(what.to_string())
        }
        _ => StoreError::Query(err),
    }
}

/// After a conditional update touched no rows: missing, or in the wrong state
fn explain_no_change(
    conn: &Connection,
    id: RecordId,
    expected: DrawingStatus,
) -> StoreError {
    match SqliteStore::get_with(conn, id) {
        Ok(d) => StoreError::Conflict(format!(
            "drawing {} is {}, not {}",
            d.number, d.status, expected
        )),
        Err(e) => e,
    }
}

impl DrawingRepo for SqliteStore {
    fn list_by_status(&self, statuses: &[DrawingStatus]) -> Result<Vec<Drawing>, StoreError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM drawings WHERE status IN ({}) ORDER BY id",
            DRAWING_COLUMNS, placeholders
        );
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(statuses.iter().map(|s| s.as_str())), drawing_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn list_all(&self) -> Result<Vec<Drawing>, StoreError> {
        let sql = format!("SELECT {} FROM drawings ORDER BY id", DRAWING_COLUMNS);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], drawing_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn get(&self, id: RecordId) -> Result<Drawing, StoreError> {
        let conn = self.conn()?;
        Self::get_with(&conn, id)
    }

    fn request(
        &self,
        id: RecordId,
        username: &str,
        at: NaiveDateTime,
    ) -> Result<Drawing, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE drawings SET status = ?1, requested_by = ?2, requested_at = ?3
             WHERE id = ?4 AND status = ?5",
            params![
                DrawingStatus::Requested.as_str(),
                username,
                at.format(TIMESTAMP_FORMAT).to_string(),
                id,
                DrawingStatus::Approved.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(explain_no_change(&conn, id, DrawingStatus::Approved));
        }
        Self::get_with(&conn, id)
    }

    fn transition(
        &self,
        id: RecordId,
        from: DrawingStatus,
        to: DrawingStatus,
    ) -> Result<Drawing, StoreError> {
        let conn = self.conn()?;
        let changed = if to == DrawingStatus::Approved {
            conn.execute(
                "UPDATE drawings SET status = ?1, requested_by = NULL, requested_at = NULL
                 WHERE id = ?2 AND status = ?3",
                params![to.as_str(), id, from.as_str()],
            )?
        } else {
            conn.execute(
                "UPDATE drawings SET status = ?1 WHERE id = ?2 AND status = ?3",
                params![to.as_str(), id, from.as_str()],
            )?
        };
        if changed == 0 {
            return Err(explain_no_change(&conn, id, from));
        }
        Self::get_with(&conn, id)
    }

    fn insert(&self, new: &NewDrawing) -> Result<Drawing, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO drawings (drawing_no, title, revision, approved_on, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                new.number,
                new.title,
                new.revision,
                new.approved_on.map(|d| d.format(DATE_FORMAT).to_string()),
                DrawingStatus::Approved.as_str(),
            ],
        )
        .map_err(|e| map_constraint(e, &format!("drawing {}", new.number)))?;
        let id = conn.last_insert_rowid();
        Self::get_with(&conn, id)
    }

    fn count_requested_by(&self, username: &str) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM drawings WHERE requested_by = ?1 AND status = ?2",
            params![username, DrawingStatus::Requested.as_str()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }
}

impl UserRepo for SqliteStore {
    fn list(&self) -> Result<Vec<UserAccount>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, username, department, permissions FROM users ORDER BY id")?;
        let rows = stmt.query_map([], user_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn find_credentials(&self, username: &str) -> Result<Option<Credentials>, StoreError> {
        let conn = self.conn()?;
        let creds = conn
            .query_row(
                "SELECT id, username, password_hash, permissions FROM users WHERE username = ?1",
                params![username],
                |row| {
                    let permissions: Option<String> = row.get(3)?;
                    Ok(Credentials {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password_hash: row.get(2)?,
                        permissions: permissions
                            .as_deref()
                            .map(PermissionSet::from_stored)
                            .unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(creds)
    }

    fn exists(&self, username: &str, except: Option<RecordId>) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let found: Option<RecordId> = conn
            .query_row(
                "SELECT id FROM users WHERE username = ?1 AND id != ?2",
                params![username, except.unwrap_or(-1)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn create(&self, new: &NewUser) -> Result<RecordId, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (username, password_hash, department, permissions)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                new.username,
                new.password_hash,
                new.department,
                new.permissions.to_stored(),
            ],
        )
        .map_err(|e| map_constraint(e, &format!("username '{}'", new.username)))?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, update: &UserUpdate) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = match &update.password_hash {
            Some(hash) => conn.execute(
                "UPDATE users SET username = ?1, password_hash = ?2, department = ?3,
                 permissions = ?4 WHERE id = ?5",
                params![
                    update.username,
                    hash,
                    update.department,
                    update.permissions.to_stored(),
                    update.id,
                ],
            ),
            None => conn.execute(
                "UPDATE users SET username = ?1, department = ?2, permissions = ?3
                 WHERE id = ?4",
                params![
                    update.username,
                    update.department,
                    update.permissions.to_stored(),
                    update.id,
                ],
            ),
        }
        .map_err(|e| map_constraint(e, &format!("username '{}'", update.username)))?;
        if changed == 0 {
            return Err(StoreError::NotFound(update.id));
        }
        Ok(())
    }

    fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn add_drawing(store: &SqliteStore, number: &str) -> Drawing {
        store
            .insert(&NewDrawing {
                number: number.into(),
                title: format!("{} title", number),
                revision: "A".into(),
                approved_on: NaiveDate::from_ymd_opt(2026, 1, 15),
            })
            .unwrap()
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.into(),
            password_hash: "hash".into(),
            department: "Design".into(),
            permissions: [1, 2].into_iter().collect(),
        }
    }

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 5)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap()
    }

    #[test]
    fn open_creates_schema_in_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dms.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            add_drawing(&store, "D-1");
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.list_all().unwrap().len(), 1);
        assert_eq!(reopened.path(), path.as_path());
    }

    #[test]
    fn insert_and_get_round_trip_dates() {
        let store = store();
        let d = add_drawing(&store, "D-1");
        let loaded = store.get(d.id).unwrap();
        assert_eq!(loaded.number, "D-1");
        assert_eq!(loaded.status, DrawingStatus::Approved);
        assert_eq!(loaded.approved_on, NaiveDate::from_ymd_opt(2026, 1, 15));
    }

    #[test]
    fn duplicate_drawing_number_is_rejected() {
        let store = store();
        add_drawing(&store, "D-1");
        let err = store
            .insert(&NewDrawing {
                number: "D-1".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn list_by_status_filters_and_orders() {
        let store = store();
        let a = add_drawing(&store, "D-1");
        let b = add_drawing(&store, "D-2");
        add_drawing(&store, "D-3");
        store.request(b.id, "alice", timestamp()).unwrap();

        let approved = store.list_by_status(&[DrawingStatus::Approved]).unwrap();
        assert_eq!(
            approved.iter().map(|d| d.number.as_str()).collect::<Vec<_>>(),
            vec!["D-1", "D-3"]
        );
        let both = store
            .list_by_status(&[DrawingStatus::Approved, DrawingStatus::Requested])
            .unwrap();
        assert_eq!(both.len(), 3);
        assert_eq!(both[0].id, a.id);
        assert!(store.list_by_status(&[]).unwrap().is_empty());
    }

    #[test]
    fn request_records_requester_and_refuses_twice() {
        let store = store();
        let d = add_drawing(&store, "D-1");
        let requested = store.request(d.id, "alice", timestamp()).unwrap();
        assert_eq!(requested.status, DrawingStatus::Requested);
        assert_eq!(requested.requested_by.as_deref(), Some("alice"));
        assert_eq!(requested.requested_at, Some(timestamp()));

        let err = store.request(d.id, "bob", timestamp()).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(matches!(
            store.request(999, "bob", timestamp()),
            Err(StoreError::NotFound(999))
        ));
    }

    #[test]
    fn transition_back_to_approved_clears_requester() {
        let store = store();
        let d = add_drawing(&store, "D-1");
        store.request(d.id, "alice", timestamp()).unwrap();
        let rejected = store
            .transition(d.id, DrawingStatus::Requested, DrawingStatus::Approved)
            .unwrap();
        assert_eq!(rejected.status, DrawingStatus::Approved);
        assert!(rejected.requested_by.is_none());
        assert!(rejected.requested_at.is_none());
    }

    #[test]
    fn transition_from_wrong_state_conflicts() {
        let store = store();
        let d = add_drawing(&store, "D-1");
        let err = store
            .transition(d.id, DrawingStatus::Requested, DrawingStatus::Issued)
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.get(d.id).unwrap().status, DrawingStatus::Approved);
    }

    #[test]
    fn count_requested_by_counts_outstanding_only() {
        let store = store();
        let a = add_drawing(&store, "D-1");
        let b = add_drawing(&store, "D-2");
        store.request(a.id, "alice", timestamp()).unwrap();
        store.request(b.id, "alice", timestamp()).unwrap();
        store
            .transition(b.id, DrawingStatus::Requested, DrawingStatus::Issued)
            .unwrap();
        assert_eq!(store.count_requested_by("alice").unwrap(), 1);
        assert_eq!(store.count_requested_by("bob").unwrap(), 0);
    }

    #[test]
    fn user_crud() {
        let store = store();
        let id = store.create(&new_user("alice")).unwrap();
        let users = store.list().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].permissions.abbreviations(), "Req, Issue");

        store
            .update(&UserUpdate {
                id,
                username: "alice2".into(),
                password_hash: None,
                department: "QA".into(),
                permissions: PermissionSet::all(),
            })
            .unwrap();
        let creds = store.find_credentials("alice2").unwrap().unwrap();
        assert_eq!(creds.password_hash, "hash");
        assert_eq!(creds.permissions, PermissionSet::all());

        store.delete(id).unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(matches!(store.delete(id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn update_with_password_replaces_hash() {
        let store = store();
        let id = store.create(&new_user("alice")).unwrap();
        store
            .update(&UserUpdate {
                id,
                username: "alice".into(),
                password_hash: Some("new-hash".into()),
                department: "Design".into(),
                permissions: PermissionSet::new(),
            })
            .unwrap();
        let creds = store.find_credentials("alice").unwrap().unwrap();
        assert_eq!(creds.password_hash, "new-hash");
        assert!(creds.permissions.is_empty());
    }

    #[test]
    fn unique_username_is_enforced_by_the_table() {
        let store = store();
        store.create(&new_user("alice")).unwrap();
        let err = store.create(&new_user("alice")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn exists_ignores_the_excepted_row() {
        let store = store();
        let id = store.create(&new_user("alice")).unwrap();
        assert!(store.exists("alice", None).unwrap());
        assert!(!store.exists("alice", Some(id)).unwrap());
        assert!(!store.exists("bob", None).unwrap());
    }

    #[test]
    fn legacy_permission_text_is_tolerated() {
        let store = store();
        {
            let conn = store.conn().unwrap();
            conn.execute(
                "INSERT INTO users (username, password_hash, permissions) VALUES ('x', 'h', 'garbage')",
                [],
            )
            .unwrap();
        }
        let users = store.list().unwrap();
        assert!(users[0].permissions.is_empty());
    }
}
