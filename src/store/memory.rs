use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use super::{DrawingRepo, StoreError, UserRepo};
use crate::model::{
    Credentials, Drawing, DrawingStatus, NewDrawing, NewUser, PermissionSet, RecordId,
    UserAccount, UserUpdate,
};

#[derive(Debug, Default)]
struct Tables {
    drawings: Vec<Drawing>,
    /// (account, password hash)
    users: Vec<(UserAccount, String)>,
    next_drawing_id: RecordId,
    next_user_id: RecordId,
}

/// In-memory records store.
///
/// Backs the `--demo` fixture and the test suite. `set_offline` makes every
/// call fail as if the database were unreachable; `set_latency` delays every
/// call on the calling (worker) thread.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    offline: AtomicBool,
    latency: Mutex<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Sample drawings in every state, for the `--demo` mode
    pub fn demo() -> Self {
        let store = MemoryStore::new();
        let samples = [
            ("MDI-DRW-101", "Pump housing", "A.0"),
            ("MDI-DRW-105", "Impeller", "1.2"),
            ("ENG-2024-001", "Base frame", "0"),
            ("ENG-2024-002", "Coupling guard", "0"),
            ("ST-9982-X", "Stair stringer", "B"),
            ("ST-9983-X", "Handrail post", "B"),
            ("EL-0417", "Panel wiring", "C.1"),
            ("EL-0418", "Cable tray layout", "A"),
            ("CV-3001", "Foundation plan", "2"),
            ("CV-3002", "Drainage detail", "1"),
            ("HV-550", "Duct routing level 2", "D"),
            ("HV-551", "Duct routing level 3", "D"),
            ("PI-7710", "Piping isometric 10", "0"),
            ("PI-7711", "Piping isometric 11", "0"),
            ("PI-7712", "Piping isometric 12", "1"),
        ];
        for (number, title, revision) in samples {
            let _ = store.insert(&NewDrawing {
                number: number.into(),
                title: title.into(),
                revision: revision.into(),
                approved_on: NaiveDate::from_ymd_opt(2026, 1, 12),
            });
        }
        let requested_at = NaiveDate::from_ymd_opt(2026, 2, 3).and_then(|d| d.and_hms_opt(10, 15, 0));
        for (id, who) in [(1, "jdoe"), (3, "rbrown"), (5, "swilson"), (7, "jdoe")] {
            if let Some(at) = requested_at {
                let _ = store.request(id, who, at);
            }
        }
        store
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        if let Ok(mut guard) = self.latency.lock() {
            *guard = latency;
        }
    }

    /// Insert a user with an already-hashed password
    pub fn add_user(
        &self,
        username: &str,
        password_hash: &str,
        permissions: PermissionSet,
    ) -> Result<RecordId, StoreError> {
        self.create(&NewUser {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            department: String::new(),
            permissions,
        })
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        let latency = self.latency.lock().map(|d| *d).unwrap_or_default();
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("store poisoned".into()))
    }
}

fn find_drawing(tables: &mut Tables, id: RecordId) -> Result<&mut Drawing, StoreError> {
    tables
        .drawings
        .iter_mut()
        .find(|d| d.id == id)
        .ok_or(StoreError::NotFound(id))
}

impl DrawingRepo for MemoryStore {
    fn list_by_status(&self, statuses: &[DrawingStatus]) -> Result<Vec<Drawing>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .drawings
            .iter()
            .filter(|d| statuses.contains(&d.status))
            .cloned()
            .collect())
    }

    fn list_all(&self) -> Result<Vec<Drawing>, StoreError> {
        Ok(self.tables()?.drawings.clone())
    }

    fn get(&self, id: RecordId) -> Result<Drawing, StoreError> {
        let mut tables = self.tables()?;
        find_drawing(&mut tables, id).map(|d| d.clone())
    }

    fn request(
        &self,
        id: RecordId,
        username: &str,
        at: NaiveDateTime,
    ) -> Result<Drawing, StoreError> {
        let mut tables = self.tables()?;
        let drawing = find_drawing(&mut tables, id)?;
        if drawing.status != DrawingStatus::Approved {
            return Err(StoreError::Conflict(format!(
                "drawing {} is {}, not {}",
                drawing.number,
                drawing.status,
                DrawingStatus::Approved
            )));
        }
        drawing.status = DrawingStatus::Requested;
        drawing.requested_by = Some(username.to_string());
        drawing.requested_at = Some(at);
        Ok(drawing.clone())
    }

    fn transition(
        &self,
        id: RecordId,
        from: DrawingStatus,
        to: DrawingStatus,
    ) -> Result<Drawing, StoreError> {
        let mut tables = self.tables()?;
        let drawing = find_drawing(&mut tables, id)?;
        if drawing.status != from {
            return Err(StoreError::Conflict(format!(
                "drawing {} is {}, not {}",
                drawing.number, drawing.status, from
            )));
        }
        drawing.status = to;
        if to == DrawingStatus::Approved {
            drawing.requested_by = None;
            drawing.requested_at = None;
        }
        Ok(drawing.clone())
    }

    fn insert(&self, new: &NewDrawing) -> Result<Drawing, StoreError> {
        let mut tables = self.tables()?;
        if tables.drawings.iter().any(|d| d.number == new.number) {
            return Err(StoreError::Duplicate(format!("drawing {}", new.number)));
        }
        tables.next_drawing_id += 1;
        let drawing = Drawing {
            id: tables.next_drawing_id,
            number: new.number.clone(),
            title: new.title.clone(),
            revision: new.revision.clone(),
            approved_on: new.approved_on,
            status: DrawingStatus::Approved,
            requested_by: None,
            requested_at: None,
        };
        tables.drawings.push(drawing.clone());
        Ok(drawing)
    }

    fn count_requested_by(&self, username: &str) -> Result<usize, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .drawings
            .iter()
            .filter(|d| {
                d.status == DrawingStatus::Requested && d.requested_by.as_deref() == Some(username)
            })
            .count())
    }
}

impl UserRepo for MemoryStore {
    fn list(&self) -> Result<Vec<UserAccount>, StoreError> {
        let tables = self.tables()?;
        Ok(tables.users.iter().map(|(u, _)| u.clone()).collect())
    }

    fn find_credentials(&self, username: &str) -> Result<Option<Credentials>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .users
            .iter()
            .find(|(u, _)| u.username == username)
            .map(|(u, hash)| Credentials {
                id: u.id,
                username: u.username.clone(),
                password_hash: hash.clone(),
                permissions: u.permissions.clone(),
            }))
    }

    fn exists(&self, username: &str, except: Option<RecordId>) -> Result<bool, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .users
            .iter()
            .any(|(u, _)| u.username == username && Some(u.id) != except))
    }

    fn create(&self, new: &NewUser) -> Result<RecordId, StoreError> {
        let mut tables = self.tables()?;
        if tables.users.iter().any(|(u, _)| u.username == new.username) {
            return Err(StoreError::Duplicate(format!("username '{}'", new.username)));
        }
        tables.next_user_id += 1;
        let id = tables.next_user_id;
        tables.users.push((
            UserAccount {
                id,
                username: new.username.clone(),
                department: new.department.clone(),
                permissions: new.permissions.clone(),
            },
            new.password_hash.clone(),
        ));
        Ok(id)
    }

    fn update(&self, update: &UserUpdate) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables
            .users
            .iter()
            .any(|(u, _)| u.username == update.username && u.id != update.id)
        {
            return Err(StoreError::Duplicate(format!("username '{}'", update.username)));
        }
        let (account, hash) = tables
            .users
            .iter_mut()
            .find(|(u, _)| u.id == update.id)
            .ok_or(StoreError::NotFound(update.id))?;
        account.username = update.username.clone();
        account.department = update.department.clone();
        account.permissions = update.permissions.clone();
        if let Some(new_hash) = &update.password_hash {
            *hash = new_hash.clone();
        }
        Ok(())
    }

    fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        let before = tables.users.len();
        tables.users.retain(|(u, _)| u.id != id);
        if tables.users.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
