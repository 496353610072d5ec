use serde::Serialize;

use super::{PermissionSet, Record, RecordId};

/// A user account as shown in the user management table (no password hash)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserAccount {
    pub id: RecordId,
    pub username: String,
    pub department: String,
    pub permissions: PermissionSet,
}

impl Record for UserAccount {
    fn id(&self) -> RecordId {
        self.id
    }
}

/// What the authenticator needs from the users table
#[derive(Debug, Clone)]
pub struct Credentials {
    pub id: RecordId,
    pub username: String,
    pub password_hash: String,
    pub permissions: PermissionSet,
}

/// Fields for inserting a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub department: String,
    pub permissions: PermissionSet,
}

/// Full overwrite of a user row. `password_hash: None` keeps the current hash.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub id: RecordId,
    pub username: String,
    pub password_hash: Option<String>,
    pub department: String,
    pub permissions: PermissionSet,
}
