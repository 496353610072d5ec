use crate::model::{NewUser, PermissionSet, RecordId, UserAccount, UserUpdate};
use crate::ops::auth::hash_password;
use crate::store::{Store, StoreError, UserRepo};

/// Contents of the add/edit user dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserForm {
    /// `None` when adding a new user
    pub id: Option<RecordId>,
    pub username: String,
    pub password: String,
    pub department: String,
    pub permissions: PermissionSet,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Username is required")]
    MissingUsername,
    #[error("Password is required for new users")]
    MissingPassword,
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Username '{0}' already exists")]
    Duplicate(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl UserForm {
    pub fn for_new() -> Self {
        UserForm::default()
    }

    /// Prefilled from an account. The password stays blank; leaving it blank
    /// keeps the current one.
    pub fn for_edit(account: &UserAccount) -> Self {
        UserForm {
            id: Some(account.id),
            username: account.username.clone(),
            password: String::new(),
            department: account.department.clone(),
            permissions: account.permissions.clone(),
        }
    }

    pub fn is_edit(&self) -> bool {
        self.id.is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::MissingUsername);
        }
        if !self.is_edit() && self.password.trim().is_empty() {
            return Err(ValidationError::MissingPassword);
        }
        Ok(())
    }
}

/// Create or update the account described by `form`. Returns the user id.
pub fn save_user(
    users: &dyn UserRepo,
    form: &UserForm,
    iterations: u32,
) -> Result<RecordId, SaveError> {
    form.validate()?;
    let username = form.username.trim().to_string();
    let department = form.department.trim().to_string();
    if users.exists(&username, form.id)? {
        return Err(SaveError::Duplicate(username));
    }
    let password_hash = if form.password.trim().is_empty() {
        None
    } else {
        Some(hash_password(&form.password, iterations))
    };

    let result = match form.id {
        Some(id) => users
            .update(&UserUpdate {
                id,
                username: username.clone(),
                password_hash,
                department,
                permissions: form.permissions.clone(),
            })
            .map(|()| id),
        None => users.create(&NewUser {
            username: username.clone(),
            password_hash: password_hash.unwrap_or_default(),
            department,
            permissions: form.permissions.clone(),
        }),
    };
    match result {
        Ok(id) => {
            tracing::info!(user = %username, id, created = form.id.is_none(), "user saved");
            Ok(id)
        }
        // Lost a race with another writer between the check and the write
        Err(StoreError::Duplicate(_)) => Err(SaveError::Duplicate(username)),
        Err(e) => Err(e.into()),
    }
}

/// Delete a user account. Refuses to delete the acting user, or anyone with
/// outstanding drawing requests.
pub fn delete_user(store: &Store, acting_user: &str, account: &UserAccount) -> Result<(), StoreError> {
    if account.username == acting_user {
        return Err(StoreError::Conflict(
            "you cannot delete your own account".into(),
        ));
    }
    let outstanding = store.drawings.count_requested_by(&account.username)?;
    if outstanding > 0 {
        return Err(StoreError::Conflict(format!(
            "{} has {} outstanding drawing request{}",
            account.username,
            outstanding,
            if outstanding == 1 { "" } else { "s" }
        )));
    }
    store.users.delete(account.id)?;
    tracing::info!(user = %account.username, by = acting_user, "user deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ops::auth::authenticate;
    use crate::store::MemoryStore;

    const FAST: u32 = 1_000;

    fn form(username: &str, password: &str) -> UserForm {
        UserForm {
            username: username.into(),
            password: password.into(),
            department: " Drafting ".into(),
            permissions: [1, 2].into_iter().collect(),
            ..UserForm::default()
        }
    }

    #[test]
    fn new_user_needs_username_and_password() {
        assert_eq!(form("  ", "pw").validate(), Err(ValidationError::MissingUsername));
        assert_eq!(form("bob", " ").validate(), Err(ValidationError::MissingPassword));
        assert_eq!(form("bob", "pw").validate(), Ok(()));
    }

    #[test]
    fn edit_allows_blank_password() {
        let mut f = form("bob", "");
        f.id = Some(3);
        assert_eq!(f.validate(), Ok(()));
    }

    #[test]
    fn create_then_sign_in() {
        let store = MemoryStore::new();
        let id = save_user(&store, &form(" bob ", "pw"), FAST).unwrap();
        let users = store.list().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, id);
        assert_eq!(users[0].username, "bob");
        assert_eq!(users[0].department, "Drafting");
        assert!(authenticate(&store, "bob", "pw").ok);
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let store = MemoryStore::new();
        save_user(&store, &form("bob", "pw"), FAST).unwrap();
        let err = save_user(&store, &form("bob", "other"), FAST).unwrap_err();
        assert!(matches!(err, SaveError::Duplicate(ref name) if name == "bob"));
        assert_eq!(err.to_string(), "Username 'bob' already exists");
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn blank_password_on_edit_keeps_the_hash() {
        let store = MemoryStore::new();
        let id = save_user(&store, &form("bob", "pw"), FAST).unwrap();
        let account = store.list().unwrap().remove(0);
        let mut edit = UserForm::for_edit(&account);
        edit.department = "Issuing".into();
        edit.permissions = [5].into_iter().collect();
        assert_eq!(save_user(&store, &edit, FAST).unwrap(), id);

        let outcome = authenticate(&store, "bob", "pw");
        assert!(outcome.ok);
        assert_eq!(outcome.permissions.iter().collect::<Vec<_>>(), vec![5]);
        assert_eq!(store.list().unwrap()[0].department, "Issuing");
    }

    #[test]
    fn new_password_on_edit_replaces_the_hash() {
        let store = MemoryStore::new();
        save_user(&store, &form("bob", "pw"), FAST).unwrap();
        let mut edit = UserForm::for_edit(&store.list().unwrap()[0]);
        edit.password = "changed".into();
        save_user(&store, &edit, FAST).unwrap();
        assert!(!authenticate(&store, "bob", "pw").ok);
        assert!(authenticate(&store, "bob", "changed").ok);
    }

    #[test]
    fn rename_onto_existing_user_is_rejected() {
        let store = MemoryStore::new();
        save_user(&store, &form("alice", "pw"), FAST).unwrap();
        save_user(&store, &form("bob", "pw"), FAST).unwrap();
        let bob = store.list().unwrap().remove(1);
        let mut edit = UserForm::for_edit(&bob);
        edit.username = "alice".into();
        assert!(matches!(
            save_user(&store, &edit, FAST),
            Err(SaveError::Duplicate(_))
        ));
    }

    #[test]
    fn cannot_delete_self() {
        let mem = Arc::new(MemoryStore::new());
        mem.add_user("admin", "h", PermissionSet::all()).unwrap();
        let store = Store::memory(mem.clone());
        let admin = mem.list().unwrap().remove(0);
        let err = delete_user(&store, "admin", &admin).unwrap_err();
        assert!(err.to_string().contains("your own account"));
        assert_eq!(mem.list().unwrap().len(), 1);
    }

    #[test]
    fn cannot_delete_user_with_outstanding_requests() {
        let mem = Arc::new(MemoryStore::demo());
        mem.add_user("jdoe", "h", PermissionSet::new()).unwrap();
        mem.add_user("nobody", "h", PermissionSet::new()).unwrap();
        let store = Store::memory(mem.clone());
        let users = mem.list().unwrap();

        let err = delete_user(&store, "admin", &users[0]).unwrap_err();
        assert_eq!(err.to_string(), "jdoe has 2 outstanding drawing requests");

        delete_user(&store, "admin", &users[1]).unwrap();
        assert_eq!(mem.list().unwrap().len(), 1);
    }
}
