use crate::model::{PAGE_TABLE, PageKey, PermissionSet};

/// The signed-in user and what they may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub permissions: PermissionSet,
}

/// Why a navigation was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("you don't have permission to access {0}")]
pub struct AccessDenied(pub PageKey);

impl Session {
    pub fn new(username: impl Into<String>, permissions: PermissionSet) -> Self {
        Session {
            username: username.into(),
            permissions,
        }
    }

    /// Pages whose code is in the permission set, in table order
    pub fn allowed_pages(&self) -> Vec<PageKey> {
        PAGE_TABLE
            .iter()
            .filter(|(code, _)| self.permissions.contains(*code))
            .map(|(_, key)| *key)
            .collect()
    }

    pub fn can_access(&self, page: PageKey) -> bool {
        self.permissions.contains(page.code())
    }

    /// Where to land after sign-in. `None` is the "no access" state.
    pub fn landing_page(&self) -> Option<PageKey> {
        self.allowed_pages().into_iter().next()
    }

    /// Gate a navigation request
    pub fn check(&self, page: PageKey) -> Result<(), AccessDenied> {
        if self.can_access(page) {
            Ok(())
        } else {
            Err(AccessDenied(page))
        }
    }
}
