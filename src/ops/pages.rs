//! Concrete table pages: each is a [`ListPage`] configuration of the list
//! view controller.

use crate::model::{Drawing, DrawingStatus, PageKey, UserAccount};
use crate::ops::list_view::{ActionContext, Column, ListPage, RowAction, RowOutcome};
use crate::ops::user_admin;
use crate::store::{Store, StoreError};

const DRAWING_COLUMNS: &[Column] = &[
    Column {
        title: "Drawing No",
        width: 16,
    },
    Column {
        title: "Revision",
        width: 9,
    },
    Column {
        title: "Status",
        width: 11,
    },
    Column {
        title: "Requested By",
        width: 30,
    },
];

fn drawing_cells(d: &Drawing) -> Vec<String> {
    vec![
        d.number.clone(),
        d.revision.clone(),
        d.status.as_str().to_uppercase(),
        d.requester_label(),
    ]
}

/// Fields the drawing pages and `dms drawing list --search` match against
pub(crate) fn drawing_search_fields(d: &Drawing) -> Vec<String> {
    vec![
        d.number.clone(),
        d.revision.clone(),
        d.status.as_str().to_string(),
        d.requester_label(),
    ]
}

/// Approved drawings that users may request
pub struct RequestsPage;

impl ListPage for RequestsPage {
    type Row = Drawing;
    const KEY: PageKey = PageKey::DrawingRequests;
    const TITLE: &'static str = "Drawing Requests";

    fn columns() -> &'static [Column] {
        DRAWING_COLUMNS
    }

    fn cells(row: &Drawing) -> Vec<String> {
        drawing_cells(row)
    }

    fn search_fields(row: &Drawing) -> Vec<String> {
        drawing_search_fields(row)
    }

    fn actions() -> &'static [RowAction] {
        &[RowAction::Request]
    }

    fn describe(row: &Drawing) -> String {
        row.number.clone()
    }

    /// Approved drawings, plus outstanding requests so a requester can see theirs
    fn load(store: &Store) -> Result<Vec<Drawing>, StoreError> {
        store
            .drawings
            .list_by_status(&[DrawingStatus::Approved, DrawingStatus::Requested])
    }

    fn perform(
        store: &Store,
        ctx: &ActionContext,
        action: RowAction,
        row: &Drawing,
    ) -> Result<RowOutcome<Drawing>, StoreError> {
        match action {
            RowAction::Request => {
                if row.status == DrawingStatus::Requested {
                    return Err(StoreError::Conflict(format!(
                        "{} is already requested by {}",
                        row.number,
                        row.requested_by.as_deref().unwrap_or("someone")
                    )));
                }
                let updated = store.drawings.request(row.id, &ctx.username, ctx.now)?;
                tracing::info!(drawing = %row.number, user = %ctx.username, "drawing requested");
                Ok(RowOutcome::Replace(updated))
            }
            _ => Ok(RowOutcome::Keep),
        }
    }
}

/// Outstanding requests awaiting issue or rejection
pub struct IssuancePage;

impl ListPage for IssuancePage {
    type Row = Drawing;
    const KEY: PageKey = PageKey::DrawingIssuance;
    const TITLE: &'static str = "Drawing Issuance";

    fn columns() -> &'static [Column] {
        DRAWING_COLUMNS
    }

    fn cells(row: &Drawing) -> Vec<String> {
        drawing_cells(row)
    }

    fn search_fields(row: &Drawing) -> Vec<String> {
        drawing_search_fields(row)
    }

    fn actions() -> &'static [RowAction] {
        &[RowAction::Issue, RowAction::Reject]
    }

    fn describe(row: &Drawing) -> String {
        row.number.clone()
    }

    fn load(store: &Store) -> Result<Vec<Drawing>, StoreError> {
        store.drawings.list_by_status(&[DrawingStatus::Requested])
    }

    fn perform(
        store: &Store,
        ctx: &ActionContext,
        action: RowAction,
        row: &Drawing,
    ) -> Result<RowOutcome<Drawing>, StoreError> {
        let to = match action {
            RowAction::Issue => DrawingStatus::Issued,
            RowAction::Reject => DrawingStatus::Approved,
            _ => return Ok(RowOutcome::Keep),
        };
        store
            .drawings
            .transition(row.id, DrawingStatus::Requested, to)?;
        tracing::info!(drawing = %row.number, by = %ctx.username, status = %to, "request resolved");
        Ok(RowOutcome::Remove)
    }
}

/// Account administration
pub struct UsersPage;

impl ListPage for UsersPage {
    type Row = UserAccount;
    const KEY: PageKey = PageKey::UserManagement;
    const TITLE: &'static str = "User Management";

    fn columns() -> &'static [Column] {
        &[
            Column {
                title: "ID",
                width: 6,
            },
            Column {
                title: "Username",
                width: 18,
            },
            Column {
                title: "Department",
                width: 18,
            },
            Column {
                title: "Permissions",
                width: 30,
            },
        ]
    }

    fn cells(row: &UserAccount) -> Vec<String> {
        vec![
            row.id.to_string(),
            row.username.clone(),
            row.department.clone(),
            row.permissions.abbreviations(),
        ]
    }

    fn search_fields(row: &UserAccount) -> Vec<String> {
        vec![
            row.id.to_string(),
            row.username.clone(),
            row.department.clone(),
        ]
    }

    fn actions() -> &'static [RowAction] {
        &[RowAction::Edit, RowAction::Delete]
    }

    fn describe(row: &UserAccount) -> String {
        row.username.clone()
    }

    fn load(store: &Store) -> Result<Vec<UserAccount>, StoreError> {
        store.users.list()
    }

    fn perform(
        store: &Store,
        ctx: &ActionContext,
        action: RowAction,
        row: &UserAccount,
    ) -> Result<RowOutcome<UserAccount>, StoreError> {
        match action {
            RowAction::Delete => {
                user_admin::delete_user(store, &ctx.username, row)?;
                Ok(RowOutcome::Remove)
            }
            _ => Ok(RowOutcome::Keep),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::PermissionSet;
    use crate::store::MemoryStore;

    fn ctx(user: &str) -> ActionContext {
        ActionContext {
            username: user.into(),
            now: NaiveDate::from_ymd_opt(2026, 3, 5)
                .and_then(|d| d.and_hms_opt(14, 20, 0))
                .unwrap(),
        }
    }

    fn demo() -> Store {
        Store::memory(Arc::new(MemoryStore::demo()))
    }

    #[test]
    fn requests_page_loads_approved_and_requested() {
        let store = demo();
        let rows = RequestsPage::load(&store).unwrap();
        assert_eq!(rows.len(), 15);
        let issuance = IssuancePage::load(&store).unwrap();
        assert_eq!(issuance.len(), 4);
        assert!(issuance.iter().all(|d| d.status == DrawingStatus::Requested));
    }

    #[test]
    fn request_replaces_row_with_requester() {
        let store = demo();
        let row = store.drawings.get(2).unwrap();
        let outcome =
            RequestsPage::perform(&store, &ctx("alice"), RowAction::Request, &row).unwrap();
        let RowOutcome::Replace(updated) = outcome else {
            panic!("expected a replacement row");
        };
        assert_eq!(updated.status, DrawingStatus::Requested);
        assert_eq!(
            RequestsPage::cells(&updated),
            vec![
                "MDI-DRW-105".to_string(),
                "1.2".into(),
                "REQUESTED".into(),
                "alice at 05-03-2026 14:20".into()
            ]
        );
        assert_eq!(store.drawings.count_requested_by("alice").unwrap(), 1);
    }

    #[test]
    fn requesting_a_requested_drawing_conflicts() {
        let store = demo();
        let row = store.drawings.get(1).unwrap();
        let err = RequestsPage::perform(&store, &ctx("alice"), RowAction::Request, &row)
            .unwrap_err();
        assert!(err.to_string().contains("already requested by jdoe"));
    }

    #[test]
    fn issue_removes_row_and_updates_store() {
        let store = demo();
        let row = store.drawings.get(3).unwrap();
        let outcome = IssuancePage::perform(&store, &ctx("clerk"), RowAction::Issue, &row).unwrap();
        assert_eq!(outcome, RowOutcome::Remove);
        assert_eq!(store.drawings.get(3).unwrap().status, DrawingStatus::Issued);
    }

    #[test]
    fn reject_returns_drawing_to_approved() {
        let store = demo();
        let row = store.drawings.get(5).unwrap();
        IssuancePage::perform(&store, &ctx("clerk"), RowAction::Reject, &row).unwrap();
        let d = store.drawings.get(5).unwrap();
        assert_eq!(d.status, DrawingStatus::Approved);
        assert_eq!(d.requested_by, None);
    }

    #[test]
    fn issuing_twice_conflicts() {
        let store = demo();
        let row = store.drawings.get(7).unwrap();
        IssuancePage::perform(&store, &ctx("clerk"), RowAction::Issue, &row).unwrap();
        let err = IssuancePage::perform(&store, &ctx("clerk"), RowAction::Issue, &row);
        assert!(matches!(err, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn users_page_cells_abbreviate_permissions() {
        let account = UserAccount {
            id: 7,
            username: "alice".into(),
            department: "Drafting".into(),
            permissions: [1, 4].into_iter().collect::<PermissionSet>(),
        };
        assert_eq!(
            UsersPage::cells(&account),
            vec![
                "7".to_string(),
                "alice".into(),
                "Drafting".into(),
                "Req, Rpt".into()
            ]
        );
        assert!(!UsersPage::search_fields(&account).contains(&"Req, Rpt".to_string()));
    }
}
