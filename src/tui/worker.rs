//! Background work for the UI thread.
//!
//! Every store call runs on a short-lived thread and reports back with exactly
//! one [`Message`]. Only the event loop consumes messages, so only the UI
//! thread mutates application state.

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use crate::model::{Drawing, Record, RecordId, UserAccount};
use crate::ops::auth::{self, AuthOutcome};
use crate::ops::list_view::{ActionContext, ListPage, RowAction, RowOutcome};
use crate::ops::user_admin::{self, SaveError, UserForm};
use crate::store::{Store, StoreError, UserRepo};

/// A result from one list controller's worker
#[derive(Debug)]
pub enum ListEvent<R> {
    Loaded {
        generation: u64,
        result: Result<Vec<R>, StoreError>,
    },
    ActionDone {
        action: RowAction,
        id: RecordId,
        result: Result<RowOutcome<R>, StoreError>,
    },
}

#[derive(Debug)]
pub enum Message {
    Auth {
        generation: u64,
        username: String,
        outcome: AuthOutcome,
    },
    Requests(ListEvent<Drawing>),
    Issuance(ListEvent<Drawing>),
    Users(ListEvent<UserAccount>),
    UserSaved {
        generation: u64,
        result: Result<RecordId, SaveError>,
    },
}

/// Routes a page's worker results into a [`Message`]
pub trait Routed: ListPage + Sized {
    fn wrap(event: ListEvent<Self::Row>) -> Message;
}

pub fn spawn_auth(
    users: Arc<dyn UserRepo>,
    tx: Sender<Message>,
    generation: u64,
    username: String,
    password: String,
) {
    thread::spawn(move || {
        let outcome = auth::authenticate(users.as_ref(), &username, &password);
        let _ = tx.send(Message::Auth {
            generation,
            username: username.trim().to_string(),
            outcome,
        });
    });
}

pub fn spawn_load<P: Routed>(store: Store, tx: Sender<Message>, generation: u64) {
    thread::spawn(move || {
        let result = P::load(&store);
        let _ = tx.send(P::wrap(ListEvent::Loaded { generation, result }));
    });
}

pub fn spawn_action<P: Routed>(
    store: Store,
    tx: Sender<Message>,
    ctx: ActionContext,
    action: RowAction,
    row: P::Row,
) {
    thread::spawn(move || {
        let id = row.id();
        let result = P::perform(&store, &ctx, action, &row);
        let _ = tx.send(P::wrap(ListEvent::ActionDone { action, id, result }));
    });
}

pub fn spawn_save_user(
    users: Arc<dyn UserRepo>,
    tx: Sender<Message>,
    generation: u64,
    form: UserForm,
    iterations: u32,
) {
    thread::spawn(move || {
        let result = user_admin::save_user(users.as_ref(), &form, iterations);
        let _ = tx.send(Message::UserSaved { generation, result });
    });
}
