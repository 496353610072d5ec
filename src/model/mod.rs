pub mod config;
pub mod drawing;
pub mod permission;
pub mod user;

pub use config::*;
pub use drawing::*;
pub use permission::*;
pub use user::*;

/// Identifier of a stored row (drawing or user)
pub type RecordId = i64;

/// A row that can live in a list view's working set.
///
/// Identity is the identifier field; a working set never holds two records
/// with the same id.
pub trait Record {
    fn id(&self) -> RecordId;
}
