use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{Record, RecordId};

/// Format used when showing who requested a drawing and when
pub const REQUEST_TIME_FORMAT: &str = "%d-%m-%Y %H:%M";

/// Lifecycle state of a drawing record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrawingStatus {
    Approved,
    Requested,
    Issued,
    Returned,
}

impl DrawingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DrawingStatus::Approved => "Approved",
            DrawingStatus::Requested => "Requested",
            DrawingStatus::Issued => "Issued",
            DrawingStatus::Returned => "Returned",
        }
    }
}

impl fmt::Display for DrawingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown drawing status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for DrawingStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" => Ok(DrawingStatus::Approved),
            "requested" => Ok(DrawingStatus::Requested),
            "issued" => Ok(DrawingStatus::Issued),
            "returned" => Ok(DrawingStatus::Returned),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// An engineering drawing record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Drawing {
    pub id: RecordId,
    /// Drawing number, e.g. "MDI-DRW-101"
    pub number: String,
    pub title: String,
    pub revision: String,
    pub approved_on: Option<NaiveDate>,
    pub status: DrawingStatus,
    /// Username of the requester, while a request is outstanding
    pub requested_by: Option<String>,
    pub requested_at: Option<NaiveDateTime>,
}

impl Drawing {
    /// "alice at 05-03-2026 14:20", or empty when nobody requested it
    pub fn requester_label(&self) -> String {
        match (&self.requested_by, self.requested_at) {
            (Some(user), Some(at)) => format!("{} at {}", user, at.format(REQUEST_TIME_FORMAT)),
            (Some(user), None) => user.clone(),
            _ => String::new(),
        }
    }
}

impl Record for Drawing {
    fn id(&self) -> RecordId {
        self.id
    }
}

/// Fields for inserting a new drawing (always starts Approved)
#[derive(Debug, Clone, Default)]
pub struct NewDrawing {
    pub number: String,
    pub title: String,
    pub revision: String,
    pub approved_on: Option<NaiveDate>,
}
