use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A page of the application. Each page is gated by one permission code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKey {
    DrawingRequests,
    DrawingIssuance,
    Return,
    Reports,
    UserManagement,
}

/// Permission code → page, in menu order.
pub const PAGE_TABLE: [(i64, PageKey); 5] = [
    (1, PageKey::DrawingRequests),
    (2, PageKey::DrawingIssuance),
    (3, PageKey::Return),
    (4, PageKey::Reports),
    (5, PageKey::UserManagement),
];

impl PageKey {
    pub fn code(self) -> i64 {
        PAGE_TABLE
            .iter()
            .find(|(_, key)| *key == self)
            .map(|(code, _)| *code)
            .unwrap_or_default()
    }

    pub fn from_code(code: i64) -> Option<Self> {
        PAGE_TABLE
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, key)| *key)
    }

    pub fn label(self) -> &'static str {
        match self {
            PageKey::DrawingRequests => "Drawing Requests",
            PageKey::DrawingIssuance => "Drawing Issuance",
            PageKey::Return => "Return",
            PageKey::Reports => "Reports",
            PageKey::UserManagement => "User Management",
        }
    }

    /// Abbreviation used in the user table's permissions column
    pub fn short_label(self) -> &'static str {
        match self {
            PageKey::DrawingRequests => "Req",
            PageKey::DrawingIssuance => "Issue",
            PageKey::Return => "Ret",
            PageKey::Reports => "Rpt",
            PageKey::UserManagement => "Users",
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The set of integer capability codes attached to a user.
///
/// Persisted as a JSON list. Codes outside the page table are kept (the store
/// owns them) but grant nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<i64>);

impl PermissionSet {
    pub fn new() -> Self {
        PermissionSet(BTreeSet::new())
    }

    /// Every code in the page table
    pub fn all() -> Self {
        PAGE_TABLE.iter().map(|(code, _)| *code).collect()
    }

    pub fn contains(&self, code: i64) -> bool {
        self.0.contains(&code)
    }

    pub fn insert(&mut self, code: i64) -> bool {
        self.0.insert(code)
    }

    pub fn remove(&mut self, code: i64) -> bool {
        self.0.remove(&code)
    }

    /// Flip a code on or off
    pub fn toggle(&mut self, code: i64) {
        if !self.0.remove(&code) {
            self.0.insert(code);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }

    /// Parse a stored permission value leniently.
    ///
    /// Accepts a native JSON list, or a string holding a serialized list.
    /// List elements may be integers or numeric strings; anything else is
    /// skipped. Any other shape yields the empty set.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => items.iter().filter_map(code_from_value).collect(),
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Array(items)) => items.iter().filter_map(code_from_value).collect(),
                _ => PermissionSet::new(),
            },
            _ => PermissionSet::new(),
        }
    }

    /// Parse the serialized column text leniently (see [`from_value`](Self::from_value))
    pub fn from_stored(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => PermissionSet::from_value(&value),
            Err(_) => PermissionSet::new(),
        }
    }

    /// Serialize for storage as a JSON list
    pub fn to_stored(&self) -> String {
        let codes: Vec<i64> = self.iter().collect();
        serde_json::to_string(&codes).unwrap_or_else(|_| "[]".to_string())
    }

    /// Abbreviated page names, e.g. "Req, Rpt"
    pub fn abbreviations(&self) -> String {
        self.iter()
            .filter_map(PageKey::from_code)
            .map(PageKey::short_label)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromIterator<i64> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        PermissionSet(iter.into_iter().collect())
    }
}

fn code_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
