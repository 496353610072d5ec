use serde::Serialize;

use crate::model::{Drawing, DrawingStatus, UserAccount};
use crate::util::unicode;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct UserJson {
    pub id: i64,
    pub username: String,
    pub department: String,
    pub permissions: Vec<i64>,
}

#[derive(Serialize)]
pub struct DrawingJson {
    pub id: i64,
    pub number: String,
    pub title: String,
    pub revision: String,
    pub status: DrawingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<String>,
}

pub fn user_to_json(user: &UserAccount) -> UserJson {
    UserJson {
        id: user.id,
        username: user.username.clone(),
        department: user.department.clone(),
        permissions: user.permissions.iter().collect(),
    }
}

pub fn drawing_to_json(drawing: &Drawing) -> DrawingJson {
    DrawingJson {
        id: drawing.id,
        number: drawing.number.clone(),
        title: drawing.title.clone(),
        revision: drawing.revision.clone(),
        status: drawing.status,
        approved_on: drawing.approved_on.map(|d| d.to_string()),
        requested_by: drawing.requested_by.clone(),
        requested_at: drawing
            .requested_at
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string()),
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// Left-aligned columns separated by two spaces; the last column is not padded
fn format_row(cells: &[&str], widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        match widths.get(i) {
            Some(w) if i + 1 < cells.len() => {
                line.push_str(&unicode::fit_to_width(cell, *w));
                line.push_str("  ");
            }
            _ => line.push_str(cell),
        }
    }
    line.trim_end().to_string()
}

fn column_widths(header: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|r| unicode::display_width(&r[i]))
                .chain(std::iter::once(unicode::display_width(h)))
                .max()
                .unwrap_or(0)
        })
        .collect()
}

fn format_table(header: &[&str], rows: Vec<Vec<String>>) -> Vec<String> {
    let widths = column_widths(header, &rows);
    let mut lines = vec![format_row(header, &widths)];
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        lines.push(format_row(&cells, &widths));
    }
    lines
}

pub fn format_user_table(users: &[UserAccount]) -> Vec<String> {
    let rows = users
        .iter()
        .map(|u| {
            vec![
                u.id.to_string(),
                u.username.clone(),
                u.department.clone(),
                u.permissions.abbreviations(),
            ]
        })
        .collect();
    format_table(&["ID", "USERNAME", "DEPARTMENT", "PERMISSIONS"], rows)
}

pub fn format_drawing_table(drawings: &[Drawing]) -> Vec<String> {
    let rows = drawings
        .iter()
        .map(|d| {
            vec![
                d.number.clone(),
                d.revision.clone(),
                d.status.as_str().to_uppercase(),
                d.title.clone(),
                d.requester_label(),
            ]
        })
        .collect();
    format_table(
        &["DRAWING NO", "REV", "STATUS", "TITLE", "REQUESTED BY"],
        rows,
    )
}
