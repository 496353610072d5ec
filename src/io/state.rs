use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::PageKey;

const STATE_FILE: &str = ".dms-state.json";

/// Persisted TUI state (written to .dms-state.json next to the database)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiState {
    /// Prefills the sign-in form
    #[serde(default)]
    pub last_username: Option<String>,
    /// Reopened when `last_username` signs in again and may still access it
    #[serde(default)]
    pub last_page: Option<PageKey>,
}

/// Where the state file lives for a given database file
pub fn state_path(database: &Path) -> PathBuf {
    match database.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(STATE_FILE),
        _ => PathBuf::from(STATE_FILE),
    }
}

/// Read the state file. Missing or unreadable state is ignored.
pub fn read_ui_state(path: &Path) -> Option<UiState> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

pub fn write_ui_state(path: &Path, state: &UiState) -> Result<(), std::io::Error> {
    let content = serde_json::to_string_pretty(state)?;
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(STATE_FILE);
        let state = UiState {
            last_username: Some("alice".into()),
            last_page: Some(PageKey::DrawingIssuance),
        };
        write_ui_state(&path, &state).unwrap();
        assert_eq!(read_ui_state(&path), Some(state));
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"drawing_issuance\""));
    }

    #[test]
    fn read_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_ui_state(&dir.path().join(STATE_FILE)).is_none());
    }

    #[test]
    fn read_malformed_json_returns_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(STATE_FILE);
        fs::write(&path, "not json {{{").unwrap();
        assert!(read_ui_state(&path).is_none());
    }

    #[test]
    fn fields_default_when_absent() {
        let state: UiState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, UiState::default());
    }

    #[test]
    fn state_sits_next_to_the_database() {
        assert_eq!(
            state_path(Path::new("/srv/dms/drawings.db")),
            PathBuf::from("/srv/dms/.dms-state.json")
        );
        assert_eq!(state_path(Path::new("drawings.db")), PathBuf::from(".dms-state.json"));
    }
}
