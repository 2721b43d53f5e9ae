//! File I/O for session persistence
//!
//! Sessions are stored as JSON. Callers pass the file; the shell and the CLI
//! default it to `<config dir>/zenium/session.json`.

use super::Session;
use anyhow::{Context, Result};
use std::path::Path;

/// Save the session to a specific file
///
/// The file is replaced atomically, so a crash mid-save leaves the previous
/// session intact.
pub fn save_session_to(session: &Session, path: &Path) -> Result<()> {
    let contents =
        serde_json::to_string_pretty(session).context("Failed to serialize session")?;

    zenium_config::paths::write_atomic(path, &contents)
        .with_context(|| format!("Failed to write session to {:?}", path))?;

    log::info!("Saved session ({} tabs) to {:?}", session.tabs.len(), path);
    Ok(())
}

/// Load the session from a specific file
///
/// Returns `None` if the file doesn't exist or is empty.
/// Returns an error if the file exists but is corrupt.
pub fn load_session_from(path: &Path) -> Result<Option<Session>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read session from {:?}", path))?;

    if contents.trim().is_empty() {
        return Ok(None);
    }

    let session: Session = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse session from {:?}", path))?;

    log::info!("Loaded session ({} tabs) from {:?}", session.tabs.len(), path);
    Ok(Some(session))
}

/// Remove a session file (no error if it does not exist)
pub fn clear_session_at(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove session file {:?}", path))?;
        log::info!("Cleared session file {:?}", path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{NavigationEntry, NavigationHistory};
    use crate::session::SessionTab;
    use crate::view::{TabCategory, TabId};
    use tempfile::tempdir;

    fn sample() -> Session {
        Session {
            active_tab_id: Some(TabId::from("t2")),
            tab_order: vec![TabId::from("t1"), TabId::from("t2")],
            tabs: vec![
                SessionTab {
                    tab_id: TabId::from("t1"),
                    url: "https://a.example/".to_string(),
                    history: NavigationHistory::single("https://a.example/"),
                    category: TabCategory::Pinned,
                    favicon_url: Some("https://a.example/favicon.ico".to_string()),
                    is_unloaded: true,
                },
                SessionTab {
                    tab_id: TabId::from("t2"),
                    url: "https://b.example/2".to_string(),
                    history: NavigationHistory::new(
                        1,
                        vec![
                            NavigationEntry::new("https://b.example/1", Some("One".to_string())),
                            NavigationEntry::new("https://b.example/2", None),
                        ],
                    ),
                    category: TabCategory::Regular,
                    favicon_url: None,
                    is_unloaded: false,
                },
            ],
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("session.json");

        save_session_to(&sample(), &path).unwrap();
        let loaded = load_session_from(&path).unwrap().unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_load_missing_file() {
        let temp = tempdir().unwrap();
        assert!(load_session_from(&temp.path().join("nope.json")).unwrap().is_none());
    }

    #[test]
    fn test_load_empty_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("session.json");
        std::fs::write(&path, "  \n").unwrap();
        assert!(load_session_from(&path).unwrap().is_none());
    }

    #[test]
    fn test_load_corrupt_file_is_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("session.json");
        std::fs::write(&path, "{\"tabs\": [").unwrap();
        assert!(load_session_from(&path).is_err());
    }

    #[test]
    fn test_save_creates_parent_and_leaves_no_temp_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("session.json");
        save_session_to(&sample(), &path).unwrap();

        let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["session.json"]);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("session.json");
        save_session_to(&sample(), &path).unwrap();

        clear_session_at(&path).unwrap();
        assert!(!path.exists());
        clear_session_at(&path).unwrap();
    }
}
