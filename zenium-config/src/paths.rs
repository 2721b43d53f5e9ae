//! Path helpers for every file the shell persists.
//!
//! Everything lives in `<config_dir>/zenium/` (XDG on Linux, the platform
//! equivalent elsewhere):
//!
//! - `config.yaml`    shell configuration
//! - `settings.json`  user settings key-value store
//! - `session.json`   last saved tab session
//! - `history.jsonl`  append-only visit log
//! - `zntp-sites.json` registered zntp:// sites

use crate::error::ConfigError;
use std::path::{Component, Path, PathBuf};

/// Get the configuration directory path
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("zenium")
}

pub fn shell_config_path() -> PathBuf {
    config_dir().join("config.yaml")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn session_path() -> PathBuf {
    config_dir().join("session.json")
}

pub fn history_path() -> PathBuf {
    config_dir().join("history.jsonl")
}

pub fn sites_path() -> PathBuf {
    config_dir().join("zntp-sites.json")
}

/// Default root for `zenium://` pages: a `pages` directory next to the
/// executable, falling back to the working directory.
pub fn default_pages_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("pages")))
        .unwrap_or_else(|| PathBuf::from("pages"))
}

/// Normalize `path` without touching the filesystem.
///
/// `.` components are dropped and `..` pops the previous normal component.
/// A `..` that would climb above the path's root is kept, so the result still
/// fails a `starts_with` containment check instead of silently clamping.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().map(|c| c.as_os_str()).collect()
}

/// Join `relative` onto `base` and require the lexically normalized result
/// to stay inside `base`.
///
/// Works for paths that do not exist yet. Absolute `relative` paths are
/// rejected because `Path::join` would discard `base`.
pub fn confine(base: &Path, relative: &Path) -> Result<PathBuf, ConfigError> {
    let base = normalize_lexically(base);
    let joined = normalize_lexically(&base.join(relative));

    if relative.has_root() || !joined.starts_with(&base) {
        return Err(ConfigError::PathTraversal(format!(
            "path '{}' resolves to '{}' which is outside the expected directory '{}'",
            relative.display(),
            joined.display(),
            base.display(),
        )));
    }

    Ok(joined)
}

/// Write `contents` to `path` atomically: write a sibling temp file, then
/// rename it over the target. Creates the parent directory if needed.
pub fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    std::fs::write(&temp_path, contents)?;
    std::fs::rename(&temp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths_share_config_dir() {
        let dir = config_dir();
        assert!(session_path().starts_with(&dir));
        assert!(settings_path().starts_with(&dir));
        assert!(history_path().starts_with(&dir));
        assert!(sites_path().starts_with(&dir));
        assert_eq!(session_path().file_name().unwrap(), "session.json");
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(normalize_lexically(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(
            normalize_lexically(Path::new("a/../../b")),
            PathBuf::from("../b")
        );
    }

    #[test]
    fn test_confine_accepts_descendant() {
        let got = confine(Path::new("/srv/pages"), Path::new("newtab/index.html")).unwrap();
        assert_eq!(got, PathBuf::from("/srv/pages/newtab/index.html"));
    }

    #[test]
    fn test_confine_rejects_escape() {
        let err = confine(Path::new("/srv/pages"), Path::new("../../etc/passwd")).unwrap_err();
        assert!(matches!(err, ConfigError::PathTraversal(_)));
    }

    #[test]
    fn test_confine_rejects_sibling_prefix() {
        // "/srv/pages-private" shares a string prefix but is not a descendant
        let err = confine(Path::new("/srv/pages"), Path::new("../pages-private/x.html"));
        assert!(err.is_err());
    }

    #[test]
    fn test_confine_rejects_absolute() {
        assert!(confine(Path::new("/srv/pages"), Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn test_write_atomic_creates_parent_and_replaces() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("state.json");

        write_atomic(&path, "one").unwrap();
        write_atomic(&path, "two").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
        assert!(!temp.path().join("nested").join("state.json.tmp").exists());
    }
}
