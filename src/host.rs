//! Boundary to the embeddable web-view runtime.
//!
//! The shell never renders web content itself. A host (a native web-view
//! toolkit binding, or [`crate::testing`] in tests) implements [`HostWindow`]
//! and [`Surface`]; the managers only ever talk to these traits.
//!
//! Surfaces report what happens inside them through [`SurfaceEvent`]s
//! delivered on the channel returned by [`Surface::subscribe`].

use crate::layout::{Bounds, Point, Size};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use zenium_config::Theme;

/// Host-assigned identifier of a surface, unique for the process lifetime.
pub type SurfaceId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Web content of one browser tab
    Tab,
    /// Thin progress strip stacked over a tab
    LoadingBar,
    /// Frameless floating overlay
    Modal,
}

/// One entry of a surface's back/forward list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EntryRepr")]
pub struct NavigationEntry {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl NavigationEntry {
    pub fn new(url: impl Into<String>, title: Option<String>) -> Self {
        Self {
            url: url.into(),
            title,
        }
    }
}

/// Older session files stored entries as bare URL strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum EntryRepr {
    Url(String),
    Entry {
        url: String,
        #[serde(default)]
        title: Option<String>,
    },
}

impl From<EntryRepr> for NavigationEntry {
    fn from(repr: EntryRepr) -> Self {
        match repr {
            EntryRepr::Url(url) => NavigationEntry { url, title: None },
            EntryRepr::Entry { url, title } => NavigationEntry { url, title },
        }
    }
}

/// Snapshot of a surface's back/forward list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NavigationHistory {
    #[serde(default, deserialize_with = "deserialize_index")]
    pub index: usize,
    #[serde(default)]
    pub entries: Vec<NavigationEntry>,
}

/// Hosts report `-1` for an empty list; treat any negative index as 0.
fn deserialize_index<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(usize::try_from(raw).unwrap_or(0))
}

impl NavigationHistory {
    pub fn new(index: usize, entries: Vec<NavigationEntry>) -> Self {
        Self { index, entries }
    }

    /// A one-entry history pointing at `url`.
    pub fn single(url: impl Into<String>) -> Self {
        Self {
            index: 0,
            entries: vec![NavigationEntry::new(url, None)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when a bulk restore is possible: at least one entry and the
    /// index points at one of them.
    pub fn is_restorable(&self) -> bool {
        self.index < self.entries.len()
    }

    pub fn active_entry(&self) -> Option<&NavigationEntry> {
        self.entries.get(self.index)
    }
}

/// Keyboard input as seen by a surface before the page handles it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyInput {
    pub key: String,
    pub control: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn control(mut self) -> Self {
        self.control = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }
}

/// Decision of an [`InputFilter`] for a key-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputDisposition {
    /// Let the host apply its default handling.
    Pass,
    /// Suppress the host's default action; the page still receives the key.
    Block,
}

/// Consulted by the host for every key-down before default handling.
pub trait InputFilter: Send + Sync {
    fn filter(&self, input: &KeyInput) -> InputDisposition;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    LoadStarted,
    LoadStopped,
    /// The main document finished loading.
    LoadFinished,
    LoadFailed {
        code: i32,
        description: String,
        url: String,
    },
    TitleUpdated(String),
    FaviconUpdated(Vec<String>),
    Navigated(String),
    NavigatedInPage(String),
    KeyDown(KeyInput),
    Blurred,
    Destroyed,
}

#[derive(Debug, Clone, Error)]
pub enum SurfaceError {
    #[error("surface {0} has been destroyed")]
    Destroyed(SurfaceId),

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("history restore failed: {0}")]
    HistoryRestore(String),
}

/// An isolated web-rendering surface.
///
/// Methods on a destroyed surface must not panic: getters return empty
/// values, mutators do nothing, and async calls fail with
/// [`SurfaceError::Destroyed`].
#[async_trait]
pub trait Surface: Send + Sync {
    fn id(&self) -> SurfaceId;
    fn kind(&self) -> SurfaceKind;

    fn set_bounds(&self, bounds: Bounds);
    fn bounds(&self) -> Bounds;

    fn is_destroyed(&self) -> bool;
    fn destroy(&self);

    fn url(&self) -> String;
    fn title(&self) -> String;
    fn favicons(&self) -> Vec<String>;

    /// Start a navigation. Resolves once the navigation has committed.
    async fn load_url(&self, url: &str) -> Result<(), SurfaceError>;

    /// Replace the back/forward list and load the entry at `history.index`.
    async fn restore_history(&self, history: &NavigationHistory) -> Result<(), SurfaceError>;

    fn navigation_history(&self) -> NavigationHistory;
    fn can_go_back(&self) -> bool;
    fn go_back(&self);
    fn can_go_forward(&self) -> bool;
    fn go_forward(&self);
    fn reload(&self);

    /// Evaluate `script` in the page and return its JSON-converted result.
    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, SurfaceError>;

    fn toggle_devtools(&self);
    fn focus(&self);
    fn set_transparent_background(&self);
    fn set_input_filter(&self, filter: Arc<dyn InputFilter>);

    /// Open a new event stream. The stream ends when the surface is destroyed.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<SurfaceEvent>;
}

/// The top-level window hosting every surface.
///
/// Attached surfaces are stacked in attach order; `raise` moves one to the top.
pub trait HostWindow: Send + Sync {
    /// Size of the content area (excluding native decorations).
    fn content_size(&self) -> Size;
    /// Window position and size in screen coordinates.
    fn outer_bounds(&self) -> Bounds;
    fn cursor_position(&self) -> Point;

    fn create_surface(&self, kind: SurfaceKind) -> Arc<dyn Surface>;
    fn attach(&self, surface: SurfaceId);
    fn detach(&self, surface: SurfaceId);
    fn raise(&self, surface: SurfaceId);

    /// Colour scheme the host should render native chrome and
    /// `prefers-color-scheme` with.
    fn set_theme(&self, theme: Theme);
    fn uses_dark_colors(&self) -> bool;

    /// Terminate the application without asking again.
    fn quit(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_accepts_bare_url_entries() {
        let json = r#"{"index":1,"entries":["https://a.example/","https://b.example/"]}"#;
        let history: NavigationHistory = serde_json::from_str(json).unwrap();
        assert_eq!(history.index, 1);
        assert_eq!(history.entries[1], NavigationEntry::new("https://b.example/", None));
    }

    #[test]
    fn test_history_accepts_mixed_entries() {
        let json = r#"{"index":0,"entries":[{"url":"https://a.example/","title":"A"},"https://b.example/"]}"#;
        let history: NavigationHistory = serde_json::from_str(json).unwrap();
        assert_eq!(history.active_entry().unwrap().title.as_deref(), Some("A"));
        assert_eq!(history.entries.len(), 2);
    }

    #[test]
    fn test_negative_index_clamps_to_zero() {
        let history: NavigationHistory =
            serde_json::from_str(r#"{"index":-1,"entries":[]}"#).unwrap();
        assert_eq!(history.index, 0);
        assert!(!history.is_restorable());
    }

    #[test]
    fn test_untitled_entry_serializes_without_title() {
        let json = serde_json::to_string(&NavigationEntry::new("https://a.example/", None)).unwrap();
        assert_eq!(json, r#"{"url":"https://a.example/"}"#);
    }

    #[test]
    fn test_out_of_range_index_is_not_restorable() {
        let history = NavigationHistory::new(3, vec![NavigationEntry::new("https://a.example/", None)]);
        assert!(!history.is_restorable());
        assert!(history.active_entry().is_none());
    }
}
