//! Tab table records.
//!
//! Every tab the shell knows about has exactly one [`TabSlot`] in the view
//! manager's table: either a live surface with its loading bar and event
//! subscription, or an unloaded placeholder. Moving between the two is a
//! single table write, so a tab can never be half-loaded.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::host::{NavigationHistory, Surface, SurfaceId};
use crate::task::TaskGuard;

/// Unique identifier for a tab, stable for the tab's lifetime. The UI mints
/// every id; the core only echoes them back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for TabId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TabId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Presentation class of a tab. Pinned and essential tabs offer "unload"
/// where regular tabs offer "close"; the view manager treats them alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabCategory {
    #[default]
    Regular,
    Pinned,
    Essential,
}

/// Everything needed to bring an unloaded tab back.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub url: String,
    pub history: NavigationHistory,
    pub favicon_url: Option<String>,
    pub category: TabCategory,
}

impl Placeholder {
    /// Title for the tab row: the active history entry's title, if any.
    pub fn title(&self) -> Option<&str> {
        self.history
            .active_entry()
            .and_then(|entry| entry.title.as_deref())
            .filter(|title| !title.is_empty())
    }
}

/// A tab with a live rendering surface.
pub(crate) struct LoadedTab {
    pub(crate) surface: Arc<dyn Surface>,
    pub(crate) overlay: Arc<dyn Surface>,
    pub(crate) category: TabCategory,
    /// A non-internal load is in progress
    pub(crate) loading: bool,
    /// Pump task forwarding this surface's events; aborted with the record
    pub(crate) _events: TaskGuard,
    /// Pending "hide the loading bar" timer
    pub(crate) hide_timer: Option<TaskGuard>,
}

impl LoadedTab {
    pub(crate) fn surface_id(&self) -> SurfaceId {
        self.surface.id()
    }
}

pub(crate) enum TabSlot {
    Loaded(LoadedTab),
    Unloaded(Placeholder),
}

impl TabSlot {
    pub(crate) fn as_loaded(&self) -> Option<&LoadedTab> {
        match self {
            TabSlot::Loaded(tab) => Some(tab),
            TabSlot::Unloaded(_) => None,
        }
    }

    pub(crate) fn as_loaded_mut(&mut self) -> Option<&mut LoadedTab> {
        match self {
            TabSlot::Loaded(tab) => Some(tab),
            TabSlot::Unloaded(_) => None,
        }
    }
}

/// Read-only view of one tab for callers outside the manager.
#[derive(Clone)]
pub enum TabSnapshot {
    Loaded {
        tab_id: TabId,
        surface: Arc<dyn Surface>,
        category: TabCategory,
    },
    Unloaded {
        tab_id: TabId,
        placeholder: Placeholder,
    },
}

impl TabSnapshot {
    pub fn tab_id(&self) -> &TabId {
        match self {
            TabSnapshot::Loaded { tab_id, .. } | TabSnapshot::Unloaded { tab_id, .. } => tab_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NavigationEntry;

    #[test]
    fn test_category_wire_names() {
        assert_eq!(serde_json::to_string(&TabCategory::Essential).unwrap(), "\"essential\"");
        let parsed: TabCategory = serde_json::from_str("\"pinned\"").unwrap();
        assert_eq!(parsed, TabCategory::Pinned);
    }

    #[test]
    fn test_placeholder_title_from_active_entry() {
        let placeholder = Placeholder {
            url: "https://b.example/".to_string(),
            history: NavigationHistory::new(
                1,
                vec![
                    NavigationEntry::new("https://a.example/", Some("A".to_string())),
                    NavigationEntry::new("https://b.example/", Some(String::new())),
                ],
            ),
            favicon_url: None,
            category: TabCategory::Regular,
        };
        // Empty titles count as missing
        assert_eq!(placeholder.title(), None);
    }

    #[test]
    fn test_ui_ids_travel_as_bare_strings() {
        let id: TabId = serde_json::from_str("\"tab-1712\"").unwrap();
        assert_eq!(id, TabId::from("tab-1712"));
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"tab-1712\"");
    }
}
