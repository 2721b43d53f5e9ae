//! Session persistence: save the open tabs on shutdown, restore them on the
//! next launch.
//!
//! Only the tab that was active is rebuilt as a live surface on restore;
//! every other tab comes back as an unloaded placeholder and is loaded the
//! first time the user switches to it.

pub mod capture;
pub mod restore;
pub mod shutdown;
pub mod storage;

pub use restore::{PLACEHOLDER_TITLE, RestoreOutcome};
pub use shutdown::{SaveReport, ShutdownCoordinator, ShutdownPhase};

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use zenium_config::ShellConfig;

use crate::host::NavigationHistory;
use crate::ui::UiBridge;
use crate::view::{Placeholder, TabCategory, TabId, ViewManager};

/// Everything persisted about the open tabs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub active_tab_id: Option<TabId>,
    /// Tab ids left to right, as reported by the UI
    #[serde(default)]
    pub tab_order: Vec<TabId>,
    #[serde(default)]
    pub tabs: Vec<SessionTab>,
}

/// A single tab in a saved session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTab {
    pub tab_id: TabId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub history: NavigationHistory,
    #[serde(default)]
    pub category: TabCategory,
    #[serde(default)]
    pub favicon_url: Option<String>,
    /// The tab had no live surface when the session was saved
    #[serde(default)]
    pub is_unloaded: bool,
}

impl SessionTab {
    pub fn from_placeholder(tab_id: TabId, placeholder: Placeholder) -> Self {
        Self {
            tab_id,
            url: placeholder.url,
            history: placeholder.history,
            category: placeholder.category,
            favicon_url: placeholder.favicon_url,
            is_unloaded: true,
        }
    }

    pub fn placeholder(&self) -> Placeholder {
        Placeholder {
            url: self.url.clone(),
            history: self.history.clone(),
            favicon_url: self.favicon_url.clone(),
            category: self.category,
        }
    }
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Tabs in display order.
    ///
    /// Follows `tab_order`, skipping ids with no saved tab, then appends
    /// saved tabs the order did not mention (a save whose order request
    /// timed out has an empty order). Each id appears once.
    pub fn ordered_tabs(&self) -> Vec<&SessionTab> {
        let by_id: HashMap<&TabId, &SessionTab> =
            self.tabs.iter().map(|tab| (&tab.tab_id, tab)).collect();
        let mut seen = HashSet::new();

        let ordered = self.tab_order.iter().filter_map(|id| by_id.get(id).copied());
        ordered
            .chain(self.tabs.iter())
            .filter(|&tab| seen.insert(&tab.tab_id))
            .collect()
    }
}

/// Saves, loads and restores the session file for one window.
#[derive(Clone)]
pub struct SessionManager {
    path: PathBuf,
    view: ViewManager,
    ui: Arc<UiBridge>,
    ui_request_timeout: Duration,
    restore_ack_timeout: Duration,
}

impl SessionManager {
    pub fn new(path: impl Into<PathBuf>, view: ViewManager, ui: Arc<UiBridge>, config: &ShellConfig) -> Self {
        Self {
            path: path.into(),
            view,
            ui,
            ui_request_timeout: config.ui_request_timeout(),
            restore_ack_timeout: config.restore_ack_timeout(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Capture the current tabs and write them out.
    ///
    /// Unanswered UI requests degrade to empty data; only a failed write is
    /// an error.
    pub async fn save(&self) -> Result<Session> {
        let session = capture::capture_session(&self.view, &self.ui, self.ui_request_timeout).await;
        storage::save_session_to(&session, &self.path)?;
        Ok(session)
    }

    /// Read the saved session. Missing, empty and unreadable files all mean
    /// "start fresh".
    pub fn load(&self) -> Option<Session> {
        match storage::load_session_from(&self.path) {
            Ok(session) => session,
            Err(e) => {
                log::warn!("Ignoring unreadable session: {:#}", e);
                None
            }
        }
    }

    pub async fn restore(&self, session: &Session) -> RestoreOutcome {
        restore::restore_session(&self.view, &self.ui, session, self.restore_ack_timeout).await
    }

    pub async fn load_and_restore(&self) -> RestoreOutcome {
        match self.load() {
            Some(session) => self.restore(&session).await,
            None => RestoreOutcome::Empty,
        }
    }

    pub fn clear(&self) -> Result<()> {
        storage::clear_session_at(&self.path)
    }
}
