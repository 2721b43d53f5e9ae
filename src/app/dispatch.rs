//! UI → core traffic.
//!
//! Commands are fire-and-forget; queries produce a JSON answer the host
//! glue hands back to the asking page. Unknown tab and modal ids are the
//! managers' business: they log and ignore.

use serde::Deserialize;
use serde_json::{Value, json};

use super::Shell;
use crate::host::SurfaceId;
use crate::modal::ModalOptions;
use crate::omnibox;
use crate::protocol::{AddSiteRequest, Site, SiteError, UpdateSiteRequest};
use crate::ui::UiEvent;
use crate::view::{TabCategory, TabId};

/// Default number of entries for history and suggestion queries.
const DEFAULT_QUERY_LIMIT: usize = 50;

/// Notification sent by the UI (or by a modal) to the core.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "command",
    content = "params",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum UiCommand {
    CreateTab {
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
    },
    SwitchTab {
        tab_id: TabId,
    },
    CloseTab {
        tab_id: TabId,
    },
    UnloadTab {
        tab_id: TabId,
    },
    /// `url` is whatever the user typed; it goes through the omnibox.
    Navigate {
        tab_id: TabId,
        url: String,
    },
    GoBack {
        tab_id: TabId,
    },
    GoForward {
        tab_id: TabId,
    },
    Reload {
        tab_id: TabId,
    },
    ResizeSidebar {
        width: f64,
    },
    SetTabCategory {
        tab_id: TabId,
        category: TabCategory,
    },
    ShowModal(ModalOptions),
    CloseModal {
        id: String,
    },
    CloseAllModals,
    /// Sent by a modal page about itself.
    RequestCloseSelf {
        surface_id: SurfaceId,
    },
    ResizeModal {
        surface_id: SurfaceId,
        height: f64,
    },
    /// Opaque payload a modal wants the main UI to see.
    ModalAction {
        action: Value,
    },
    SetSetting {
        key: String,
        value: Value,
    },
    CheckForUpdates,
    DownloadUpdate,
    InstallUpdate,
    CloseWindow,
}

/// Request sent by the UI that expects an answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "query",
    content = "params",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum UiQuery {
    GetHistory {
        #[serde(default)]
        limit: Option<usize>,
    },
    GetSearchSuggestions {
        query: String,
        #[serde(default)]
        limit: Option<usize>,
    },
    GetSettings,
    IsDarkMode,
    ResolveInput {
        input: String,
    },
    ListSites,
    AddSite(AddSiteRequest),
    UpdateSite(UpdateSiteRequest),
    RemoveSite {
        fqdn: String,
    },
}

impl Shell {
    pub async fn handle_command(&self, command: UiCommand) {
        debug_log!("SHELL", "command {:?}", command);
        let inner = &self.inner;

        match command {
            UiCommand::CreateTab { tab_id, url } => {
                let url = url.unwrap_or_else(|| self.new_tab_url());
                inner.view.new_tab(tab_id, &url, None).await;
            }
            UiCommand::SwitchTab { tab_id } => {
                inner.view.switch_tab(&tab_id).await;
                // Tab surfaces were just re-raised; modals must stay on top
                inner.modals.raise_all();
            }
            UiCommand::CloseTab { tab_id } => inner.view.close_tab(&tab_id),
            UiCommand::UnloadTab { tab_id } => inner.view.unload_tab(&tab_id).await,
            UiCommand::Navigate { tab_id, url } => {
                match omnibox::resolve_input(&url, &inner.config.search_url) {
                    Some(target) => inner.view.navigate(&tab_id, &target).await,
                    None => log::debug!("Ignoring empty navigation for tab {}", tab_id),
                }
            }
            UiCommand::GoBack { tab_id } => inner.view.go_back(&tab_id),
            UiCommand::GoForward { tab_id } => inner.view.go_forward(&tab_id),
            UiCommand::Reload { tab_id } => inner.view.reload(&tab_id),
            UiCommand::ResizeSidebar { width } => inner.view.update_sidebar_width(width),
            UiCommand::SetTabCategory { tab_id, category } => {
                inner.view.set_category(&tab_id, category)
            }
            UiCommand::ShowModal(options) => inner.modals.show(options).await,
            UiCommand::CloseModal { id } => inner.modals.close(&id),
            UiCommand::CloseAllModals => inner.modals.close_all(),
            UiCommand::RequestCloseSelf { surface_id } => {
                inner.modals.close_by_surface(surface_id)
            }
            UiCommand::ResizeModal { surface_id, height } => {
                inner.modals.resize(surface_id, height)
            }
            UiCommand::ModalAction { action } => {
                inner.ui.notify(UiEvent::ModalEvent { action });
            }
            UiCommand::SetSetting { key, value } => {
                if let Err(e) = inner.settings.set(&key, value) {
                    log::error!("Failed to save setting '{}': {:#}", key, e);
                }
            }
            UiCommand::CheckForUpdates => match &inner.updates {
                Some(updates) => updates.check().await,
                None => log::debug!("No update backend, ignoring update check"),
            },
            UiCommand::DownloadUpdate => match &inner.updates {
                Some(updates) => updates.download().await,
                None => log::debug!("No update backend, ignoring download"),
            },
            UiCommand::InstallUpdate => match &inner.updates {
                Some(updates) => updates.install(),
                None => log::debug!("No update backend, ignoring install"),
            },
            UiCommand::CloseWindow => {
                self.on_close_requested();
            }
        }
    }

    pub async fn handle_query(&self, query: UiQuery) -> Value {
        debug_log!("SHELL", "query {:?}", query);
        let inner = &self.inner;

        match query {
            UiQuery::GetHistory { limit } => {
                let entries = inner.history.recent(limit.unwrap_or(DEFAULT_QUERY_LIMIT));
                to_json(&entries)
            }
            UiQuery::GetSearchSuggestions { query, limit } => {
                let suggestions = omnibox::suggestions(
                    &inner.history.get_all(),
                    &query,
                    limit.unwrap_or(DEFAULT_QUERY_LIMIT),
                );
                to_json(&suggestions)
            }
            UiQuery::GetSettings => Value::Object(inner.settings.all()),
            UiQuery::IsDarkMode => Value::Bool(inner.window.uses_dark_colors()),
            UiQuery::ResolveInput { input } => {
                to_json(&omnibox::resolve_input(&input, &inner.config.search_url))
            }
            UiQuery::ListSites => to_json(&inner.sites.list()),
            UiQuery::AddSite(request) => site_reply(inner.sites.add(request)),
            UiQuery::UpdateSite(request) => site_reply(inner.sites.update(request)),
            UiQuery::RemoveSite { fqdn } => site_reply(inner.sites.remove(&fqdn)),
        }
    }

    /// URL for a tab the UI created without one: the user's setting, else
    /// the configured default.
    fn new_tab_url(&self) -> String {
        self.inner
            .settings
            .get("newTabUrl")
            .and_then(|value| value.as_str().map(str::to_string))
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.inner.config.new_tab_url.clone())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        log::error!("Failed to serialize query answer: {}", e);
        Value::Null
    })
}

fn site_reply(result: Result<Vec<Site>, SiteError>) -> Value {
    match result {
        Ok(sites) => json!({ "success": true, "sites": sites }),
        Err(e) => json!({ "success": false, "message": e.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let command: UiCommand = serde_json::from_value(json!({
            "command": "navigate",
            "params": {"tabId": "t1", "url": "example.com"}
        }))
        .unwrap();
        assert_eq!(
            command,
            UiCommand::Navigate {
                tab_id: TabId::from("t1"),
                url: "example.com".to_string(),
            }
        );
    }

    #[test]
    fn test_unit_command_needs_no_params() {
        let command: UiCommand =
            serde_json::from_value(json!({"command": "close-all-modals"})).unwrap();
        assert_eq!(command, UiCommand::CloseAllModals);
    }

    #[test]
    fn test_show_modal_params_are_modal_options() {
        let command: UiCommand = serde_json::from_value(json!({
            "command": "show-modal",
            "params": {"id": "settings", "x": 10, "y": 20, "width": 300, "height": 200}
        }))
        .unwrap();
        let UiCommand::ShowModal(options) = command else {
            panic!("expected show-modal");
        };
        assert_eq!(options.id, "settings");
        assert!(options.close_on_blur);
    }

    #[test]
    fn test_query_wire_format() {
        let query: UiQuery = serde_json::from_value(json!({
            "query": "get-search-suggestions",
            "params": {"query": "rust"}
        }))
        .unwrap();
        assert_eq!(
            query,
            UiQuery::GetSearchSuggestions {
                query: "rust".to_string(),
                limit: None,
            }
        );
    }

    #[test]
    fn test_site_reply_shapes() {
        assert_eq!(site_reply(Ok(Vec::new())), json!({"success": true, "sites": []}));
        let failed = site_reply(Err(SiteError::NotFound("a.b".to_string())));
        assert_eq!(failed["success"], json!(false));
        assert!(failed["message"].is_string());
    }
}
