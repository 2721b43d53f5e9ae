//! Build a [`Session`] from the live tab table and the UI.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use super::{Session, SessionTab};
use crate::host::{NavigationHistory, Surface};
use crate::ui::{TabStates, UiBridge, UiRequest};
use crate::view::{query_favicon, TabCategory, TabId, TabSnapshot, ViewManager};

/// Snapshot every tab.
///
/// The UI is asked for the tab order and the category map concurrently,
/// each bounded by `ui_timeout`; a missing answer becomes an empty order or
/// an empty map. Loaded tabs are captured concurrently, unloaded ones are
/// copied from their placeholders. Never fails.
pub async fn capture_session(view: &ViewManager, ui: &UiBridge, ui_timeout: Duration) -> Session {
    let (tab_order, tab_states) = tokio::join!(
        ui.request_as::<Vec<TabId>>(UiRequest::GetTabOrder, ui_timeout),
        ui.request_as::<TabStates>(UiRequest::GetTabStates, ui_timeout),
    );
    let tab_order = tab_order.unwrap_or_else(|e| {
        log::warn!("Saving without tab order: {}", e);
        Vec::new()
    });
    let tab_states = tab_states.unwrap_or_else(|e| {
        log::warn!("Saving without tab categories: {}", e);
        TabStates::default()
    });

    let snapshots = view.snapshots();
    let live = snapshots.iter().filter_map(|snapshot| match snapshot {
        TabSnapshot::Loaded {
            tab_id,
            surface,
            category,
        } => {
            let category = tab_states.0.get(tab_id).copied().unwrap_or(*category);
            Some(capture_loaded(tab_id.clone(), Arc::clone(surface), category))
        }
        TabSnapshot::Unloaded { .. } => None,
    });
    let mut tabs: Vec<SessionTab> = join_all(live).await.into_iter().flatten().collect();

    for snapshot in snapshots {
        if let TabSnapshot::Unloaded {
            tab_id,
            mut placeholder,
        } = snapshot
        {
            if let Some(category) = tab_states.0.get(&tab_id) {
                placeholder.category = *category;
            }
            tabs.push(SessionTab::from_placeholder(tab_id, placeholder));
        }
    }

    let position = |id: &TabId| tab_order.iter().position(|o| o == id).unwrap_or(usize::MAX);
    tabs.sort_by(|a, b| {
        position(&a.tab_id)
            .cmp(&position(&b.tab_id))
            .then_with(|| a.tab_id.cmp(&b.tab_id))
    });

    debug_info!(
        "SESSION",
        "Captured {} tabs ({} in UI order)",
        tabs.len(),
        tab_order.len()
    );
    Session {
        active_tab_id: view.active_tab_id(),
        tab_order,
        tabs,
    }
}

/// Capture one live tab. `None` if its surface was destroyed meanwhile.
async fn capture_loaded(tab_id: TabId, surface: Arc<dyn Surface>, category: TabCategory) -> Option<SessionTab> {
    let favicon_url = query_favicon(surface.as_ref()).await;
    if surface.is_destroyed() {
        log::debug!("Tab {} closed while saving, skipping", tab_id);
        return None;
    }

    let url = surface.url();
    let mut history = surface.navigation_history();
    if history.is_empty() && !url.is_empty() {
        history = NavigationHistory::single(url.as_str());
    }

    Some(SessionTab {
        tab_id,
        url,
        history,
        category,
        favicon_url,
        is_unloaded: false,
    })
}
