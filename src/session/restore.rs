//! Rebuild tabs from a saved [`Session`].

use std::time::Duration;

use futures_util::future::join_all;

use super::Session;
use crate::ui::{UiBridge, UiEvent, UiRequest};
use crate::view::{TabId, ViewManager};

/// Row title for a restored tab whose saved history has no title.
pub const PLACEHOLDER_TITLE: &str = "Loading...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Nothing to restore; the caller should open a fresh tab.
    Empty,
    Restored { active: TabId, restored: usize },
}

/// Restore every saved tab, in display order.
///
/// The recorded active tab (or, if it is missing, the first tab) is rebuilt
/// as a live surface with its full back/forward list; all others become
/// unloaded placeholders. Each tab row is created through a UI request whose
/// answer is the acknowledgement. Once every row is acknowledged (or
/// `ack_timeout` passes) the active tab is switched to and the UI told to
/// mark it.
pub async fn restore_session(
    view: &ViewManager,
    ui: &UiBridge,
    session: &Session,
    ack_timeout: Duration,
) -> RestoreOutcome {
    let ordered = session.ordered_tabs();
    let Some(first) = ordered.first() else {
        log::info!("Saved session has no tabs");
        return RestoreOutcome::Empty;
    };

    let active = session
        .active_tab_id
        .as_ref()
        .filter(|id| ordered.iter().any(|tab| &tab.tab_id == *id))
        .unwrap_or(&first.tab_id)
        .clone();

    let mut pending = Vec::with_capacity(ordered.len());
    for tab in &ordered {
        let request = if tab.tab_id == active {
            view.new_tab(tab.tab_id.clone(), &tab.url, Some(tab.history.clone()))
                .await;
            view.set_category(&tab.tab_id, tab.category);
            UiRequest::CreateTab {
                tab_id: tab.tab_id.clone(),
                url: tab.url.clone(),
                favicon_url: tab.favicon_url.clone(),
                category: tab.category,
            }
        } else {
            let placeholder = tab.placeholder();
            let title = placeholder.title().unwrap_or(PLACEHOLDER_TITLE).to_string();
            if !view.register_unloaded(tab.tab_id.clone(), placeholder) {
                continue;
            }
            UiRequest::CreateUnloadedTab {
                tab_id: tab.tab_id.clone(),
                url: tab.url.clone(),
                title,
                favicon_url: tab.favicon_url.clone(),
                category: tab.category,
            }
        };

        match ui.send_request(request) {
            Ok(reply) => pending.push((tab.tab_id.clone(), reply)),
            Err(e) => log::warn!("Could not create UI row for tab {}: {}", tab.tab_id, e),
        }
    }

    // Barrier: every row exists before one of them is marked active
    let acks = join_all(pending.into_iter().map(|(tab_id, reply)| async move {
        (tab_id, ui.wait(reply, ack_timeout).await)
    }))
    .await;
    for (tab_id, ack) in acks {
        if let Err(e) = ack {
            log::warn!("UI did not acknowledge restored tab {}: {}", tab_id, e);
        }
    }

    view.switch_tab(&active).await;
    ui.notify(UiEvent::SwitchTab {
        tab_id: active.clone(),
    });

    log::info!("Restored {} tabs, active {}", ordered.len(), active);
    RestoreOutcome::Restored {
        active,
        restored: ordered.len(),
    }
}
