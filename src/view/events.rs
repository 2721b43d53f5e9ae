//! Per-tab surface event handling.

use std::sync::Arc;

use super::{is_internal_url, TabSlot, ViewManager};
use crate::host::{Surface, SurfaceEvent, SurfaceId};
use crate::keyblocker::is_devtools_toggle;
use crate::task::TaskGuard;
use crate::ui::UiEvent;
use crate::view::TabId;

impl ViewManager {
    /// Forward `surface`'s events to the manager until the stream ends or
    /// the returned guard is dropped.
    pub(super) fn spawn_event_pump(&self, tab_id: TabId, surface: &Arc<dyn Surface>) -> TaskGuard {
        let mut events = surface.subscribe();
        let surface_id = surface.id();
        let weak = Arc::downgrade(&self.inner);

        TaskGuard::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                ViewManager::from_inner(inner)
                    .handle_surface_event(&tab_id, surface_id, event)
                    .await;
            }
            debug_log!("VIEW", "Event stream for tab {} ended", tab_id);
        })
    }

    /// Surface of `tab_id` if it is still the one with `surface_id`.
    ///
    /// Events can be queued behind an unload/load cycle; those from the old
    /// surface must not touch the new one.
    fn current_surface(&self, tab_id: &TabId, surface_id: SurfaceId) -> Option<Arc<dyn Surface>> {
        self.inner
            .state
            .lock()
            .tabs
            .get(tab_id)
            .and_then(TabSlot::as_loaded)
            .filter(|tab| tab.surface_id() == surface_id)
            .map(|tab| Arc::clone(&tab.surface))
    }

    /// Record the loading flag; returns whether the tab is the active one.
    fn set_loading(&self, tab_id: &TabId, loading: bool) -> bool {
        let mut state = self.inner.state.lock();
        let active = state.active.as_ref() == Some(tab_id);
        if let Some(tab) = state.tabs.get_mut(tab_id).and_then(TabSlot::as_loaded_mut) {
            tab.loading = loading;
        }
        active
    }

    pub(super) async fn handle_surface_event(
        &self,
        tab_id: &TabId,
        surface_id: SurfaceId,
        event: SurfaceEvent,
    ) {
        let Some(surface) = self.current_surface(tab_id, surface_id) else {
            return;
        };
        debug_trace!("VIEW", "tab {} <- {:?}", tab_id, event);

        match event {
            SurfaceEvent::LoadStarted => {
                if is_internal_url(&surface.url()) {
                    return;
                }
                if self.set_loading(tab_id, true) {
                    self.show_loading_overlay(tab_id);
                }
            }
            SurfaceEvent::LoadStopped => {
                if self.set_loading(tab_id, false) {
                    self.finish_loading(tab_id).await;
                }
                if surface.is_destroyed() {
                    return;
                }
                let url = surface.url();
                if !url.is_empty() && !is_internal_url(&url) && url != "about:blank" {
                    self.inner.history.add(&url, &surface.title());
                }
            }
            SurfaceEvent::LoadFailed {
                code,
                description,
                url,
            } => {
                log::error!("Tab {} failed to load {}: {} ({})", tab_id, url, description, code);
            }
            SurfaceEvent::TitleUpdated(title) => {
                self.inner.ui.notify(UiEvent::TitleUpdated {
                    tab_id: tab_id.clone(),
                    title,
                });
            }
            SurfaceEvent::FaviconUpdated(favicons) => {
                if let Some(favicon_url) = favicons.into_iter().next() {
                    self.inner.ui.notify(UiEvent::FaviconUpdated {
                        tab_id: tab_id.clone(),
                        favicon_url,
                    });
                }
            }
            SurfaceEvent::Navigated(url) | SurfaceEvent::NavigatedInPage(url) => {
                self.inner.ui.notify(UiEvent::UrlUpdated {
                    tab_id: tab_id.clone(),
                    url,
                });
            }
            SurfaceEvent::KeyDown(input) => {
                if is_devtools_toggle(&input) {
                    surface.toggle_devtools();
                }
            }
            SurfaceEvent::LoadFinished | SurfaceEvent::Blurred | SurfaceEvent::Destroyed => {}
        }
    }
}
