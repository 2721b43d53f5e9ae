//! Loading-bar choreography for the active tab.

use std::sync::Arc;

use super::{TabSlot, ViewManager};
use crate::host::{Surface, SurfaceId};
use crate::layout::{loading_bar_bounds, Bounds};
use crate::task::TaskGuard;
use crate::view::TabId;

const LOADING_START_SCRIPT: &str = r#"(() => {
    const loader = document.querySelector(".loader");
    loader.classList.remove("finished");
    loader.classList.add("loading");
})()"#;

const LOADING_FINISHED_SCRIPT: &str =
    r#"document.querySelector(".loader").classList.add("finished")"#;

impl ViewManager {
    /// Position the bar over the tab and restart its animation.
    ///
    /// A pending hide from a previous load is cancelled.
    pub fn show_loading_overlay(&self, tab_id: &TabId) {
        let Some((surface, overlay, height)) = ({
            let mut state = self.inner.state.lock();
            let height = state.layout.loading_bar_height;
            state
                .tabs
                .get_mut(tab_id)
                .and_then(TabSlot::as_loaded_mut)
                .map(|tab| {
                    tab.hide_timer = None;
                    (Arc::clone(&tab.surface), Arc::clone(&tab.overlay), height)
                })
        }) else {
            return;
        };

        let script_target = Arc::clone(&overlay);
        tokio::spawn(async move {
            if let Err(e) = script_target.execute_script(LOADING_START_SCRIPT).await {
                log::debug!("Loading bar start script failed: {}", e);
            }
        });
        self.place_loading_bar(surface.as_ref(), overlay.as_ref(), height);
    }

    /// Play the "finished" animation, then hide the bar after the configured
    /// delay.
    pub async fn finish_loading(&self, tab_id: &TabId) {
        let Some(overlay) = self.loading_bar(tab_id) else {
            return;
        };
        if let Err(e) = overlay.execute_script(LOADING_FINISHED_SCRIPT).await {
            log::debug!("Loading bar finish script failed for tab {}: {}", tab_id, e);
        }

        let overlay_id = overlay.id();
        let delay = self.inner.timing.loading_hide_delay;
        let weak = Arc::downgrade(&self.inner);
        let tab = tab_id.clone();

        let mut state = self.inner.state.lock();
        let Some(loaded) = state.tabs.get_mut(tab_id).and_then(TabSlot::as_loaded_mut) else {
            return;
        };
        if loaded.overlay.id() != overlay_id {
            return;
        }
        loaded.hide_timer = Some(TaskGuard::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                ViewManager::from_inner(inner).hide_finished_bar(&tab, overlay_id);
            }
        }));
    }

    /// Timer callback: collapse the bar and put the tab back on top.
    fn hide_finished_bar(&self, tab_id: &TabId, overlay_id: SurfaceId) {
        let Some((surface, overlay, active)) = ({
            let mut state = self.inner.state.lock();
            let active = state.active.as_ref() == Some(tab_id);
            state
                .tabs
                .get_mut(tab_id)
                .and_then(TabSlot::as_loaded_mut)
                .filter(|tab| tab.overlay.id() == overlay_id)
                .map(|tab| {
                    // Running inside this timer; forget it without aborting
                    if let Some(timer) = tab.hide_timer.take() {
                        timer.disarm();
                    }
                    (Arc::clone(&tab.surface), Arc::clone(&tab.overlay), active)
                })
        }) else {
            return;
        };

        overlay.set_bounds(Bounds::ZERO);
        if active {
            self.inner.window.raise(surface.id());
        }
        debug_log!("VIEW", "Loading bar hidden for tab {}", tab_id);
    }

    /// Keep the bar glued to the bottom edge of its tab.
    pub(super) fn place_loading_bar(&self, surface: &dyn Surface, overlay: &dyn Surface, height: i32) {
        overlay.set_bounds(loading_bar_bounds(surface.bounds(), height));
        self.inner.window.raise(overlay.id());
    }

    /// Re-place the bar if `tab_id` is active and loading. Used while the
    /// surface is being animated.
    pub(super) fn track_loading_bar(&self, tab_id: &TabId) {
        let Some((surface, overlay, height)) = ({
            let state = self.inner.state.lock();
            let height = state.layout.loading_bar_height;
            if state.active.as_ref() != Some(tab_id) {
                None
            } else {
                state
                    .tabs
                    .get(tab_id)
                    .and_then(TabSlot::as_loaded)
                    .filter(|tab| tab.loading)
                    .map(|tab| (Arc::clone(&tab.surface), Arc::clone(&tab.overlay), height))
            }
        }) else {
            return;
        };
        self.place_loading_bar(surface.as_ref(), overlay.as_ref(), height);
    }
}
