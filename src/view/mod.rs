//! Tab/view lifecycle coordinator.
//!
//! [`ViewManager`] owns one rendering surface per loaded tab, plus the thin
//! loading-bar surface stacked over it. Tabs can be unloaded (surface
//! destroyed, state kept in a [`Placeholder`]) and loaded again any number of
//! times; closing is terminal.
//!
//! Only the active tab ever has non-zero bounds. Every other surface stays
//! attached with zero-sized bounds so switching back is instant.
//!
//! Operations on unknown tab ids are logged and ignored. Errors from surfaces
//! that were destroyed mid-call are treated as "skip this step".

mod animation;
mod events;
mod loading;
mod tab;

pub use tab::{Placeholder, TabCategory, TabId, TabSnapshot};
pub(crate) use tab::{LoadedTab, TabSlot};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use zenium_config::ShellConfig;

use crate::history::HistorySink;
use crate::host::{HostWindow, InputFilter, NavigationHistory, Surface, SurfaceKind};
use crate::keyblocker::KeyBlocker;
use crate::layout::{Bounds, LayoutParams};
use crate::task::TaskGuard;
use crate::ui::{UiBridge, UiEvent};

/// Scheme of the shell's own pages. Loads on it never show the loading bar
/// and are never written to the visit log.
pub const INTERNAL_SCHEME: &str = "zenium://";

/// Page loaded into every loading-bar surface.
pub const LOADING_BAR_URL: &str = "zenium://loading";

/// Best-effort in-page favicon lookup.
const FAVICON_QUERY: &str = r#"(() => {
    const link = document.querySelector('link[rel~="icon"]');
    return link ? link.href : null;
})()"#;

pub fn is_internal_url(url: &str) -> bool {
    url.starts_with(INTERNAL_SCHEME)
}

/// Timing knobs for loading-bar and titlebar animations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTiming {
    pub animation_duration: Duration,
    pub animation_frame: Duration,
    pub loading_hide_delay: Duration,
}

impl ViewTiming {
    pub fn from_config(config: &ShellConfig) -> Self {
        Self {
            animation_duration: config.animation_duration(),
            animation_frame: config.animation_frame(),
            loading_hide_delay: config.loading_hide_delay(),
        }
    }
}

impl Default for ViewTiming {
    fn default() -> Self {
        Self::from_config(&ShellConfig::default())
    }
}

/// Cheap-to-clone handle to the shared tab table.
#[derive(Clone)]
pub struct ViewManager {
    inner: Arc<Inner>,
}

struct Inner {
    window: Arc<dyn HostWindow>,
    ui: Arc<UiBridge>,
    history: Arc<dyn HistorySink>,
    input_filter: Arc<dyn InputFilter>,
    timing: ViewTiming,
    state: Mutex<ViewState>,
}

struct ViewState {
    tabs: HashMap<TabId, TabSlot>,
    active: Option<TabId>,
    layout: LayoutParams,
    /// Running titlebar animation of the active surface
    animation: Option<TaskGuard>,
}

impl ViewManager {
    pub fn new(
        window: Arc<dyn HostWindow>,
        ui: Arc<UiBridge>,
        history: Arc<dyn HistorySink>,
        config: &ShellConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                window,
                ui,
                history,
                input_filter: Arc::new(KeyBlocker::default()),
                timing: ViewTiming::from_config(config),
                state: Mutex::new(ViewState {
                    tabs: HashMap::new(),
                    active: None,
                    layout: LayoutParams::from_config(config),
                    animation: None,
                }),
            }),
        }
    }

    fn from_inner(inner: Arc<Inner>) -> Self {
        Self { inner }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a live tab.
    ///
    /// Both surfaces start hidden; the tab becomes visible on the next
    /// [`switch_tab`](Self::switch_tab). When `history` can be restored the
    /// whole back/forward list is replayed and the active entry loaded;
    /// otherwise `url` is loaded. An id that is already in the table is
    /// ignored with a warning.
    pub async fn new_tab(&self, tab_id: TabId, url: &str, history: Option<NavigationHistory>) {
        let window = &self.inner.window;

        let surface = window.create_surface(SurfaceKind::Tab);
        surface.set_bounds(Bounds::ZERO);
        surface.set_input_filter(Arc::clone(&self.inner.input_filter));

        let overlay = window.create_surface(SurfaceKind::LoadingBar);
        overlay.set_bounds(Bounds::ZERO);

        let events = self.spawn_event_pump(tab_id.clone(), &surface);
        {
            let mut state = self.inner.state.lock();
            if state.tabs.contains_key(&tab_id) {
                drop(state);
                log::warn!("new_tab: tab {} already exists, ignoring", tab_id);
                surface.destroy();
                overlay.destroy();
                return;
            }
            state.tabs.insert(
                tab_id.clone(),
                TabSlot::Loaded(LoadedTab {
                    surface: Arc::clone(&surface),
                    overlay: Arc::clone(&overlay),
                    category: TabCategory::default(),
                    loading: false,
                    _events: events,
                    hide_timer: None,
                }),
            );
        }
        window.attach(surface.id());
        window.attach(overlay.id());
        debug_info!("VIEW", "Created tab {} (surface {})", tab_id, surface.id());

        if let Err(e) = overlay.load_url(LOADING_BAR_URL).await {
            log::debug!("Loading bar page failed for tab {}: {}", tab_id, e);
        }

        match history.filter(NavigationHistory::is_restorable) {
            Some(history) => self.restore_history(&tab_id, &surface, &history).await,
            None => {
                if let Err(e) = surface.load_url(url).await {
                    log::warn!("Tab {} failed to load {}: {}", tab_id, url, e);
                }
            }
        }
    }

    async fn restore_history(
        &self,
        tab_id: &TabId,
        surface: &Arc<dyn Surface>,
        history: &NavigationHistory,
    ) {
        debug_info!(
            "VIEW",
            "Restoring {} history entries at index {} for tab {}",
            history.entries.len(),
            history.index,
            tab_id
        );

        match surface.restore_history(history).await {
            Ok(()) => {
                if surface.is_destroyed() {
                    return;
                }
                self.inner.ui.notify(UiEvent::TabRestored {
                    tab_id: tab_id.clone(),
                    title: surface.title(),
                    url: surface.url(),
                    favicon_url: surface.favicons().into_iter().next(),
                });
            }
            Err(e) => {
                log::warn!("History restore failed for tab {}: {}", tab_id, e);
                if surface.is_destroyed() {
                    return;
                }
                // At least bring back the page the user was on
                if let Some(entry) = history.active_entry()
                    && let Err(e) = surface.load_url(&entry.url).await
                {
                    log::warn!("Fallback load of {} failed for tab {}: {}", entry.url, tab_id, e);
                }
            }
        }
    }

    /// Make `tab_id` the visible tab. An unloaded tab is loaded first.
    pub async fn switch_tab(&self, tab_id: &TabId) {
        let unloaded = matches!(
            self.inner.state.lock().tabs.get(tab_id),
            Some(TabSlot::Unloaded(_))
        );
        if unloaded {
            self.load_tab(tab_id).await;
        } else {
            self.activate(tab_id);
        }
    }

    /// Raise and lay out a loaded tab, hiding every other surface.
    fn activate(&self, tab_id: &TabId) -> bool {
        let (target, others, loading) = {
            let mut state = self.inner.state.lock();
            let Some(tab) = state.tabs.get(tab_id).and_then(TabSlot::as_loaded) else {
                log::debug!("switch_tab: no loaded tab {}", tab_id);
                return false;
            };
            let target = Arc::clone(&tab.surface);
            let loading = tab.loading;

            let others: Vec<_> = state
                .tabs
                .iter()
                .filter(|(id, _)| *id != tab_id)
                .filter_map(|(_, slot)| slot.as_loaded())
                .map(|tab| (Arc::clone(&tab.surface), Arc::clone(&tab.overlay)))
                .collect();

            state.active = Some(tab_id.clone());
            // An animation still running on the previous tab would re-show it
            state.animation = None;
            (target, others, loading)
        };

        self.inner.window.raise(target.id());
        for (surface, overlay) in others {
            surface.set_bounds(Bounds::ZERO);
            overlay.set_bounds(Bounds::ZERO);
        }
        self.update_active_view_bounds();
        if loading {
            self.show_loading_overlay(tab_id);
        }

        if !target.is_destroyed() {
            self.inner.ui.notify(UiEvent::UrlUpdated {
                tab_id: tab_id.clone(),
                url: target.url(),
            });
        }
        debug_info!("VIEW", "Switched to tab {}", tab_id);
        true
    }

    /// Destroy a tab's surfaces and forget it entirely. Safe to call for
    /// unknown or already closed tabs.
    pub fn close_tab(&self, tab_id: &TabId) {
        let removed = {
            let mut state = self.inner.state.lock();
            let removed = state.tabs.remove(tab_id);
            if state.active.as_ref() == Some(tab_id) {
                state.active = None;
                state.animation = None;
            }
            removed
        };

        match removed {
            Some(TabSlot::Loaded(tab)) => {
                self.teardown(tab);
                debug_info!("VIEW", "Closed tab {}", tab_id);
            }
            Some(TabSlot::Unloaded(_)) => {
                debug_info!("VIEW", "Discarded unloaded tab {}", tab_id);
            }
            None => log::debug!("close_tab: unknown tab {}", tab_id),
        }
    }

    /// Detach and destroy both surfaces. Dropping the record aborts the
    /// event pump and any pending hide timer.
    fn teardown(&self, tab: LoadedTab) {
        for surface in [&tab.surface, &tab.overlay] {
            self.inner.window.detach(surface.id());
            if !surface.is_destroyed() {
                surface.destroy();
            }
        }
    }

    /// Free a tab's surface, keeping enough state to bring it back.
    ///
    /// The favicon is queried before the surface is destroyed; a failed
    /// query leaves the placeholder without one.
    pub async fn unload_tab(&self, tab_id: &TabId) {
        let Some(surface) = self.loaded_surface(tab_id) else {
            log::debug!("unload_tab: no loaded tab {}", tab_id);
            return;
        };

        let favicon_url = query_favicon(surface.as_ref()).await;
        if surface.is_destroyed() {
            log::debug!("unload_tab: surface of tab {} destroyed meanwhile", tab_id);
            return;
        }

        let url = surface.url();
        let mut history = surface.navigation_history();
        if history.is_empty() && !url.is_empty() {
            history = NavigationHistory::single(url.as_str());
        }

        let removed = {
            let mut state = self.inner.state.lock();
            let category = match state.tabs.get(tab_id).and_then(TabSlot::as_loaded) {
                Some(tab) if tab.surface_id() == surface.id() => tab.category,
                _ => {
                    log::debug!("unload_tab: tab {} changed while querying favicon", tab_id);
                    return;
                }
            };
            let placeholder = Placeholder {
                url,
                history,
                favicon_url,
                category,
            };
            let removed = state
                .tabs
                .insert(tab_id.clone(), TabSlot::Unloaded(placeholder));
            if state.active.as_ref() == Some(tab_id) {
                state.active = None;
                state.animation = None;
            }
            removed
        };

        if let Some(TabSlot::Loaded(tab)) = removed {
            self.teardown(tab);
        }
        self.inner.ui.notify(UiEvent::TabUnloaded {
            tab_id: tab_id.clone(),
        });
        debug_info!("VIEW", "Unloaded tab {}", tab_id);
    }

    /// Recreate an unloaded tab from its placeholder and switch to it.
    pub async fn load_tab(&self, tab_id: &TabId) {
        let placeholder = {
            let mut state = self.inner.state.lock();
            if matches!(state.tabs.get(tab_id), Some(TabSlot::Unloaded(_))) {
                match state.tabs.remove(tab_id) {
                    Some(TabSlot::Unloaded(placeholder)) => Some(placeholder),
                    _ => None,
                }
            } else {
                None
            }
        };
        let Some(placeholder) = placeholder else {
            log::debug!("load_tab: tab {} is not unloaded", tab_id);
            return;
        };

        self.new_tab(
            tab_id.clone(),
            &placeholder.url,
            Some(placeholder.history.clone()),
        )
        .await;
        self.set_category(tab_id, placeholder.category);

        // The fresh surface has not fetched its favicon yet
        if let Some(favicon_url) = placeholder.favicon_url {
            self.inner.ui.notify(UiEvent::FaviconUpdated {
                tab_id: tab_id.clone(),
                favicon_url,
            });
        }
        self.inner.ui.notify(UiEvent::TabLoaded {
            tab_id: tab_id.clone(),
        });
        self.activate(tab_id);
    }

    /// Add an unloaded placeholder without ever creating a surface.
    ///
    /// Returns false if the id is already in the table.
    pub fn register_unloaded(&self, tab_id: TabId, placeholder: Placeholder) -> bool {
        let mut state = self.inner.state.lock();
        if state.tabs.contains_key(&tab_id) {
            log::warn!("register_unloaded: tab {} already exists", tab_id);
            return false;
        }
        state.tabs.insert(tab_id, TabSlot::Unloaded(placeholder));
        true
    }

    pub fn set_category(&self, tab_id: &TabId, category: TabCategory) {
        let mut state = self.inner.state.lock();
        match state.tabs.get_mut(tab_id) {
            Some(TabSlot::Loaded(tab)) => tab.category = category,
            Some(TabSlot::Unloaded(placeholder)) => placeholder.category = category,
            None => log::debug!("set_category: unknown tab {}", tab_id),
        }
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub async fn navigate(&self, tab_id: &TabId, url: &str) {
        let Some(surface) = self.loaded_surface(tab_id) else {
            log::debug!("navigate: no loaded tab {}", tab_id);
            return;
        };
        if let Err(e) = surface.load_url(url).await {
            log::warn!("Tab {} failed to navigate to {}: {}", tab_id, url, e);
        }
    }

    pub fn go_back(&self, tab_id: &TabId) {
        if let Some(surface) = self.loaded_surface(tab_id)
            && surface.can_go_back()
        {
            surface.go_back();
        }
    }

    pub fn go_forward(&self, tab_id: &TabId) {
        if let Some(surface) = self.loaded_surface(tab_id)
            && surface.can_go_forward()
        {
            surface.go_forward();
        }
    }

    pub fn reload(&self, tab_id: &TabId) {
        if let Some(surface) = self.loaded_surface(tab_id) {
            surface.reload();
        }
    }

    // ========================================================================
    // Layout
    // ========================================================================

    /// Apply a sidebar width chosen by the UI (clamped to the supported range).
    pub fn update_sidebar_width(&self, width: f64) {
        let width = zenium_config::clamp_sidebar_width(width).round() as i32;
        self.inner.state.lock().layout.sidebar_width = width;
        self.update_active_view_bounds();
    }

    /// Recompute the active surface's bounds for the current window size.
    pub fn update_active_view_bounds(&self) {
        let Some((surface, overlay, loading, layout)) = ({
            let state = self.inner.state.lock();
            state
                .active
                .as_ref()
                .and_then(|id| state.tabs.get(id))
                .and_then(TabSlot::as_loaded)
                .map(|tab| {
                    (
                        Arc::clone(&tab.surface),
                        Arc::clone(&tab.overlay),
                        tab.loading,
                        state.layout,
                    )
                })
        }) else {
            return;
        };

        let content = self.inner.window.content_size();
        surface.set_bounds(layout.active_view_bounds(content, surface.bounds()));
        if loading {
            self.place_loading_bar(surface.as_ref(), overlay.as_ref(), layout.loading_bar_height);
        }
    }

    pub fn layout(&self) -> LayoutParams {
        self.inner.state.lock().layout
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn active_tab_id(&self) -> Option<TabId> {
        self.inner.state.lock().active.clone()
    }

    pub fn active_surface(&self) -> Option<Arc<dyn Surface>> {
        let state = self.inner.state.lock();
        state
            .active
            .as_ref()
            .and_then(|id| state.tabs.get(id))
            .and_then(TabSlot::as_loaded)
            .map(|tab| Arc::clone(&tab.surface))
    }

    /// Live surface of a loaded tab.
    pub fn loaded_surface(&self, tab_id: &TabId) -> Option<Arc<dyn Surface>> {
        self.inner
            .state
            .lock()
            .tabs
            .get(tab_id)
            .and_then(TabSlot::as_loaded)
            .map(|tab| Arc::clone(&tab.surface))
    }

    pub fn loading_bar(&self, tab_id: &TabId) -> Option<Arc<dyn Surface>> {
        self.inner
            .state
            .lock()
            .tabs
            .get(tab_id)
            .and_then(TabSlot::as_loaded)
            .map(|tab| Arc::clone(&tab.overlay))
    }

    pub fn placeholder(&self, tab_id: &TabId) -> Option<Placeholder> {
        match self.inner.state.lock().tabs.get(tab_id) {
            Some(TabSlot::Unloaded(placeholder)) => Some(placeholder.clone()),
            _ => None,
        }
    }

    pub fn contains(&self, tab_id: &TabId) -> bool {
        self.inner.state.lock().tabs.contains_key(tab_id)
    }

    pub fn is_loaded(&self, tab_id: &TabId) -> bool {
        matches!(
            self.inner.state.lock().tabs.get(tab_id),
            Some(TabSlot::Loaded(_))
        )
    }

    pub fn is_unloaded(&self, tab_id: &TabId) -> bool {
        matches!(
            self.inner.state.lock().tabs.get(tab_id),
            Some(TabSlot::Unloaded(_))
        )
    }

    pub fn is_loading(&self, tab_id: &TabId) -> bool {
        self.inner
            .state
            .lock()
            .tabs
            .get(tab_id)
            .and_then(TabSlot::as_loaded)
            .is_some_and(|tab| tab.loading)
    }

    pub fn tab_count(&self) -> usize {
        self.inner.state.lock().tabs.len()
    }

    /// Every tab, sorted by id.
    pub fn snapshots(&self) -> Vec<TabSnapshot> {
        let state = self.inner.state.lock();
        let mut snapshots: Vec<_> = state
            .tabs
            .iter()
            .map(|(tab_id, slot)| match slot {
                TabSlot::Loaded(tab) => TabSnapshot::Loaded {
                    tab_id: tab_id.clone(),
                    surface: Arc::clone(&tab.surface),
                    category: tab.category,
                },
                TabSlot::Unloaded(placeholder) => TabSnapshot::Unloaded {
                    tab_id: tab_id.clone(),
                    placeholder: placeholder.clone(),
                },
            })
            .collect();
        snapshots.sort_by(|a, b| a.tab_id().cmp(b.tab_id()));
        snapshots
    }
}

/// Ask the page for its favicon, falling back to what the host reported.
///
/// Never fails: a destroyed surface or a throwing script yields `None`.
pub(crate) async fn query_favicon(surface: &dyn Surface) -> Option<String> {
    match surface.execute_script(FAVICON_QUERY).await {
        Ok(Value::String(url)) if !url.is_empty() => return Some(url),
        Ok(_) => {}
        Err(e) => {
            log::debug!("Favicon query failed on surface {}: {}", surface.id(), e);
        }
    }
    if surface.is_destroyed() {
        return None;
    }
    surface.favicons().into_iter().next()
}
