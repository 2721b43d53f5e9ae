//! In-memory host used by the unit and integration tests.
//!
//! [`MockWindow`] records every surface it creates and the attach/raise
//! stacking order. [`MockSurface`] keeps a real back/forward list, records
//! executed scripts, and lets a test inject [`SurfaceEvent`]s with
//! [`MockSurface::emit`]. Navigation never emits events on its own.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use zenium_config::Theme;

use crate::host::{
    HostWindow, InputDisposition, InputFilter, KeyInput, NavigationEntry, NavigationHistory,
    Surface, SurfaceError, SurfaceEvent, SurfaceId, SurfaceKind,
};
use crate::layout::{Bounds, Point, Size};

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

struct SurfaceState {
    bounds: Bounds,
    destroyed: bool,
    history: NavigationHistory,
    title: String,
    favicons: Vec<String>,
    devtools_open: bool,
    focused: bool,
    transparent: bool,
    input_filter: Option<Arc<dyn InputFilter>>,
    scripts: Vec<String>,
    script_result: Result<Value, String>,
    destroy_during_script: bool,
    fail_restore: bool,
    reloads: usize,
}

pub struct MockSurface {
    id: SurfaceId,
    kind: SurfaceKind,
    state: Mutex<SurfaceState>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SurfaceEvent>>>,
}

impl MockSurface {
    fn new(id: SurfaceId, kind: SurfaceKind, fail_restore: bool) -> Self {
        Self {
            id,
            kind,
            state: Mutex::new(SurfaceState {
                bounds: Bounds::ZERO,
                destroyed: false,
                history: NavigationHistory::default(),
                title: String::new(),
                favicons: Vec::new(),
                devtools_open: false,
                focused: false,
                transparent: false,
                input_filter: None,
                scripts: Vec::new(),
                script_result: Ok(Value::Null),
                destroy_during_script: false,
                fail_restore,
                reloads: 0,
            }),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Deliver `event` to every open subscription.
    pub fn emit(&self, event: SurfaceEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Run `input` through the installed filter, then deliver it as a key-down.
    pub fn press_key(&self, input: KeyInput) -> InputDisposition {
        let filter = self.state.lock().input_filter.clone();
        let disposition = filter.map_or(InputDisposition::Pass, |f| f.filter(&input));
        self.emit(SurfaceEvent::KeyDown(input));
        disposition
    }

    pub fn set_title(&self, title: &str) {
        let mut state = self.state.lock();
        state.title = title.to_string();
        let index = state.history.index;
        if let Some(entry) = state.history.entries.get_mut(index) {
            entry.title = Some(title.to_string());
        }
    }

    pub fn set_favicons(&self, favicons: Vec<String>) {
        self.state.lock().favicons = favicons;
    }

    /// Result returned by every subsequent `execute_script`.
    pub fn set_script_result(&self, result: Result<Value, String>) {
        self.state.lock().script_result = result;
    }

    /// Destroy the surface while the next script is being evaluated.
    pub fn destroy_during_next_script(&self) {
        self.state.lock().destroy_during_script = true;
    }

    pub fn scripts(&self) -> Vec<String> {
        self.state.lock().scripts.clone()
    }

    pub fn has_input_filter(&self) -> bool {
        self.state.lock().input_filter.is_some()
    }

    pub fn devtools_open(&self) -> bool {
        self.state.lock().devtools_open
    }

    pub fn is_focused(&self) -> bool {
        self.state.lock().focused
    }

    pub fn is_transparent(&self) -> bool {
        self.state.lock().transparent
    }

    pub fn reload_count(&self) -> usize {
        self.state.lock().reloads
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

#[async_trait]
impl Surface for MockSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn kind(&self) -> SurfaceKind {
        self.kind
    }

    fn set_bounds(&self, bounds: Bounds) {
        let mut state = self.state.lock();
        if !state.destroyed {
            state.bounds = bounds;
        }
    }

    fn bounds(&self) -> Bounds {
        self.state.lock().bounds
    }

    fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    fn destroy(&self) {
        {
            let mut state = self.state.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.bounds = Bounds::ZERO;
        }
        self.emit(SurfaceEvent::Destroyed);
        self.subscribers.lock().clear();
    }

    fn url(&self) -> String {
        let state = self.state.lock();
        if state.destroyed {
            return String::new();
        }
        state
            .history
            .active_entry()
            .map(|entry| entry.url.clone())
            .unwrap_or_default()
    }

    fn title(&self) -> String {
        let state = self.state.lock();
        if state.destroyed {
            String::new()
        } else {
            state.title.clone()
        }
    }

    fn favicons(&self) -> Vec<String> {
        let state = self.state.lock();
        if state.destroyed {
            Vec::new()
        } else {
            state.favicons.clone()
        }
    }

    async fn load_url(&self, url: &str) -> Result<(), SurfaceError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(SurfaceError::Destroyed(self.id));
        }
        let history = &mut state.history;
        if !history.entries.is_empty() {
            history.entries.truncate(history.index + 1);
        }
        history.entries.push(NavigationEntry::new(url, None));
        history.index = history.entries.len() - 1;
        state.title.clear();
        Ok(())
    }

    async fn restore_history(&self, history: &NavigationHistory) -> Result<(), SurfaceError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(SurfaceError::Destroyed(self.id));
        }
        if state.fail_restore {
            return Err(SurfaceError::HistoryRestore("restore refused by mock".to_string()));
        }
        state.history = history.clone();
        state.title = history
            .active_entry()
            .and_then(|entry| entry.title.clone())
            .unwrap_or_default();
        Ok(())
    }

    fn navigation_history(&self) -> NavigationHistory {
        let state = self.state.lock();
        if state.destroyed {
            NavigationHistory::default()
        } else {
            state.history.clone()
        }
    }

    fn can_go_back(&self) -> bool {
        let state = self.state.lock();
        !state.destroyed && state.history.index > 0
    }

    fn go_back(&self) {
        if self.can_go_back() {
            self.state.lock().history.index -= 1;
        }
    }

    fn can_go_forward(&self) -> bool {
        let state = self.state.lock();
        !state.destroyed && state.history.index + 1 < state.history.entries.len()
    }

    fn go_forward(&self) {
        if self.can_go_forward() {
            self.state.lock().history.index += 1;
        }
    }

    fn reload(&self) {
        let mut state = self.state.lock();
        if !state.destroyed {
            state.reloads += 1;
        }
    }

    async fn execute_script(&self, script: &str) -> Result<Value, SurfaceError> {
        let destroy_now = {
            let mut state = self.state.lock();
            if state.destroyed {
                return Err(SurfaceError::Destroyed(self.id));
            }
            state.scripts.push(script.to_string());
            std::mem::take(&mut state.destroy_during_script)
        };

        tokio::task::yield_now().await;
        if destroy_now {
            self.destroy();
            return Err(SurfaceError::Destroyed(self.id));
        }

        let state = self.state.lock();
        if state.destroyed {
            return Err(SurfaceError::Destroyed(self.id));
        }
        state.script_result.clone().map_err(SurfaceError::Script)
    }

    fn toggle_devtools(&self) {
        let mut state = self.state.lock();
        state.devtools_open = !state.devtools_open;
    }

    fn focus(&self) {
        self.state.lock().focused = true;
    }

    fn set_transparent_background(&self) {
        self.state.lock().transparent = true;
    }

    fn set_input_filter(&self, filter: Arc<dyn InputFilter>) {
        self.state.lock().input_filter = Some(filter);
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SurfaceEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if !self.is_destroyed() {
            self.subscribers.lock().push(tx);
        }
        rx
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

pub struct MockWindow {
    content_size: Mutex<Size>,
    outer_bounds: Mutex<Bounds>,
    cursor: Mutex<Point>,
    next_id: AtomicU64,
    surfaces: Mutex<Vec<Arc<MockSurface>>>,
    /// Attached surfaces, bottom to top
    stack: Mutex<Vec<SurfaceId>>,
    theme: Mutex<Option<Theme>>,
    system_dark: AtomicBool,
    fail_next_restore: AtomicBool,
    quits: AtomicUsize,
}

impl MockWindow {
    pub fn new(content_size: Size) -> Arc<Self> {
        Arc::new(Self {
            content_size: Mutex::new(content_size),
            outer_bounds: Mutex::new(Bounds::new(0, 0, content_size.width, content_size.height)),
            cursor: Mutex::new(Point::new(-1, -1)),
            next_id: AtomicU64::new(1),
            surfaces: Mutex::new(Vec::new()),
            stack: Mutex::new(Vec::new()),
            theme: Mutex::new(None),
            system_dark: AtomicBool::new(false),
            fail_next_restore: AtomicBool::new(false),
            quits: AtomicUsize::new(0),
        })
    }

    pub fn set_content_size(&self, size: Size) {
        *self.content_size.lock() = size;
    }

    pub fn set_outer_bounds(&self, bounds: Bounds) {
        *self.outer_bounds.lock() = bounds;
    }

    pub fn set_cursor(&self, point: Point) {
        *self.cursor.lock() = point;
    }

    pub fn set_system_dark(&self, dark: bool) {
        self.system_dark.store(dark, Ordering::SeqCst);
    }

    /// Make the next created tab surface refuse `restore_history`.
    pub fn fail_next_restore(&self) {
        self.fail_next_restore.store(true, Ordering::SeqCst);
    }

    pub fn surface(&self, id: SurfaceId) -> Option<Arc<MockSurface>> {
        self.surfaces.lock().iter().find(|s| s.id == id).cloned()
    }

    /// Every surface of `kind` ever created, oldest first.
    pub fn surfaces(&self, kind: SurfaceKind) -> Vec<Arc<MockSurface>> {
        self.surfaces
            .lock()
            .iter()
            .filter(|s| s.kind == kind)
            .cloned()
            .collect()
    }

    pub fn live_surfaces(&self, kind: SurfaceKind) -> Vec<Arc<MockSurface>> {
        self.surfaces(kind)
            .into_iter()
            .filter(|s| !s.is_destroyed())
            .collect()
    }

    /// Tab surfaces currently occupying screen area.
    pub fn visible_tabs(&self) -> Vec<Arc<MockSurface>> {
        self.live_surfaces(SurfaceKind::Tab)
            .into_iter()
            .filter(|s| !s.bounds().is_hidden())
            .collect()
    }

    pub fn stack(&self) -> Vec<SurfaceId> {
        self.stack.lock().clone()
    }

    pub fn top(&self) -> Option<SurfaceId> {
        self.stack.lock().last().copied()
    }

    pub fn is_attached(&self, id: SurfaceId) -> bool {
        self.stack.lock().contains(&id)
    }

    pub fn theme(&self) -> Option<Theme> {
        *self.theme.lock()
    }

    pub fn quit_count(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }
}

impl HostWindow for MockWindow {
    fn content_size(&self) -> Size {
        *self.content_size.lock()
    }

    fn outer_bounds(&self) -> Bounds {
        *self.outer_bounds.lock()
    }

    fn cursor_position(&self) -> Point {
        *self.cursor.lock()
    }

    fn create_surface(&self, kind: SurfaceKind) -> Arc<dyn Surface> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let fail_restore =
            kind == SurfaceKind::Tab && self.fail_next_restore.swap(false, Ordering::SeqCst);
        let surface = Arc::new(MockSurface::new(id, kind, fail_restore));
        self.surfaces.lock().push(Arc::clone(&surface));
        surface
    }

    fn attach(&self, surface: SurfaceId) {
        let mut stack = self.stack.lock();
        if !stack.contains(&surface) {
            stack.push(surface);
        }
    }

    fn detach(&self, surface: SurfaceId) {
        self.stack.lock().retain(|id| *id != surface);
    }

    fn raise(&self, surface: SurfaceId) {
        let mut stack = self.stack.lock();
        if let Some(pos) = stack.iter().position(|id| *id == surface) {
            let id = stack.remove(pos);
            stack.push(id);
        }
    }

    fn set_theme(&self, theme: Theme) {
        *self.theme.lock() = Some(theme);
    }

    fn uses_dark_colors(&self) -> bool {
        match *self.theme.lock() {
            Some(Theme::Dark) => true,
            Some(Theme::Light) => false,
            Some(Theme::System) | None => self.system_dark.load(Ordering::SeqCst),
        }
    }

    fn quit(&self) {
        self.quits.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_truncates_forward_entries() {
        let window = MockWindow::new(Size::new(800, 600));
        let surface = window.create_surface(SurfaceKind::Tab);
        surface.load_url("https://a.example/").await.unwrap();
        surface.load_url("https://b.example/").await.unwrap();
        surface.go_back();
        surface.load_url("https://c.example/").await.unwrap();

        let history = surface.navigation_history();
        let urls: Vec<_> = history.entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example/", "https://c.example/"]);
        assert_eq!(history.index, 1);
        assert!(!surface.can_go_forward());
    }

    #[tokio::test]
    async fn test_destroyed_surface_fails_async_calls() {
        let window = MockWindow::new(Size::new(800, 600));
        let surface = window.create_surface(SurfaceKind::Tab);
        let mut events = surface.subscribe();
        surface.destroy();

        assert!(matches!(events.recv().await, Some(SurfaceEvent::Destroyed)));
        assert!(events.recv().await.is_none());
        assert!(matches!(
            surface.execute_script("1").await,
            Err(SurfaceError::Destroyed(_))
        ));
        assert_eq!(surface.url(), "");
    }

    #[test]
    fn test_raise_moves_to_top() {
        let window = MockWindow::new(Size::new(800, 600));
        window.attach(1);
        window.attach(2);
        window.raise(1);
        assert_eq!(window.stack(), vec![2, 1]);
        window.detach(1);
        assert_eq!(window.top(), Some(2));
    }
}
