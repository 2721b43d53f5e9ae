//! Shared integration test helpers for zenium.
//!
//! Builds the managers over the in-crate mock host and gives tests a
//! scripted stand-in for the UI layer.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::{Harness, settle};
//! ```
//!
//! The `#![allow(dead_code)]` below suppresses warnings when only a subset
//! of helpers is used per test binary.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use zenium::history::HistoryStore;
use zenium::host::SurfaceKind;
use zenium::layout::Size;
use zenium::protocol::SiteRegistry;
use zenium::task::TaskGuard;
use zenium::testing::{MockSurface, MockWindow};
use zenium::ui::{UiBridge, UiEvent, UiMessage, UiRequest};
use zenium::update::UpdateBackend;
use zenium::{Shell, ShellDeps, TabId, ViewManager};
use zenium_config::{SettingsStore, ShellConfig};

pub const WINDOW_SIZE: Size = Size::new(1200, 800);

/// Let spawned event pumps and timers run to quiescence.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Everything a UI answered and was told, recorded by [`ScriptedUi`].
#[derive(Clone, Default)]
pub struct UiLog(Arc<Mutex<Vec<UiMessage>>>);

impl UiLog {
    pub fn messages(&self) -> Vec<UiMessage> {
        self.0.lock().clone()
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.0
            .lock()
            .iter()
            .filter_map(|msg| match msg {
                UiMessage::Notify { event } => Some(event.clone()),
                UiMessage::Request { .. } => None,
            })
            .collect()
    }

    pub fn requests(&self) -> Vec<UiRequest> {
        self.0
            .lock()
            .iter()
            .filter_map(|msg| match msg {
                UiMessage::Request { request, .. } => Some(request.clone()),
                UiMessage::Notify { .. } => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// A fake UI: answers each request with `answer(request)` (no answer when it
/// returns `None`) and records all traffic.
pub struct ScriptedUi {
    pub log: UiLog,
    _task: TaskGuard,
}

impl ScriptedUi {
    pub fn spawn<F>(ui: Arc<UiBridge>, mut rx: mpsc::UnboundedReceiver<UiMessage>, answer: F) -> Self
    where
        F: Fn(&UiRequest) -> Option<Value> + Send + 'static,
    {
        let log = UiLog::default();
        let sink = log.clone();
        let task = TaskGuard::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let UiMessage::Request { id, request } = &msg
                    && let Some(value) = answer(request)
                {
                    ui.respond(*id, value);
                }
                sink.0.lock().push(msg);
            }
        });
        Self { log, _task: task }
    }
}

/// Answer every request the way a cooperative UI would: acks for row
/// creation, the given order for `get-tab-order`, an empty category map.
pub fn cooperative_answer(order: Vec<&str>) -> impl Fn(&UiRequest) -> Option<Value> + Send + 'static {
    let order: Vec<String> = order.into_iter().map(str::to_string).collect();
    move |request| match request {
        UiRequest::GetTabOrder => Some(serde_json::json!(order)),
        UiRequest::GetTabStates => Some(serde_json::json!({})),
        UiRequest::CreateTab { .. } | UiRequest::CreateUnloadedTab { .. } => {
            Some(Value::Bool(true))
        }
    }
}

/// A view manager over a mock window, with a scripted UI.
pub struct Harness {
    pub window: Arc<MockWindow>,
    pub ui: Arc<UiBridge>,
    pub history: Arc<HistoryStore>,
    pub view: ViewManager,
    pub config: ShellConfig,
    pub log: UiLog,
    _scripted: ScriptedUi,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_answers(cooperative_answer(Vec::new()))
    }

    pub fn with_answers<F>(answer: F) -> Self
    where
        F: Fn(&UiRequest) -> Option<Value> + Send + 'static,
    {
        let config = ShellConfig::default();
        let window = MockWindow::new(WINDOW_SIZE);
        let (ui, rx) = UiBridge::new();
        let ui = Arc::new(ui);
        let history = Arc::new(HistoryStore::in_memory());
        let view = ViewManager::new(window.clone(), Arc::clone(&ui), history.clone(), &config);
        let scripted = ScriptedUi::spawn(Arc::clone(&ui), rx, answer);

        Self {
            window,
            ui,
            history,
            view,
            config,
            log: scripted.log.clone(),
            _scripted: scripted,
        }
    }

    /// The mock behind a loaded tab's surface.
    pub fn tab_surface(&self, tab_id: &str) -> Arc<MockSurface> {
        let surface = self
            .view
            .loaded_surface(&TabId::from(tab_id))
            .expect("tab is not loaded");
        self.window.surface(surface.id()).expect("surface not created by the mock")
    }

    pub fn loading_bar(&self, tab_id: &str) -> Arc<MockSurface> {
        let surface = self
            .view
            .loading_bar(&TabId::from(tab_id))
            .expect("tab is not loaded");
        self.window.surface(surface.id()).expect("surface not created by the mock")
    }

    /// Open a tab and make it the active one.
    pub async fn open(&self, tab_id: &str, url: &str) -> Arc<MockSurface> {
        let id = TabId::from(tab_id);
        self.view.new_tab(id.clone(), url, None).await;
        self.view.switch_tab(&id).await;
        self.tab_surface(tab_id)
    }

    pub fn live_tabs(&self) -> usize {
        self.window.live_surfaces(SurfaceKind::Tab).len()
    }
}

/// Scratch directory with a renderer root holding a global stylesheet.
pub fn renderer_root() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(
        temp.path().join(zenium::modal::GLOBAL_STYLESHEET),
        ":root { --accent: #7aa2f7; }",
    )
    .expect("Failed to write stylesheet");
    temp
}

/// A whole [`Shell`] over a mock window, with every store rooted in a
/// scratch directory.
pub struct ShellHarness {
    pub window: Arc<MockWindow>,
    pub ui: Arc<UiBridge>,
    pub shell: Shell,
    pub history: Arc<HistoryStore>,
    pub settings: Arc<SettingsStore>,
    pub sites: Arc<SiteRegistry>,
    pub log: UiLog,
    pub temp: TempDir,
    _scripted: ScriptedUi,
}

impl ShellHarness {
    pub fn new() -> Self {
        Self::build(ShellConfig::default(), cooperative_answer(Vec::new()), None)
    }

    pub fn build<F>(config: ShellConfig, answer: F, updates: Option<Arc<dyn UpdateBackend>>) -> Self
    where
        F: Fn(&UiRequest) -> Option<Value> + Send + 'static,
    {
        let temp = renderer_root();
        let config = ShellConfig {
            pages_root: Some(temp.path().join("pages")),
            ..config
        };

        let window = MockWindow::new(WINDOW_SIZE);
        let (ui, rx) = UiBridge::new();
        let ui = Arc::new(ui);
        let history = Arc::new(HistoryStore::in_memory());
        let settings = Arc::new(SettingsStore::open_at(temp.path().join("settings.json")));
        let sites = Arc::new(SiteRegistry::open_at(temp.path().join("zntp-sites.json")));

        let shell = Shell::new(ShellDeps {
            window: window.clone(),
            ui: Arc::clone(&ui),
            history: history.clone(),
            settings: settings.clone(),
            sites: sites.clone(),
            updates,
            config,
            session_path: temp.path().join("session.json"),
            renderer_root: temp.path().to_path_buf(),
        });
        let scripted = ScriptedUi::spawn(Arc::clone(&ui), rx, answer);

        Self {
            window,
            ui,
            shell,
            history,
            settings,
            sites,
            log: scripted.log.clone(),
            temp,
            _scripted: scripted,
        }
    }

    pub fn session_path(&self) -> std::path::PathBuf {
        self.temp.path().join("session.json")
    }

    /// The mock behind a loaded tab's surface.
    pub fn tab_surface(&self, tab_id: &str) -> Arc<MockSurface> {
        let surface = self
            .shell
            .view()
            .loaded_surface(&TabId::from(tab_id))
            .expect("tab is not loaded");
        self.window.surface(surface.id()).expect("surface not created by the mock")
    }
}
