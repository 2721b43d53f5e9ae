//! Composition root for one browser window.
//!
//! This module contains the glue between the host and the managers:
//! - `Shell`: owns the view, modal and session managers and every store they share
//! - `dispatch`: UI commands and queries routed to the right manager
//! - `titlebar`: cursor polling for the hidden titlebar strip
//!
//! Nothing in here is global. The host builds a [`ShellDeps`], hands it to
//! [`Shell::new`], and forwards window and UI traffic to the returned handle.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use zenium_config::{SettingsStore, ShellConfig, Theme};

use crate::history::HistoryStore;
use crate::host::HostWindow;
use crate::layout::TitlebarReveal;
use crate::modal::ModalManager;
use crate::protocol::{self, SchemeResponse, SiteRegistry};
use crate::session::{RestoreOutcome, SaveReport, SessionManager, ShutdownCoordinator};
use crate::task::TaskGuard;
use crate::ui::{UiBridge, UiEvent};
use crate::update::{UpdateBackend, UpdateOrchestrator};
use crate::view::ViewManager;

mod dispatch;
mod titlebar;

pub use dispatch::{UiCommand, UiQuery};

/// Everything a [`Shell`] is built from.
pub struct ShellDeps {
    pub window: Arc<dyn HostWindow>,
    pub ui: Arc<UiBridge>,
    pub history: Arc<HistoryStore>,
    pub settings: Arc<SettingsStore>,
    pub sites: Arc<SiteRegistry>,
    /// Platform auto-updater, when the build ships one
    pub updates: Option<Arc<dyn UpdateBackend>>,
    pub config: ShellConfig,
    pub session_path: PathBuf,
    /// Directory holding the UI's own stylesheets and scripts
    pub renderer_root: PathBuf,
}

/// Answer to a window close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseResponse {
    /// Keep the window open; the shell quits by itself once the session is saved.
    Prevent,
    /// The shell is already quitting; let the window go.
    Allow,
}

/// Cheap-to-clone handle to one window's shell.
#[derive(Clone)]
pub struct Shell {
    inner: Arc<ShellInner>,
}

struct ShellInner {
    window: Arc<dyn HostWindow>,
    ui: Arc<UiBridge>,
    view: ViewManager,
    modals: ModalManager,
    session: SessionManager,
    history: Arc<HistoryStore>,
    settings: Arc<SettingsStore>,
    sites: Arc<SiteRegistry>,
    updates: Option<UpdateOrchestrator>,
    config: ShellConfig,
    pages_root: PathBuf,
    shutdown: ShutdownCoordinator,
    reveal: Mutex<TitlebarReveal>,
    tasks: Mutex<ShellTasks>,
}

#[derive(Default)]
struct ShellTasks {
    settings_forwarder: Option<TaskGuard>,
    titlebar_poll: Option<TaskGuard>,
    shutdown: Option<JoinHandle<SaveReport>>,
}

impl Shell {
    pub fn new(deps: ShellDeps) -> Self {
        let ShellDeps {
            window,
            ui,
            history,
            settings,
            sites,
            updates,
            config,
            session_path,
            renderer_root,
        } = deps;

        let view = ViewManager::new(
            Arc::clone(&window),
            Arc::clone(&ui),
            history.clone(),
            &config,
        );
        let modals = ModalManager::new(Arc::clone(&window), renderer_root);
        let session = SessionManager::new(session_path, view.clone(), Arc::clone(&ui), &config);
        let updates = updates.map(|backend| UpdateOrchestrator::new(backend, Arc::clone(&ui)));

        window.set_theme(settings.theme());

        Self {
            inner: Arc::new(ShellInner {
                view,
                modals,
                session,
                history,
                settings,
                sites,
                updates,
                pages_root: config.pages_root(),
                shutdown: ShutdownCoordinator::new(config.shutdown_hard_timeout()),
                reveal: Mutex::new(TitlebarReveal::from_config(&config)),
                tasks: Mutex::new(ShellTasks::default()),
                config,
                window,
                ui,
            }),
        }
    }

    pub fn view(&self) -> &ViewManager {
        &self.inner.view
    }

    pub fn modals(&self) -> &ModalManager {
        &self.inner.modals
    }

    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    pub fn config(&self) -> &ShellConfig {
        &self.inner.config
    }

    // ========================================================================
    // Window lifecycle
    // ========================================================================

    /// The UI finished loading: start forwarding setting changes and bring
    /// back the last session, or ask the UI for a first tab.
    pub async fn on_renderer_ready(&self) -> RestoreOutcome {
        self.start_settings_forwarder();

        let outcome = self.inner.session.load_and_restore().await;
        match &outcome {
            RestoreOutcome::Empty => self.inner.ui.notify(UiEvent::CreateInitialTab),
            RestoreOutcome::Restored { .. } => self.inner.modals.raise_all(),
        }
        outcome
    }

    pub fn on_window_resized(&self) {
        self.inner.view.update_active_view_bounds();
    }

    /// Handle a request to close the window.
    ///
    /// The first request is intercepted and starts the save-then-quit
    /// sequence; the host window is quit exactly once when it ends.
    pub fn on_close_requested(&self) -> CloseResponse {
        let shutdown = &self.inner.shutdown;
        if shutdown.is_quitting() {
            return CloseResponse::Allow;
        }
        if !shutdown.intercept_close() {
            return CloseResponse::Prevent;
        }

        log::info!("Close requested, saving session before quitting");
        self.stop_titlebar_polling();

        let shell = self.clone();
        let handle = tokio::spawn(async move {
            let session = shell.inner.session.clone();
            let report = shell
                .inner
                .shutdown
                .run(async move { session.save().await.map(drop) })
                .await;
            shell.inner.window.quit();
            report
        });
        self.inner.tasks.lock().shutdown = Some(handle);
        CloseResponse::Prevent
    }

    /// Wait for a shutdown started by [`on_close_requested`](Self::on_close_requested).
    /// `None` when no shutdown is running.
    pub async fn wait_for_shutdown(&self) -> Option<SaveReport> {
        let handle = self.inner.tasks.lock().shutdown.take()?;
        match handle.await {
            Ok(report) => Some(report),
            Err(e) => {
                log::error!("Shutdown task failed: {}", e);
                None
            }
        }
    }

    pub fn is_quitting(&self) -> bool {
        self.inner.shutdown.is_quitting()
    }

    // ========================================================================
    // Protocols
    // ========================================================================

    /// Resolve a request for one of the shell's own schemes.
    pub fn resolve_scheme(&self, url: &str) -> SchemeResponse {
        if url.starts_with(protocol::ZENIUM_SCHEME) {
            protocol::resolve_zenium(url, &self.inner.pages_root).into()
        } else {
            protocol::resolve_zntp(url, &self.inner.sites).into()
        }
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Relay every persisted setting change to the UI, applying theme changes
    /// to the host window as they pass. Started once.
    fn start_settings_forwarder(&self) {
        let mut tasks = self.inner.tasks.lock();
        if tasks.settings_forwarder.is_some() {
            return;
        }

        let mut changes = self.inner.settings.subscribe();
        let ui = Arc::clone(&self.inner.ui);
        let window = Arc::clone(&self.inner.window);
        tasks.settings_forwarder = Some(TaskGuard::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if change.key == "theme" {
                            let theme: Theme =
                                serde_json::from_value(change.value.clone()).unwrap_or_default();
                            window.set_theme(theme);
                        }
                        ui.notify(UiEvent::SettingUpdated {
                            key: change.key,
                            value: change.value,
                        });
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("Setting forwarder fell behind, {} changes skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
    }
}
