//! Floating, frameless overlay surfaces.
//!
//! Modals are keyed by a caller-chosen id. Showing a modal whose id is
//! already open replaces it, so one id never owns two surfaces. A modal goes
//! away on explicit close, on focus loss (unless disabled), or when its
//! surface is destroyed by the host.

mod document;

pub use document::{escape_html, Markup, ModalDocument};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;

use crate::host::{HostWindow, Surface, SurfaceEvent, SurfaceId, SurfaceKind};
use crate::layout::Bounds;
use crate::task::TaskGuard;

/// Stylesheet shared by the main UI and every modal, relative to the
/// renderer directory.
pub const GLOBAL_STYLESHEET: &str = "styles.css";

fn default_close_on_blur() -> bool {
    true
}

/// Parameters of [`ModalManager::show`], as sent by the UI.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalOptions {
    pub id: String,
    /// Body markup authored by the shell UI. Inserted verbatim.
    #[serde(default)]
    pub content: String,
    /// Plain text shown above the content. Always escaped.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "default_close_on_blur")]
    pub close_on_blur: bool,
    /// Stylesheets to inline, relative to the renderer directory
    #[serde(default)]
    pub css_paths: Vec<String>,
    /// Scripts to inline, relative to the renderer directory
    #[serde(default)]
    pub js_paths: Vec<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ModalOptions {
    pub fn new(id: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            id: id.into(),
            content: String::new(),
            message: None,
            close_on_blur: true,
            css_paths: Vec::new(),
            js_paths: Vec::new(),
            x: bounds.x as f64,
            y: bounds.y as f64,
            width: bounds.width as f64,
            height: bounds.height as f64,
        }
    }

    /// Rectangle relative to the main window's content area.
    pub fn bounds(&self) -> Bounds {
        Bounds::new(
            self.x.round() as i32,
            self.y.round() as i32,
            self.width.round() as i32,
            self.height.round() as i32,
        )
    }
}

struct ModalRecord {
    surface: Arc<dyn Surface>,
    /// Creation order, used to keep the stacking stable on re-raise
    seq: u64,
    events: TaskGuard,
}

#[derive(Default)]
struct ModalState {
    modals: HashMap<String, ModalRecord>,
    by_surface: HashMap<SurfaceId, String>,
    next_seq: u64,
}

impl ModalState {
    fn take(&mut self, id: &str) -> Option<ModalRecord> {
        let record = self.modals.remove(id)?;
        self.by_surface.remove(&record.surface.id());
        Some(record)
    }
}

/// Cheap-to-clone handle to the set of open modals.
#[derive(Clone)]
pub struct ModalManager {
    inner: Arc<ModalInner>,
}

struct ModalInner {
    window: Arc<dyn HostWindow>,
    renderer_root: PathBuf,
    /// Read once at construction
    global_css: String,
    state: Mutex<ModalState>,
}

impl ModalManager {
    pub fn new(window: Arc<dyn HostWindow>, renderer_root: impl Into<PathBuf>) -> Self {
        let renderer_root = renderer_root.into();
        let global_css = match std::fs::read_to_string(renderer_root.join(GLOBAL_STYLESHEET)) {
            Ok(css) => css,
            Err(e) => {
                log::warn!(
                    "Global modal stylesheet unavailable in {:?}: {}",
                    renderer_root,
                    e
                );
                String::new()
            }
        };

        Self {
            inner: Arc::new(ModalInner {
                window,
                renderer_root,
                global_css,
                state: Mutex::new(ModalState::default()),
            }),
        }
    }

    /// Create and display a modal, replacing any open modal with the same id.
    pub async fn show(&self, options: ModalOptions) {
        self.close(&options.id);

        let window = &self.inner.window;
        let surface = window.create_surface(SurfaceKind::Modal);
        surface.set_transparent_background();

        // Subscribe before loading so the load-finished focus is never missed
        let events = self.spawn_event_pump(options.id.clone(), &surface, options.close_on_blur);

        let replaced = {
            let mut state = self.inner.state.lock();
            // A concurrent show for the same id may have landed meanwhile
            let replaced = state.take(&options.id);
            let seq = state.next_seq;
            state.next_seq += 1;
            state.by_surface.insert(surface.id(), options.id.clone());
            state.modals.insert(
                options.id.clone(),
                ModalRecord {
                    surface: Arc::clone(&surface),
                    seq,
                    events,
                },
            );
            replaced
        };
        if let Some(record) = replaced {
            self.teardown(record);
        }

        window.attach(surface.id());
        surface.set_bounds(options.bounds());
        debug_info!(
            "MODAL",
            "Showing modal '{}' (surface {}) at {:?}",
            options.id,
            surface.id(),
            options.bounds()
        );

        let document = self.build_document(&options);
        if let Err(e) = surface.load_url(&document.to_data_url()).await {
            log::warn!("Modal '{}' failed to load its document: {}", options.id, e);
        }
    }

    fn build_document(&self, options: &ModalOptions) -> ModalDocument {
        let mut body = Vec::new();
        if let Some(message) = &options.message {
            body.push(Markup::Trusted("<p class=\"modal-message\">".to_string()));
            body.push(Markup::Text(message.clone()));
            body.push(Markup::Trusted("</p>".to_string()));
        }
        body.push(Markup::Trusted(options.content.clone()));

        ModalDocument {
            global_css: self.inner.global_css.clone(),
            stylesheets: self.read_fragments(&options.css_paths),
            scripts: self.read_fragments(&options.js_paths),
            body,
        }
    }

    /// Read auxiliary files under the renderer directory. Unreadable or
    /// out-of-tree paths are logged and left out.
    fn read_fragments(&self, relative_paths: &[String]) -> Vec<String> {
        relative_paths
            .iter()
            .filter_map(|relative| {
                let path = match zenium_config::paths::confine(&self.inner.renderer_root, Path::new(relative)) {
                    Ok(path) => path,
                    Err(e) => {
                        log::error!("Rejected modal resource {:?}: {}", relative, e);
                        return None;
                    }
                };
                match std::fs::read_to_string(&path) {
                    Ok(contents) => Some(contents),
                    Err(e) => {
                        log::error!("Failed to read modal resource {:?}: {}", path, e);
                        None
                    }
                }
            })
            .collect()
    }

    fn spawn_event_pump(&self, id: String, surface: &Arc<dyn Surface>, close_on_blur: bool) -> TaskGuard {
        let mut events = surface.subscribe();
        let surface_id = surface.id();
        let weak = Arc::downgrade(&self.inner);

        TaskGuard::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let manager = ModalManager { inner };
                match event {
                    SurfaceEvent::LoadFinished => {
                        if let Some(surface) = manager.current_surface(&id, surface_id) {
                            surface.focus();
                        }
                    }
                    SurfaceEvent::Blurred if close_on_blur => {
                        debug_log!("MODAL", "Modal '{}' lost focus", id);
                        manager.close_from_pump(&id, surface_id);
                        break;
                    }
                    SurfaceEvent::Destroyed => {
                        manager.close_from_pump(&id, surface_id);
                        break;
                    }
                    _ => {}
                }
            }
        })
    }

    fn current_surface(&self, id: &str, surface_id: SurfaceId) -> Option<Arc<dyn Surface>> {
        self.inner
            .state
            .lock()
            .modals
            .get(id)
            .filter(|record| record.surface.id() == surface_id)
            .map(|record| Arc::clone(&record.surface))
    }

    /// Close `id` from inside its own event pump, if `surface_id` is still
    /// the modal's surface.
    fn close_from_pump(&self, id: &str, surface_id: SurfaceId) {
        let record = {
            let mut state = self.inner.state.lock();
            state.by_surface.remove(&surface_id);
            match state.modals.get(id) {
                Some(record) if record.surface.id() == surface_id => state.take(id),
                _ => None,
            }
        };
        if let Some(ModalRecord { surface, events, .. }) = record {
            // Running inside this pump; aborting it here would be a no-op at best
            events.disarm();
            self.destroy_surface(surface.as_ref());
            debug_info!("MODAL", "Closed modal '{}'", id);
        }
    }

    /// Destroy the surface; dropping the record aborts its event pump.
    fn teardown(&self, record: ModalRecord) {
        self.destroy_surface(record.surface.as_ref());
    }

    fn destroy_surface(&self, surface: &dyn Surface) {
        self.inner.window.detach(surface.id());
        if !surface.is_destroyed() {
            surface.destroy();
        }
    }

    /// Close and destroy a modal. Unknown ids are ignored.
    pub fn close(&self, id: &str) {
        let record = self.inner.state.lock().take(id);
        if let Some(record) = record {
            self.teardown(record);
            debug_info!("MODAL", "Closed modal '{}'", id);
        }
    }

    /// Close whichever modal owns `surface_id` (a modal asking to close itself).
    pub fn close_by_surface(&self, surface_id: SurfaceId) {
        let id = self.inner.state.lock().by_surface.get(&surface_id).cloned();
        match id {
            Some(id) => self.close(&id),
            None => log::debug!("close_by_surface: surface {} is not a modal", surface_id),
        }
    }

    pub fn close_all(&self) {
        let records: Vec<_> = {
            let mut state = self.inner.state.lock();
            state.by_surface.clear();
            state.modals.drain().map(|(_, record)| record).collect()
        };
        let count = records.len();
        for record in records {
            self.teardown(record);
        }
        if count > 0 {
            debug_info!("MODAL", "Closed all {} modals", count);
        }
    }

    /// Content-driven resize: set the height of the modal owning
    /// `surface_id`, keeping its position and width.
    pub fn resize(&self, surface_id: SurfaceId, height: f64) {
        let surface = {
            let state = self.inner.state.lock();
            state
                .by_surface
                .get(&surface_id)
                .and_then(|id| state.modals.get(id))
                .map(|record| Arc::clone(&record.surface))
        };
        let Some(surface) = surface else {
            log::error!("resize: no modal owns surface {}", surface_id);
            return;
        };

        let bounds = Bounds {
            height: height.round() as i32,
            ..surface.bounds()
        };
        debug_log!("MODAL", "Resizing surface {} to {:?}", surface_id, bounds);
        surface.set_bounds(bounds);
    }

    /// Put every modal back above the tab surfaces, oldest first.
    pub fn raise_all(&self) {
        let mut surfaces: Vec<_> = self
            .inner
            .state
            .lock()
            .modals
            .values()
            .map(|record| (record.seq, record.surface.id()))
            .collect();
        surfaces.sort_unstable();
        for (_, surface_id) in surfaces {
            self.inner.window.raise(surface_id);
        }
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.inner.state.lock().modals.contains_key(id)
    }

    pub fn count(&self) -> usize {
        self.inner.state.lock().modals.len()
    }

    pub fn surface(&self, id: &str) -> Option<Arc<dyn Surface>> {
        self.inner
            .state
            .lock()
            .modals
            .get(id)
            .map(|record| Arc::clone(&record.surface))
    }

    /// Modal id owning `surface_id`, if any.
    pub fn id_for_surface(&self, surface_id: SurfaceId) -> Option<String> {
        self.inner.state.lock().by_surface.get(&surface_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_ui_payload() {
        let options: ModalOptions = serde_json::from_str(
            r#"{"id":"url-input","content":"<input>","x":10.4,"y":20,"width":300.6,"height":40,"cssPaths":["urlInput/urlInput.css"]}"#,
        )
        .unwrap();
        assert!(options.close_on_blur);
        assert_eq!(options.css_paths, vec!["urlInput/urlInput.css"]);
        assert_eq!(options.bounds(), Bounds::new(10, 20, 301, 40));
    }

    #[test]
    fn test_close_on_blur_can_be_disabled() {
        let options: ModalOptions = serde_json::from_str(
            r#"{"id":"settings","closeOnBlur":false,"x":0,"y":0,"width":1,"height":1}"#,
        )
        .unwrap();
        assert!(!options.close_on_blur);
        assert!(options.content.is_empty());
    }
}
