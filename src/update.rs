//! Update orchestration contract.
//!
//! Checking, downloading and installing are done by a host-provided
//! [`UpdateBackend`] (typically the platform auto-update component). The
//! shell only drives it and forwards every lifecycle event to the UI
//! unchanged.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::ui::{UiBridge, UiEvent};

/// Information about an available update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    /// The new version available
    pub version: String,
    /// Release notes, if the backend provides them
    #[serde(default)]
    pub release_notes: Option<String>,
    /// When the release was published
    #[serde(default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgress {
    pub percent: f64,
    pub transferred: u64,
    pub total: u64,
    pub bytes_per_second: u64,
}

/// Lifecycle event forwarded to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum UpdateEvent {
    InfoAvailable(UpdateInfo),
    NotAvailable,
    DownloadProgress(DownloadProgress),
    DownloadComplete,
    Error(String),
}

#[async_trait]
pub trait UpdateBackend: Send + Sync {
    /// `Some` when a newer version exists.
    async fn check(&self) -> Result<Option<UpdateInfo>>;

    /// Download the update found by the last check, reporting progress.
    async fn download(&self, progress: mpsc::UnboundedSender<DownloadProgress>) -> Result<()>;

    /// Quit and install the downloaded update.
    fn install(&self) -> Result<()>;
}

pub struct UpdateOrchestrator {
    backend: Arc<dyn UpdateBackend>,
    ui: Arc<UiBridge>,
}

impl UpdateOrchestrator {
    pub fn new(backend: Arc<dyn UpdateBackend>, ui: Arc<UiBridge>) -> Self {
        Self { backend, ui }
    }

    fn emit(&self, event: UpdateEvent) {
        self.ui.notify(UiEvent::Update { update: event });
    }

    pub async fn check(&self) {
        match self.backend.check().await {
            Ok(Some(info)) => {
                log::info!("Update available: {}", info.version);
                self.emit(UpdateEvent::InfoAvailable(info));
            }
            Ok(None) => self.emit(UpdateEvent::NotAvailable),
            Err(e) => {
                log::warn!("Update check failed: {:#}", e);
                self.emit(UpdateEvent::Error(format!("{e:#}")));
            }
        }
    }

    pub async fn download(&self) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let download = self.backend.download(tx);
        tokio::pin!(download);

        // Forward progress while the download runs, then drain what is left
        let result = loop {
            tokio::select! {
                result = &mut download => break result,
                Some(progress) = rx.recv() => self.emit(UpdateEvent::DownloadProgress(progress)),
            }
        };
        while let Ok(progress) = rx.try_recv() {
            self.emit(UpdateEvent::DownloadProgress(progress));
        }

        match result {
            Ok(()) => self.emit(UpdateEvent::DownloadComplete),
            Err(e) => {
                log::warn!("Update download failed: {:#}", e);
                self.emit(UpdateEvent::Error(format!("{e:#}")));
            }
        }
    }

    pub fn install(&self) {
        if let Err(e) = self.backend.install() {
            log::error!("Update install failed: {:#}", e);
            self.emit(UpdateEvent::Error(format!("{e:#}")));
        }
    }
}
