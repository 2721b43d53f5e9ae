//! Shell configuration loaded from `config.yaml`.
//!
//! Every field carries a serde default, so a partial file (or no file) yields
//! a usable configuration.

use crate::error::ConfigError;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellConfig {
    // ========================================================================
    // Layout
    // ========================================================================
    /// Initial sidebar width in logical pixels
    #[serde(default = "crate::defaults::sidebar_width")]
    pub sidebar_width: f64,

    /// Gap between the window edge and the tab surface
    #[serde(default = "crate::defaults::view_padding")]
    pub view_padding: f64,

    /// Width of the sidebar drag handle
    #[serde(default = "crate::defaults::resize_handle_width")]
    pub resize_handle_width: f64,

    /// Tab surface top offset while the titlebar strip is hidden
    #[serde(default = "crate::defaults::titlebar_collapsed_y")]
    pub titlebar_collapsed_y: f64,

    /// Tab surface top offset while the titlebar strip is revealed
    #[serde(default = "crate::defaults::titlebar_expanded_y")]
    pub titlebar_expanded_y: f64,

    /// Height of the hover zone at the top of the window that reveals the titlebar
    #[serde(default = "crate::defaults::titlebar_trigger_height")]
    pub titlebar_trigger_height: f64,

    #[serde(default = "crate::defaults::loading_bar_height")]
    pub loading_bar_height: f64,

    // ========================================================================
    // Timing
    // ========================================================================
    #[serde(default = "crate::defaults::animation_duration_ms")]
    pub animation_duration_ms: u64,

    #[serde(default = "crate::defaults::animation_frame_ms")]
    pub animation_frame_ms: u64,

    /// Delay between the "finished" animation and hiding the loading bar
    #[serde(default = "crate::defaults::loading_hide_delay_ms")]
    pub loading_hide_delay_ms: u64,

    /// Per-request timeout for core → UI round trips during session save
    #[serde(default = "crate::defaults::ui_request_timeout_ms")]
    pub ui_request_timeout_ms: u64,

    /// Upper bound on waiting for the UI to acknowledge restored tab rows
    #[serde(default = "crate::defaults::restore_ack_timeout_ms")]
    pub restore_ack_timeout_ms: u64,

    /// After this long the shutdown sequence quits even if saving has not finished
    #[serde(default = "crate::defaults::shutdown_hard_timeout_ms")]
    pub shutdown_hard_timeout_ms: u64,

    #[serde(default = "crate::defaults::titlebar_poll_ms")]
    pub titlebar_poll_ms: u64,

    // ========================================================================
    // Navigation
    // ========================================================================
    /// URL opened for new tabs created by the shell itself
    #[serde(default = "crate::defaults::new_tab_url")]
    pub new_tab_url: String,

    /// Search prefix used by the omnibox; the encoded query is appended
    #[serde(default = "crate::defaults::search_url")]
    pub search_url: String,

    /// Root directory served under `zenium://` (defaults next to the executable)
    #[serde(default)]
    pub pages_root: Option<PathBuf>,

    /// Log level override (`error`, `warn`, `info`, `debug`, `trace`)
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            sidebar_width: crate::defaults::sidebar_width(),
            view_padding: crate::defaults::view_padding(),
            resize_handle_width: crate::defaults::resize_handle_width(),
            titlebar_collapsed_y: crate::defaults::titlebar_collapsed_y(),
            titlebar_expanded_y: crate::defaults::titlebar_expanded_y(),
            titlebar_trigger_height: crate::defaults::titlebar_trigger_height(),
            loading_bar_height: crate::defaults::loading_bar_height(),
            animation_duration_ms: crate::defaults::animation_duration_ms(),
            animation_frame_ms: crate::defaults::animation_frame_ms(),
            loading_hide_delay_ms: crate::defaults::loading_hide_delay_ms(),
            ui_request_timeout_ms: crate::defaults::ui_request_timeout_ms(),
            restore_ack_timeout_ms: crate::defaults::restore_ack_timeout_ms(),
            shutdown_hard_timeout_ms: crate::defaults::shutdown_hard_timeout_ms(),
            titlebar_poll_ms: crate::defaults::titlebar_poll_ms(),
            new_tab_url: crate::defaults::new_tab_url(),
            search_url: crate::defaults::search_url(),
            pages_root: None,
            log_level: None,
        }
    }
}

impl ShellConfig {
    /// Load configuration from the default path, or defaults if it does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&paths::shell_config_path())
    }

    /// Load configuration from a specific file.
    ///
    /// A missing or empty file yields defaults. A corrupt file is an error;
    /// callers log it and fall back to [`ShellConfig::default`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No shell config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: ShellConfig = serde_yaml_ng::from_str(&contents)?;
        config.validate()?;
        log::info!("Loaded shell config from {:?}", path);
        Ok(config)
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&paths::shell_config_path())
    }

    /// Save configuration atomically (temp file then rename).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yaml_ng::to_string(self)?;
        paths::write_atomic(path, &yaml)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.animation_frame_ms == 0 {
            return Err(ConfigError::Validation(
                "animation_frame_ms must be greater than zero".to_string(),
            ));
        }
        if self.titlebar_poll_ms == 0 {
            return Err(ConfigError::Validation(
                "titlebar_poll_ms must be greater than zero".to_string(),
            ));
        }
        if self.titlebar_expanded_y < self.titlebar_collapsed_y {
            return Err(ConfigError::Validation(format!(
                "titlebar_expanded_y ({}) must not be smaller than titlebar_collapsed_y ({})",
                self.titlebar_expanded_y, self.titlebar_collapsed_y
            )));
        }
        Ok(())
    }

    /// Directory served under `zenium://`.
    pub fn pages_root(&self) -> PathBuf {
        self.pages_root
            .clone()
            .unwrap_or_else(paths::default_pages_root)
    }

    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_duration_ms)
    }

    pub fn animation_frame(&self) -> Duration {
        Duration::from_millis(self.animation_frame_ms)
    }

    pub fn loading_hide_delay(&self) -> Duration {
        Duration::from_millis(self.loading_hide_delay_ms)
    }

    pub fn ui_request_timeout(&self) -> Duration {
        Duration::from_millis(self.ui_request_timeout_ms)
    }

    pub fn restore_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.restore_ack_timeout_ms)
    }

    pub fn shutdown_hard_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_hard_timeout_ms)
    }

    pub fn titlebar_poll(&self) -> Duration {
        Duration::from_millis(self.titlebar_poll_ms)
    }
}
