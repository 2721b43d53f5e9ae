//! Configuration system for the Zenium browser shell.
//!
//! This crate provides:
//!
//! - XDG-style path helpers for every file the shell persists
//! - The YAML shell configuration (layout constants, timeouts, defaults)
//! - The JSON settings key-value store with change broadcast
//! - Typed error variants for config I/O and path validation

pub mod defaults;
pub mod error;
pub mod paths;
pub mod settings;
pub mod shell_config;

pub use error::ConfigError;
pub use settings::{SettingChange, SettingsStore, Theme};
pub use shell_config::ShellConfig;

/// Narrowest sidebar the UI may request, in logical pixels.
pub const MIN_SIDEBAR_WIDTH: f64 = 150.0;

/// Widest sidebar the UI may request, in logical pixels.
pub const MAX_SIDEBAR_WIDTH: f64 = 500.0;

/// Clamp a sidebar width requested by the UI into the supported range.
pub fn clamp_sidebar_width(width: f64) -> f64 {
    if width.is_nan() {
        return MIN_SIDEBAR_WIDTH;
    }
    width.clamp(MIN_SIDEBAR_WIDTH, MAX_SIDEBAR_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_sidebar_width() {
        assert_eq!(clamp_sidebar_width(100.0), 150.0);
        assert_eq!(clamp_sidebar_width(320.0), 320.0);
        assert_eq!(clamp_sidebar_width(9000.0), 500.0);
        assert_eq!(clamp_sidebar_width(f64::NAN), 150.0);
    }
}
