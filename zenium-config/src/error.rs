//! Typed error variants for the zenium-config crate.
//!
//! Most helpers return `anyhow::Result`; `ConfigError` values are carried
//! inside and can be recovered with `downcast_ref` by callers that need to
//! tell a parse failure apart from a traversal attempt.
//!
//! # Example
//!
//! ```rust,no_run
//! use zenium_config::ConfigError;
//!
//! fn check_load_err(e: &anyhow::Error) {
//!     if let Some(cfg_err) = e.downcast_ref::<ConfigError>() {
//!         match cfg_err {
//!             ConfigError::Io(io) => eprintln!("I/O error: {io}"),
//!             ConfigError::Parse(p) => eprintln!("YAML parse error: {p}"),
//!             ConfigError::Json(j) => eprintln!("JSON parse error: {j}"),
//!             ConfigError::Validation(msg) => eprintln!("Validation: {msg}"),
//!             ConfigError::PathTraversal(msg) => eprintln!("Path traversal: {msg}"),
//!         }
//!     }
//! }
//! ```

use std::fmt;

/// Errors that can occur when loading or saving configuration state.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred reading or writing a config file.
    Io(std::io::Error),

    /// The shell config file contained YAML that could not be parsed.
    Parse(serde_yaml_ng::Error),

    /// A JSON state file (settings, sites) could not be parsed or encoded.
    Json(serde_json::Error),

    /// A field value failed semantic validation.
    Validation(String),

    /// A path resolved outside the directory it must stay inside.
    ///
    /// The inner string includes the offending path and the expected base.
    PathTraversal(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error in config: {e}"),
            ConfigError::Parse(e) => write!(f, "YAML parse error in config: {e}"),
            ConfigError::Json(e) => write!(f, "JSON error in state file: {e}"),
            ConfigError::Validation(msg) => write!(f, "Config validation error: {msg}"),
            ConfigError::PathTraversal(msg) => write!(f, "Path traversal detected: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Json(e) => Some(e),
            ConfigError::Validation(_) | ConfigError::PathTraversal(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}
