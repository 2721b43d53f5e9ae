//! Command-line interface for zenium.
//!
//! The browser window itself is driven by the embedding host; the binary
//! only offers offline tools for the files the shell keeps: inspecting or
//! clearing the saved session, resolving scheme URLs the way the shell
//! would, and listing recent history.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use zenium_config::ShellConfig;

use crate::history::HistoryStore;
use crate::protocol::{self, SchemeResponse, SiteRegistry};
use crate::session::{Session, storage};

/// zenium - a multi-tab browser shell
#[derive(Parser)]
#[command(name = "zenium")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set debug log level (overrides config and RUST_LOG)
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevelArg>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect or remove the saved session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Resolve a zenium:// or zntp:// URL
    Resolve {
        url: String,

        /// Pages root for zenium:// (defaults to the configured root)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },

    /// List the most recent history entries
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Print the saved tabs in display order
    Show {
        /// Session file (defaults to the standard location)
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,

        /// Print the raw JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Delete the saved session
    Clear {
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,
    },
}

/// Run a subcommand and return the process exit code.
pub fn run_command(command: Commands, config: &ShellConfig) -> i32 {
    let result = match command {
        Commands::Session {
            action: SessionAction::Show { path, json },
        } => show_session(path, json),
        Commands::Session {
            action: SessionAction::Clear { path },
        } => clear_session(path),
        Commands::Resolve { url, root } => resolve(&url, root, config),
        Commands::History { limit } => show_history(limit),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("zenium: error: {e:#}");
            1
        }
    }
}

fn session_path(path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(zenium_config::paths::session_path)
}

fn show_session(path: Option<PathBuf>, json: bool) -> Result<i32> {
    let path = session_path(path);
    let Some(session) = storage::load_session_from(&path)? else {
        println!("No saved session at {}", path.display());
        return Ok(0);
    };

    if json {
        let text =
            serde_json::to_string_pretty(&session).context("Failed to serialize session")?;
        println!("{text}");
    } else {
        print_session_summary(&session);
    }
    Ok(0)
}

fn print_session_summary(session: &Session) {
    let tabs = session.ordered_tabs();
    println!("{} tab(s)", tabs.len());
    for tab in tabs {
        let marker = if session.active_tab_id.as_ref() == Some(&tab.tab_id) {
            '*'
        } else {
            ' '
        };
        let state = if tab.is_unloaded { " (unloaded)" } else { "" };
        println!(
            "{} {:<12} {:<10} {} [{} entries]{}",
            marker,
            tab.tab_id,
            format!("{:?}", tab.category).to_lowercase(),
            tab.url,
            tab.history.entries.len(),
            state
        );
    }
}

fn clear_session(path: Option<PathBuf>) -> Result<i32> {
    let path = session_path(path);
    storage::clear_session_at(&path)?;
    println!("Cleared {}", path.display());
    Ok(0)
}

fn resolve(url: &str, root: Option<PathBuf>, config: &ShellConfig) -> Result<i32> {
    let response: SchemeResponse = if url.starts_with(protocol::ZENIUM_SCHEME) {
        let root = root.unwrap_or_else(|| config.pages_root());
        protocol::resolve_zenium(url, &root).into()
    } else {
        protocol::resolve_zntp(url, &SiteRegistry::open()).into()
    };

    println!(
        "{}",
        serde_json::to_string(&response).context("Failed to serialize resolution")?
    );
    Ok(match response {
        SchemeResponse::Error { .. } => 2,
        _ => 0,
    })
}

fn show_history(limit: usize) -> Result<i32> {
    let history = HistoryStore::open()?;
    for entry in history.recent(limit) {
        println!(
            "{}  {}  {}",
            entry.visited_at.format("%Y-%m-%d %H:%M"),
            entry.title,
            entry.url
        );
    }
    Ok(0)
}
