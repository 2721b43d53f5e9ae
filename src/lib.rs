// Library exports for testing and embedding hosts
//
// # Mutex Usage Policy
//
// Zenium's managers are cheap `Clone` handles over shared state. New code
// should follow these rules:
//
//   - `parking_lot::Mutex`   : use for all manager state (tab table, modal map,
//                               pending UI requests). Lock, copy out the `Arc`s you
//                               need, release, and only then call into a surface.
//
//   - Never hold a lock across `.await`. Every host call that crosses into a
//     surface (script evaluation, navigation, history restore) may suspend.
//
//   - `tokio::sync` channels (`mpsc`, `oneshot`, `broadcast`) carry everything
//     that crosses between tasks: surface events, UI requests and responses,
//     setting changes.

/// Application version (root crate version).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[macro_use]
pub mod debug;

pub mod app;
pub mod cli;
pub mod history;
pub mod host;
pub mod keyblocker;
pub mod layout;
pub mod modal;
pub mod omnibox;
pub mod protocol;
pub mod session;
pub mod task;
pub mod testing;
pub mod ui;
pub mod update;
pub mod view;

pub use app::{CloseResponse, Shell, ShellDeps};
pub use view::{TabCategory, TabId, ViewManager};
