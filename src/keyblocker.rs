//! Suppresses host default actions for browser shortcuts the shell handles
//! itself (reload, devtools), and recognizes the devtools toggle key.

use crate::host::{InputDisposition, InputFilter, KeyInput};

/// Key that toggles the developer tools of the focused tab.
pub const DEVTOOLS_KEY: &str = "F12";

/// A key combination whose host default action is suppressed.
///
/// Modifiers match exactly: `ctrl+r` does not match `ctrl+shift+r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockedShortcut {
    /// Lowercase key name as reported by the host
    pub key: &'static str,
    pub control: bool,
    pub shift: bool,
    pub alt: bool,
}

impl BlockedShortcut {
    const fn key(key: &'static str) -> Self {
        Self {
            key,
            control: false,
            shift: false,
            alt: false,
        }
    }

    const fn ctrl(key: &'static str) -> Self {
        Self {
            control: true,
            ..Self::key(key)
        }
    }

    const fn ctrl_shift(key: &'static str) -> Self {
        Self {
            control: true,
            shift: true,
            ..Self::key(key)
        }
    }

    fn matches(&self, input: &KeyInput, normalized_key: &str) -> bool {
        self.key == normalized_key
            && self.control == input.control
            && self.shift == input.shift
            && self.alt == input.alt
    }
}

pub const DEFAULT_BLOCKED: &[BlockedShortcut] = &[
    // Reload
    BlockedShortcut::ctrl("r"),
    // Force reload
    BlockedShortcut::ctrl_shift("r"),
    // Inspector (F12 is handled per tab)
    BlockedShortcut::ctrl_shift("i"),
    BlockedShortcut::key("f5"),
];

#[derive(Debug, Clone)]
pub struct KeyBlocker {
    shortcuts: Vec<BlockedShortcut>,
}

impl Default for KeyBlocker {
    fn default() -> Self {
        Self {
            shortcuts: DEFAULT_BLOCKED.to_vec(),
        }
    }
}

impl KeyBlocker {
    pub fn new(shortcuts: Vec<BlockedShortcut>) -> Self {
        Self { shortcuts }
    }

    pub fn is_blocked(&self, input: &KeyInput) -> bool {
        let normalized = input.key.to_lowercase();
        self.shortcuts
            .iter()
            .any(|shortcut| shortcut.matches(input, &normalized))
    }
}

impl InputFilter for KeyBlocker {
    fn filter(&self, input: &KeyInput) -> InputDisposition {
        if self.is_blocked(input) {
            debug_trace!("VIEW", "Blocked default action for key {:?}", input.key);
            InputDisposition::Block
        } else {
            InputDisposition::Pass
        }
    }
}

pub fn is_devtools_toggle(input: &KeyInput) -> bool {
    input.key == DEVTOOLS_KEY
}
