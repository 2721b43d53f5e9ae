//! Window geometry: where the active tab surface, its loading bar, and the
//! titlebar reveal strip sit inside the host window.
//!
//! Everything here is pure arithmetic over logical pixels; the managers feed
//! in the host's content size and current surface bounds.

use serde::{Deserialize, Serialize};
use zenium_config::ShellConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    /// Bounds used to hide a surface without destroying it.
    pub const ZERO: Bounds = Bounds {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the surface occupies no screen area.
    pub fn is_hidden(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Inclusive hit test, matching how the host reports cursor coordinates
    /// on the window edge.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Layout parameters for the tab content area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub sidebar_width: i32,
    pub view_padding: i32,
    pub resize_handle_width: i32,
    pub collapsed_y: i32,
    pub expanded_y: i32,
    pub loading_bar_height: i32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self::from_config(&ShellConfig::default())
    }
}

impl LayoutParams {
    pub fn from_config(config: &ShellConfig) -> Self {
        Self {
            sidebar_width: zenium_config::clamp_sidebar_width(config.sidebar_width).round() as i32,
            view_padding: config.view_padding.round() as i32,
            resize_handle_width: config.resize_handle_width.round() as i32,
            collapsed_y: config.titlebar_collapsed_y.round() as i32,
            expanded_y: config.titlebar_expanded_y.round() as i32,
            loading_bar_height: config.loading_bar_height.round() as i32,
        }
    }

    /// Vertical placement `(y, height)` of the active surface for a given
    /// titlebar state.
    pub fn vertical_span(&self, content: Size, expanded: bool) -> (i32, i32) {
        let y = if expanded {
            self.expanded_y
        } else {
            self.collapsed_y
        };
        (y, (content.height - y - self.view_padding).max(0))
    }

    /// Bounds of the active tab surface.
    ///
    /// The titlebar state is read back from the surface's current `y`: a
    /// surface sitting below the collapsed offset is treated as expanded, so a
    /// window resize mid-reveal keeps the strip open.
    pub fn active_view_bounds(&self, content: Size, current: Bounds) -> Bounds {
        let expanded = current.y > self.collapsed_y;
        let (y, height) = self.vertical_span(content, expanded);
        let x = self.sidebar_width + self.view_padding + self.resize_handle_width;
        let width = content.width
            - self.sidebar_width
            - self.view_padding * 2
            - self.resize_handle_width;

        Bounds::new(x, y, width.max(0), height)
    }
}

/// Strip along the bottom edge of `view` where the loading bar is drawn.
pub fn loading_bar_bounds(view: Bounds, bar_height: i32) -> Bounds {
    Bounds::new(
        view.x,
        view.y + view.height - bar_height,
        view.width,
        bar_height,
    )
}

/// Interpolate `y` and `height` from `start` towards `target`, rounded to
/// whole pixels. `x` and `width` stay at `start`.
pub fn lerp_bounds(start: Bounds, target: Bounds, progress: f64) -> Bounds {
    let t = progress.clamp(0.0, 1.0);
    let lerp = |a: i32, b: i32| (a as f64 + (b - a) as f64 * t).round() as i32;
    Bounds {
        y: lerp(start.y, target.y),
        height: lerp(start.height, target.height),
        ..start
    }
}

/// Transition reported by [`TitlebarReveal::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealChange {
    Expand,
    Collapse,
}

/// Hover tracking for the hidden titlebar strip.
///
/// The strip opens when the cursor enters the thin trigger zone at the top of
/// the window and closes once it leaves the (taller) expanded zone.
#[derive(Debug, Clone)]
pub struct TitlebarReveal {
    trigger_height: i32,
    expanded_height: i32,
    revealed: bool,
}

impl TitlebarReveal {
    pub fn new(trigger_height: i32, expanded_height: i32) -> Self {
        Self {
            trigger_height,
            expanded_height,
            revealed: false,
        }
    }

    pub fn from_config(config: &ShellConfig) -> Self {
        Self::new(
            config.titlebar_trigger_height.round() as i32,
            config.titlebar_expanded_y.round() as i32,
        )
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Feed one cursor sample (screen coordinates) against the window's outer bounds.
    pub fn update(&mut self, cursor: Point, window: Bounds) -> Option<RevealChange> {
        let trigger = Bounds {
            height: self.trigger_height,
            ..window
        };
        let expanded = Bounds {
            height: self.expanded_height,
            ..window
        };

        if !self.revealed && trigger.contains(cursor) {
            self.revealed = true;
            Some(RevealChange::Expand)
        } else if self.revealed && !expanded.contains(cursor) {
            self.revealed = false;
            Some(RevealChange::Collapse)
        } else {
            None
        }
    }
}
