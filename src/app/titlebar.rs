//! Hidden titlebar: poll the cursor while the window has focus and slide the
//! active tab down when the pointer reaches the top edge.

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::Shell;
use crate::layout::RevealChange;
use crate::task::TaskGuard;
use crate::ui::UiEvent;

impl Shell {
    /// One poll step. Returns the transition it applied, if any.
    pub fn poll_titlebar(&self) -> Option<RevealChange> {
        let inner = &self.inner;
        let cursor = inner.window.cursor_position();
        let window_bounds = inner.window.outer_bounds();
        let change = inner.reveal.lock().update(cursor, window_bounds)?;

        let expanded = change == RevealChange::Expand;
        debug_log!("SHELL", "Titlebar {:?}", change);
        inner.ui.notify(UiEvent::SetDraggable {
            draggable: expanded,
        });

        let (y, height) = inner
            .view
            .layout()
            .vertical_span(inner.window.content_size(), expanded);
        inner.view.animate_view_bounds(y, height, None);
        Some(change)
    }

    /// Start polling on window focus. A running poller is left alone.
    pub fn start_titlebar_polling(&self) {
        let mut tasks = self.inner.tasks.lock();
        if tasks.titlebar_poll.is_some() {
            return;
        }

        let period = self.inner.config.titlebar_poll().max(Duration::from_millis(1));
        let shell = std::sync::Arc::downgrade(&self.inner);
        tasks.titlebar_poll = Some(TaskGuard::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(inner) = shell.upgrade() else { break };
                Shell { inner }.poll_titlebar();
            }
        }));
    }

    /// Stop polling on blur or close.
    pub fn stop_titlebar_polling(&self) {
        self.inner.tasks.lock().titlebar_poll = None;
    }

    pub fn is_polling_titlebar(&self) -> bool {
        self.inner.tasks.lock().titlebar_poll.is_some()
    }
}
