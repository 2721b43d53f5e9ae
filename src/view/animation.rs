use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use super::ViewManager;
use crate::layout::{lerp_bounds, Bounds};
use crate::task::TaskGuard;

impl ViewManager {
    /// Slide the active surface's `y` and `height` to the target values.
    ///
    /// Starting a new animation cancels the running one; so does switching,
    /// unloading or closing the active tab. `duration` defaults to the
    /// configured animation duration. The loading bar follows the surface
    /// while the tab is loading.
    pub fn animate_view_bounds(&self, target_y: i32, target_height: i32, duration: Option<Duration>) {
        let duration = duration.unwrap_or(self.inner.timing.animation_duration);
        let frame = self.inner.timing.animation_frame;

        let Some(tab_id) = self.active_tab_id() else {
            return;
        };
        let Some(surface) = self.loaded_surface(&tab_id) else {
            return;
        };

        let start = surface.bounds();
        let target = Bounds {
            y: target_y,
            height: target_height,
            ..start
        };
        let weak = Arc::downgrade(&self.inner);
        let animated_tab = tab_id.clone();

        let task = TaskGuard::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(frame);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let progress = if duration.is_zero() {
                    1.0
                } else {
                    (started.elapsed().as_secs_f64() / duration.as_secs_f64()).min(1.0)
                };
                if surface.is_destroyed() {
                    break;
                }
                surface.set_bounds(lerp_bounds(start, target, progress));

                let Some(inner) = weak.upgrade() else {
                    break;
                };
                ViewManager::from_inner(inner).track_loading_bar(&animated_tab);
                if progress >= 1.0 {
                    break;
                }
            }
        });

        let mut state = self.inner.state.lock();
        if state.active.as_ref() == Some(&tab_id) {
            // Replacing the guard aborts the previous animation
            state.animation = Some(task);
        }
    }
}
