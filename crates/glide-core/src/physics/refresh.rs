use std::rc::Rc;

use tracing::debug;

use super::engine::{Callback, Scroller};

/// Pull-to-refresh zone above the top of the content
#[derive(Clone)]
pub(super) struct PullToRefresh {
    height: f64,
    on_activate: Callback,
    on_deactivate: Callback,
    on_start: Callback,
}

impl Scroller {
    /// Enable pull-to-refresh for a zone of `height` above the content.
    ///
    /// `on_activate` fires when a drag crosses the zone edge, `on_deactivate`
    /// when it moves back or the refresh finishes, and `on_start` when the
    /// refresh begins. Call [`Scroller::finish_pull_to_refresh`] once the
    /// refresh work is done.
    pub fn activate_pull_to_refresh(
        &self,
        height: f64,
        on_activate: impl Fn() + 'static,
        on_deactivate: impl Fn() + 'static,
        on_start: impl Fn() + 'static,
    ) {
        *self.shared.refresh.borrow_mut() = Some(PullToRefresh {
            height,
            on_activate: Rc::new(on_activate),
            on_deactivate: Rc::new(on_deactivate),
            on_start: Rc::new(on_start),
        });
    }

    /// Start a refresh without a gesture
    pub fn trigger_pull_to_refresh(&self) {
        if self.shared.refresh.borrow().is_none() {
            return;
        }
        self.shared.state.borrow_mut().refresh_active = true;
        self.start_refresh();
    }

    /// Leave the refresh zone and settle back into bounds
    pub fn finish_pull_to_refresh(&self) {
        let Some(refresh) = self.refresh() else {
            return;
        };
        self.shared.state.borrow_mut().refresh_active = false;
        debug!("Pull to refresh finished");
        (refresh.on_deactivate)();

        let values = self.values();
        self.settle(values.left, values.top, true);
    }

    pub fn is_refresh_armed(&self) -> bool {
        self.shared.state.borrow().refresh_active
    }

    fn refresh(&self) -> Option<PullToRefresh> {
        self.shared.refresh.borrow().clone()
    }

    pub(crate) fn has_refresh(&self) -> bool {
        self.shared.refresh.borrow().is_some()
    }

    /// Arm or disarm the refresh zone for a dragged `top` position
    pub(crate) fn update_refresh_arming(&self, top: f64) {
        let Some(refresh) = self.refresh() else {
            return;
        };
        let armed = self.is_refresh_armed();
        if !armed && top <= -refresh.height {
            self.shared.state.borrow_mut().refresh_active = true;
            debug!(top, height = refresh.height, "Pull to refresh armed");
            (refresh.on_activate)();
        } else if armed && top > -refresh.height {
            self.shared.state.borrow_mut().refresh_active = false;
            debug!(top, height = refresh.height, "Pull to refresh disarmed");
            (refresh.on_deactivate)();
        }
    }

    /// Hold the zone open and hand over to the host's refresh work.
    /// The zone stays armed until the refresh is finished.
    pub(crate) fn start_refresh(&self) {
        let Some(refresh) = self.refresh() else {
            return;
        };
        let values = self.values();
        debug!(height = refresh.height, "Pull to refresh started");
        self.publish(values.left, -refresh.height, values.zoom, true);
        (refresh.on_start)();
    }
}
