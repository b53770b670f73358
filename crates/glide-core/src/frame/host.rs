use std::cell::RefCell;

use super::{FrameCallback, FrameClock, NativeFrameSource};

/// Frame clock driven by the host's display-refresh callback.
///
/// The host calls [`HostFrameClock::on_frame`] once per refresh; callbacks
/// queued while a frame is being delivered wait for the following one.
#[derive(Default)]
pub struct HostFrameClock {
    pending: RefCell<Vec<FrameCallback>>,
}

impl HostFrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks waiting for the next frame
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Deliver one frame. Returns how many callbacks ran.
    pub fn on_frame(&self, now: f64) -> usize {
        let callbacks = std::mem::take(&mut *self.pending.borrow_mut());
        let count = callbacks.len();
        for callback in callbacks {
            callback(now);
        }
        count
    }
}

impl FrameClock for HostFrameClock {
    fn schedule(&self, callback: FrameCallback) {
        self.pending.borrow_mut().push(callback);
    }
}

impl NativeFrameSource for HostFrameClock {
    fn signature(&self) -> String {
        "requestFrame() { [native code] }".to_string()
    }
}
