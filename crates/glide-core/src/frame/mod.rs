//! Frame scheduling capability consumed by the animation scheduler.
//!
//! A host with a display-refresh hook wraps it as a [`NativeFrameSource`];
//! everything else falls back to [`PollingFrameClock`]. The choice is made
//! once by [`select_frame_clock`] and handed to the engine.

mod host;
mod polling;

use std::rc::Rc;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::config::FrameConfig;
use crate::time::Clock;

pub use host::HostFrameClock;
pub use polling::PollingFrameClock;

/// Callback run once at the next frame with the frame time in milliseconds
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Runs callbacks around the next display refresh
pub trait FrameClock {
    /// Queue `callback` for the next frame. Every callback queued within one
    /// frame fires exactly once, together with the others.
    fn schedule(&self, callback: FrameCallback);
}

/// A platform frame hook that can describe where it comes from
pub trait NativeFrameSource: FrameClock {
    /// Self-description of the hook, e.g. `requestFrame() { [native code] }`
    fn signature(&self) -> String;
}

/// Whether a hook signature looks like a platform implementation rather than
/// a user shim registered under the same name
pub fn is_native_signature(signature: &str) -> bool {
    static NATIVE: OnceLock<Option<Regex>> = OnceLock::new();
    NATIVE
        .get_or_init(|| {
            Regex::new(r"(?i)^\s*(?:function\s+)?\w+\(\)\s*\{\s*\[native code\]\s*\}\s*$").ok()
        })
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(signature))
}

/// Frame clock chosen for an engine instance
#[derive(Clone)]
pub enum SelectedFrameClock {
    Native(Rc<dyn NativeFrameSource>),
    Polling(Rc<PollingFrameClock>),
}

impl SelectedFrameClock {
    pub fn is_native(&self) -> bool {
        matches!(self, SelectedFrameClock::Native(_))
    }

    /// The polling clock, when the fallback was selected and needs driving
    pub fn polling(&self) -> Option<Rc<PollingFrameClock>> {
        match self {
            SelectedFrameClock::Polling(clock) => Some(clock.clone()),
            SelectedFrameClock::Native(_) => None,
        }
    }
}

impl FrameClock for SelectedFrameClock {
    fn schedule(&self, callback: FrameCallback) {
        match self {
            SelectedFrameClock::Native(source) => source.schedule(callback),
            SelectedFrameClock::Polling(clock) => clock.schedule(callback),
        }
    }
}

/// Prefer a verified native frame source, otherwise poll at the target rate
pub fn select_frame_clock(
    native: Option<Rc<dyn NativeFrameSource>>,
    clock: Rc<dyn Clock>,
    config: &FrameConfig,
) -> SelectedFrameClock {
    if let Some(source) = native {
        let signature = source.signature();
        if is_native_signature(&signature) {
            debug!(signature = %signature, "Using native frame source");
            return SelectedFrameClock::Native(source);
        }
        debug!(signature = %signature, "Frame source is not native, falling back to polling");
    }
    SelectedFrameClock::Polling(Rc::new(PollingFrameClock::new(clock, config.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    struct ShimSource {
        inner: HostFrameClock,
    }

    impl FrameClock for ShimSource {
        fn schedule(&self, callback: FrameCallback) {
            self.inner.schedule(callback);
        }
    }

    impl NativeFrameSource for ShimSource {
        fn signature(&self) -> String {
            "function requestFrame(cb) { setTimeout(cb, 16) }".to_string()
        }
    }

    #[test]
    fn test_native_signature_heuristic() {
        assert!(is_native_signature("requestFrame() { [native code] }"));
        assert!(is_native_signature("  requestAnimationFrame() {\n    [native code]\n}"));
        assert!(is_native_signature(
            "function requestAnimationFrame() { [native code] }"
        ));
        assert!(!is_native_signature("function requestFrame() { return shim(); }"));
        assert!(!is_native_signature("functionrequestFrame() {} [native code] }"));
        assert!(!is_native_signature("requestFrame() { return shim(); }"));
        assert!(!is_native_signature(""));
    }

    #[test]
    fn test_selects_native_source() {
        let clock = Rc::new(ManualClock::new(0.0));
        let source: Rc<dyn NativeFrameSource> = Rc::new(HostFrameClock::new());
        let selected = select_frame_clock(Some(source), clock, &FrameConfig::default());
        assert!(selected.is_native());
        assert!(selected.polling().is_none());
    }

    #[test]
    fn test_shim_falls_back_to_polling() {
        let clock = Rc::new(ManualClock::new(0.0));
        let source: Rc<dyn NativeFrameSource> = Rc::new(ShimSource {
            inner: HostFrameClock::new(),
        });
        let selected = select_frame_clock(Some(source), clock.clone(), &FrameConfig::default());
        assert!(!selected.is_native());

        let fallback = select_frame_clock(None, clock, &FrameConfig::default());
        assert!(fallback.polling().is_some());
    }
}
