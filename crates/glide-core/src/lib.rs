//! Inertial scrolling and zooming physics for a logical viewport.
//!
//! The crate never touches a rendering surface. Hosts feed gesture samples in
//! through [`GestureAdapter`], drive frames through a [`FrameClock`], and
//! receive positions through the `on_change` callback of the [`Scroller`].

pub mod animation;
pub mod config;
pub mod error;
pub mod frame;
pub mod gesture;
pub mod physics;
pub mod time;

#[cfg(test)]
mod testing;

pub use animation::{AnimationId, AnimationTask, Animator, Easing, StepControl};
pub use config::{FrameConfig, GlideConfig, ScrollerOptions};
pub use error::{Error, Result};
pub use frame::{select_frame_clock, FrameClock, HostFrameClock, PollingFrameClock, SelectedFrameClock};
pub use gesture::{Contact, GestureAdapter};
pub use physics::{Phase, ScrollMax, ScrollValues, Scroller, ScrollerBuilder};
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
