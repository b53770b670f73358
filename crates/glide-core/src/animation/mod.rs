//! Timed tasks driven by a [`crate::FrameClock`].
//!
//! - `easing` - pure easing curves mapping [0, 1] to [0, 1]
//! - `scheduler` - registry of running tasks with catch-up for missed frames

pub mod easing;
pub mod scheduler;

pub use easing::Easing;
pub use scheduler::{AnimationId, AnimationTask, Animator, StepControl};
