//! Scroll and zoom state machine.
//!
//! - `deceleration` - momentum integration after a release
//! - `engine` - position, bounds, transitions and callbacks
//! - `refresh` - pull-to-refresh zone

pub mod deceleration;
mod engine;
mod refresh;

pub use deceleration::Velocity;
pub use engine::{Callback, ChangeCallback, Phase, ScrollMax, ScrollValues, Scroller, ScrollerBuilder};
