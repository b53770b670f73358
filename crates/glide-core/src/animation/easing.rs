//! Pure easing functions for animated transitions
//!
//! Provides mathematical easing functions that map input [0, 1] to output [0, 1]
//! with various acceleration curves.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    /// Used when a transition redirects one already in flight
    EaseOutCubic,
    /// Used for a transition starting from rest
    EaseInOutCubic,
}

impl Easing {
    /// Apply the easing function to a progress value
    #[inline]
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::EaseOutCubic => cubic_ease_out(t),
            Easing::EaseInOutCubic => cubic_ease_in_out(t),
        }
    }
}

/// Cubic ease-out: f(t) = 1 - (1-t)³
#[inline]
fn cubic_ease_out(t: f64) -> f64 {
    let inv = 1.0 - t;
    1.0 - inv * inv * inv
}

/// Cubic ease-in-out: 4t³ on the first half, mirrored on the second
#[inline]
fn cubic_ease_in_out(t: f64) -> f64 {
    let t = t * 2.0;
    if t < 1.0 {
        0.5 * t * t * t
    } else {
        let t = t - 2.0;
        0.5 * (t * t * t + 2.0)
    }
}
