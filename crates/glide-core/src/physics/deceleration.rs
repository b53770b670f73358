//! Momentum integration used after a flick.
//!
//! Pure functions over position, velocity and bounds; the engine owns the
//! task that calls [`advance`] once per frame.

use crate::config::ScrollerOptions;

/// Velocity in pixels per nominal 60 Hz step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

impl Velocity {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether either component is still at or above `threshold`
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.x.abs() >= threshold || self.y.abs() >= threshold
    }
}

/// Range the position may rest in while decelerating
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecelerationBounds {
    pub min_left: f64,
    pub max_left: f64,
    pub min_top: f64,
    pub max_top: f64,
}

impl DecelerationBounds {
    /// Global scroll range `[0, max]` on both axes
    pub fn global(max_left: f64, max_top: f64) -> Self {
        Self {
            min_left: 0.0,
            max_left,
            min_top: 0.0,
            max_top,
        }
    }

    /// The single page containing the (clamped) release position
    pub fn page(
        left: f64,
        top: f64,
        max_left: f64,
        max_top: f64,
        page_width: f64,
        page_height: f64,
    ) -> Self {
        let left = left.min(max_left).max(0.0);
        let top = top.min(max_top).max(0.0);
        let (min_left, max_left) = page_span(left, page_width, max_left);
        let (min_top, max_top) = page_span(top, page_height, max_top);
        Self {
            min_left,
            max_left,
            min_top,
            max_top,
        }
    }

    /// Signed distance back inside the bounds; zero when inside
    pub fn penetration(&self, left: f64, top: f64) -> (f64, f64) {
        (
            outside(left, self.min_left, self.max_left),
            outside(top, self.min_top, self.max_top),
        )
    }
}

fn page_span(position: f64, page: f64, max: f64) -> (f64, f64) {
    if page > 0.0 {
        (
            (position / page).floor() * page,
            (position / page).ceil() * page,
        )
    } else {
        (0.0, max)
    }
}

fn outside(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        min - value
    } else if value > max {
        max - value
    } else {
        0.0
    }
}

/// Physics coefficients for one deceleration run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecelerationParams {
    pub bouncing: bool,
    pub paging: bool,
    pub friction: f64,
    pub penetration_deceleration: f64,
    pub penetration_acceleration: f64,
}

impl From<&ScrollerOptions> for DecelerationParams {
    fn from(options: &ScrollerOptions) -> Self {
        Self {
            bouncing: options.bouncing,
            paging: options.paging,
            friction: options.friction_factor,
            penetration_deceleration: options.penetration_deceleration,
            penetration_acceleration: options.penetration_acceleration,
        }
    }
}

/// Advance one step: move by the velocity, then decay and bounce it.
///
/// Returns the new position; `velocity` is updated in place.
pub fn advance(
    left: f64,
    top: f64,
    velocity: &mut Velocity,
    bounds: &DecelerationBounds,
    params: &DecelerationParams,
) -> (f64, f64) {
    let mut left = left + velocity.x;
    let mut top = top + velocity.y;

    if !params.bouncing {
        let fixed_left = left.min(bounds.max_left).max(bounds.min_left);
        if fixed_left != left {
            left = fixed_left;
            velocity.x = 0.0;
        }

        let fixed_top = top.min(bounds.max_top).max(bounds.min_top);
        if fixed_top != top {
            top = fixed_top;
            velocity.y = 0.0;
        }
    }

    // Paging settles through the page bounds instead of friction
    if !params.paging {
        velocity.x *= params.friction;
        velocity.y *= params.friction;
    }

    if params.bouncing {
        let (outside_x, outside_y) = bounds.penetration(left, top);
        velocity.x = bounce(velocity.x, outside_x, params);
        velocity.y = bounce(velocity.y, outside_y, params);
    }

    (left, top)
}

fn bounce(velocity: f64, outside: f64, params: &DecelerationParams) -> f64 {
    if outside == 0.0 {
        velocity
    } else if outside * velocity <= 0.0 {
        // Still heading out or stalled: pull back in proportion to the overshoot
        velocity + outside * params.penetration_deceleration
    } else {
        // Heading back in: spring towards the bound
        outside * params.penetration_acceleration
    }
}
