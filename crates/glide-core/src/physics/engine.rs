use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::debug;

use super::deceleration::{self, DecelerationBounds, DecelerationParams, Velocity};
use super::refresh::PullToRefresh;
use crate::animation::{AnimationId, AnimationTask, Animator, Easing, StepControl};
use crate::config::{FrameConfig, ScrollerOptions};
use crate::frame::FrameClock;
use crate::time::Clock;
use crate::{Error, Result};

pub type ChangeCallback = Rc<dyn Fn(f64, f64, f64)>;
pub type Callback = Rc<dyn Fn()>;

/// Current position and zoom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollValues {
    pub left: f64,
    pub top: f64,
    pub zoom: f64,
}

/// Largest allowed scroll position at the current zoom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMax {
    pub left: f64,
    pub top: f64,
}

/// Where the engine's state machine currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Tracking,
    Dragging,
    Decelerating,
    Animating,
    RefreshArmed,
}

#[derive(Debug, Clone, Copy)]
struct Deceleration {
    bounds: DecelerationBounds,
    velocity: Velocity,
}

#[derive(Debug)]
pub(super) struct ScrollState {
    client_left: f64,
    client_top: f64,
    client_width: f64,
    client_height: f64,
    content_width: f64,
    content_height: f64,
    snap_width: f64,
    snap_height: f64,

    zoom_level: f64,
    scroll_left: f64,
    scroll_top: f64,
    max_scroll_left: f64,
    max_scroll_top: f64,
    scheduled_left: f64,
    scheduled_top: f64,

    tracking: bool,
    dragging: bool,
    did_deceleration_complete: bool,
    animating: Option<AnimationId>,
    decelerating: Option<AnimationId>,
    deceleration: Option<Deceleration>,
    pub(super) refresh_active: bool,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            client_left: 0.0,
            client_top: 0.0,
            client_width: 0.0,
            client_height: 0.0,
            content_width: 0.0,
            content_height: 0.0,
            snap_width: 100.0,
            snap_height: 100.0,
            zoom_level: 1.0,
            scroll_left: 0.0,
            scroll_top: 0.0,
            max_scroll_left: 0.0,
            max_scroll_top: 0.0,
            scheduled_left: 0.0,
            scheduled_top: 0.0,
            tracking: false,
            dragging: false,
            did_deceleration_complete: false,
            animating: None,
            decelerating: None,
            deceleration: None,
            refresh_active: false,
        }
    }
}

impl ScrollState {
    fn compute_scroll_max(&mut self, zoom: f64) {
        self.max_scroll_left = (self.content_width * zoom - self.client_width).max(0.0);
        self.max_scroll_top = (self.content_height * zoom - self.client_height).max(0.0);
    }
}

pub(super) struct Shared {
    options: ScrollerOptions,
    animator: Animator,
    on_change: Option<ChangeCallback>,
    on_scrolling_complete: Option<Callback>,
    pub(super) state: RefCell<ScrollState>,
    pub(super) refresh: RefCell<Option<PullToRefresh>>,
    zoom_complete: RefCell<Option<Box<dyn FnOnce()>>>,
}

/// Builds a [`Scroller`] from options, callbacks and the clocks it runs on
pub struct ScrollerBuilder {
    options: ScrollerOptions,
    frame_config: FrameConfig,
    on_change: Option<ChangeCallback>,
    on_scrolling_complete: Option<Callback>,
}

impl ScrollerBuilder {
    pub fn new(options: ScrollerOptions) -> Self {
        Self {
            options,
            frame_config: FrameConfig::default(),
            on_change: None,
            on_scrolling_complete: None,
        }
    }

    pub fn frame_config(mut self, frame_config: FrameConfig) -> Self {
        self.frame_config = frame_config;
        self
    }

    /// Receives `(left, top, zoom)` on every published position
    pub fn on_change(mut self, callback: impl Fn(f64, f64, f64) + 'static) -> Self {
        self.on_change = Some(Rc::new(callback));
        self
    }

    /// Fires when a touch or deceleration ends without another scroll starting
    pub fn on_scrolling_complete(mut self, callback: impl Fn() + 'static) -> Self {
        self.on_scrolling_complete = Some(Rc::new(callback));
        self
    }

    pub fn build(self, frames: Rc<dyn FrameClock>, clock: Rc<dyn Clock>) -> Result<Scroller> {
        self.options.validate()?;
        let animator = Animator::new(frames, clock, self.frame_config);
        Ok(Scroller {
            shared: Rc::new(Shared {
                options: self.options,
                animator,
                on_change: self.on_change,
                on_scrolling_complete: self.on_scrolling_complete,
                state: RefCell::new(ScrollState::default()),
                refresh: RefCell::new(None),
                zoom_complete: RefCell::new(None),
            }),
        })
    }
}

/// Scroll and zoom physics for one viewport.
///
/// Clones are handles to the same engine. Callbacks run without any internal
/// borrow held, so they may call back into the engine.
#[derive(Clone)]
pub struct Scroller {
    pub(super) shared: Rc<Shared>,
}

impl Scroller {
    pub fn builder(options: ScrollerOptions) -> ScrollerBuilder {
        ScrollerBuilder::new(options)
    }

    pub fn options(&self) -> &ScrollerOptions {
        &self.shared.options
    }

    /// Update the viewport and content extents; `None` keeps the old value.
    /// The current position is clamped to the new bounds without animating.
    pub fn set_dimensions(
        &self,
        client_width: Option<f64>,
        client_height: Option<f64>,
        content_width: Option<f64>,
        content_height: Option<f64>,
    ) {
        let (left, top) = {
            let mut state = self.shared.state.borrow_mut();
            let finite = |value: Option<f64>| value.filter(|v| v.is_finite());
            if let Some(width) = finite(client_width) {
                state.client_width = width;
            }
            if let Some(height) = finite(client_height) {
                state.client_height = height;
            }
            if let Some(width) = finite(content_width) {
                state.content_width = width;
            }
            if let Some(height) = finite(content_height) {
                state.content_height = height;
            }
            let zoom = state.zoom_level;
            state.compute_scroll_max(zoom);
            (state.scroll_left, state.scroll_top)
        };
        self.settle(left, top, false);
    }

    /// Page offset of the viewport; wheel and pinch origins are relative to it
    pub fn set_position(&self, left: f64, top: f64) {
        let mut state = self.shared.state.borrow_mut();
        state.client_left = left;
        state.client_top = top;
    }

    pub fn set_snap_size(&self, width: f64, height: f64) {
        let mut state = self.shared.state.borrow_mut();
        state.snap_width = width;
        state.snap_height = height;
    }

    pub fn values(&self) -> ScrollValues {
        let state = self.shared.state.borrow();
        ScrollValues {
            left: state.scroll_left,
            top: state.scroll_top,
            zoom: state.zoom_level,
        }
    }

    pub fn scroll_max(&self) -> ScrollMax {
        let state = self.shared.state.borrow();
        ScrollMax {
            left: state.max_scroll_left,
            top: state.max_scroll_top,
        }
    }

    pub fn phase(&self) -> Phase {
        let state = self.shared.state.borrow();
        if state.dragging {
            if state.refresh_active {
                Phase::RefreshArmed
            } else {
                Phase::Dragging
            }
        } else if state.tracking {
            Phase::Tracking
        } else if state.decelerating.is_some() {
            Phase::Decelerating
        } else if state.animating.is_some() {
            Phase::Animating
        } else if state.refresh_active {
            Phase::RefreshArmed
        } else {
            Phase::Idle
        }
    }

    pub fn is_decelerating(&self) -> bool {
        self.shared.state.borrow().decelerating.is_some()
    }

    pub fn is_animating(&self) -> bool {
        self.shared.state.borrow().animating.is_some()
    }

    /// Zoom to `level`, keeping `origin` (viewport coordinates, default the
    /// viewport center) visually fixed
    pub fn zoom_to(&self, level: f64, animate: bool, origin: Option<(f64, f64)>) -> Result<()> {
        self.zoom_to_inner(level, animate, origin, None)
    }

    /// Like [`Scroller::zoom_to`], running `on_complete` once the zoom has landed
    pub fn zoom_to_and_then(
        &self,
        level: f64,
        animate: bool,
        origin: Option<(f64, f64)>,
        on_complete: impl FnOnce() + 'static,
    ) -> Result<()> {
        self.zoom_to_inner(level, animate, origin, Some(Box::new(on_complete)))
    }

    pub fn zoom_by(&self, factor: f64, animate: bool, origin: Option<(f64, f64)>) -> Result<()> {
        let level = self.shared.state.borrow().zoom_level * factor;
        self.zoom_to_inner(level, animate, origin, None)
    }

    pub fn zoom_by_and_then(
        &self,
        factor: f64,
        animate: bool,
        origin: Option<(f64, f64)>,
        on_complete: impl FnOnce() + 'static,
    ) -> Result<()> {
        let level = self.shared.state.borrow().zoom_level * factor;
        self.zoom_to_inner(level, animate, origin, Some(Box::new(on_complete)))
    }

    fn zoom_to_inner(
        &self,
        level: f64,
        animate: bool,
        origin: Option<(f64, f64)>,
        on_complete: Option<Box<dyn FnOnce()>>,
    ) -> Result<()> {
        let options = &self.shared.options;
        if !options.zooming {
            return Err(Error::ZoomingDisabled);
        }

        if let Some(callback) = on_complete {
            *self.shared.zoom_complete.borrow_mut() = Some(callback);
        }
        self.stop_deceleration();

        let (left, top, level) = {
            let mut state = self.shared.state.borrow_mut();
            let old_level = state.zoom_level;
            let (origin_left, origin_top) =
                origin.unwrap_or((state.client_width / 2.0, state.client_height / 2.0));

            let level = level.min(options.max_zoom).max(options.min_zoom);
            state.compute_scroll_max(level);

            let left = (origin_left + state.scroll_left) * level / old_level - origin_left;
            let top = (origin_top + state.scroll_top) * level / old_level - origin_top;
            (
                left.min(state.max_scroll_left).max(0.0),
                top.min(state.max_scroll_top).max(0.0),
                level,
            )
        };

        debug!(level, left, top, animate, "Zooming");
        self.publish(left, top, level, animate);
        Ok(())
    }

    /// Scroll to a position, honouring axis locks, paging, snapping and bounds.
    ///
    /// With `zoom`, `left`/`top` are given at zoom 1 and scaled to the new
    /// level. Ignored while a gesture is being tracked.
    pub fn scroll_to(&self, left: f64, top: f64, animate: bool, zoom: Option<f64>) -> Result<()> {
        let current_zoom = self.shared.state.borrow().zoom_level;
        let zoom = zoom.filter(|zoom| *zoom != current_zoom);
        if zoom.is_some() && !self.shared.options.zooming {
            return Err(Error::ZoomingDisabled);
        }
        self.scroll_to_inner(left, top, animate, zoom);
        Ok(())
    }

    /// Scroll relative to the animation target, or the current position
    pub fn scroll_by(&self, left: f64, top: f64, animate: bool) {
        let (start_left, start_top) = {
            let state = self.shared.state.borrow();
            if state.animating.is_some() {
                (state.scheduled_left, state.scheduled_top)
            } else {
                (state.scroll_left, state.scroll_top)
            }
        };
        self.scroll_to_inner(start_left + left, start_top + top, animate, None);
    }

    /// Scroll without changing zoom
    pub(crate) fn settle(&self, left: f64, top: f64, animate: bool) {
        self.scroll_to_inner(left, top, animate, None);
    }

    fn scroll_to_inner(&self, left: f64, top: f64, animate: bool, zoom: Option<f64>) {
        // An in-progress drag owns the position
        if self.is_tracking() {
            return;
        }
        self.stop_deceleration();

        let options = &self.shared.options;
        let (left, top, zoom, animate) = {
            let mut state = self.shared.state.borrow_mut();
            let (mut left, mut top) = (left, top);
            let zoom = match zoom {
                Some(zoom) => {
                    left *= zoom;
                    top *= zoom;
                    state.compute_scroll_max(zoom);
                    zoom
                }
                None => state.zoom_level,
            };

            if !options.scrolling_x {
                left = state.scroll_left;
            } else if options.paging {
                left = round_to(left, state.client_width);
            } else if options.snapping {
                left = round_to(left, state.snap_width);
            }

            if !options.scrolling_y {
                top = state.scroll_top;
            } else if options.paging {
                top = round_to(top, state.client_height);
            } else if options.snapping {
                top = round_to(top, state.snap_height);
            }

            left = left.min(state.max_scroll_left).max(0.0);
            top = top.min(state.max_scroll_top).max(0.0);

            // Still publish an unchanged position so the renderer stays in sync
            let animate = animate && !(left == state.scroll_left && top == state.scroll_top);
            (left, top, zoom, animate)
        };

        self.publish(left, top, zoom, animate);
    }

    /// Apply a position, either immediately or through an eased transition
    pub(crate) fn publish(&self, left: f64, top: f64, zoom: f64, animate: bool) {
        let was_animating = self.shared.state.borrow_mut().animating.take();
        if let Some(id) = was_animating {
            self.shared.animator.stop(id);
        }

        let options = &self.shared.options;
        if animate && options.animating {
            let (old_left, old_top, old_zoom) = {
                let mut state = self.shared.state.borrow_mut();
                state.scheduled_left = left;
                state.scheduled_top = top;
                (state.scroll_left, state.scroll_top, state.zoom_level)
            };
            let diff_left = left - old_left;
            let diff_top = top - old_top;
            let diff_zoom = zoom - old_zoom;

            let step_handle = self.downgrade();
            let verify_handle = self.downgrade();
            let complete_handle = self.downgrade();
            let easing = if was_animating.is_some() {
                Easing::EaseOutCubic
            } else {
                Easing::EaseInOutCubic
            };

            let task = AnimationTask::new(move |percent, _, render| {
                if render {
                    if let Some(scroller) = Scroller::upgrade(&step_handle) {
                        let (left, top, zoom) = if percent >= 1.0 {
                            (left, top, zoom)
                        } else {
                            (
                                old_left + diff_left * percent,
                                old_top + diff_top * percent,
                                old_zoom + diff_zoom * percent,
                            )
                        };
                        {
                            let mut state = scroller.shared.state.borrow_mut();
                            state.scroll_left = left;
                            state.scroll_top = top;
                            state.zoom_level = zoom;
                        }
                        scroller.emit_change(left, top, zoom);
                    }
                }
                StepControl::Continue
            })
            .verify(move |id| match Scroller::upgrade(&verify_handle) {
                Some(scroller) => {
                    let current = scroller.shared.state.borrow().animating;
                    current == Some(id)
                }
                None => false,
            })
            .on_complete(move |_, id, finished| {
                if let Some(scroller) = Scroller::upgrade(&complete_handle) {
                    scroller.transition_completed(id, finished);
                }
            })
            .duration(options.animation_duration_ms)
            .easing(easing);

            let id = self.shared.animator.start(task);
            self.shared.state.borrow_mut().animating = Some(id);
        } else {
            {
                let mut state = self.shared.state.borrow_mut();
                state.scheduled_left = left;
                state.scroll_left = left;
                state.scheduled_top = top;
                state.scroll_top = top;
                state.zoom_level = zoom;
            }
            self.emit_change(left, top, zoom);

            if options.zooming {
                self.shared.state.borrow_mut().compute_scroll_max(zoom);
                self.resolve_zoom_complete();
            }
        }
    }

    fn transition_completed(&self, id: AnimationId, finished: bool) {
        let (was_current, did_deceleration_complete) = {
            let mut state = self.shared.state.borrow_mut();
            let was_current = state.animating == Some(id);
            if was_current {
                state.animating = None;
            }
            (was_current, state.did_deceleration_complete)
        };

        if did_deceleration_complete || finished {
            self.notify_scrolling_complete();
        }

        if self.shared.options.zooming {
            {
                let mut state = self.shared.state.borrow_mut();
                let zoom = state.zoom_level;
                state.compute_scroll_max(zoom);
            }
            // A superseded transition leaves the callback to its successor
            if was_current {
                self.resolve_zoom_complete();
            }
        }
    }

    fn resolve_zoom_complete(&self) {
        let callback = self.shared.zoom_complete.borrow_mut().take();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Report a position, clamping it to the configured bounce envelope.
    /// The stored position is left untouched.
    fn emit_change(&self, left: f64, top: f64, zoom: f64) {
        let Some(on_change) = self.shared.on_change.clone() else {
            return;
        };
        let (left, top) = {
            let state = self.shared.state.borrow();
            let options = &self.shared.options;
            let left = bounce_envelope(
                left,
                options.bouncing_x,
                state.content_width,
                state.client_width,
            );
            let top = bounce_envelope(
                top,
                options.bouncing_y,
                state.content_height,
                state.client_height,
            );
            (left, top)
        };
        on_change(left, top, zoom);
    }

    pub(crate) fn notify_scrolling_complete(&self) {
        if let Some(callback) = self.shared.on_scrolling_complete.clone() {
            callback();
        }
    }

    /// Start momentum scrolling with a release velocity in px per 60 Hz step
    pub(crate) fn start_deceleration(&self, velocity_x: f64, velocity_y: f64) {
        let options = &self.shared.options;
        let bounds = {
            let mut state = self.shared.state.borrow_mut();
            let bounds = if options.paging {
                DecelerationBounds::page(
                    state.scroll_left,
                    state.scroll_top,
                    state.max_scroll_left,
                    state.max_scroll_top,
                    state.client_width,
                    state.client_height,
                )
            } else {
                DecelerationBounds::global(state.max_scroll_left, state.max_scroll_top)
            };
            state.deceleration = Some(Deceleration {
                bounds,
                velocity: Velocity::new(velocity_x, velocity_y),
            });
            bounds
        };
        debug!(velocity_x, velocity_y, ?bounds, "Deceleration started");

        let min_velocity = options.min_velocity_to_keep_decelerating();
        let step_handle = self.downgrade();
        let verify_handle = self.downgrade();
        let complete_handle = self.downgrade();

        let task = AnimationTask::new(move |_, _, render| {
            if let Some(scroller) = Scroller::upgrade(&step_handle) {
                scroller.step_through_deceleration(render);
            }
            StepControl::Continue
        })
        .verify(move |_| {
            let Some(scroller) = Scroller::upgrade(&verify_handle) else {
                return false;
            };
            let mut state = scroller.shared.state.borrow_mut();
            let keep_going = state
                .deceleration
                .is_some_and(|deceleration| deceleration.velocity.exceeds(min_velocity));
            if !keep_going {
                state.did_deceleration_complete = true;
            }
            keep_going
        })
        .on_complete(move |_, id, _| {
            if let Some(scroller) = Scroller::upgrade(&complete_handle) {
                scroller.deceleration_completed(id);
            }
        });

        let id = self.shared.animator.start(task);
        self.shared.state.borrow_mut().decelerating = Some(id);
    }

    fn step_through_deceleration(&self, render: bool) {
        let params = DecelerationParams::from(&self.shared.options);
        let (left, top, zoom) = {
            let mut state = self.shared.state.borrow_mut();
            let (scroll_left, scroll_top) = (state.scroll_left, state.scroll_top);
            let Some(run) = state.deceleration.as_mut() else {
                return;
            };
            let (left, top) =
                deceleration::advance(scroll_left, scroll_top, &mut run.velocity, &run.bounds, &params);
            if !render {
                state.scroll_left = left;
                state.scroll_top = top;
            }
            (left, top, state.zoom_level)
        };

        if render {
            self.publish(left, top, zoom, false);
        }
    }

    fn deceleration_completed(&self, id: AnimationId) {
        let settle_at = {
            let mut state = self.shared.state.borrow_mut();
            // Preempted runs were already cleared by whoever stopped them
            if state.decelerating != Some(id) {
                return;
            }
            state.decelerating = None;
            state.deceleration = None;
            (state.did_deceleration_complete, state.scroll_left, state.scroll_top)
        };
        let (did_complete, left, top) = settle_at;
        debug!(did_complete, left, top, "Deceleration finished");

        if did_complete {
            self.notify_scrolling_complete();
        }
        self.settle(left, top, self.shared.options.snapping);
    }

    fn stop_deceleration(&self) -> bool {
        let stopped = {
            let mut state = self.shared.state.borrow_mut();
            state.deceleration = None;
            state.decelerating.take()
        };
        match stopped {
            Some(id) => self.shared.animator.stop(id),
            None => false,
        }
    }

    /// Cancel deceleration and any running transition.
    /// Returns whether anything was moving.
    pub(crate) fn interrupt(&self) -> bool {
        let decelerating = self.stop_deceleration();
        let animating = self.shared.state.borrow_mut().animating.take();
        let animating = match animating {
            Some(id) => self.shared.animator.stop(id),
            None => false,
        };
        decelerating || animating
    }

    pub(crate) fn begin_tracking(&self, dragging: bool) {
        let mut state = self.shared.state.borrow_mut();
        state.tracking = true;
        state.dragging = dragging;
        state.did_deceleration_complete = false;
    }

    pub(crate) fn end_tracking(&self) {
        self.shared.state.borrow_mut().tracking = false;
    }

    pub(crate) fn is_tracking(&self) -> bool {
        self.shared.state.borrow().tracking
    }

    pub(crate) fn set_dragging(&self, dragging: bool) {
        self.shared.state.borrow_mut().dragging = dragging;
    }

    pub(crate) fn is_dragging(&self) -> bool {
        self.shared.state.borrow().dragging
    }

    pub(crate) fn client_origin(&self) -> (f64, f64) {
        let state = self.shared.state.borrow();
        (state.client_left, state.client_top)
    }

    /// Recompute the scroll bounds for a zoom level that is not yet published
    pub(crate) fn compute_scroll_max_for(&self, zoom: f64) {
        self.shared.state.borrow_mut().compute_scroll_max(zoom);
    }

    fn downgrade(&self) -> Weak<Shared> {
        Rc::downgrade(&self.shared)
    }

    fn upgrade(handle: &Weak<Shared>) -> Option<Scroller> {
        handle.upgrade().map(|shared| Scroller { shared })
    }
}

fn round_to(value: f64, step: f64) -> f64 {
    if step > 0.0 {
        (value / step).round() * step
    } else {
        value
    }
}

fn bounce_envelope(value: f64, limit: f64, content: f64, client: f64) -> f64 {
    if limit > 0.0 && content > client {
        if value < 0.0 {
            value.max(-limit)
        } else {
            value.min(content - client + limit)
        }
    } else {
        value
    }
}
