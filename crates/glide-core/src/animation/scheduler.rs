//! Cooperative scheduler for concurrently running timed tasks.
//!
//! Tasks live in an arena of slots addressed by [`AnimationId`]. An id carries
//! the serial of the task that was started with it, so ids of finished tasks
//! never match a slot's later occupant.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use super::easing::Easing;
use crate::config::FrameConfig;
use crate::frame::FrameClock;
use crate::time::Clock;

/// Handle of a task started on an [`Animator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationId {
    slot: usize,
    serial: u64,
}

impl AnimationId {
    /// Monotonically increasing per animator
    pub fn serial(&self) -> u64 {
        self.serial
    }
}

impl fmt::Display for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.serial)
    }
}

/// Returned by a step function to request early completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
    Continue,
    Stop,
}

/// `(percent, now, render)`; `render` is false for catch-up steps
pub type StepFn = Box<dyn FnMut(f64, f64, bool) -> StepControl>;
/// Returning false cancels the task
pub type VerifyFn = Box<dyn FnMut(AnimationId) -> bool>;
/// `(estimated_fps, id, finished)`
pub type CompletedFn = Box<dyn FnOnce(f64, AnimationId, bool)>;

/// Description of a task before it is started
pub struct AnimationTask {
    step: StepFn,
    verify: Option<VerifyFn>,
    completed: Option<CompletedFn>,
    duration: Option<f64>,
    easing: Option<Easing>,
}

impl AnimationTask {
    pub fn new(step: impl FnMut(f64, f64, bool) -> StepControl + 'static) -> Self {
        Self {
            step: Box::new(step),
            verify: None,
            completed: None,
            duration: None,
            easing: None,
        }
    }

    pub fn verify(mut self, verify: impl FnMut(AnimationId) -> bool + 'static) -> Self {
        self.verify = Some(Box::new(verify));
        self
    }

    pub fn on_complete(mut self, completed: impl FnOnce(f64, AnimationId, bool) + 'static) -> Self {
        self.completed = Some(Box::new(completed));
        self
    }

    /// Fixed duration in milliseconds; without one the task runs until
    /// stopped, verified away, or its step returns [`StepControl::Stop`]
    pub fn duration(mut self, duration_ms: f64) -> Self {
        self.duration = Some(duration_ms);
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }
}

struct TaskCallbacks {
    step: RefCell<StepFn>,
    verify: RefCell<Option<VerifyFn>>,
    completed: Cell<Option<CompletedFn>>,
}

struct Task {
    serial: u64,
    callbacks: Rc<TaskCallbacks>,
    start: f64,
    last_frame: f64,
    dropped: u32,
    duration: Option<f64>,
    easing: Option<Easing>,
    active: bool,
}

#[derive(Default)]
struct Registry {
    slots: Vec<Option<Task>>,
    free: Vec<usize>,
    next_serial: u64,
}

impl Registry {
    fn get(&self, id: AnimationId) -> Option<&Task> {
        self.slots
            .get(id.slot)
            .and_then(|slot| slot.as_ref())
            .filter(|task| task.serial == id.serial)
    }

    fn get_mut(&mut self, id: AnimationId) -> Option<&mut Task> {
        self.slots
            .get_mut(id.slot)
            .and_then(|slot| slot.as_mut())
            .filter(|task| task.serial == id.serial)
    }

    fn insert(&mut self, make: impl FnOnce(u64) -> Task) -> AnimationId {
        self.next_serial += 1;
        let serial = self.next_serial;
        let task = make(serial);
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(task);
                slot
            }
            None => {
                self.slots.push(Some(task));
                self.slots.len() - 1
            }
        };
        AnimationId { slot, serial }
    }

    fn remove(&mut self, id: AnimationId) -> Option<Task> {
        if self.get(id).is_none() {
            return None;
        }
        self.free.push(id.slot);
        self.slots[id.slot].take()
    }
}

struct AnimatorInner {
    frames: Rc<dyn FrameClock>,
    clock: Rc<dyn Clock>,
    config: FrameConfig,
    registry: RefCell<Registry>,
}

/// Runs [`AnimationTask`]s frame by frame. Clones share one registry.
#[derive(Clone)]
pub struct Animator {
    inner: Rc<AnimatorInner>,
}

impl Animator {
    pub fn new(frames: Rc<dyn FrameClock>, clock: Rc<dyn Clock>, config: FrameConfig) -> Self {
        Self {
            inner: Rc::new(AnimatorInner {
                frames,
                clock,
                config,
                registry: RefCell::new(Registry::default()),
            }),
        }
    }

    /// Register a task and request its first frame
    pub fn start(&self, task: AnimationTask) -> AnimationId {
        let start = self.inner.clock.now();
        let AnimationTask {
            step,
            verify,
            completed,
            duration,
            easing,
        } = task;
        let callbacks = Rc::new(TaskCallbacks {
            step: RefCell::new(step),
            verify: RefCell::new(verify),
            completed: Cell::new(completed),
        });

        let id = self.inner.registry.borrow_mut().insert(|serial| Task {
            serial,
            callbacks,
            start,
            last_frame: start,
            dropped: 0,
            duration,
            easing,
            active: true,
        });
        debug!(id = %id, duration_ms = ?duration, "Animation started");

        self.request_frame(id);
        id
    }

    /// Mark a task inactive. Its completion runs on the next frame.
    /// Returns whether the task was running.
    pub fn stop(&self, id: AnimationId) -> bool {
        let mut registry = self.inner.registry.borrow_mut();
        match registry.get_mut(id) {
            Some(task) if task.active => {
                task.active = false;
                debug!(id = %id, "Animation stopped");
                true
            }
            _ => false,
        }
    }

    pub fn is_running(&self, id: AnimationId) -> bool {
        self.inner
            .registry
            .borrow()
            .get(id)
            .is_some_and(|task| task.active)
    }

    /// Number of tasks still holding a registry slot
    pub fn live_tasks(&self) -> usize {
        self.inner
            .registry
            .borrow()
            .slots
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    fn request_frame(&self, id: AnimationId) {
        let weak: Weak<AnimatorInner> = Rc::downgrade(&self.inner);
        self.inner.frames.schedule(Box::new(move |_| {
            if let Some(inner) = weak.upgrade() {
                Animator { inner }.frame(id);
            }
        }));
    }

    fn frame(&self, id: AnimationId) {
        let now = self.inner.clock.now();
        self.step(id, now, true);
    }

    /// Run one step; returns whether the task is still alive afterwards
    fn step(&self, id: AnimationId, now: f64, render: bool) -> bool {
        let callbacks = {
            let registry = self.inner.registry.borrow();
            match registry.get(id) {
                Some(task) if task.active => Some(task.callbacks.clone()),
                Some(_) => None,
                None => return false,
            }
        };
        let Some(callbacks) = callbacks else {
            self.finish(id, now, false);
            return false;
        };
        let verified = match callbacks.verify.borrow_mut().as_mut() {
            Some(verify) => verify(id),
            None => true,
        };
        if !verified {
            self.finish(id, now, false);
            return false;
        }

        if render {
            let last_frame = match self.inner.registry.borrow().get(id) {
                Some(task) => task.last_frame,
                None => return false,
            };
            let period = self.inner.config.frame_period_ms();
            let dropped = ((now - last_frame) / period).round() as i64 - 1;
            let catch_up = dropped.clamp(0, self.inner.config.max_catch_up_frames as i64);
            for _ in 0..catch_up {
                if !self.step(id, now, false) {
                    return false;
                }
                if let Some(task) = self.inner.registry.borrow_mut().get_mut(id) {
                    task.dropped += 1;
                }
            }
        }

        let (start, duration, easing) = match self.inner.registry.borrow().get(id) {
            Some(task) => (task.start, task.duration, task.easing),
            None => return false,
        };
        let percent = match duration {
            Some(duration) if duration > 0.0 => ((now - start) / duration).min(1.0),
            Some(_) => 1.0,
            None => 0.0,
        };
        let value = easing.map_or(percent, |easing| easing.apply(percent));

        let control = {
            let mut step = callbacks.step.borrow_mut();
            (*step)(value, now, render)
        };
        trace!(id = %id, percent, render, "Animation step");

        if !render {
            return true;
        }

        if control == StepControl::Stop || percent >= 1.0 {
            self.finish(id, now, percent >= 1.0 || duration.is_none());
            false
        } else {
            // The step may have stopped the task from the inside
            match self.inner.registry.borrow_mut().get_mut(id) {
                Some(task) => task.last_frame = now,
                None => return false,
            }
            self.request_frame(id);
            true
        }
    }

    fn finish(&self, id: AnimationId, now: f64, finished: bool) {
        let Some(task) = self.inner.registry.borrow_mut().remove(id) else {
            return;
        };
        let elapsed_secs = (now - task.start) / 1000.0;
        let target = self.inner.config.target_fps as f64;
        let fps = if elapsed_secs > 0.0 {
            target - task.dropped as f64 / elapsed_secs
        } else {
            target
        };
        debug!(id = %id, finished, fps, "Animation completed");

        if let Some(completed) = task.callbacks.completed.take() {
            completed(fps, id, finished);
        }
    }
}
