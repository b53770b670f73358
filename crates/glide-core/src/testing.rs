//! Deterministic rig shared by the engine and gesture tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::ScrollerOptions;
use crate::frame::HostFrameClock;
use crate::physics::Scroller;
use crate::time::{Clock, ManualClock};

pub(crate) const FRAME_MS: f64 = 1000.0 / 60.0;

pub(crate) struct Harness {
    pub clock: ManualClock,
    pub frames: Rc<HostFrameClock>,
    pub scroller: Scroller,
    pub changes: Rc<RefCell<Vec<(f64, f64, f64)>>>,
    pub completes: Rc<Cell<u32>>,
}

impl Harness {
    pub fn new(options: ScrollerOptions) -> Self {
        let clock = ManualClock::new(0.0);
        let frames = Rc::new(HostFrameClock::new());
        let changes: Rc<RefCell<Vec<(f64, f64, f64)>>> = Default::default();
        let completes: Rc<Cell<u32>> = Default::default();

        let (sink, counter) = (changes.clone(), completes.clone());
        let scroller = Scroller::builder(options)
            .on_change(move |left, top, zoom| sink.borrow_mut().push((left, top, zoom)))
            .on_scrolling_complete(move || counter.set(counter.get() + 1))
            .build(frames.clone(), Rc::new(clock.clone()))
            .expect("valid options");

        Self {
            clock,
            frames,
            scroller,
            changes,
            completes,
        }
    }

    /// Advance the clock by `advance` ms and deliver one frame
    pub fn frame(&self, advance: f64) -> usize {
        self.clock.advance(advance);
        self.frames.on_frame(self.clock.now())
    }

    /// Deliver `count` frames at the nominal rate
    pub fn run_frames(&self, count: usize) {
        for _ in 0..count {
            self.frame(FRAME_MS);
        }
    }
}
