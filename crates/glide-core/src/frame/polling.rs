use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use super::{FrameCallback, FrameClock};
use crate::config::FrameConfig;
use crate::time::Clock;

/// Fixed-interval fallback used when no native frame source exists.
///
/// Every callback queued between two ticks fires on the next tick with a
/// shared timestamp. After `idle_suspend_ms` without any callback the clock
/// suspends itself; the next [`FrameClock::schedule`] resumes it.
pub struct PollingFrameClock {
    clock: Rc<dyn Clock>,
    config: FrameConfig,
    pending: RefCell<Vec<FrameCallback>>,
    running: Cell<bool>,
    last_active: Cell<f64>,
    wake: Notify,
}

impl PollingFrameClock {
    pub fn new(clock: Rc<dyn Clock>, config: FrameConfig) -> Self {
        let now = clock.now();
        Self {
            clock,
            config,
            pending: RefCell::new(Vec::new()),
            running: Cell::new(false),
            last_active: Cell::new(now),
            wake: Notify::new(),
        }
    }

    /// Whether the polling timer is currently active
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.config.frame_period_ms() / 1000.0)
    }

    /// One timer tick: run the batch, then suspend if idle for too long.
    /// Returns how many callbacks ran.
    pub fn tick(&self) -> usize {
        if !self.running.get() {
            return 0;
        }

        let time = self.clock.now();
        let callbacks = std::mem::take(&mut *self.pending.borrow_mut());
        let count = callbacks.len();
        for callback in callbacks {
            callback(time);
            self.last_active.set(time);
        }

        if time - self.last_active.get() > self.config.idle_suspend_ms {
            self.running.set(false);
            debug!(idle_ms = time - self.last_active.get(), "Frame polling suspended");
        } else {
            trace!(callbacks = count, "Frame tick");
        }
        count
    }

    /// Drive the clock until `shutdown` flips to true or its sender drops
    pub async fn run(self: Rc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if !self.running.get() {
                tokio::select! {
                    _ = self.wake.notified() => {
                        interval.reset();
                        continue;
                    }
                    result = shutdown.changed() => {
                        if result.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }
            }

            tokio::select! {
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    self.tick();
                }
            }
        }
        debug!("Frame polling driver stopped");
    }
}

impl FrameClock for PollingFrameClock {
    fn schedule(&self, callback: FrameCallback) {
        self.pending.borrow_mut().push(callback);
        if !self.running.get() {
            self.running.set(true);
            self.last_active.set(self.clock.now());
            self.wake.notify_one();
            debug!("Frame polling resumed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    fn polling(clock: &ManualClock) -> PollingFrameClock {
        PollingFrameClock::new(Rc::new(clock.clone()), FrameConfig::default())
    }

    #[test]
    fn test_shared_timestamp_per_tick() {
        let clock = ManualClock::new(0.0);
        let frames = polling(&clock);
        let seen = Rc::new(RefCell::new(Vec::new()));
        for _ in 0..2 {
            let seen = seen.clone();
            frames.schedule(Box::new(move |now| seen.borrow_mut().push(now)));
        }
        clock.advance(16.0);
        assert_eq!(frames.tick(), 2);
        assert_eq!(*seen.borrow(), vec![16.0, 16.0]);
        assert_eq!(frames.tick(), 0);
    }

    #[test]
    fn test_suspends_when_idle_and_resumes_on_schedule() {
        let clock = ManualClock::new(0.0);
        let frames = polling(&clock);
        assert!(!frames.is_running());

        frames.schedule(Box::new(|_| {}));
        assert!(frames.is_running());
        clock.advance(16.0);
        frames.tick();

        clock.advance(2000.0);
        frames.tick();
        assert!(frames.is_running());

        clock.advance(600.0);
        frames.tick();
        assert!(!frames.is_running());

        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        frames.schedule(Box::new(move |_| flag.set(true)));
        assert!(frames.is_running());
        clock.advance(16.0);
        frames.tick();
        assert!(fired.get());
    }

    #[test]
    fn test_suspended_clock_does_not_fire() {
        let clock = ManualClock::new(0.0);
        let frames = polling(&clock);
        assert_eq!(frames.tick(), 0);
        assert!(!frames.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_fires_resumes_and_stops() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let clock = ManualClock::new(0.0);
                let frames = Rc::new(polling(&clock));
                let (tx, rx) = watch::channel(false);
                let driver = tokio::task::spawn_local(frames.clone().run(rx));

                let fired = Rc::new(Cell::new(0));
                let counter = fired.clone();
                frames.schedule(Box::new(move |_| counter.set(counter.get() + 1)));

                tokio::time::sleep(Duration::from_millis(50)).await;
                assert_eq!(fired.get(), 1);

                // Idle past the suspend limit, then wake the driver back up
                clock.advance(3000.0);
                tokio::time::sleep(Duration::from_millis(50)).await;
                assert!(!frames.is_running());

                let counter = fired.clone();
                frames.schedule(Box::new(move |_| counter.set(counter.get() + 1)));
                assert!(frames.is_running());
                tokio::time::sleep(Duration::from_millis(50)).await;
                assert_eq!(fired.get(), 2);

                tx.send(true).unwrap();
                driver.await.unwrap();
            })
            .await;
    }
}
