use tracing::debug;

use super::contact::{focal_point, Contact};
use super::history::{SampleHistory, VELOCITY_WINDOW_MS};
use crate::physics::Scroller;
use crate::time::Timestamp;
use crate::Result;

/// Wheel zoom factor per notch
const WHEEL_ZOOM_OUT: f64 = 0.97;
const WHEEL_ZOOM_IN: f64 = 1.03;

/// Distance before a single contact unlocks an axis when locking is on
const LOCKED_SCROLL_THRESHOLD: f64 = 3.0;
/// Distance before a single contact starts dragging
const DRAG_THRESHOLD: f64 = 5.0;

#[derive(Debug)]
struct Session {
    initial: (f64, f64),
    last: (f64, f64),
    last_move: f64,
    last_scale: f64,
    enable_x: bool,
    enable_y: bool,
    single_contact: bool,
    /// Cleared once the touch turns into a drag
    interrupted_animation: bool,
    history: SampleHistory,
}

/// Turns raw wheel and touch samples into scroller input
pub struct GestureAdapter {
    scroller: Scroller,
    session: Option<Session>,
}

impl GestureAdapter {
    pub fn new(scroller: Scroller) -> Self {
        Self {
            scroller,
            session: None,
        }
    }

    pub fn scroller(&self) -> &Scroller {
        &self.scroller
    }

    /// One wheel notch at page position `(x, y)`; positive deltas zoom out
    pub fn on_wheel(&mut self, delta: f64, timestamp: impl Into<Timestamp>, x: f64, y: f64) -> Result<()> {
        let timestamp: Timestamp = timestamp.into();
        timestamp.to_millis()?;
        let options = self.scroller.options();

        if options.zooming {
            let factor = if delta > 0.0 { WHEEL_ZOOM_OUT } else { WHEEL_ZOOM_IN };
            let (client_left, client_top) = self.scroller.client_origin();
            let zoom = self.scroller.values().zoom * factor;
            self.scroller
                .zoom_to(zoom, false, Some((x - client_left, y - client_top)))
        } else {
            if options.scrolling_wheel {
                self.scroller.scroll_by(0.0, -delta, false);
            }
            Ok(())
        }
    }

    /// First sample of a touch. Cancels any running motion.
    pub fn on_gesture_start(&mut self, contacts: &[Contact], timestamp: impl Into<Timestamp>) -> Result<()> {
        let time = Timestamp::to_millis(&timestamp.into())?;
        let point = focal_point(contacts)?;

        let interrupted = self.scroller.interrupt();
        let single_contact = contacts.len() == 1;
        let options = self.scroller.options();
        debug!(contacts = contacts.len(), interrupted, "Gesture started");

        self.session = Some(Session {
            initial: point,
            last: point,
            last_move: time,
            last_scale: 1.0,
            enable_x: !single_contact && options.scrolling_x,
            enable_y: !single_contact && options.scrolling_y,
            single_contact,
            interrupted_animation: true,
            history: SampleHistory::new(),
        });
        // Multiple contacts drag straight away; a single one must travel first
        self.scroller.begin_tracking(!single_contact);
        Ok(())
    }

    /// Follow-up sample. `scale` is the pinch scale relative to the start.
    pub fn on_gesture_move(
        &mut self,
        contacts: &[Contact],
        timestamp: impl Into<Timestamp>,
        scale: Option<f64>,
    ) -> Result<()> {
        let time = Timestamp::to_millis(&timestamp.into())?;
        let (x, y) = focal_point(contacts)?;

        if !self.scroller.is_tracking() {
            return Ok(());
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let scroller = &self.scroller;
        let options = scroller.options();

        if scroller.is_dragging() {
            let move_x = x - session.last.0;
            let move_y = y - session.last.1;
            let values = scroller.values();
            let (mut left, mut top, mut level) = (values.left, values.top, values.zoom);

            if let (Some(scale), true) = (scale, options.zooming) {
                let old_level = level;
                level = (level / session.last_scale * scale)
                    .min(options.max_zoom)
                    .max(options.min_zoom);

                if level != old_level {
                    let (client_left, client_top) = scroller.client_origin();
                    let (rel_x, rel_y) = (x - client_left, y - client_top);
                    left = (rel_x + left) * level / old_level - rel_x;
                    top = (rel_y + top) * level / old_level - rel_y;
                    scroller.compute_scroll_max_for(level);
                }
            }

            let max = scroller.scroll_max();
            let speed = options.speed_multiplier;

            if session.enable_x {
                left -= move_x * speed;
                if left > max.left || left < 0.0 {
                    if options.bouncing {
                        // Drag through the edge at half rate
                        left += move_x / 2.0 * speed;
                    } else {
                        left = left.min(max.left).max(0.0);
                    }
                }
            }

            if session.enable_y {
                top -= move_y * speed;
                if top > max.top || top < 0.0 {
                    if options.bouncing {
                        top += move_y / 2.0 * speed;
                        if !session.enable_x && scroller.has_refresh() {
                            scroller.update_refresh_arming(top);
                        }
                    } else {
                        top = top.min(max.top).max(0.0);
                    }
                }
            }

            session.history.push(left, top, time);
            scroller.publish(left, top, level, false);
        } else {
            let scroll_threshold = if options.locking {
                LOCKED_SCROLL_THRESHOLD
            } else {
                0.0
            };
            let distance_x = (x - session.initial.0).abs();
            let distance_y = (y - session.initial.1).abs();

            session.enable_x = options.scrolling_x && distance_x >= scroll_threshold;
            session.enable_y = options.scrolling_y && distance_y >= scroll_threshold;

            let values = scroller.values();
            session.history.push(values.left, values.top, time);

            let dragging = (session.enable_x || session.enable_y)
                && (distance_x >= DRAG_THRESHOLD || distance_y >= DRAG_THRESHOLD);
            if dragging {
                scroller.set_dragging(true);
                session.interrupted_animation = false;
                debug!(
                    x_axis = session.enable_x,
                    y_axis = session.enable_y,
                    "Drag started"
                );
            }
        }

        session.last = (x, y);
        session.last_move = time;
        if let Some(scale) = scale {
            session.last_scale = scale;
        }
        Ok(())
    }

    /// Release. Starts momentum, the refresh sequence, or a settle.
    pub fn on_gesture_end(&mut self, timestamp: impl Into<Timestamp>) -> Result<()> {
        let time = Timestamp::to_millis(&timestamp.into())?;

        if !self.scroller.is_tracking() {
            return Ok(());
        }
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let scroller = &self.scroller;
        let options = scroller.options();
        scroller.end_tracking();

        if scroller.is_dragging() {
            scroller.set_dragging(false);
            let idle = time - session.last_move;

            if session.single_contact && options.animating && idle <= VELOCITY_WINDOW_MS {
                let values = scroller.values();
                let threshold = options.min_velocity_to_start_deceleration();
                match session
                    .history
                    .release_velocity(values.left, values.top, session.last_move)
                {
                    Some(velocity) if velocity.x.abs() > threshold || velocity.y.abs() > threshold => {
                        if !scroller.is_refresh_armed() {
                            scroller.start_deceleration(velocity.x, velocity.y);
                        }
                    }
                    _ => scroller.notify_scrolling_complete(),
                }
            } else if idle > VELOCITY_WINDOW_MS {
                scroller.notify_scrolling_complete();
            }
        }

        if !scroller.is_decelerating() {
            if scroller.is_refresh_armed() {
                scroller.start_refresh();
            } else {
                if session.interrupted_animation {
                    scroller.notify_scrolling_complete();
                }
                let values = scroller.values();
                scroller.settle(values.left, values.top, true);
            }
        }
        debug!(decelerating = scroller.is_decelerating(), "Gesture ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::config::ScrollerOptions;
    use crate::physics::Phase;
    use crate::testing::Harness;
    use crate::Error;

    fn touch(x: f64, y: f64) -> [Contact; 1] {
        [Contact::new(x, y)]
    }

    fn list_harness(options: ScrollerOptions) -> (Harness, GestureAdapter) {
        let h = Harness::new(options);
        h.scroller.set_dimensions(Some(320.0), Some(480.0), Some(320.0), Some(5000.0));
        let adapter = GestureAdapter::new(h.scroller.clone());
        (h, adapter)
    }

    #[test]
    fn test_slow_release_does_not_decelerate() {
        let (h, mut adapter) = list_harness(ScrollerOptions {
            bouncing: false,
            ..Default::default()
        });
        h.scroller.scroll_to(0.0, 100.0, false, None).unwrap();

        adapter.on_gesture_start(&touch(100.0, 300.0), 0.0).unwrap();
        adapter.on_gesture_move(&touch(100.0, 290.0), 10.0, None).unwrap();
        assert_eq!(h.scroller.phase(), Phase::Dragging);
        adapter.on_gesture_move(&touch(100.0, 289.7), 20.0, None).unwrap();
        adapter.on_gesture_move(&touch(100.0, 289.4), 30.0, None).unwrap();
        adapter.on_gesture_end(35.0).unwrap();

        assert!(!h.scroller.is_decelerating());
        assert_eq!(h.completes.get(), 1);
        h.run_frames(30);
        assert_eq!(h.completes.get(), 1);
    }

    #[test]
    fn test_fling_starts_deceleration() {
        let (h, mut adapter) = list_harness(ScrollerOptions::default());
        adapter.on_gesture_start(&touch(100.0, 400.0), 0.0).unwrap();
        let mut y = 400.0;
        for t in 1..=6 {
            y -= 30.0;
            adapter.on_gesture_move(&touch(100.0, y), t as f64 * 16.0, None).unwrap();
        }
        let released_at = h.scroller.values().top;
        adapter.on_gesture_end(100.0).unwrap();
        assert_eq!(h.scroller.phase(), Phase::Decelerating);
        assert_eq!(h.completes.get(), 0);

        h.run_frames(600);
        assert!(!h.scroller.is_decelerating());
        assert!(h.scroller.values().top > released_at + 100.0);
        assert_eq!(h.completes.get(), 1);
    }

    #[test]
    fn test_release_after_pause_completes_without_momentum() {
        let (h, mut adapter) = list_harness(ScrollerOptions::default());
        adapter.on_gesture_start(&touch(100.0, 400.0), 0.0).unwrap();
        adapter.on_gesture_move(&touch(100.0, 350.0), 16.0, None).unwrap();
        adapter.on_gesture_move(&touch(100.0, 300.0), 32.0, None).unwrap();
        adapter.on_gesture_end(500.0).unwrap();
        assert!(!h.scroller.is_decelerating());
        assert_eq!(h.completes.get(), 1);
        assert_eq!(h.scroller.values().top, 50.0);
    }

    #[test]
    fn test_tap_reports_completion() {
        let (h, mut adapter) = list_harness(ScrollerOptions::default());
        adapter.on_gesture_start(&touch(10.0, 10.0), 0.0).unwrap();
        assert_eq!(h.scroller.phase(), Phase::Tracking);
        adapter.on_gesture_move(&touch(11.0, 11.0), 10.0, None).unwrap();
        assert_eq!(h.scroller.phase(), Phase::Tracking);
        adapter.on_gesture_end(20.0).unwrap();
        assert_eq!(h.completes.get(), 1);
        assert_eq!(h.scroller.phase(), Phase::Idle);
    }

    #[test]
    fn test_touch_interrupts_deceleration() {
        let (h, mut adapter) = list_harness(ScrollerOptions::default());
        h.scroller.start_deceleration(0.0, 30.0);
        h.frame(16.0);
        assert!(h.scroller.is_decelerating());

        adapter.on_gesture_start(&touch(10.0, 10.0), 100.0).unwrap();
        assert!(!h.scroller.is_decelerating());
        let held = h.scroller.values().top;
        h.run_frames(10);
        assert_eq!(h.scroller.values().top, held);
    }

    #[test]
    fn test_locked_axis_ignores_cross_motion() {
        let (h, mut adapter) = list_harness(ScrollerOptions::default());
        h.scroller.set_dimensions(None, None, Some(2000.0), None);
        adapter.on_gesture_start(&touch(100.0, 300.0), 0.0).unwrap();
        // Mostly vertical: x travel stays under the locking threshold
        adapter.on_gesture_move(&touch(102.0, 290.0), 10.0, None).unwrap();
        adapter.on_gesture_move(&touch(150.0, 250.0), 20.0, None).unwrap();
        let values = h.scroller.values();
        assert_eq!(values.left, 0.0);
        assert_eq!(values.top, 40.0);
    }

    #[test]
    fn test_drag_past_edge_moves_at_half_rate() {
        let (h, mut adapter) = list_harness(ScrollerOptions::default());
        adapter.on_gesture_start(&touch(100.0, 100.0), 0.0).unwrap();
        adapter.on_gesture_move(&touch(100.0, 110.0), 10.0, None).unwrap();
        adapter.on_gesture_move(&touch(100.0, 150.0), 20.0, None).unwrap();
        assert_eq!(h.scroller.values().top, -20.0);
        assert_eq!(h.changes.borrow().last().copied(), Some((0.0, -20.0, 1.0)));
    }

    #[test]
    fn test_drag_without_bouncing_clamps() {
        let (h, mut adapter) = list_harness(ScrollerOptions {
            bouncing: false,
            ..Default::default()
        });
        adapter.on_gesture_start(&touch(100.0, 100.0), 0.0).unwrap();
        adapter.on_gesture_move(&touch(100.0, 110.0), 10.0, None).unwrap();
        adapter.on_gesture_move(&touch(100.0, 150.0), 20.0, None).unwrap();
        assert_eq!(h.scroller.values().top, 0.0);
    }

    #[test]
    fn test_speed_multiplier_scales_drag() {
        let (h, mut adapter) = list_harness(ScrollerOptions {
            speed_multiplier: 2.0,
            ..Default::default()
        });
        adapter.on_gesture_start(&touch(100.0, 300.0), 0.0).unwrap();
        adapter.on_gesture_move(&touch(100.0, 290.0), 10.0, None).unwrap();
        adapter.on_gesture_move(&touch(100.0, 270.0), 20.0, None).unwrap();
        assert_eq!(h.scroller.values().top, 40.0);
    }

    #[test]
    fn test_pull_to_refresh_through_gestures() {
        let (h, mut adapter) = list_harness(ScrollerOptions {
            scrolling_x: false,
            ..Default::default()
        });
        let starts = Rc::new(Cell::new(0));
        let activations = Rc::new(Cell::new(0));
        let (s, a) = (starts.clone(), activations.clone());
        h.scroller.activate_pull_to_refresh(
            60.0,
            move || a.set(a.get() + 1),
            || {},
            move || s.set(s.get() + 1),
        );

        adapter.on_gesture_start(&touch(100.0, 100.0), 0.0).unwrap();
        adapter.on_gesture_move(&touch(100.0, 110.0), 10.0, None).unwrap();
        adapter.on_gesture_move(&touch(100.0, 240.0), 20.0, None).unwrap();
        assert_eq!(activations.get(), 1);
        assert_eq!(h.scroller.phase(), Phase::RefreshArmed);

        adapter.on_gesture_end(25.0).unwrap();
        assert_eq!(starts.get(), 1);
        assert!(!h.scroller.is_decelerating());
        h.run_frames(30);
        assert_eq!(h.scroller.values().top, -60.0);
        assert!(h.scroller.is_refresh_armed());
        assert_eq!(starts.get(), 1);

        h.scroller.finish_pull_to_refresh();
        assert!(!h.scroller.is_refresh_armed());
        h.run_frames(30);
        assert_eq!(h.scroller.values().top, 0.0);
    }

    #[test]
    fn test_pinch_zooms_about_focal_point() {
        let (h, mut adapter) = list_harness(ScrollerOptions {
            zooming: true,
            ..Default::default()
        });
        h.scroller.set_dimensions(Some(300.0), Some(300.0), Some(1000.0), Some(1000.0));
        let pinch = [Contact::new(100.0, 100.0), Contact::new(200.0, 200.0)];
        adapter.on_gesture_start(&pinch, 0.0).unwrap();
        assert_eq!(h.scroller.phase(), Phase::Dragging);

        adapter.on_gesture_move(&pinch, 16.0, Some(2.0)).unwrap();
        let values = h.scroller.values();
        assert_eq!(values.zoom, 2.0);
        assert_eq!(values.left, 150.0);
        assert_eq!(values.top, 150.0);

        adapter.on_gesture_move(&pinch, 32.0, Some(10.0)).unwrap();
        assert_eq!(h.scroller.values().zoom, 3.0);
        adapter.on_gesture_end(48.0).unwrap();
    }

    #[test]
    fn test_wheel_zooms_about_pointer() {
        let (h, mut adapter) = list_harness(ScrollerOptions {
            zooming: true,
            ..Default::default()
        });
        h.scroller.set_position(10.0, 20.0);
        adapter.on_wheel(120.0, 0.0, 10.0, 20.0).unwrap();
        assert!((h.scroller.values().zoom - 0.97).abs() < 1e-12);
        adapter.on_wheel(-120.0, 1.0, 10.0, 20.0).unwrap();
        assert!((h.scroller.values().zoom - 0.97 * 1.03).abs() < 1e-12);
        assert_eq!(h.scroller.values().left, 0.0);
    }

    #[test]
    fn test_wheel_scrolls_when_zooming_disabled() {
        let (h, mut adapter) = list_harness(ScrollerOptions::default());
        adapter.on_wheel(-120.0, 0.0, 0.0, 0.0).unwrap();
        assert_eq!(h.scroller.values().top, 120.0);

        let (h, mut adapter) = list_harness(ScrollerOptions {
            scrolling_wheel: false,
            ..Default::default()
        });
        adapter.on_wheel(-120.0, 0.0, 0.0, 0.0).unwrap();
        assert_eq!(h.scroller.values().top, 0.0);
    }

    #[test]
    fn test_invalid_input_leaves_state_untouched() {
        let (h, mut adapter) = list_harness(ScrollerOptions::default());
        assert!(matches!(
            adapter.on_gesture_start(&[], 0.0),
            Err(Error::InvalidContacts(_))
        ));
        assert!(matches!(
            adapter.on_gesture_start(&touch(0.0, 0.0), f64::NAN),
            Err(Error::InvalidTimestamp(_))
        ));
        assert_eq!(h.scroller.phase(), Phase::Idle);

        adapter.on_gesture_start(&touch(0.0, 0.0), 0.0).unwrap();
        assert!(adapter.on_gesture_move(&[], 10.0, None).is_err());
        assert!(adapter.on_gesture_end(f64::INFINITY).is_err());
        assert_eq!(h.scroller.phase(), Phase::Tracking);
    }

    #[test]
    fn test_date_timestamps_accepted() {
        let (h, mut adapter) = list_harness(ScrollerOptions::default());
        let start = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let later = Utc.timestamp_millis_opt(1_700_000_000_010).unwrap();
        adapter.on_gesture_start(&touch(0.0, 100.0), start).unwrap();
        adapter.on_gesture_move(&touch(0.0, 90.0), later, None).unwrap();
        adapter.on_gesture_end(later).unwrap();
        assert_eq!(h.scroller.phase(), Phase::Idle);
    }

    #[test]
    fn test_moves_without_session_are_ignored() {
        let (h, mut adapter) = list_harness(ScrollerOptions::default());
        adapter.on_gesture_move(&touch(0.0, 0.0), 0.0, None).unwrap();
        adapter.on_gesture_end(10.0).unwrap();
        assert_eq!(h.completes.get(), 0);
        assert!(h.changes.borrow().len() <= 1);
    }
}
