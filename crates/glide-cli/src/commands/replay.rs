use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use anyhow::Result;
use tracing::{debug, warn};

use glide_core::{Clock, GestureAdapter, HostFrameClock, ManualClock, Scroller};

use super::script::{Event, Script};

/// Frames run after the last event while anything is still moving
const MAX_SETTLE_FRAMES: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Change { time: f64, left: f64, top: f64, zoom: f64 },
    Complete { time: f64 },
    Refresh { time: f64, stage: &'static str },
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Change {
                time,
                left,
                top,
                zoom,
            } => write!(
                f,
                "{:>9.1}ms  left {:>9.2}  top {:>9.2}  zoom {:.3}",
                time, left, top, zoom
            ),
            Record::Complete { time } => write!(f, "{:>9.1}ms  scrolling complete", time),
            Record::Refresh { time, stage } => write!(f, "{:>9.1}ms  refresh {}", time, stage),
        }
    }
}

pub fn run(path: &Path) -> Result<()> {
    let script = Script::load(path)?;
    let records = replay(&script)?;

    if records.is_empty() {
        println!("Nothing was published.");
        return Ok(());
    }

    for record in &records {
        println!("{}", record);
    }
    Ok(())
}

/// Run a script on a manual clock and collect everything the scroller reported
pub fn replay(script: &Script) -> Result<Vec<Record>> {
    let origin = script.start_time()?.unwrap_or(0.0);
    let clock = ManualClock::new(origin);
    let frames = Rc::new(HostFrameClock::new());
    let records: Rc<RefCell<Vec<Record>>> = Default::default();

    let elapsed = {
        let clock = clock.clone();
        move || clock.now() - origin
    };

    let (on_change, on_complete) = {
        let (change_log, complete_log) = (records.clone(), records.clone());
        let (change_time, complete_time) = (elapsed.clone(), elapsed.clone());
        (
            move |left, top, zoom| {
                change_log.borrow_mut().push(Record::Change {
                    time: change_time(),
                    left,
                    top,
                    zoom,
                })
            },
            move || {
                complete_log.borrow_mut().push(Record::Complete {
                    time: complete_time(),
                })
            },
        )
    };

    let scroller = Scroller::builder(script.options.clone())
        .on_change(on_change)
        .on_scrolling_complete(on_complete)
        .build(frames.clone(), Rc::new(clock.clone()))?;

    scroller.set_dimensions(
        Some(script.viewport.width),
        Some(script.viewport.height),
        Some(script.content.width),
        Some(script.content.height),
    );
    if let Some(snap) = script.snap {
        scroller.set_snap_size(snap.width, snap.height);
    }
    if let Some(height) = script.refresh_height {
        let stage = |stage: &'static str| {
            let log = records.clone();
            let time = elapsed.clone();
            move || log.borrow_mut().push(Record::Refresh { time: time(), stage })
        };
        scroller.activate_pull_to_refresh(height, stage("armed"), stage("disarmed"), stage("started"));
    }

    let mut adapter = GestureAdapter::new(scroller.clone());
    let advance_to = |target: f64| {
        while clock.now() + script.frame_ms <= target {
            clock.advance(script.frame_ms);
            frames.on_frame(clock.now());
        }
        if target > clock.now() {
            clock.set(target);
        }
    };

    for event in &script.events {
        if let Some(time) = event.time()? {
            advance_to(time);
        }
        debug!(?event, "Replaying");

        match event {
            Event::Start { contacts, .. } => adapter.on_gesture_start(contacts, clock.now())?,
            Event::Move {
                contacts, scale, ..
            } => adapter.on_gesture_move(contacts, clock.now(), *scale)?,
            Event::End { .. } => adapter.on_gesture_end(clock.now())?,
            Event::Wheel { delta, x, y, .. } => adapter.on_wheel(*delta, clock.now(), *x, *y)?,
            Event::ScrollTo {
                left,
                top,
                animate,
                zoom,
            } => scroller.scroll_to(*left, *top, *animate, *zoom)?,
            Event::ZoomTo { level, animate } => scroller.zoom_to(*level, *animate, None)?,
            Event::Wait { ms } => advance_to(clock.now() + ms),
            Event::FinishRefresh => scroller.finish_pull_to_refresh(),
        }
    }

    let mut settle_frames = 0;
    while frames.pending() > 0 {
        if settle_frames == MAX_SETTLE_FRAMES {
            warn!(frames = settle_frames, "Scroller still moving, stopping replay");
            break;
        }
        clock.advance(script.frame_ms);
        frames.on_frame(clock.now());
        settle_frames += 1;
    }

    let records = records.borrow().clone();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changes(records: &[Record]) -> Vec<(f64, f64, f64)> {
        records
            .iter()
            .filter_map(|record| match record {
                Record::Change { left, top, zoom, .. } => Some((*left, *top, *zoom)),
                _ => None,
            })
            .collect()
    }

    fn completions(records: &[Record]) -> usize {
        records
            .iter()
            .filter(|record| matches!(record, Record::Complete { .. }))
            .count()
    }

    #[test]
    fn test_scroll_to_is_clamped() {
        let script = Script::from_json(
            r#"{
                "options": { "scrolling_x": false },
                "viewport": { "width": 320, "height": 480 },
                "content": { "width": 320, "height": 1000 },
                "events": [{ "type": "scroll_to", "left": 0, "top": 2000 }]
            }"#,
        )
        .unwrap();
        let records = replay(&script).unwrap();
        assert_eq!(changes(&records).last().copied(), Some((0.0, 520.0, 1.0)));
    }

    #[test]
    fn test_flick_decelerates_and_completes_once() {
        let script = Script::from_json(
            r#"{
                "viewport": { "width": 320, "height": 480 },
                "content": { "width": 320, "height": 10000 },
                "events": [
                    { "type": "start", "contacts": [{ "x": 100, "y": 400 }], "time": 0 },
                    { "type": "move", "contacts": [{ "x": 100, "y": 370 }], "time": 16 },
                    { "type": "move", "contacts": [{ "x": 100, "y": 340 }], "time": 32 },
                    { "type": "move", "contacts": [{ "x": 100, "y": 310 }], "time": 48 },
                    { "type": "move", "contacts": [{ "x": 100, "y": 280 }], "time": 64 },
                    { "type": "end", "time": 70 }
                ]
            }"#,
        )
        .unwrap();
        let records = replay(&script).unwrap();
        let tops: Vec<f64> = changes(&records).iter().map(|(_, top, _)| *top).collect();

        let released = 90.0;
        assert!(tops.contains(&released));
        assert!(tops.last().copied().unwrap() > released + 100.0);
        // Momentum only ever moves the list further down
        let after_release = tops.iter().skip_while(|top| **top < released);
        assert!(after_release.clone().zip(after_release.skip(1)).all(|(a, b)| b >= a));
        assert_eq!(completions(&records), 1);
    }

    #[test]
    fn test_pull_to_refresh_session() {
        let script = Script::from_json(
            r#"{
                "options": { "scrolling_x": false },
                "viewport": { "width": 320, "height": 480 },
                "content": { "width": 320, "height": 1000 },
                "refresh_height": 60,
                "events": [
                    { "type": "start", "contacts": [{ "x": 100, "y": 100 }], "time": 0 },
                    { "type": "move", "contacts": [{ "x": 100, "y": 110 }], "time": 10 },
                    { "type": "move", "contacts": [{ "x": 100, "y": 240 }], "time": 20 },
                    { "type": "end", "time": 25 },
                    { "type": "wait", "ms": 500 },
                    { "type": "finish_refresh" }
                ]
            }"#,
        )
        .unwrap();
        let records = replay(&script).unwrap();
        let stages: Vec<&str> = records
            .iter()
            .filter_map(|record| match record {
                Record::Refresh { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect();
        assert_eq!(stages, vec!["armed", "started", "disarmed"]);
        let tops: Vec<f64> = changes(&records).iter().map(|(_, top, _)| *top).collect();
        assert!(tops.contains(&-60.0));
        assert_eq!(tops.last().copied(), Some(0.0));
    }

    #[test]
    fn test_zoom_without_zooming_fails() {
        let script = Script::from_json(
            r#"{
                "viewport": { "width": 100, "height": 100 },
                "content": { "width": 400, "height": 400 },
                "events": [{ "type": "zoom_to", "level": 2 }]
            }"#,
        )
        .unwrap();
        let err = replay(&script).unwrap_err();
        assert!(err.to_string().contains("Zooming"));
    }

    #[test]
    fn test_record_display() {
        let record = Record::Change {
            time: 16.0,
            left: 0.0,
            top: 12.5,
            zoom: 1.0,
        };
        assert!(record.to_string().contains("top     12.50"));
        assert!(Record::Complete { time: 1.0 }
            .to_string()
            .ends_with("scrolling complete"));
    }
}
