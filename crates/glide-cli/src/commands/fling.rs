use std::rc::Rc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::sync::{watch, Notify};
use tokio::task::LocalSet;
use tracing::info;

use glide_core::{
    select_frame_clock, Clock, Contact, GestureAdapter, GlideConfig, ScrollValues, Scroller,
    SystemClock,
};

/// Samples fed in before the release, one nominal frame apart
const FLICK_SAMPLES: u32 = 5;
const SAMPLE_SPACING_MS: f64 = 1000.0 / 60.0;

pub struct Fling {
    pub velocity: f64,
    pub viewport: f64,
    pub content: f64,
    pub timeout_secs: u64,
}

/// Where a fling ended up, and whether it stopped before the timeout
#[derive(Debug, Clone, Copy)]
pub struct Outcome {
    pub values: ScrollValues,
    pub settled: bool,
}

pub async fn run(config: &GlideConfig, fling: Fling) -> Result<()> {
    let timeout_secs = fling.timeout_secs;
    let outcome = LocalSet::new().run_until(simulate(config, fling)).await?;
    if outcome.settled {
        println!("Came to rest at top {:.2}", outcome.values.top);
    } else {
        println!(
            "Still moving after {}s, stopped at top {:.2}",
            timeout_secs, outcome.values.top
        );
    }
    Ok(())
}

async fn simulate(config: &GlideConfig, fling: Fling) -> Result<Outcome> {
    let clock: Rc<dyn Clock> = Rc::new(SystemClock::new());
    let frames = select_frame_clock(None, clock.clone(), &config.frame);
    let Some(polling) = frames.polling() else {
        bail!("no frame driver available");
    };

    let rest = Rc::new(Notify::new());
    let scroller = {
        let change_clock = clock.clone();
        let rest = rest.clone();
        Scroller::builder(config.scroller.clone())
            .frame_config(config.frame.clone())
            .on_change(move |left, top, zoom| {
                println!(
                    "{:>9.1}ms  left {:>9.2}  top {:>9.2}  zoom {:.3}",
                    change_clock.now(),
                    left,
                    top,
                    zoom
                );
            })
            .on_scrolling_complete(move || rest.notify_one())
            .build(Rc::new(frames.clone()), clock.clone())?
    };
    scroller.set_dimensions(
        Some(fling.viewport),
        Some(fling.viewport),
        Some(fling.viewport),
        Some(fling.content),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let driver = tokio::task::spawn_local(polling.run(shutdown_rx));

    // Synthesize a flick: the finger travels `velocity` px per frame upwards
    let mut adapter = GestureAdapter::new(scroller.clone());
    let start = clock.now();
    let mut y = fling.viewport / 2.0 + fling.velocity * FLICK_SAMPLES as f64;
    adapter.on_gesture_start(&[Contact::new(0.0, y)], start)?;
    for sample in 1..=FLICK_SAMPLES {
        y -= fling.velocity;
        adapter.on_gesture_move(
            &[Contact::new(0.0, y)],
            start + sample as f64 * SAMPLE_SPACING_MS,
            None,
        )?;
    }
    adapter.on_gesture_end(start + FLICK_SAMPLES as f64 * SAMPLE_SPACING_MS)?;
    info!(velocity = fling.velocity, "Released");

    let settled =
        tokio::time::timeout(Duration::from_secs(fling.timeout_secs), rest.notified()).await;

    shutdown_tx.send(true)?;
    driver.await?;

    Ok(Outcome {
        values: scroller.values(),
        settled: settled.is_ok(),
    })
}
