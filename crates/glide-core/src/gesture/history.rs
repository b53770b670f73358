use std::collections::VecDeque;

use crate::physics::Velocity;

/// Release velocity is measured over this much of the gesture's tail
pub const VELOCITY_WINDOW_MS: f64 = 100.0;

const MAX_SAMPLES: usize = 20;
const TRIM_SAMPLES: usize = 10;
const STEP_MS: f64 = 1000.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    left: f64,
    top: f64,
    time: f64,
}

/// Recent scroll positions of a gesture, oldest first
#[derive(Debug, Default)]
pub struct SampleHistory {
    samples: VecDeque<Sample>,
}

impl SampleHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, left: f64, top: f64, time: f64) {
        if self.samples.len() > MAX_SAMPLES {
            self.samples.drain(..TRIM_SAMPLES);
        }
        self.samples.push_back(Sample { left, top, time });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Velocity per 60 Hz step between the oldest sample inside the window
    /// ending at `last_move` and the current position.
    ///
    /// `None` when the window holds a single sample or no elapsed time.
    pub fn release_velocity(&self, left: f64, top: f64, last_move: f64) -> Option<Velocity> {
        let end = self.samples.len().checked_sub(1)?;
        let cutoff = last_move - VELOCITY_WINDOW_MS;
        let start = self
            .samples
            .iter()
            .rposition(|sample| sample.time <= cutoff)
            .map_or(0, |outside| outside + 1)
            .min(end);
        if start == end {
            return None;
        }

        let first = self.samples[start];
        let elapsed = self.samples[end].time - first.time;
        if elapsed <= 0.0 {
            return None;
        }
        Some(Velocity::new(
            (left - first.left) / elapsed * STEP_MS,
            (top - first.top) / elapsed * STEP_MS,
        ))
    }
}
