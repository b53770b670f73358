//! Monotonic clocks and gesture timestamps.
//!
//! All times inside the crate are milliseconds as `f64`.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::{Error, Result};

/// Source of the current time in milliseconds
pub trait Clock {
    fn now(&self) -> f64;
}

/// Monotonic wall clock, measured from its creation
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, now: f64) {
        self.now.set(now);
    }

    pub fn advance(&self, delta: f64) {
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

/// Time stamp attached to a gesture sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timestamp {
    /// Milliseconds on the caller's time base
    Millis(f64),
    /// Calendar time, converted to epoch milliseconds
    Date(DateTime<Utc>),
}

impl Timestamp {
    /// Milliseconds value, rejecting numbers that cannot order samples
    pub fn to_millis(&self) -> Result<f64> {
        match *self {
            Timestamp::Millis(ms) if ms.is_finite() => Ok(ms),
            Timestamp::Millis(ms) => Err(Error::InvalidTimestamp(ms.to_string())),
            Timestamp::Date(date) => Ok(date.timestamp_millis() as f64),
        }
    }
}

impl From<f64> for Timestamp {
    fn from(ms: f64) -> Self {
        Timestamp::Millis(ms)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(date: DateTime<Utc>) -> Self {
        Timestamp::Date(date)
    }
}

impl TryFrom<&serde_json::Value> for Timestamp {
    type Error = Error;

    fn try_from(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Timestamp::Millis)
                .ok_or_else(|| Error::InvalidTimestamp(n.to_string())),
            serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|d| Timestamp::Date(d.with_timezone(&Utc)))
                .map_err(|_| Error::InvalidTimestamp(s.clone())),
            other => Err(Error::InvalidTimestamp(other.to_string())),
        }
    }
}
