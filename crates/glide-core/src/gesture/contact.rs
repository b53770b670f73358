use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One touch point in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub x: f64,
    pub y: f64,
}

impl Contact {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Point a gesture is tracked by: the single contact, or the midpoint of the
/// first two
pub(crate) fn focal_point(contacts: &[Contact]) -> Result<(f64, f64)> {
    match contacts {
        [] => Err(Error::InvalidContacts("empty contact list".to_string())),
        [only] => Ok((only.x, only.y)),
        [first, second, ..] => Ok(((first.x + second.x) / 2.0, (first.y + second.y) / 2.0)),
    }
}
