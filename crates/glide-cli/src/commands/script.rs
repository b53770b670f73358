use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use glide_core::{Contact, ScrollerOptions, Timestamp};

/// Width and height in pixels
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

/// A recorded gesture session to replay against a fresh scroller
#[derive(Debug, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub options: ScrollerOptions,
    pub viewport: Extent,
    pub content: Extent,
    #[serde(default)]
    pub snap: Option<Extent>,
    /// Enables pull-to-refresh with this zone height
    #[serde(default)]
    pub refresh_height: Option<f64>,
    /// Frame period used between events
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,
    pub events: Vec<Event>,
}

fn default_frame_ms() -> f64 {
    1000.0 / 60.0
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Start {
        contacts: Vec<Contact>,
        time: serde_json::Value,
    },
    Move {
        contacts: Vec<Contact>,
        time: serde_json::Value,
        #[serde(default)]
        scale: Option<f64>,
    },
    End {
        time: serde_json::Value,
    },
    Wheel {
        delta: f64,
        time: serde_json::Value,
        x: f64,
        y: f64,
    },
    ScrollTo {
        left: f64,
        top: f64,
        #[serde(default)]
        animate: bool,
        #[serde(default)]
        zoom: Option<f64>,
    },
    ZoomTo {
        level: f64,
        #[serde(default)]
        animate: bool,
    },
    /// Let frames run for a while without input
    Wait {
        ms: f64,
    },
    FinishRefresh,
}

impl Event {
    /// Event time in milliseconds, for events that carry one
    pub fn time(&self) -> Result<Option<f64>> {
        let value = match self {
            Event::Start { time, .. }
            | Event::Move { time, .. }
            | Event::End { time }
            | Event::Wheel { time, .. } => time,
            _ => return Ok(None),
        };
        let millis = Timestamp::try_from(value)?.to_millis()?;
        Ok(Some(millis))
    }
}

impl Script {
    /// Load a script, picking the format from the file extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("toml") => Self::from_toml(&content),
            _ => bail!("unsupported script format: {}", path.display()),
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let script: Self = serde_json::from_str(content)?;
        script.options.validate()?;
        Ok(script)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let script: Self = toml::from_str(content)?;
        script.options.validate()?;
        Ok(script)
    }

    /// Time of the first timed event, used as the replay clock origin
    pub fn start_time(&self) -> Result<Option<f64>> {
        for event in &self.events {
            if let Some(time) = event.time()? {
                return Ok(Some(time));
            }
        }
        Ok(None)
    }
}
