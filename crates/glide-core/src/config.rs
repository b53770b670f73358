use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlideConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scroller: ScrollerOptions,
    #[serde(default)]
    pub frame: FrameConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Behaviour switches and physics coefficients of a scroller.
///
/// Frozen once a [`crate::Scroller`] is built from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollerOptions {
    /// Allow scrolling on the x-axis
    #[serde(default = "default_true")]
    pub scrolling_x: bool,
    /// Allow scrolling on the y-axis
    #[serde(default = "default_true")]
    pub scrolling_y: bool,
    /// Let the wheel scroll when zooming is disabled
    #[serde(default = "default_true")]
    pub scrolling_wheel: bool,
    /// Animate deceleration, zoom and bounce transitions
    #[serde(default = "default_true")]
    pub animating: bool,
    /// Duration of animated transitions in milliseconds
    #[serde(default = "default_animation_duration")]
    pub animation_duration_ms: f64,
    /// Allow excursions beyond the scroll bounds
    #[serde(default = "default_true")]
    pub bouncing: bool,
    /// Maximum reported excursion on the x-axis (0 = unbounded)
    #[serde(default)]
    pub bouncing_x: f64,
    /// Maximum reported excursion on the y-axis (0 = unbounded)
    #[serde(default)]
    pub bouncing_y: f64,
    /// Lock single-contact drags to the dominant axis
    #[serde(default = "default_true")]
    pub locking: bool,
    /// Rest only on whole-viewport pages
    #[serde(default)]
    pub paging: bool,
    /// Rest only on multiples of the snap size
    #[serde(default)]
    pub snapping: bool,
    /// Enable pinch and wheel zooming
    #[serde(default)]
    pub zooming: bool,
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,
    /// Multiplier applied to drag distances
    #[serde(default = "default_speed_multiplier")]
    pub speed_multiplier: f64,
    /// Pull-back applied while moving back towards the bounds
    #[serde(default = "default_penetration_deceleration")]
    pub penetration_deceleration: f64,
    /// Spring pull-back applied while moving further outside the bounds
    #[serde(default = "default_penetration_acceleration")]
    pub penetration_acceleration: f64,
    /// Per-step velocity attenuation during deceleration
    #[serde(default = "default_friction_factor")]
    pub friction_factor: f64,
}

impl Default for ScrollerOptions {
    fn default() -> Self {
        Self {
            scrolling_x: default_true(),
            scrolling_y: default_true(),
            scrolling_wheel: default_true(),
            animating: default_true(),
            animation_duration_ms: default_animation_duration(),
            bouncing: default_true(),
            bouncing_x: 0.0,
            bouncing_y: 0.0,
            locking: default_true(),
            paging: false,
            snapping: false,
            zooming: false,
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            speed_multiplier: default_speed_multiplier(),
            penetration_deceleration: default_penetration_deceleration(),
            penetration_acceleration: default_penetration_acceleration(),
            friction_factor: default_friction_factor(),
        }
    }
}

impl ScrollerOptions {
    /// Reject option combinations the physics cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.min_zoom > 0.0 && self.max_zoom > 0.0) {
            return Err(crate::Error::Config(format!(
                "zoom limits must be positive (min_zoom={}, max_zoom={})",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.min_zoom > self.max_zoom {
            return Err(crate::Error::Config(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if !(self.friction_factor > 0.0 && self.friction_factor <= 1.0) {
            return Err(crate::Error::Config(format!(
                "friction_factor must be in (0, 1], got {}",
                self.friction_factor
            )));
        }
        if !self.animation_duration_ms.is_finite() || self.animation_duration_ms < 0.0 {
            return Err(crate::Error::Config(format!(
                "animation_duration_ms must be a non-negative number, got {}",
                self.animation_duration_ms
            )));
        }
        Ok(())
    }

    /// Release velocity needed before deceleration starts
    pub fn min_velocity_to_start_deceleration(&self) -> f64 {
        if self.paging || self.snapping {
            4.0
        } else {
            1.0
        }
    }

    /// Velocity below which deceleration counts as settled
    pub fn min_velocity_to_keep_decelerating(&self) -> f64 {
        if self.snapping {
            4.0
        } else {
            0.001
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Nominal frame rate of the scheduler
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    /// Idle time after which the polling clock suspends itself
    #[serde(default = "default_idle_suspend")]
    pub idle_suspend_ms: f64,
    /// Upper bound on catch-up steps replayed per frame
    #[serde(default = "default_max_catch_up")]
    pub max_catch_up_frames: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            idle_suspend_ms: default_idle_suspend(),
            max_catch_up_frames: default_max_catch_up(),
        }
    }
}

impl FrameConfig {
    /// Nominal frame period in milliseconds
    pub fn frame_period_ms(&self) -> f64 {
        if self.target_fps == 0 {
            1000.0 / 60.0
        } else {
            1000.0 / self.target_fps as f64
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_animation_duration() -> f64 {
    250.0
}

fn default_min_zoom() -> f64 {
    0.5
}

fn default_max_zoom() -> f64 {
    3.0
}

fn default_speed_multiplier() -> f64 {
    1.0
}

fn default_penetration_deceleration() -> f64 {
    0.03
}

fn default_penetration_acceleration() -> f64 {
    0.08
}

fn default_friction_factor() -> f64 {
    0.95
}

fn default_target_fps() -> u32 {
    60
}

fn default_idle_suspend() -> f64 {
    2500.0
}

fn default_max_catch_up() -> u32 {
    4
}

impl GlideConfig {
    /// Load configuration from file or return defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path, defaulting when it is missing
    pub fn load_from(path: &std::path::Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self =
                toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
            config.scroller.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = self.to_toml()?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn to_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Get the configuration file path
    /// Always uses ~/.config/glide/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("glide")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ScrollerOptions::default();
        assert!(options.scrolling_x && options.scrolling_y);
        assert!(options.bouncing);
        assert!(!options.zooming);
        assert_eq!(options.animation_duration_ms, 250.0);
        assert_eq!(options.friction_factor, 0.95);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: GlideConfig = toml::from_str(
            r#"
            [scroller]
            paging = true
            max_zoom = 4.0
            "#,
        )
        .unwrap();
        assert!(config.scroller.paging);
        assert_eq!(config.scroller.max_zoom, 4.0);
        assert_eq!(config.scroller.min_zoom, 0.5);
        assert_eq!(config.frame.target_fps, 60);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_validate_rejects_inverted_zoom() {
        let options = ScrollerOptions {
            min_zoom: 2.0,
            max_zoom: 1.0,
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_deceleration_thresholds() {
        let mut options = ScrollerOptions::default();
        assert_eq!(options.min_velocity_to_start_deceleration(), 1.0);
        assert_eq!(options.min_velocity_to_keep_decelerating(), 0.001);

        options.paging = true;
        assert_eq!(options.min_velocity_to_start_deceleration(), 4.0);
        assert_eq!(options.min_velocity_to_keep_decelerating(), 0.001);

        options.paging = false;
        options.snapping = true;
        assert_eq!(options.min_velocity_to_keep_decelerating(), 4.0);
    }

    #[test]
    fn test_frame_period() {
        let frame = FrameConfig::default();
        assert!((frame.frame_period_ms() - 16.666).abs() < 0.01);
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = GlideConfig::default();
        let text = config.to_toml().unwrap();
        let parsed: GlideConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.scroller, config.scroller);
    }
}
