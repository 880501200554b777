use codec::CodecError;
use engine::{RenderMode, TrackingMode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_STYLE: &str = "https://demotiles.maplibre.org/style.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid controller config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("pixelRatio must be a positive number, got {0}")]
    PixelRatio(f64),
    #[error("hitRadiusPx must be a non-negative number, got {0}")]
    HitRadius(f64),
    #[error("initialStyle must not be empty")]
    EmptyStyle,
    #[error("myLocationTrackingMode {0} is not in 0..=3")]
    TrackingMode(i64),
    #[error("myLocationRenderMode {0} is not in 0..=2")]
    RenderMode(i64),
    #[error("invalid initial options: {0}")]
    Options(#[from] CodecError),
}

/// Creation parameters of one controller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerConfig {
    pub initial_style: String,
    /// Display density. Host pixel arguments are multiplied by it.
    pub pixel_ratio: f64,
    pub drag_enabled: bool,
    /// Half-size of the hit-test window, in device pixels.
    pub hit_radius_px: f64,
    pub track_camera_position: bool,
    pub my_location_enabled: bool,
    pub my_location_tracking_mode: i64,
    pub my_location_render_mode: i64,
    /// Device language used by `map#matchMapLanguageWithDeviceDefault`.
    pub locale: String,
    /// Options bag applied once the map is ready, with `map#update` semantics.
    pub initial_options: Option<Value>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            initial_style: DEFAULT_STYLE.to_string(),
            pixel_ratio: 1.0,
            drag_enabled: true,
            hit_radius_px: 10.0,
            track_camera_position: false,
            my_location_enabled: false,
            my_location_tracking_mode: 0,
            my_location_render_mode: 0,
            locale: "en".to_string(),
            initial_options: None,
        }
    }
}

impl ControllerConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0) {
            return Err(ConfigError::PixelRatio(self.pixel_ratio));
        }
        if !(self.hit_radius_px.is_finite() && self.hit_radius_px >= 0.0) {
            return Err(ConfigError::HitRadius(self.hit_radius_px));
        }
        if self.initial_style.trim().is_empty() {
            return Err(ConfigError::EmptyStyle);
        }
        if TrackingMode::from_code(self.my_location_tracking_mode).is_none() {
            return Err(ConfigError::TrackingMode(self.my_location_tracking_mode));
        }
        if RenderMode::from_code(self.my_location_render_mode).is_none() {
            return Err(ConfigError::RenderMode(self.my_location_render_mode));
        }
        Ok(())
    }
}
