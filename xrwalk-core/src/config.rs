/// Tunables for locomotion, input and interaction
use serde::Deserialize;
use thiserror::Error;

pub const MIN_BASE_SPEED: f32 = 0.5;
pub const MAX_BASE_SPEED: f32 = 4.0;
pub const BASE_SPEED_STEP: f32 = 0.25;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config at '{path}': {message}")]
    Json { path: String, message: String },
    #[error("invalid config value for '{field}': {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WalkConfig {
    pub base_speed: f32,
    pub sprint_multiplier: f32,
    /// Velocity multiplier applied after each move
    pub friction: f32,
    /// World units moved per unit of velocity in one tick
    pub step_scale: f32,
    /// Fraction of the joystick's max throw ignored around the centre
    pub joystick_dead_zone: f32,
    pub look_sensitivity: f32,
    pub viewing_distance: f32,
    pub pick_distance: Option<f32>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            base_speed: 1.5,
            sprint_multiplier: 1.5,
            friction: 0.8,
            step_scale: 0.1,
            joystick_dead_zone: 0.3,
            look_sensitivity: 0.002,
            viewing_distance: 5.0,
            pick_distance: None,
        }
    }
}

impl WalkConfig {
    /// Parse a JSON config; missing fields fall back to defaults
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let de = &mut serde_json::Deserializer::from_str(input);
        let config: Self = serde_path_to_error::deserialize(de).map_err(|error| {
            let path = error.path().to_string();
            ConfigError::Json {
                path,
                message: error.into_inner().to_string(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("base_speed", self.base_speed),
            ("sprint_multiplier", self.sprint_multiplier),
            ("step_scale", self.step_scale),
            ("viewing_distance", self.viewing_distance),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    message: format!("must be positive, got {value}"),
                });
            }
        }
        if !(0.0..1.0).contains(&self.friction) {
            return Err(ConfigError::Invalid {
                field: "friction",
                message: format!("must be in [0, 1), got {}", self.friction),
            });
        }
        if !(0.0..1.0).contains(&self.joystick_dead_zone) {
            return Err(ConfigError::Invalid {
                field: "joystick_dead_zone",
                message: format!("must be in [0, 1), got {}", self.joystick_dead_zone),
            });
        }
        Ok(())
    }
}

/// Clamp to the slider range and snap to its step
pub fn snap_base_speed(speed: f32) -> f32 {
    let clamped = speed.clamp(MIN_BASE_SPEED, MAX_BASE_SPEED);
    (clamped / BASE_SPEED_STEP).round() * BASE_SPEED_STEP
}
