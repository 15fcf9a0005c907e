//! Simulation configuration.
//!
//! [`ChaosConfig`] collects every input the control surface can change. It
//! builds with chained `with_*` setters and round-trips through JSON, where
//! colors are written as `#rrggbb` strings:
//!
//! ```json
//! {
//!   "particle_count": 500,
//!   "trail_length": 200,
//!   "dt": 0.005,
//!   "substeps": 4,
//!   "low_speed_color": "#0000ff",
//!   "high_speed_color": "#ff0000"
//! }
//! ```
//!
//! Missing fields take their defaults.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::color::AutoRange;
use crate::error::ConfigError;

/// All tunable inputs of a [`ChaosManager`](crate::ChaosManager).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosConfig {
    /// Number of particles `N`.
    pub particle_count: u32,
    /// Requested trail length; the effective length may be clamped.
    pub trail_length: u32,
    /// Timestep per tick.
    pub dt: f64,
    /// Integration calls per tick, each of `dt / substeps`.
    pub substeps: u32,
    #[serde(with = "hex_color")]
    pub low_speed_color: Vec3,
    #[serde(with = "hex_color")]
    pub high_speed_color: Vec3,
    /// Contrast of the speed gradient in `[0, 1]`, 0.5 is linear.
    pub speed_contrast: f64,
    /// Upper bound on `N * trail_length`.
    pub max_total_trail_points: u32,
    pub auto_range: AutoRange,
    /// Seed for particle placement; `None` seeds from entropy.
    pub seed: Option<u64>,
    pub freeze: bool,
    /// Monotonic counter; any change restarts the simulation.
    pub restart_trigger: u64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            particle_count: 250,
            trail_length: 150,
            dt: 0.005,
            substeps: 1,
            low_speed_color: Vec3::new(0.0, 0.0, 1.0),
            high_speed_color: Vec3::new(1.0, 0.0, 0.0),
            speed_contrast: 0.5,
            max_total_trail_points: 1_000_000,
            auto_range: AutoRange::default(),
            seed: None,
            freeze: false,
            restart_trigger: 0,
        }
    }
}

impl ChaosConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of particles.
    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.particle_count = count;
        self
    }

    /// Set the requested trail length.
    pub fn with_trail_length(mut self, length: u32) -> Self {
        self.trail_length = length;
        self
    }

    /// Set the timestep per tick.
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Set the number of integration substeps per tick (at least 1).
    pub fn with_substeps(mut self, substeps: u32) -> Self {
        self.substeps = substeps.max(1);
        self
    }

    /// Set the gradient endpoints (RGB, 0.0-1.0).
    pub fn with_colors(mut self, low: Vec3, high: Vec3) -> Self {
        self.low_speed_color = low;
        self.high_speed_color = high;
        self
    }

    /// Set the gradient endpoints from `#rrggbb` strings.
    pub fn with_hex_colors(self, low: &str, high: &str) -> Result<Self, ConfigError> {
        let low = parse_hex_color(low)?;
        let high = parse_hex_color(high)?;
        Ok(self.with_colors(low, high))
    }

    /// Set the gradient contrast, clamped to `[0, 1]`.
    pub fn with_speed_contrast(mut self, contrast: f64) -> Self {
        self.speed_contrast = contrast.clamp(0.0, 1.0);
        self
    }

    /// Set the upper bound on total trail points.
    pub fn with_max_total_trail_points(mut self, points: u32) -> Self {
        self.max_total_trail_points = points;
        self
    }

    /// Set the auto-ranging parameters.
    pub fn with_auto_range(mut self, auto_range: AutoRange) -> Self {
        self.auto_range = auto_range;
        self
    }

    /// Make particle placement reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Start frozen.
    pub fn with_freeze(mut self, freeze: bool) -> Self {
        self.freeze = freeze;
        self
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ChaosConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check value ranges. Zero particles or a zero trail length are valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> Result<(), ConfigError> {
            Err(ConfigError::InvalidValue {
                field,
                reason: reason.into(),
            })
        }

        if self.substeps == 0 {
            return invalid("substeps", "must be at least 1");
        }
        if !self.dt.is_finite() {
            return invalid("dt", format!("must be finite, got {}", self.dt));
        }
        if !(0.0..=1.0).contains(&self.speed_contrast) {
            return invalid("speed_contrast", format!("must be within [0, 1], got {}", self.speed_contrast));
        }
        let auto = &self.auto_range;
        if !(0.0 <= auto.lower_percentile && auto.lower_percentile < auto.upper_percentile && auto.upper_percentile <= 1.0) {
            return invalid(
                "auto_range",
                format!(
                    "percentiles must satisfy 0 <= lower < upper <= 1, got {} and {}",
                    auto.lower_percentile, auto.upper_percentile
                ),
            );
        }
        if !(auto.smoothing > 0.0 && auto.smoothing <= 1.0) {
            return invalid("auto_range.smoothing", format!("must be within (0, 1], got {}", auto.smoothing));
        }
        if auto.resample_interval == 0 {
            return invalid("auto_range.resample_interval", "must be at least 1");
        }
        if auto.max_samples < 2 {
            return invalid("auto_range.max_samples", "must be at least 2");
        }
        Ok(())
    }
}

/// Parse `#rrggbb` (leading `#` optional) into linear 0.0-1.0 RGB.
pub fn parse_hex_color(s: &str) -> Result<Vec3, ConfigError> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(ConfigError::InvalidColor(s.to_string()));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map(|v| v as f32 / 255.0)
            .map_err(|_| ConfigError::InvalidColor(s.to_string()))
    };
    Ok(Vec3::new(channel(0)?, channel(2)?, channel(4)?))
}

/// Format 0.0-1.0 RGB as `#rrggbb`.
pub fn to_hex_color(color: Vec3) -> String {
    let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    format!("#{:02x}{:02x}{:02x}", c.x as u8, c.y as u8, c.z as u8)
}

mod hex_color {
    use glam::Vec3;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(color: &Vec3, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_hex_color(*color))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec3, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_hex_color(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_control_panel() {
        let config = ChaosConfig::default();
        assert_eq!(config.particle_count, 250);
        assert_eq!(config.trail_length, 150);
        assert_eq!(config.dt, 0.005);
        assert_eq!(config.substeps, 1);
        assert_eq!(to_hex_color(config.low_speed_color), "#0000ff");
        assert_eq!(to_hex_color(config.high_speed_color), "#ff0000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let config = ChaosConfig::new()
            .with_particle_count(10)
            .with_trail_length(20)
            .with_substeps(0)
            .with_speed_contrast(3.0)
            .with_seed(42);
        assert_eq!(config.particle_count, 10);
        assert_eq!(config.trail_length, 20);
        assert_eq!(config.substeps, 1);
        assert_eq!(config.speed_contrast, 1.0);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff0000").unwrap(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(parse_hex_color("00ff00").unwrap(), Vec3::new(0.0, 1.0, 0.0));
        assert!(parse_hex_color("#ff00").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
        assert!(parse_hex_color("#ffé000").is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let config = ChaosConfig::from_json(
            r##"{ "particle_count": 12, "low_speed_color": "#00ff00", "substeps": 4 }"##,
        )
        .unwrap();
        assert_eq!(config.particle_count, 12);
        assert_eq!(config.substeps, 4);
        assert_eq!(config.low_speed_color, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(config.trail_length, 150);
    }

    #[test]
    fn test_json_round_trip_keeps_colors() {
        let config = ChaosConfig::default().with_hex_colors("#123456", "#abcdef").unwrap();
        let json = config.to_json().unwrap();
        assert!(json.contains("\"#123456\""));
        let back = ChaosConfig::from_json(&json).unwrap();
        assert_eq!(to_hex_color(back.high_speed_color), "#abcdef");
    }

    #[test]
    fn test_validation_errors() {
        let bad = [
            r#"{ "substeps": 0 }"#,
            r#"{ "speed_contrast": 1.5 }"#,
            r#"{ "auto_range": { "lower_percentile": 0.9, "upper_percentile": 0.1 } }"#,
            r#"{ "auto_range": { "smoothing": 0.0 } }"#,
            r#"{ "auto_range": { "max_samples": 1 } }"#,
        ];
        for json in bad {
            assert!(
                matches!(ChaosConfig::from_json(json), Err(ConfigError::InvalidValue { .. })),
                "{json}"
            );
        }
        assert!(matches!(
            ChaosConfig::from_json(r##"{ "high_speed_color": "red" }"##),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_zero_sizes_are_valid() {
        let config = ChaosConfig::default().with_particle_count(0).with_trail_length(0);
        assert!(config.validate().is_ok());
    }
}
