//! Scene configuration: the fixed frame step and the game-layer rules
//! applied to physics events.

use serde::{Deserialize, Serialize};

use crate::SceneError;

/// Configuration for a [`Scene`](crate::scene::Scene).
///
/// The `fixed_dt` is the duration in seconds of each frame. A value of
/// `1.0 / 60.0` gives 60 frames per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Fixed time step in seconds per frame. Must be positive and finite.
    pub fixed_dt: f32,
    /// Health every player spawns with.
    pub starting_health: u32,
    /// Seconds a player ignores further damage after being hurt.
    pub invulnerability: f32,
    /// Health lost per hazard contact.
    pub hazard_damage: u32,
}

impl Default for SceneConfig {
    /// Defaults to 60 Hz, three hit points, one second of invulnerability.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            starting_health: 3,
            invulnerability: 1.0,
            hazard_damage: 1,
        }
    }
}

impl SceneConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::ConfigParse`] on malformed JSON and
    /// [`SceneError::InvalidConfig`] if a value fails
    /// [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        let config: SceneConfig =
            serde_json::from_str(json).map_err(|e| SceneError::ConfigParse {
                details: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`SceneError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), SceneError> {
        if !(self.fixed_dt > 0.0 && self.fixed_dt.is_finite()) {
            return Err(SceneError::InvalidConfig {
                field: "fixed_dt",
                reason: format!("must be positive and finite, got {}", self.fixed_dt),
            });
        }
        if self.starting_health == 0 {
            return Err(SceneError::InvalidConfig {
                field: "starting_health",
                reason: "must be at least 1".to_owned(),
            });
        }
        if !(self.invulnerability >= 0.0 && self.invulnerability.is_finite()) {
            return Err(SceneError::InvalidConfig {
                field: "invulnerability",
                reason: format!("must be non-negative and finite, got {}", self.invulnerability),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_60hz() {
        let config = SceneConfig::default();
        assert!((config.fixed_dt - 1.0 / 60.0).abs() < f32::EPSILON);
        config.validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SceneConfig::from_json(r#"{ "starting_health": 5 }"#).unwrap();
        assert_eq!(config.starting_health, 5);
        assert_eq!(config.hazard_damage, 1);
    }

    #[test]
    fn rejects_unusable_values() {
        for (json, field) in [
            (r#"{ "fixed_dt": 0 }"#, "fixed_dt"),
            (r#"{ "fixed_dt": -0.5 }"#, "fixed_dt"),
            (r#"{ "starting_health": 0 }"#, "starting_health"),
            (r#"{ "invulnerability": -1 }"#, "invulnerability"),
        ] {
            match SceneConfig::from_json(json) {
                Err(SceneError::InvalidConfig { field: got, .. }) => assert_eq!(got, field),
                other => panic!("{json}: expected InvalidConfig, got {other:?}"),
            }
        }
        assert!(matches!(
            SceneConfig::from_json("{ nope"),
            Err(SceneError::ConfigParse { .. })
        ));
    }
}
