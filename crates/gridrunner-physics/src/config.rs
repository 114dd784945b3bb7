//! Global physics tunables.

use serde::{Deserialize, Serialize};

use crate::math::{Rect, Vec2};
use crate::PhysicsError;

/// Ceiling applied to every frame's delta time, in seconds.
pub const DEFAULT_MAX_DT: f32 = 1.0 / 30.0;

/// Largest accepted `max_speed`, in pixels per second.
pub const MAX_SPEED_CEILING: f32 = 100_000.0;

/// Configuration for a [`PhysicsEngine`](crate::engine::PhysicsEngine).
///
/// Units are pixels and seconds; y grows downward, so the default gravity
/// points along +y.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity acceleration; applied as a force scaled by mass.
    pub gravity: Vec2,
    /// Upper bound on a body's speed after integration.
    pub max_speed: f32,
    /// Delta-time ceiling. Larger frames are integrated as this value.
    pub max_dt: f32,
    /// Optional outer walls. Bodies are kept inside and flagged on contact.
    pub world_bounds: Option<Rect>,
    /// How far below its feet a previously grounded body looks for a floor
    /// to snap onto.
    pub ground_snap_distance: f32,
    /// Reject bodies with invalid mass at registration instead of skipping
    /// them during integration.
    pub strict_validation: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, 980.0),
            max_speed: 900.0,
            max_dt: DEFAULT_MAX_DT,
            world_bounds: None,
            ground_snap_distance: 4.0,
            strict_validation: false,
        }
    }
}

impl PhysicsConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::ConfigParse`] on malformed JSON and
    /// [`PhysicsError::InvalidConfig`] if the parsed values fail
    /// [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, PhysicsError> {
        let config: PhysicsConfig =
            serde_json::from_str(json).map_err(|e| PhysicsError::ConfigParse {
                details: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every tunable is usable.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !self.gravity.is_finite() {
            return Err(invalid("gravity", "must be finite"));
        }
        if !(self.max_speed > 0.0 && self.max_speed <= MAX_SPEED_CEILING) {
            return Err(invalid("max_speed", "must be positive and at most 100000"));
        }
        if !(self.max_dt > 0.0 && self.max_dt.is_finite()) {
            return Err(invalid("max_dt", "must be positive and finite"));
        }
        if !(self.ground_snap_distance >= 0.0 && self.ground_snap_distance.is_finite()) {
            return Err(invalid(
                "ground_snap_distance",
                "must be non-negative and finite",
            ));
        }
        if let Some(b) = self.world_bounds {
            if !(b.w > 0.0 && b.h > 0.0 && b.origin().is_finite() && b.size().is_finite()) {
                return Err(invalid("world_bounds", "must have positive finite size"));
            }
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> PhysicsError {
    PhysicsError::InvalidConfig {
        field,
        reason: reason.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
