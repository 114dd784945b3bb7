//! Player movement tuning.
//!
//! All values are in pixels and seconds, tuned for 16px tiles and the
//! default physics gravity. They are data, not load-bearing constants:
//! levels with a different tile size are expected to ship their own.

use serde::{Deserialize, Serialize};

use gridrunner_physics::Vec2;

use crate::PlayerError;

// ---------------------------------------------------------------------------
// LadderProbes
// ---------------------------------------------------------------------------

/// Offsets of the sample points used to grab, climb and leave ladders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LadderProbes {
    /// Largest horizontal distance between the body center and a ladder
    /// column center that still allows grabbing it from above.
    pub snap_tolerance: f32,
    /// How far below the feet to look for a ladder when entering from above.
    pub below_feet: f32,
    /// Inset of the head and feet samples from the collider edges.
    pub feet_inset: f32,
    /// Height of the extra sample above the feet that keeps the body on the
    /// ladder while its bottom edge crosses a cell boundary.
    pub above_feet: f32,
    /// Upper bound on the lift applied when climbing off the top.
    pub top_nudge: f32,
    /// How far the body is pushed down into a ladder grabbed from above.
    pub entry_nudge: f32,
}

impl Default for LadderProbes {
    fn default() -> Self {
        Self {
            snap_tolerance: 6.0,
            below_feet: 2.0,
            feet_inset: 2.0,
            above_feet: 6.0,
            top_nudge: 12.0,
            entry_nudge: 6.0,
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerTuning
// ---------------------------------------------------------------------------

/// Movement parameters for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub walk_speed: f32,
    /// Horizontal speed under air control (jumping or falling).
    pub air_speed: f32,
    /// Horizontal speed limit enforced after every update.
    pub max_horizontal_speed: f32,
    /// Initial upward speed of a jump.
    pub jump_force: f32,
    pub climb_speed: f32,
    /// Grace period after leaving the ground during which jump still works.
    pub coyote_time: f32,
    /// Multiplier applied to horizontal velocity each frame while idle on
    /// the ground.
    pub idle_friction: f32,
    /// Residual horizontal speed below which idle friction stops the body.
    pub stop_epsilon: f32,
    /// Landing speed at or above which the body lands walking, not idle.
    pub walk_threshold: f32,
    /// Knockback on hurt: `x` away from the facing direction, `y` upward.
    pub hurt_knockback: Vec2,
    pub hurt_duration: f32,
    /// Upward speed given to the body on death.
    pub death_knockback: f32,
    /// Ground snapping is suppressed this long after a jump or knockback.
    pub snap_suppression: f32,
    pub ladder: LadderProbes,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            walk_speed: 120.0,
            air_speed: 110.0,
            max_horizontal_speed: 160.0,
            jump_force: 360.0,
            climb_speed: 80.0,
            coyote_time: 0.1,
            idle_friction: 0.8,
            stop_epsilon: 5.0,
            walk_threshold: 10.0,
            hurt_knockback: Vec2::new(140.0, 180.0),
            hurt_duration: 0.4,
            death_knockback: 260.0,
            snap_suppression: 0.1,
            ladder: LadderProbes::default(),
        }
    }
}

impl PlayerTuning {
    /// Parse tuning from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::TuningParse`] on malformed JSON and
    /// [`PlayerError::InvalidTuning`] if a value fails
    /// [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, PlayerError> {
        let tuning: PlayerTuning =
            serde_json::from_str(json).map_err(|e| PlayerError::TuningParse {
                details: e.to_string(),
            })?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::InvalidTuning`] naming the first bad field.
    pub fn validate(&self) -> Result<(), PlayerError> {
        let non_negative = [
            ("walk_speed", self.walk_speed),
            ("air_speed", self.air_speed),
            ("max_horizontal_speed", self.max_horizontal_speed),
            ("jump_force", self.jump_force),
            ("climb_speed", self.climb_speed),
            ("coyote_time", self.coyote_time),
            ("stop_epsilon", self.stop_epsilon),
            ("walk_threshold", self.walk_threshold),
            ("hurt_duration", self.hurt_duration),
            ("death_knockback", self.death_knockback),
            ("snap_suppression", self.snap_suppression),
            ("ladder.snap_tolerance", self.ladder.snap_tolerance),
            ("ladder.below_feet", self.ladder.below_feet),
            ("ladder.feet_inset", self.ladder.feet_inset),
            ("ladder.above_feet", self.ladder.above_feet),
            ("ladder.top_nudge", self.ladder.top_nudge),
            ("ladder.entry_nudge", self.ladder.entry_nudge),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(PlayerError::InvalidTuning {
                    field,
                    reason: format!("must be non-negative and finite, got {value}"),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.idle_friction) {
            return Err(PlayerError::InvalidTuning {
                field: "idle_friction",
                reason: format!("must lie in [0, 1], got {}", self.idle_friction),
            });
        }
        if !self.hurt_knockback.is_finite() {
            return Err(PlayerError::InvalidTuning {
                field: "hurt_knockback",
                reason: "must be finite".to_owned(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
