//! Gridrunner Player -- The player control state machine.
//!
//! A [`PlayerController`] drives one player body through seven states
//! (Idle, Walk, Jump, Fall, Climb, Hurt, Dead). It reads resolved input
//! through [`ActionQuery`], steers the body before the physics step, and
//! reacts to the step's contact flags afterwards.
//!
//! # Quick Start
//!
//! ```
//! use gridrunner_player::prelude::*;
//! use gridrunner_physics::prelude::*;
//!
//! let mut engine = PhysicsEngine::new(PhysicsConfig::default()).unwrap();
//! engine.set_tile_layer(TileGrid::from_ascii(&["....", "....", "####"], 16.0).unwrap());
//! let mut player =
//!     PlayerController::spawn(&mut engine, Vec2::new(24.0, 32.0), PlayerTuning::default())
//!         .unwrap();
//!
//! let mut input = ActionState::new();
//! input.advance(ActionSet::EMPTY.with(Action::MoveRight));
//!
//! player.handle_input(&mut engine, &input).unwrap();
//! engine.advance(1.0 / 60.0);
//! player.update(&mut engine, 1.0 / 60.0).unwrap();
//!
//! assert_eq!(player.state_kind(), Some(StateKind::Walk));
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod controller;
pub mod input;
pub mod ladder;
pub mod state;

pub use config::{LadderProbes, PlayerTuning};
pub use controller::{player_body, PlayerController, PLAYER_SIZE};
pub use input::{Action, ActionQuery, ActionSet, ActionState};
pub use state::{Facing, Motion, PlayerState, StateContext, StateKind};

use gridrunner_physics::{BodyHandle, PhysicsError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by player setup and lifecycle misuse.
///
/// Per-frame problems with the body (e.g. it was unregistered) are logged
/// and skipped, not reported here.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// A controller was advanced after its state was detached.
    #[error("player controller has no active state")]
    NoActiveState,

    /// The body handle given at construction is not registered.
    #[error("player body {handle:?} is not registered with the physics engine")]
    MissingBody { handle: BodyHandle },

    #[error("invalid player tuning field '{field}': {reason}")]
    InvalidTuning {
        field: &'static str,
        reason: String,
    },

    #[error("failed to parse player tuning: {details}")]
    TuningParse { details: String },

    #[error(transparent)]
    Physics(#[from] PhysicsError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::{LadderProbes, PlayerTuning};
    pub use crate::controller::{player_body, PlayerController, PLAYER_SIZE};
    pub use crate::input::{Action, ActionQuery, ActionSet, ActionState};
    pub use crate::state::{Facing, Motion, PlayerState, StateKind};
    pub use crate::PlayerError;
}
