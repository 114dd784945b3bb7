//! Gridrunner Engine -- Scene driver with snapshots and deterministic replay.
//!
//! This crate builds on [`gridrunner_physics`] and [`gridrunner_player`] to
//! provide the game loop: a fixed-timestep [`Scene`](scene::Scene) that runs
//! player input, physics and state updates in a deterministic order, turns
//! the frame's physics events into game-layer [`GameEvent`](scene::GameEvent)s,
//! and can be snapshotted, hashed and replayed.
//!
//! # Quick Start
//!
//! ```
//! use gridrunner_engine::prelude::*;
//!
//! let tiles = TileGrid::from_ascii(
//!     &["..........", "..........", "......^^E.", "##########"],
//!     16.0,
//! )
//! .unwrap();
//! let mut scene = Scene::new(SceneConfig::default(), PhysicsConfig::default(), tiles).unwrap();
//! let p1 = scene.add_player(Vec2::new(24.0, 48.0), PlayerTuning::default()).unwrap();
//!
//! let events = scene.run_frames(60, &[ActionSet::EMPTY.with(Action::MoveRight)]).unwrap();
//! assert!(events.contains(&GameEvent::PlayerHurt { player: p1, health: 2 }));
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod replay;
pub mod scene;
pub mod snapshot;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the physics crate for convenience.
pub use gridrunner_physics;

/// Re-export the player crate for convenience.
pub use gridrunner_player;

use gridrunner_physics::PhysicsError;
use gridrunner_player::PlayerError;

use crate::scene::PlayerId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by scene setup, lifecycle misuse and snapshots.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("invalid scene config field '{field}': {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    #[error("failed to parse scene config: {details}")]
    ConfigParse { details: String },

    /// The id was never issued by this scene.
    #[error("no player {player} in this scene")]
    UnknownPlayer { player: PlayerId },

    /// A snapshot could not be serialized or parsed.
    #[error("snapshot serialization failed: {details}")]
    Snapshot { details: String },

    /// A snapshot's content does not match its recorded digest.
    #[error("snapshot hash mismatch: recorded {recorded} but recomputed {recomputed}")]
    SnapshotHashMismatch {
        recorded: String,
        recomputed: String,
    },

    /// A snapshot is internally inconsistent.
    #[error("snapshot does not describe a consistent scene: {details}")]
    SnapshotMismatch { details: String },

    #[error(transparent)]
    Physics(#[from] PhysicsError),

    #[error(transparent)]
    Player(#[from] PlayerError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the lower layers.
    pub use gridrunner_physics::prelude::*;
    pub use gridrunner_player::prelude::*;

    // Engine-specific exports.
    pub use crate::config::SceneConfig;
    pub use crate::replay::{
        replay, ReplayDivergence, ReplayEntry, ReplayLog, ReplayRecorder, ReplayResult,
    };
    pub use crate::scene::{FrameDiagnostics, GameEvent, PlayerId, PlayerSlot, PropKind, Scene};
    pub use crate::snapshot::SceneSnapshot;
    pub use crate::SceneError;
}
