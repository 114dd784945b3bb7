//! Gridrunner Physics -- Tile-based 2D platformer physics.
//!
//! This crate holds the simulation core: a registry of [`PhysicsBody`]s
//! addressed by generational [`BodyHandle`]s, a [`TileGrid`] that bodies
//! collide with, pure collision predicates, and the [`PhysicsEngine`] that
//! advances everything one frame at a time and publishes the frame's
//! collision and tile-trigger events.
//!
//! # Quick Start
//!
//! ```
//! use gridrunner_physics::prelude::*;
//!
//! let mut engine = PhysicsEngine::new(PhysicsConfig::default()).unwrap();
//! engine.set_tile_layer(TileGrid::from_ascii(&["....", "....", "####"], 16.0).unwrap());
//!
//! let body = PhysicsBody::new(Vec2::new(24.0, 32.0))
//!     .with_collider(Collider::new(Shape::rect(12.0, 24.0), Alignment::BottomCenter));
//! let handle = engine.register_body(body).unwrap();
//!
//! engine.advance(1.0 / 60.0);
//!
//! let body = engine.body(handle).unwrap();
//! assert!(body.has_collided_below());
//! assert_eq!(body.velocity.y, 0.0);
//! ```

#![deny(unsafe_code)]

pub mod body;
pub mod collide;
pub mod config;
pub mod engine;
pub mod events;
pub mod handle;
pub mod math;
pub mod shape;
pub mod tile;

pub use body::{ContactFlags, PhysicsBody, Transform};
pub use config::PhysicsConfig;
pub use engine::PhysicsEngine;
pub use handle::BodyHandle;
pub use math::{Rect, Vec2};
pub use shape::{Alignment, Collider, Shape};
pub use tile::{TileGrid, TileKind, TileQuery};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by physics setup operations.
///
/// Per-frame stepping never fails; problems with individual bodies are
/// skipped and logged instead.
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    /// The handle does not refer to a registered body.
    #[error("body {handle:?} does not exist (stale or never registered)")]
    StaleHandle { handle: BodyHandle },

    /// A body was registered with a mass that cannot be integrated.
    #[error("body mass must be positive and finite, got {mass}")]
    InvalidMass { mass: f32 },

    /// A configuration field holds an unusable value.
    #[error("invalid physics config field '{field}': {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    /// A configuration document could not be parsed.
    #[error("failed to parse physics config: {details}")]
    ConfigParse { details: String },

    /// A tile layer could not be built.
    #[error("invalid tile layer: {details}")]
    InvalidTileLayer { details: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::body::{ContactFlags, PhysicsBody, Transform};
    pub use crate::collide::Side;
    pub use crate::config::PhysicsConfig;
    pub use crate::engine::PhysicsEngine;
    pub use crate::events::{CollisionEvent, TileTriggerEvent};
    pub use crate::handle::BodyHandle;
    pub use crate::math::{Rect, Vec2};
    pub use crate::shape::{Alignment, Collider, Shape};
    pub use crate::tile::{TileGrid, TileKind, TileQuery};
    pub use crate::PhysicsError;
}
