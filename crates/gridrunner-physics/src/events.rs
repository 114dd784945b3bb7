//! Per-frame events published by [`PhysicsEngine::advance`].
//!
//! Both event lists are rebuilt from scratch on every advance. They have no
//! identity beyond the frame that produced them.
//!
//! [`PhysicsEngine::advance`]: crate::engine::PhysicsEngine::advance

use serde::{Deserialize, Serialize};

use crate::collide::Side;
use crate::handle::BodyHandle;
use crate::tile::TileKind;

/// Two bodies whose active colliders overlapped this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// Body with the lower slot index.
    pub a: BodyHandle,
    pub b: BodyHandle,
    /// The side of `a` that faces `b`.
    pub side: Side,
    /// At least one of the two colliders is a trigger.
    pub is_trigger: bool,
}

impl CollisionEvent {
    /// Whether `body` is one of the pair.
    pub fn involves(&self, body: BodyHandle) -> bool {
        self.a == body || self.b == body
    }

    /// The other member of the pair, if `body` is in it.
    pub fn other(&self, body: BodyHandle) -> Option<BodyHandle> {
        if self.a == body {
            Some(self.b)
        } else if self.b == body {
            Some(self.a)
        } else {
            None
        }
    }

    /// The contact side from `body`'s point of view.
    pub fn side_for(&self, body: BodyHandle) -> Option<Side> {
        if self.a == body {
            Some(self.side)
        } else if self.b == body {
            Some(self.side.opposite())
        } else {
            None
        }
    }
}

/// A body overlapped a hazard or level-exit tile this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileTriggerEvent {
    pub body: BodyHandle,
    pub kind: TileKind,
    /// First matching cell found, in row-major order.
    pub cell: (i32, i32),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
