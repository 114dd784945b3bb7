//! Simulated bodies.
//!
//! A [`PhysicsBody`] carries its own transform (position and scale), the
//! motion state integrated by the engine, and an optional [`Collider`]. The
//! game entity that created it keeps the [`BodyHandle`](crate::BodyHandle)
//! returned at registration; the engine owns the body itself.

use serde::{Deserialize, Serialize};

use crate::collide::Side;
use crate::math::{Rect, Vec2};
use crate::shape::Collider;

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// Position and scale of an entity in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec2,
    pub scale: Vec2,
}

impl Transform {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            scale: Vec2::ONE,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(Vec2::ZERO)
    }
}

// ---------------------------------------------------------------------------
// ContactFlags
// ---------------------------------------------------------------------------

/// Which sides of a body were resolved against a solid this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFlags {
    pub below: bool,
    pub above: bool,
    pub left: bool,
    pub right: bool,
}

impl ContactFlags {
    pub fn clear(&mut self) {
        *self = ContactFlags::default();
    }

    pub fn set(&mut self, side: Side) {
        match side {
            Side::Below => self.below = true,
            Side::Above => self.above = true,
            Side::Left => self.left = true,
            Side::Right => self.right = true,
        }
    }

    pub fn get(&self, side: Side) -> bool {
        match side {
            Side::Below => self.below,
            Side::Above => self.above,
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn any(&self) -> bool {
        self.below || self.above || self.left || self.right
    }
}

// ---------------------------------------------------------------------------
// PhysicsBody
// ---------------------------------------------------------------------------

/// One simulated entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsBody {
    pub transform: Transform,
    pub velocity: Vec2,
    /// Accumulated force, cleared after every integration step.
    pub force: Vec2,
    /// Integration is skipped unless this is positive and finite.
    pub mass: f32,
    pub use_gravity: bool,
    pub enabled: bool,
    /// Climbing bodies ignore gravity and ground snapping.
    pub is_climbing: bool,
    pub collider: Option<Collider>,
    contacts: ContactFlags,
    snap_suppression: f32,
}

impl PhysicsBody {
    /// A unit-mass, gravity-affected body at `position` with no collider.
    pub fn new(position: Vec2) -> Self {
        Self {
            transform: Transform::at(position),
            velocity: Vec2::ZERO,
            force: Vec2::ZERO,
            mass: 1.0,
            use_gravity: true,
            enabled: true,
            is_climbing: false,
            collider: None,
            contacts: ContactFlags::default(),
            snap_suppression: 0.0,
        }
    }

    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.collider = Some(collider);
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_gravity(mut self, use_gravity: bool) -> Self {
        self.use_gravity = use_gravity;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn position(&self) -> Vec2 {
        self.transform.position
    }

    /// Whether the mass allows integration.
    pub fn has_valid_mass(&self) -> bool {
        self.mass > 0.0 && self.mass.is_finite()
    }

    /// Accumulate a force for the next integration step.
    pub fn add_force(&mut self, force: Vec2) {
        self.force += force;
    }

    /// Apply an instantaneous velocity change scaled by inverse mass.
    pub fn apply_impulse(&mut self, impulse: Vec2) {
        if self.has_valid_mass() {
            self.velocity += impulse * (1.0 / self.mass);
        }
    }

    /// World-space bounds of the collider, if the body has one.
    pub fn bounds(&self) -> Option<Rect> {
        self.collider
            .as_ref()
            .map(|c| c.world_bounds(self.transform.position, self.transform.scale))
    }

    /// Contact flags resolved during the most recent physics update.
    pub fn contacts(&self) -> ContactFlags {
        self.contacts
    }

    pub(crate) fn contacts_mut(&mut self) -> &mut ContactFlags {
        &mut self.contacts
    }

    pub fn has_collided_below(&self) -> bool {
        self.contacts.below
    }

    pub fn has_collided_above(&self) -> bool {
        self.contacts.above
    }

    pub fn has_collided_left(&self) -> bool {
        self.contacts.left
    }

    pub fn has_collided_right(&self) -> bool {
        self.contacts.right
    }

    /// Disable automatic ground snapping for `seconds`. A longer pending
    /// suppression is never shortened.
    pub fn suppress_snap(&mut self, seconds: f32) {
        if seconds.is_finite() {
            self.snap_suppression = self.snap_suppression.max(seconds);
        }
    }

    pub fn snap_suppressed(&self) -> bool {
        self.snap_suppression > 0.0
    }

    pub(crate) fn tick_snap_suppression(&mut self, dt: f32) {
        self.snap_suppression = (self.snap_suppression - dt).max(0.0);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Alignment, Shape};

    #[test]
    fn mass_validity() {
        assert!(PhysicsBody::new(Vec2::ZERO).has_valid_mass());
        assert!(!PhysicsBody::new(Vec2::ZERO).with_mass(0.0).has_valid_mass());
        assert!(!PhysicsBody::new(Vec2::ZERO).with_mass(-1.0).has_valid_mass());
        assert!(!PhysicsBody::new(Vec2::ZERO).with_mass(f32::NAN).has_valid_mass());
    }

    #[test]
    fn impulse_scales_by_inverse_mass() {
        let mut b = PhysicsBody::new(Vec2::ZERO).with_mass(2.0);
        b.apply_impulse(Vec2::new(10.0, 0.0));
        assert_eq!(b.velocity, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn bounds_follow_transform() {
        let mut b = PhysicsBody::new(Vec2::new(8.0, 32.0))
            .with_collider(Collider::new(Shape::rect(16.0, 32.0), Alignment::BottomCenter));
        assert_eq!(b.bounds(), Some(Rect::new(0.0, 0.0, 16.0, 32.0)));
        b.transform.translate(Vec2::new(4.0, 0.0));
        assert_eq!(b.bounds(), Some(Rect::new(4.0, 0.0, 16.0, 32.0)));
    }

    #[test]
    fn snap_suppression_counts_down_and_never_shortens() {
        let mut b = PhysicsBody::new(Vec2::ZERO);
        b.suppress_snap(0.1);
        b.suppress_snap(0.05);
        assert!(b.snap_suppressed());
        b.tick_snap_suppression(0.06);
        assert!(b.snap_suppressed());
        b.tick_snap_suppression(0.06);
        assert!(!b.snap_suppressed());
    }

    #[test]
    fn contact_flags_set_and_clear() {
        let mut f = ContactFlags::default();
        f.set(Side::Left);
        assert!(f.get(Side::Left));
        assert!(f.any());
        f.clear();
        assert!(!f.any());
    }
}
