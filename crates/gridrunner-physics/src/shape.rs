//! Collider shapes and their world-space placement.
//!
//! A [`Collider`] owns exactly one [`Shape`]. Its world-space bounding
//! rectangle is derived from the owning body's position and scale plus an
//! offset computed from the collider's [`Alignment`].

use serde::{Deserialize, Serialize};

use crate::math::{Rect, Vec2};

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

/// Collider shape. Immutable once attached to a collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Axis-aligned box with half-extents.
    Box {
        /// Half-width along the x-axis.
        half_width: f32,
        /// Half-height along the y-axis.
        half_height: f32,
    },
    /// Circle with radius.
    Circle {
        /// Radius of the circle.
        radius: f32,
    },
}

impl Shape {
    /// Box shape from full width and height.
    pub fn rect(width: f32, height: f32) -> Self {
        Shape::Box {
            half_width: width * 0.5,
            half_height: height * 0.5,
        }
    }

    pub fn circle(radius: f32) -> Self {
        Shape::Circle { radius }
    }

    /// Full size of the shape's bounding box, regardless of variant.
    pub fn bounding_size(&self) -> Vec2 {
        match *self {
            Shape::Box {
                half_width,
                half_height,
            } => Vec2::new(half_width * 2.0, half_height * 2.0),
            Shape::Circle { radius } => Vec2::new(radius * 2.0, radius * 2.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

/// Where the owning body's position sits relative to the collider's bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    /// Body position is the top-left corner of the bounds.
    #[default]
    TopLeft,
    /// Body position is the center of the bounds.
    Center,
    /// Body position is the middle of the bottom edge (the feet).
    BottomCenter,
}

impl Alignment {
    /// Offset from the body position to the top-left corner of the bounds,
    /// in unscaled units.
    pub fn offset_for(self, size: Vec2) -> Vec2 {
        match self {
            Alignment::TopLeft => Vec2::ZERO,
            Alignment::Center => Vec2::new(-size.x * 0.5, -size.y * 0.5),
            Alignment::BottomCenter => Vec2::new(-size.x * 0.5, -size.y),
        }
    }
}

// ---------------------------------------------------------------------------
// WorldShape
// ---------------------------------------------------------------------------

/// A shape resolved into world space, ready for the narrow phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldShape {
    Box(Rect),
    Circle { center: Vec2, radius: f32 },
}

// ---------------------------------------------------------------------------
// Collider
// ---------------------------------------------------------------------------

/// A collision volume attached to a physics body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    shape: Shape,
    alignment: Alignment,
    offset: Vec2,
    /// Triggers report overlaps but never block anything.
    pub is_trigger: bool,
    /// Inactive colliders neither collide with tiles nor report overlaps.
    pub is_active: bool,
}

impl Collider {
    /// Create an active, non-trigger collider.
    pub fn new(shape: Shape, alignment: Alignment) -> Self {
        Self {
            shape,
            alignment,
            offset: alignment.offset_for(shape.bounding_size()),
            is_trigger: false,
            is_active: true,
        }
    }

    /// Create an active trigger collider.
    pub fn trigger(shape: Shape, alignment: Alignment) -> Self {
        Self {
            is_trigger: true,
            ..Self::new(shape, alignment)
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Offset from the owning body's position to the bounds' top-left corner.
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// World-space bounding rectangle: `position + offset * scale`, sized by
    /// the shape's bounding size times `scale`.
    pub fn world_bounds(&self, position: Vec2, scale: Vec2) -> Rect {
        let origin = position + self.offset.scale(scale);
        let size = self.shape.bounding_size().scale(scale);
        Rect::from_origin_size(origin, size)
    }

    /// Resolve the shape into world space for precise overlap tests.
    pub fn world_shape(&self, position: Vec2, scale: Vec2) -> WorldShape {
        let bounds = self.world_bounds(position, scale);
        match self.shape {
            Shape::Box { .. } => WorldShape::Box(bounds),
            Shape::Circle { radius } => WorldShape::Circle {
                center: bounds.center(),
                radius: radius * scale.x.abs().max(scale.y.abs()),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_size_for_each_variant() {
        assert_eq!(Shape::rect(16.0, 24.0).bounding_size(), Vec2::new(16.0, 24.0));
        assert_eq!(Shape::circle(5.0).bounding_size(), Vec2::new(10.0, 10.0));
    }

    #[test]
    fn bottom_center_alignment_puts_position_at_feet() {
        let c = Collider::new(Shape::rect(16.0, 32.0), Alignment::BottomCenter);
        let b = c.world_bounds(Vec2::new(100.0, 200.0), Vec2::ONE);
        assert_eq!(b, Rect::new(92.0, 168.0, 16.0, 32.0));
    }

    #[test]
    fn scale_applies_to_offset_and_size() {
        let c = Collider::new(Shape::rect(10.0, 10.0), Alignment::Center);
        let b = c.world_bounds(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0));
        assert_eq!(b, Rect::new(-10.0, -10.0, 20.0, 20.0));
    }

    #[test]
    fn circle_world_shape_is_centered_in_bounds() {
        let c = Collider::new(Shape::circle(4.0), Alignment::TopLeft);
        match c.world_shape(Vec2::new(10.0, 10.0), Vec2::ONE) {
            WorldShape::Circle { center, radius } => {
                assert_eq!(center, Vec2::new(14.0, 14.0));
                assert_eq!(radius, 4.0);
            }
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn trigger_constructor_sets_flags() {
        let c = Collider::trigger(Shape::rect(1.0, 1.0), Alignment::TopLeft);
        assert!(c.is_trigger);
        assert!(c.is_active);
    }
}
