//! Collision predicates and narrow-phase dispatch.
//!
//! All functions here are pure: they take world-space geometry already
//! resolved by the caller, never allocate, and never mutate. Boundaries are
//! inclusive, so shapes that merely touch are reported as overlapping. This
//! keeps resting contact detectable without depending on float luck.

use serde::{Deserialize, Serialize};

use crate::math::{Rect, Vec2};
use crate::shape::WorldShape;

/// Which side of a body a contact happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Below,
    Above,
    Left,
    Right,
}

impl Side {
    /// The side as seen from the other body.
    pub fn opposite(self) -> Side {
        match self {
            Side::Below => Side::Above,
            Side::Above => Side::Below,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Box vs box. Overlap unless strictly separated along either axis.
#[inline]
pub fn box_box(a: &Rect, b: &Rect) -> bool {
    !(a.right() < b.left() || b.right() < a.left() || a.bottom() < b.top() || b.bottom() < a.top())
}

/// Circle vs circle: squared center distance against squared radius sum.
#[inline]
pub fn circle_circle(center_a: Vec2, radius_a: f32, center_b: Vec2, radius_b: f32) -> bool {
    let r = radius_a + radius_b;
    (center_a - center_b).length_squared() <= r * r
}

/// Box vs circle: clamp the circle center into the box and test that
/// nearest point against the radius.
#[inline]
pub fn box_circle(rect: &Rect, center: Vec2, radius: f32) -> bool {
    let nearest = Vec2::new(
        center.x.clamp(rect.left(), rect.right()),
        center.y.clamp(rect.top(), rect.bottom()),
    );
    (center - nearest).length_squared() <= radius * radius
}

/// Whether `inner` lies entirely inside `outer` (edges inclusive).
#[inline]
pub fn box_contains(outer: &Rect, inner: &Rect) -> bool {
    inner.left() >= outer.left()
        && inner.right() <= outer.right()
        && inner.top() >= outer.top()
        && inner.bottom() <= outer.bottom()
}

/// Narrow phase: dispatch to the predicate matching the shape pair.
pub fn shapes_overlap(a: &WorldShape, b: &WorldShape) -> bool {
    match (a, b) {
        (WorldShape::Box(ra), WorldShape::Box(rb)) => box_box(ra, rb),
        (
            WorldShape::Circle {
                center: ca,
                radius: ra,
            },
            WorldShape::Circle {
                center: cb,
                radius: rb,
            },
        ) => circle_circle(*ca, *ra, *cb, *rb),
        (WorldShape::Box(rect), WorldShape::Circle { center, radius })
        | (WorldShape::Circle { center, radius }, WorldShape::Box(rect)) => {
            box_circle(rect, *center, *radius)
        }
    }
}

/// The side of `a` that faces `b`, picked along the axis of least
/// penetration between the two bounding boxes.
pub fn contact_side(a: &Rect, b: &Rect) -> Side {
    let overlap_x = a.right().min(b.right()) - a.left().max(b.left());
    let overlap_y = a.bottom().min(b.bottom()) - a.top().max(b.top());
    let delta = b.center() - a.center();
    if overlap_x < overlap_y {
        if delta.x >= 0.0 {
            Side::Right
        } else {
            Side::Left
        }
    } else if delta.y >= 0.0 {
        Side::Below
    } else {
        Side::Above
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
