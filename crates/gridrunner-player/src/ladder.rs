//! Ladder sampling: grabbing a ladder, staying on it, and leaving it.
//!
//! Ladders never block a climbing body in the physics layer, so every
//! decision here is made by sampling tile classifications at points on the
//! body's vertical center line. The offsets come from [`LadderProbes`].

use gridrunner_physics::{PhysicsBody, TileKind, TileQuery, Vec2};

use crate::config::LadderProbes;

/// Which of the body's sample points lie inside ladder cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LadderContact {
    pub head: bool,
    pub center: bool,
    pub feet: bool,
    /// A little above the feet; keeps the body on the ladder while its
    /// bottom edge crosses a cell boundary.
    pub above_feet: bool,
}

impl LadderContact {
    pub fn any(&self) -> bool {
        self.head || self.center || self.feet || self.above_feet
    }

    /// Only the feet are still on the ladder: the body is straddling the
    /// top of a ladder it is climbing out of.
    pub fn straddling_top(&self) -> bool {
        self.feet && !self.above_feet && !self.center && !self.head
    }
}

/// Sample the body against the ladder layer. `None` without a collider.
pub fn sample(body: &PhysicsBody, tiles: &dyn TileQuery, probes: &LadderProbes) -> Option<LadderContact> {
    let b = body.bounds()?;
    let cx = b.center().x;
    let on = |y: f32| tiles.classify(Vec2::new(cx, y)) == TileKind::Ladder;
    Some(LadderContact {
        head: on(b.top() + probes.feet_inset),
        center: on(b.center().y),
        feet: on(b.bottom() - probes.feet_inset),
        above_feet: on(b.bottom() - probes.above_feet),
    })
}

/// Solid ground right under the feet, whether or not the last physics step
/// resolved against it. Climbing bodies have no gravity, so they can rest on
/// a floor without ever touching it.
pub fn solid_below(body: &PhysicsBody, tiles: &dyn TileQuery, probes: &LadderProbes) -> bool {
    body.bounds().is_some_and(|b| {
        tiles.classify(Vec2::new(b.center().x, b.bottom() + probes.below_feet)) == TileKind::Solid
    })
}

/// Grab a ladder whose column starts just below the feet.
///
/// Succeeds only when the column center is within `snap_tolerance` of the
/// body center; the body is then centered on the column and pushed down
/// into it by `entry_nudge`.
pub fn grab_from_above(body: &mut PhysicsBody, tiles: &dyn TileQuery, probes: &LadderProbes) -> bool {
    let Some(b) = body.bounds() else {
        return false;
    };
    let cx = b.center().x;
    let Some(column_x) = tiles.ladder_column_center_x(Vec2::new(cx, b.bottom() + probes.below_feet))
    else {
        return false;
    };
    if (column_x - cx).abs() > probes.snap_tolerance {
        return false;
    }
    body.transform.translate(Vec2::new(column_x - cx, probes.entry_nudge));
    true
}

/// Whether the body's center or feet are already inside a ladder. The body
/// is not moved: climbing up starts from where it stands.
pub fn grab_from_below(body: &PhysicsBody, tiles: &dyn TileQuery, probes: &LadderProbes) -> bool {
    let Some(b) = body.bounds() else {
        return false;
    };
    let on = |p: Vec2| tiles.classify(p) == TileKind::Ladder;
    on(b.center()) || on(Vec2::new(b.center().x, b.bottom() - probes.feet_inset))
}

/// Lift a body straddling a ladder top so its feet clear the top cell. Once
/// it stops climbing it settles onto that cell, which is a one-way floor.
///
/// The lift is `top_nudge`, or more if that would not clear the cell.
pub fn clear_top(body: &mut PhysicsBody, tiles: &dyn TileQuery, probes: &LadderProbes) {
    let Some(b) = body.bounds() else {
        return;
    };
    let feet = Vec2::new(b.center().x, b.bottom() - probes.feet_inset);
    let to_top = tiles
        .cell_bounds(feet)
        .map_or(0.0, |cell| b.bottom() - cell.top());
    body.transform.translate(Vec2::new(0.0, -probes.top_nudge.max(to_top)));
    body.velocity.y = 0.0;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
