//! The physics engine: body registry, integration, tile resolution, and the
//! per-frame event lists.
//!
//! Each call to [`PhysicsEngine::advance`] runs one linear pass:
//!
//! 1. Clamp the frame's delta time to [`PhysicsConfig::max_dt`].
//! 2. Reset every body's contact flags. For every enabled body with a valid
//!    mass: apply gravity, integrate force into velocity, clear the force,
//!    clamp the speed, then move it one axis at a time against the solid
//!    tiles and the world bounds. A falling body that is not climbing also
//!    lands on ladder tops. Bodies that were grounded last frame may snap
//!    back onto a floor just below their feet.
//! 3. Test every pair of active colliders (bounding boxes first, exact
//!    shapes second) and record a [`CollisionEvent`] per overlapping pair.
//! 4. Scan the tiles under each active collider for hazards and level exits
//!    and record a [`TileTriggerEvent`] per (body, kind).
//!
//! The two event lists stay readable until the next `advance`.
//!
//! # Determinism
//!
//! Bodies are visited in slot order and pairs are tested in `(i, j)` slot
//! order, so the same registrations and inputs produce the same events in
//! the same order on every run.

use tracing::{debug, trace, warn};

use crate::body::PhysicsBody;
use crate::collide::{box_box, box_contains, contact_side, shapes_overlap, Side};
use crate::config::PhysicsConfig;
use crate::events::{CollisionEvent, TileTriggerEvent};
use crate::handle::{BodyHandle, SlotArena};
use crate::math::{Rect, Vec2};
use crate::shape::WorldShape;
use crate::tile::{TileGrid, TileKind, TileQuery};
use crate::PhysicsError;

/// Perpendicular-axis inset used while resolving one axis, so that resting
/// on a floor never reads as touching a wall (and vice versa).
const SKIN: f32 = 0.01;

/// Slack when deciding whether a tile was ahead of the body before a step.
const AHEAD_EPSILON: f32 = 0.01;

/// Upper bound on sub-steps per axis per frame.
const MAX_SWEEP_STEPS: u32 = 4_096;

// ---------------------------------------------------------------------------
// NoTiles
// ---------------------------------------------------------------------------

/// Tile query used while no tile layer is registered: everything is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTiles;

impl TileQuery for NoTiles {
    fn classify(&self, _position: Vec2) -> TileKind {
        TileKind::Empty
    }

    fn ladder_column_center_x(&self, _position: Vec2) -> Option<f32> {
        None
    }

    fn cell_bounds(&self, _position: Vec2) -> Option<Rect> {
        None
    }
}

// ---------------------------------------------------------------------------
// PhysicsEngine
// ---------------------------------------------------------------------------

/// Owns every registered body and the tile layer they collide with.
#[derive(Debug, Clone)]
pub struct PhysicsEngine {
    config: PhysicsConfig,
    bodies: SlotArena<PhysicsBody>,
    tiles: Option<TileGrid>,
    collision_events: Vec<CollisionEvent>,
    tile_events: Vec<TileTriggerEvent>,
    frame: u64,
}

impl PhysicsEngine {
    /// Create an engine with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidConfig`] if the configuration fails
    /// validation.
    pub fn new(config: PhysicsConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        Ok(Self {
            config,
            bodies: SlotArena::new(),
            tiles: None,
            collision_events: Vec::new(),
            tile_events: Vec::new(),
            frame: 0,
        })
    }

    // -- registry -----------------------------------------------------------

    /// Register a body and return the handle its owner should keep.
    ///
    /// A body with non-positive or non-finite mass is accepted with a
    /// warning and skipped during integration, unless
    /// [`PhysicsConfig::strict_validation`] is set.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidMass`] in strict mode when the mass is
    /// unusable.
    pub fn register_body(&mut self, body: PhysicsBody) -> Result<BodyHandle, PhysicsError> {
        if !body.has_valid_mass() {
            if self.config.strict_validation {
                return Err(PhysicsError::InvalidMass { mass: body.mass });
            }
            warn!(
                mass = body.mass,
                "registering body with unusable mass; it will not be integrated"
            );
        }
        let handle = self.bodies.insert(body);
        debug!(%handle, "body registered");
        Ok(handle)
    }

    /// Remove a body, handing it back to the caller. The handle becomes
    /// stale. Returns `None` for an already-stale handle.
    pub fn unregister_body(&mut self, handle: BodyHandle) -> Option<PhysicsBody> {
        let body = self.bodies.remove(handle);
        match body {
            Some(_) => debug!(%handle, "body unregistered"),
            None => warn!(%handle, "unregister called with a stale body handle"),
        }
        body
    }

    /// Whether `handle` refers to a registered body.
    pub fn contains_body(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&PhysicsBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut PhysicsBody> {
        self.bodies.get_mut(handle)
    }

    /// Like [`body`](Self::body), but a stale handle is an error.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::StaleHandle`] if `handle` is not registered.
    pub fn require_body(&self, handle: BodyHandle) -> Result<&PhysicsBody, PhysicsError> {
        self.bodies
            .get(handle)
            .ok_or(PhysicsError::StaleHandle { handle })
    }

    /// Borrow one body mutably together with the tile query surface.
    pub fn body_and_tiles_mut(
        &mut self,
        handle: BodyHandle,
    ) -> Option<(&mut PhysicsBody, &dyn TileQuery)> {
        let tiles: &dyn TileQuery = match &self.tiles {
            Some(grid) => grid,
            None => &NoTiles,
        };
        self.bodies.get_mut(handle).map(|body| (body, tiles))
    }

    /// Registered bodies in slot order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &PhysicsBody)> {
        self.bodies.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Drop every body, e.g. when the owning scene is torn down.
    pub fn clear_bodies(&mut self) {
        self.bodies.clear();
        self.collision_events.clear();
        self.tile_events.clear();
    }

    /// The body registry, handles and free slots included.
    pub fn registry(&self) -> &SlotArena<PhysicsBody> {
        &self.bodies
    }

    /// Replace the body registry and frame counter with previously captured
    /// ones. The frame's event lists are cleared.
    pub fn restore_registry(&mut self, bodies: SlotArena<PhysicsBody>, frame: u64) {
        debug!(bodies = bodies.len(), frame, "body registry restored");
        self.bodies = bodies;
        self.frame = frame;
        self.collision_events.clear();
        self.tile_events.clear();
    }

    // -- tiles --------------------------------------------------------------

    /// Register the tile layer bodies collide with, returning the previous
    /// one.
    pub fn set_tile_layer(&mut self, grid: TileGrid) -> Option<TileGrid> {
        debug!(
            width = grid.width(),
            height = grid.height(),
            tile_size = grid.tile_size(),
            "tile layer registered"
        );
        self.tiles.replace(grid)
    }

    pub fn clear_tile_layer(&mut self) -> Option<TileGrid> {
        self.tiles.take()
    }

    pub fn tiles(&self) -> Option<&TileGrid> {
        self.tiles.as_ref()
    }

    /// Classification of the tile at a world position. Empty when no layer
    /// is registered.
    pub fn query_tile_classification(&self, position: Vec2) -> TileKind {
        self.tile_query().classify(position)
    }

    /// Center x of the ladder column at `position`, if that cell is a ladder.
    pub fn try_get_ladder_column_center_x(&self, position: Vec2) -> Option<f32> {
        self.tile_query().ladder_column_center_x(position)
    }

    /// The tile layer as a query surface.
    pub fn tile_query(&self) -> &dyn TileQuery {
        match &self.tiles {
            Some(grid) => grid,
            None => &NoTiles,
        }
    }

    // -- tunables -----------------------------------------------------------

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidConfig`] for a non-finite gravity; the
    /// current value is kept.
    pub fn set_gravity(&mut self, gravity: Vec2) -> Result<(), PhysicsError> {
        self.update_config(|c| c.gravity = gravity)
    }

    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidConfig`] unless `max_speed` is positive
    /// and within
    /// [`MAX_SPEED_CEILING`](crate::config::MAX_SPEED_CEILING); the current value is kept.
    pub fn set_max_speed(&mut self, max_speed: f32) -> Result<(), PhysicsError> {
        self.update_config(|c| c.max_speed = max_speed)
    }

    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidConfig`] for bounds without a positive
    /// finite size; the current bounds are kept.
    pub fn set_world_bounds(&mut self, bounds: Option<Rect>) -> Result<(), PhysicsError> {
        self.update_config(|c| c.world_bounds = bounds)
    }

    fn update_config(&mut self, edit: impl FnOnce(&mut PhysicsConfig)) -> Result<(), PhysicsError> {
        let mut next = self.config.clone();
        edit(&mut next);
        if let Err(err) = next.validate() {
            warn!(%err, "rejected physics config change");
            return Err(err);
        }
        self.config = next;
        Ok(())
    }

    /// Number of completed `advance` calls.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    // -- events -------------------------------------------------------------

    /// Object-vs-object overlaps from the last `advance`.
    pub fn collision_events(&self) -> &[CollisionEvent] {
        &self.collision_events
    }

    /// Hazard and level-exit contacts from the last `advance`.
    pub fn tile_trigger_events(&self) -> &[TileTriggerEvent] {
        &self.tile_events
    }

    pub fn drain_collision_events(&mut self) -> Vec<CollisionEvent> {
        std::mem::take(&mut self.collision_events)
    }

    pub fn drain_tile_trigger_events(&mut self) -> Vec<TileTriggerEvent> {
        std::mem::take(&mut self.tile_events)
    }

    /// Whether `inner`'s collider lies entirely inside `outer`'s.
    pub fn contains(&self, outer: BodyHandle, inner: BodyHandle) -> bool {
        match (
            self.body(outer).and_then(PhysicsBody::bounds),
            self.body(inner).and_then(PhysicsBody::bounds),
        ) {
            (Some(o), Some(i)) => box_contains(&o, &i),
            _ => false,
        }
    }

    // -- stepping -----------------------------------------------------------

    /// Run one frame of the physics pipeline. `dt` is in seconds and is
    /// clamped to `[0, max_dt]`; a non-finite `dt` is treated as zero.
    pub fn advance(&mut self, dt: f32) {
        self.collision_events.clear();
        self.tile_events.clear();

        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.config.max_dt)
        } else {
            0.0
        };

        let config = &self.config;
        let tiles = self.tiles.as_ref();
        for (handle, body) in self.bodies.iter_mut() {
            let was_grounded = body.has_collided_below();
            body.contacts_mut().clear();
            if !body.enabled {
                trace!(%handle, "skipping disabled body");
                continue;
            }

            if !body.has_valid_mass() {
                trace!(%handle, mass = body.mass, "skipping body with unusable mass");
                continue;
            }

            integrate_velocity(body, config, dt);
            let delta = body.velocity * dt;
            if !delta.is_finite() {
                trace!(%handle, "skipping non-finite position delta");
                continue;
            }

            move_and_collide(body, delta, tiles);
            if let Some(bounds) = config.world_bounds {
                clamp_to_world(body, &bounds);
            }
            if was_grounded {
                if let Some(grid) = tiles.filter(|_| has_active_collider(body)) {
                    snap_to_ground(body, grid, config.ground_snap_distance);
                }
            }
            body.tick_snap_suppression(dt);
        }

        self.detect_overlaps();
        self.scan_tile_triggers();
        self.frame += 1;
    }

    fn detect_overlaps(&mut self) {
        let candidates: Vec<(BodyHandle, Rect, WorldShape, bool)> = self
            .bodies
            .iter()
            .filter(|(_, body)| body.enabled)
            .filter_map(|(handle, body)| {
                let collider = body.collider.as_ref().filter(|c| c.is_active)?;
                let t = &body.transform;
                Some((
                    handle,
                    collider.world_bounds(t.position, t.scale),
                    collider.world_shape(t.position, t.scale),
                    collider.is_trigger,
                ))
            })
            .collect();

        for (i, (ha, ba, sa, ta)) in candidates.iter().enumerate() {
            for (hb, bb, sb, tb) in &candidates[i + 1..] {
                // Broad phase, then exact shapes.
                if !box_box(ba, bb) || !shapes_overlap(sa, sb) {
                    continue;
                }
                self.collision_events.push(CollisionEvent {
                    a: *ha,
                    b: *hb,
                    side: contact_side(ba, bb),
                    is_trigger: *ta || *tb,
                });
            }
        }
    }

    fn scan_tile_triggers(&mut self) {
        let Some(grid) = self.tiles.as_ref() else {
            return;
        };
        for (handle, body) in self.bodies.iter() {
            if !body.enabled {
                continue;
            }
            let Some(bounds) = body
                .collider
                .as_ref()
                .filter(|c| c.is_active)
                .map(|c| c.world_bounds(body.transform.position, body.transform.scale))
            else {
                continue;
            };

            let mut seen_hazard = false;
            let mut seen_exit = false;
            for (cx, cy) in grid.cells_overlapping(&bounds).cells() {
                let kind = grid.kind_at(cx, cy);
                let seen = match kind {
                    TileKind::Hazard => &mut seen_hazard,
                    TileKind::LevelExit => &mut seen_exit,
                    _ => continue,
                };
                if !*seen {
                    *seen = true;
                    self.tile_events.push(TileTriggerEvent {
                        body: handle,
                        kind,
                        cell: (cx, cy),
                    });
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Integration and resolution helpers
// ---------------------------------------------------------------------------

fn has_active_collider(body: &PhysicsBody) -> bool {
    body.collider.as_ref().is_some_and(|c| c.is_active)
}

fn integrate_velocity(body: &mut PhysicsBody, config: &PhysicsConfig, dt: f32) {
    if body.use_gravity && !body.is_climbing {
        body.force += config.gravity * body.mass;
    }
    body.velocity += body.force * (dt / body.mass);
    body.force = Vec2::ZERO;
    body.velocity = body.velocity.clamp_length(config.max_speed);
}

/// Move along x, resolve, then along y, resolve. Each axis is stepped in
/// chunks of at most half a tile so a fast body cannot skip a thin wall.
/// Bodies without an active collider pass through the tiles.
fn move_and_collide(body: &mut PhysicsBody, delta: Vec2, tiles: Option<&TileGrid>) {
    let grid = match (tiles, has_active_collider(body)) {
        (Some(grid), true) => grid,
        _ => {
            body.transform.translate(delta);
            return;
        }
    };
    sweep_axis(body, grid, Axis::X, delta.x);
    sweep_axis(body, grid, Axis::Y, delta.y);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

fn sweep_axis(body: &mut PhysicsBody, grid: &TileGrid, axis: Axis, delta: f32) {
    if delta == 0.0 {
        return;
    }
    let max_step = grid.tile_size() * 0.5;
    let steps = (delta.abs() / max_step).ceil().clamp(1.0, MAX_SWEEP_STEPS as f32) as u32;
    let step = delta / steps as f32;
    for _ in 0..steps {
        let before = match body.bounds() {
            Some(b) => b,
            None => return,
        };
        match axis {
            Axis::X => body.transform.position.x += step,
            Axis::Y => body.transform.position.y += step,
        }
        if resolve_axis(body, grid, axis, step, &before) {
            break;
        }
    }
}

/// Push the body out of any solid tile it moved into along `axis`.
/// Returns `true` if a contact was resolved.
fn resolve_axis(
    body: &mut PhysicsBody,
    grid: &TileGrid,
    axis: Axis,
    step: f32,
    before: &Rect,
) -> bool {
    let Some(bounds) = body.bounds() else {
        return false;
    };
    let probe = match axis {
        Axis::X => bounds.inset(0.0, SKIN),
        Axis::Y => bounds.inset(SKIN, 0.0),
    };

    // Ladder tops only stop a body falling onto them.
    let lands_on_ladders = axis == Axis::Y && step > 0.0 && !body.is_climbing;
    let blocking = grid.cells_overlapping(&probe).cells().filter(|&(cx, cy)| {
        grid.kind_at(cx, cy).is_blocking() || (lands_on_ladders && grid.is_ladder_top(cx, cy))
    });

    // Only tiles that were ahead of the body before this step count; a tile
    // the body already overlapped is never used to shove it backwards.
    let mut correction: Option<f32> = None;
    for (cx, cy) in blocking {
        let cell = grid.cell_rect(cx, cy);
        let push = match (axis, step > 0.0) {
            (Axis::X, true) if cell.left() >= before.right() - AHEAD_EPSILON => {
                cell.left() - bounds.right()
            }
            (Axis::X, false) if cell.right() <= before.left() + AHEAD_EPSILON => {
                cell.right() - bounds.left()
            }
            (Axis::Y, true) if cell.top() >= before.bottom() - AHEAD_EPSILON => {
                cell.top() - bounds.bottom()
            }
            (Axis::Y, false) if cell.bottom() <= before.top() + AHEAD_EPSILON => {
                cell.bottom() - bounds.top()
            }
            _ => continue,
        };
        // Keep the push that stops the body earliest.
        correction = Some(match correction {
            None => push,
            Some(c) if step > 0.0 => c.min(push),
            Some(c) => c.max(push),
        });
    }

    let Some(push) = correction else {
        return false;
    };
    let side = match (axis, step > 0.0) {
        (Axis::X, true) => Side::Right,
        (Axis::X, false) => Side::Left,
        (Axis::Y, true) => Side::Below,
        (Axis::Y, false) => Side::Above,
    };
    match axis {
        Axis::X => {
            body.transform.position.x += push;
            body.velocity.x = 0.0;
        }
        Axis::Y => {
            body.transform.position.y += push;
            body.velocity.y = 0.0;
        }
    }
    body.contacts_mut().set(side);
    true
}

/// Keep the body's bounds inside the world rectangle, treating its edges as
/// solid walls.
fn clamp_to_world(body: &mut PhysicsBody, world: &Rect) {
    let Some(b) = body.bounds() else {
        return;
    };
    if b.left() < world.left() {
        body.transform.position.x += world.left() - b.left();
        body.velocity.x = 0.0;
        body.contacts_mut().set(Side::Left);
    } else if b.right() > world.right() {
        body.transform.position.x -= b.right() - world.right();
        body.velocity.x = 0.0;
        body.contacts_mut().set(Side::Right);
    }
    if b.top() < world.top() {
        body.transform.position.y += world.top() - b.top();
        body.velocity.y = 0.0;
        body.contacts_mut().set(Side::Above);
    } else if b.bottom() > world.bottom() {
        body.transform.position.y -= b.bottom() - world.bottom();
        body.velocity.y = 0.0;
        body.contacts_mut().set(Side::Below);
    }
}

/// Pull a body that was grounded last frame back onto a floor within
/// `distance` below its feet, unless it is climbing, moving up, already
/// grounded, or has snapping suppressed.
fn snap_to_ground(body: &mut PhysicsBody, grid: &TileGrid, distance: f32) {
    if distance <= 0.0
        || body.has_collided_below()
        || body.is_climbing
        || body.snap_suppressed()
        || body.velocity.y < 0.0
    {
        return;
    }
    let Some(bounds) = body.bounds() else {
        return;
    };
    let probe = Rect::new(bounds.left(), bounds.bottom(), bounds.w, distance).inset(SKIN, 0.0);
    let floor = grid
        .floor_cells_in(&probe)
        .map(|(cx, cy)| grid.cell_rect(cx, cy).top())
        .filter(|top| *top >= bounds.bottom() - AHEAD_EPSILON)
        .fold(None, |best: Option<f32>, top| {
            Some(best.map_or(top, |b| b.min(top)))
        });
    if let Some(top) = floor {
        body.transform.position.y += top - bounds.bottom();
        body.velocity.y = 0.0;
        body.contacts_mut().set(Side::Below);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
