//! The component that owns a player's active state.
//!
//! A [`PlayerController`] holds the handle of the player's physics body and
//! the single active [`PlayerState`]. Each frame the game calls
//! [`handle_input`](PlayerController::handle_input) before advancing the
//! physics engine and [`update`](PlayerController::update) after it. State
//! swaps always run `exit` on the old state, then `enter` on the new one.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use gridrunner_physics::{Alignment, BodyHandle, Collider, PhysicsBody, PhysicsEngine, Shape, Vec2};

use crate::config::PlayerTuning;
use crate::input::ActionQuery;
use crate::state::{Facing, Motion, PlayerState, StateContext, StateKind};
use crate::PlayerError;

/// Collider size of a standard player body.
pub const PLAYER_SIZE: Vec2 = Vec2::new(12.0, 24.0);

/// A standard player body: a box standing on `feet`.
pub fn player_body(feet: Vec2) -> PhysicsBody {
    PhysicsBody::new(feet).with_collider(Collider::new(
        Shape::rect(PLAYER_SIZE.x, PLAYER_SIZE.y),
        Alignment::BottomCenter,
    ))
}

// ---------------------------------------------------------------------------
// PlayerController
// ---------------------------------------------------------------------------

/// Serializes with its body handle, so a captured controller only makes
/// sense next to the body registry it was captured with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerController {
    body: BodyHandle,
    state: Option<PlayerState>,
    motion: Motion,
    tuning: PlayerTuning,
}

impl PlayerController {
    /// Attach a controller to an already registered body and enter Idle.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::InvalidTuning`] for unusable tuning and
    /// [`PlayerError::MissingBody`] if `body` is not registered.
    pub fn new(
        engine: &mut PhysicsEngine,
        body: BodyHandle,
        tuning: PlayerTuning,
    ) -> Result<Self, PlayerError> {
        tuning.validate()?;
        let mut controller = Self {
            body,
            state: None,
            motion: Motion::default(),
            tuning,
        };
        let (phys, tiles) = engine
            .body_and_tiles_mut(body)
            .ok_or(PlayerError::MissingBody { handle: body })?;
        let mut idle = PlayerState::Idle;
        idle.enter(&mut StateContext {
            body: phys,
            tiles,
            tuning: &controller.tuning,
            motion: &mut controller.motion,
        });
        controller.state = Some(idle);
        debug!(%body, "player controller attached");
        Ok(controller)
    }

    /// Register a [`player_body`] standing on `feet` and attach a controller
    /// to it.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new), plus any registration error from the
    /// engine.
    pub fn spawn(
        engine: &mut PhysicsEngine,
        feet: Vec2,
        tuning: PlayerTuning,
    ) -> Result<Self, PlayerError> {
        tuning.validate()?;
        let handle = engine.register_body(player_body(feet))?;
        Self::new(engine, handle, tuning)
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn state(&self) -> Option<&PlayerState> {
        self.state.as_ref()
    }

    pub fn state_kind(&self) -> Option<StateKind> {
        self.state.as_ref().map(PlayerState::kind)
    }

    pub fn is_dead(&self) -> bool {
        self.state.as_ref().is_some_and(PlayerState::is_terminal)
    }

    pub fn facing(&self) -> Facing {
        self.motion.facing
    }

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    pub fn tuning(&self) -> &PlayerTuning {
        &self.tuning
    }

    // -- per-frame hooks ----------------------------------------------------

    /// Feed this frame's input to the active state. Runs before physics.
    ///
    /// A body that is no longer registered makes this a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::NoActiveState`] after [`detach`](Self::detach).
    pub fn handle_input(
        &mut self,
        engine: &mut PhysicsEngine,
        input: &dyn ActionQuery,
    ) -> Result<(), PlayerError> {
        let handle = self.body;
        let state = active_state(&mut self.state, handle)?;
        let Some((body, tiles)) = engine.body_and_tiles_mut(handle) else {
            warn!(body = %handle, "player body is not registered; input ignored");
            return Ok(());
        };
        let mut ctx = StateContext {
            body,
            tiles,
            tuning: &self.tuning,
            motion: &mut self.motion,
        };
        if let Some(next) = state.handle_input(&mut ctx, input) {
            swap_state(&mut self.state, next, &mut ctx, handle);
        }
        Ok(())
    }

    /// Let the active state react to the physics step that just ran, then
    /// clamp horizontal speed.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::NoActiveState`] after [`detach`](Self::detach).
    pub fn update(&mut self, engine: &mut PhysicsEngine, dt: f32) -> Result<(), PlayerError> {
        let handle = self.body;
        let state = active_state(&mut self.state, handle)?;
        let Some((body, tiles)) = engine.body_and_tiles_mut(handle) else {
            warn!(body = %handle, "player body is not registered; update skipped");
            return Ok(());
        };
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        self.motion.coyote_timer = if body.has_collided_below() {
            self.tuning.coyote_time
        } else {
            (self.motion.coyote_timer - dt).max(0.0)
        };

        let mut ctx = StateContext {
            body,
            tiles,
            tuning: &self.tuning,
            motion: &mut self.motion,
        };
        if let Some(next) = state.update(&mut ctx, dt) {
            swap_state(&mut self.state, next, &mut ctx, handle);
        }

        let max = self.tuning.max_horizontal_speed;
        ctx.body.velocity.x = ctx.body.velocity.x.clamp(-max, max);
        Ok(())
    }

    // -- external triggers --------------------------------------------------

    /// Switch to Hurt. Returns `false` if the player is dead or the body is
    /// gone.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::NoActiveState`] after [`detach`](Self::detach).
    pub fn hurt(&mut self, engine: &mut PhysicsEngine) -> Result<bool, PlayerError> {
        self.force_state(engine, PlayerState::hurt())
    }

    /// Switch to Dead. Returns `false` if already dead or the body is gone.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::NoActiveState`] after [`detach`](Self::detach).
    pub fn kill(&mut self, engine: &mut PhysicsEngine) -> Result<bool, PlayerError> {
        self.force_state(engine, PlayerState::Dead)
    }

    fn force_state(
        &mut self,
        engine: &mut PhysicsEngine,
        next: PlayerState,
    ) -> Result<bool, PlayerError> {
        let handle = self.body;
        if active_state(&mut self.state, handle)?.is_terminal() {
            return Ok(false);
        }
        let Some((body, tiles)) = engine.body_and_tiles_mut(handle) else {
            warn!(body = %handle, to = %next.kind(), "player body is not registered; trigger ignored");
            return Ok(false);
        };
        debug!(body = %handle, to = %next.kind(), "external player trigger");
        let mut ctx = StateContext {
            body,
            tiles,
            tuning: &self.tuning,
            motion: &mut self.motion,
        };
        swap_state(&mut self.state, next, &mut ctx, handle);
        Ok(true)
    }

    /// Exit the active state and leave the controller without one, e.g.
    /// when the owning scene is torn down. Any later per-frame call is a
    /// lifecycle error.
    pub fn detach(&mut self, engine: &mut PhysicsEngine) {
        let Some(mut state) = self.state.take() else {
            return;
        };
        if let Some((body, tiles)) = engine.body_and_tiles_mut(self.body) {
            state.exit(&mut StateContext {
                body,
                tiles,
                tuning: &self.tuning,
                motion: &mut self.motion,
            });
        }
        debug!(body = %self.body, "player controller detached");
    }
}

fn active_state(
    state: &mut Option<PlayerState>,
    body: BodyHandle,
) -> Result<&mut PlayerState, PlayerError> {
    state.as_mut().ok_or_else(|| {
        error!(%body, "player controller advanced with no active state");
        PlayerError::NoActiveState
    })
}

/// Run `exit` on the current state and `enter` on `next`. Terminal states
/// stay put.
fn swap_state(
    slot: &mut Option<PlayerState>,
    mut next: PlayerState,
    ctx: &mut StateContext<'_>,
    body: BodyHandle,
) {
    let Some(mut current) = slot.take() else {
        return;
    };
    if current.is_terminal() {
        *slot = Some(current);
        return;
    }
    current.exit(ctx);
    next.enter(ctx);
    debug!(%body, from = %current.kind(), to = %next.kind(), "player state transition");
    *slot = Some(next);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Action, ActionSet, ActionState};
    use gridrunner_physics::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn setup(rows: &[&str], feet: Vec2) -> (PhysicsEngine, PlayerController) {
        let mut engine = PhysicsEngine::new(PhysicsConfig::default()).unwrap();
        engine.set_tile_layer(TileGrid::from_ascii(rows, 16.0).unwrap());
        let player = PlayerController::spawn(&mut engine, feet, PlayerTuning::default()).unwrap();
        (engine, player)
    }

    #[test]
    fn starts_idle() {
        let (_engine, player) = setup(&["....", "....", "####"], Vec2::new(24.0, 32.0));
        assert_eq!(player.state_kind(), Some(StateKind::Idle));
        assert!(!player.is_dead());
    }

    #[test]
    fn standard_body_stands_on_its_feet() {
        let body = player_body(Vec2::new(24.0, 32.0));
        let collider = body.collider.as_ref().unwrap();
        assert_eq!(collider.alignment(), gridrunner_physics::Alignment::BottomCenter);
        assert!(matches!(collider.shape(), gridrunner_physics::Shape::Box { .. }));
        assert_eq!(body.bounds().unwrap(), Rect::new(18.0, 8.0, 12.0, 24.0));
    }

    #[test]
    fn missing_body_is_an_error_at_construction() {
        let mut engine = PhysicsEngine::new(PhysicsConfig::default()).unwrap();
        let h = engine.register_body(player_body(Vec2::ZERO)).unwrap();
        engine.unregister_body(h);
        let err = PlayerController::new(&mut engine, h, PlayerTuning::default()).unwrap_err();
        assert!(matches!(err, PlayerError::MissingBody { handle } if handle == h));
    }

    #[test]
    fn stale_body_makes_frame_hooks_no_ops() {
        let (mut engine, mut player) = setup(&["....", "....", "####"], Vec2::new(24.0, 32.0));
        engine.unregister_body(player.body());
        let mut input = ActionState::new();
        input.advance(ActionSet::EMPTY.with(Action::MoveRight));
        player.handle_input(&mut engine, &input).unwrap();
        player.update(&mut engine, DT).unwrap();
        assert_eq!(player.state_kind(), Some(StateKind::Idle));
        assert!(!player.hurt(&mut engine).unwrap());
    }

    #[test]
    fn detached_controller_reports_lifecycle_error() {
        let (mut engine, mut player) = setup(&["....", "....", "####"], Vec2::new(24.0, 32.0));
        player.detach(&mut engine);
        assert_eq!(player.state_kind(), None);
        let err = player.update(&mut engine, DT).unwrap_err();
        assert!(matches!(err, PlayerError::NoActiveState));
        assert!(matches!(
            player.handle_input(&mut engine, &ActionState::new()),
            Err(PlayerError::NoActiveState)
        ));
    }

    #[test]
    fn dead_is_terminal() {
        let (mut engine, mut player) = setup(&["....", "....", "####"], Vec2::new(24.0, 32.0));
        assert!(player.kill(&mut engine).unwrap());
        assert!(player.is_dead());
        assert!(!player.kill(&mut engine).unwrap());
        assert!(!player.hurt(&mut engine).unwrap());
        let body = engine.body(player.body()).unwrap();
        assert!(!body.collider.as_ref().unwrap().is_active);
        assert!(body.velocity.y < 0.0);
    }

    #[test]
    fn horizontal_speed_is_clamped_after_update() {
        let (mut engine, mut player) = setup(&["....", "....", "####"], Vec2::new(24.0, 32.0));
        engine.body_mut(player.body()).unwrap().velocity.x = -5_000.0;
        player.update(&mut engine, DT).unwrap();
        let vx = engine.body(player.body()).unwrap().velocity.x;
        assert!(vx >= -player.tuning().max_horizontal_speed);
    }

    #[test]
    fn hurt_from_climb_clears_climbing_flag() {
        let (mut engine, mut player) = setup(
            &["....", ".H..", ".H..", "####"],
            Vec2::new(24.0, 48.0),
        );
        let mut input = ActionState::new();
        input.advance(ActionSet::EMPTY.with(Action::MoveUp));
        player.handle_input(&mut engine, &input).unwrap();
        assert_eq!(player.state_kind(), Some(StateKind::Climb));
        assert!(engine.body(player.body()).unwrap().is_climbing);

        assert!(player.hurt(&mut engine).unwrap());
        assert_eq!(player.state_kind(), Some(StateKind::Hurt));
        assert!(!engine.body(player.body()).unwrap().is_climbing);
    }
}
