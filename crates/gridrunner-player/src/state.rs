//! The player state machine's states.
//!
//! [`PlayerState`] is a closed set of seven variants. Each one reacts to
//! four hooks:
//!
//! - `enter` / `exit` run when the owning controller swaps states.
//! - `handle_input` runs before the physics step and may steer the body.
//! - `update` runs after the physics step and sees its contact flags.
//!
//! `handle_input` and `update` return `Some(next)` to request a transition.
//! The swap itself is done by [`PlayerController`](crate::PlayerController).

use std::fmt;

use serde::{Deserialize, Serialize};

use gridrunner_physics::{PhysicsBody, TileQuery, Vec2};

use crate::config::PlayerTuning;
use crate::input::{Action, ActionQuery};
use crate::ladder;

// ---------------------------------------------------------------------------
// Facing / Motion
// ---------------------------------------------------------------------------

/// The direction the player last moved in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

/// Per-player bookkeeping that outlives individual states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub facing: Facing,
    /// Time left in which a jump is still allowed after leaving the ground.
    pub coyote_timer: f32,
}

impl Motion {
    pub fn can_jump(&self, grounded: bool) -> bool {
        grounded || self.coyote_timer > 0.0
    }

    /// Turn towards the sign of `axis`; zero leaves the facing unchanged.
    pub fn face(&mut self, axis: f32) {
        if axis < 0.0 {
            self.facing = Facing::Left;
        } else if axis > 0.0 {
            self.facing = Facing::Right;
        }
    }
}

// ---------------------------------------------------------------------------
// StateContext
// ---------------------------------------------------------------------------

/// Everything a state may read or mutate during one hook.
pub struct StateContext<'a> {
    pub body: &'a mut PhysicsBody,
    pub tiles: &'a dyn TileQuery,
    pub tuning: &'a PlayerTuning,
    pub motion: &'a mut Motion,
}

impl StateContext<'_> {
    /// The last physics step resolved a floor under the body.
    pub fn grounded(&self) -> bool {
        self.body.has_collided_below()
    }

    /// Grounded, or standing on solid ground without having touched it
    /// (climbing bodies have no gravity to press them onto a floor).
    pub fn supported(&self) -> bool {
        self.grounded() || ladder::solid_below(self.body, self.tiles, &self.tuning.ladder)
    }

    /// Apply horizontal input at `speed`. Without input the velocity is
    /// left alone. Returns the axis value.
    fn steer(&mut self, input: &dyn ActionQuery, speed: f32) -> f32 {
        let axis = input.horizontal_axis();
        if axis != 0.0 {
            self.motion.face(axis);
            self.body.velocity.x = axis * speed;
        }
        axis
    }

    /// Grab a ladder if the held direction allows it.
    fn try_climb(&mut self, input: &dyn ActionQuery) -> Option<PlayerState> {
        let probes = &self.tuning.ladder;
        let grabbed = (input.is_action_down(Action::MoveDown)
            && ladder::grab_from_above(self.body, self.tiles, probes))
            || (input.is_action_down(Action::MoveUp)
                && ladder::grab_from_below(self.body, self.tiles, probes));
        grabbed.then(PlayerState::climb)
    }

    fn try_jump(&self, input: &dyn ActionQuery) -> Option<PlayerState> {
        (input.is_action_pressed(Action::Jump) && self.motion.can_jump(self.grounded()))
            .then_some(PlayerState::Jump)
    }

    /// Idle and Walk hold on through the coyote window before falling.
    fn ground_lost(&self) -> bool {
        !self.grounded() && self.motion.coyote_timer <= 0.0
    }

    /// The state to land in, chosen by horizontal speed.
    fn landing_state(&self) -> PlayerState {
        if self.body.velocity.x.abs() < self.tuning.walk_threshold {
            PlayerState::Idle
        } else {
            PlayerState::Walk
        }
    }
}

// ---------------------------------------------------------------------------
// StateKind
// ---------------------------------------------------------------------------

/// Payload-free discriminant of a [`PlayerState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Idle,
    Walk,
    Jump,
    Fall,
    Climb,
    Hurt,
    Dead,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateKind::Idle => "idle",
            StateKind::Walk => "walk",
            StateKind::Jump => "jump",
            StateKind::Fall => "fall",
            StateKind::Climb => "climb",
            StateKind::Hurt => "hurt",
            StateKind::Dead => "dead",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// PlayerState
// ---------------------------------------------------------------------------

/// One player state, with whatever data it carries between frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerState {
    Idle,
    Walk,
    Jump,
    Fall,
    /// `vertical` is the last commanded climb direction: `-1` up, `1` down.
    Climb { vertical: f32 },
    Hurt { remaining: f32 },
    Dead,
}

impl PlayerState {
    pub fn climb() -> Self {
        PlayerState::Climb { vertical: 0.0 }
    }

    /// A hurt state; its timer starts on `enter`.
    pub fn hurt() -> Self {
        PlayerState::Hurt { remaining: 0.0 }
    }

    pub fn kind(&self) -> StateKind {
        match self {
            PlayerState::Idle => StateKind::Idle,
            PlayerState::Walk => StateKind::Walk,
            PlayerState::Jump => StateKind::Jump,
            PlayerState::Fall => StateKind::Fall,
            PlayerState::Climb { .. } => StateKind::Climb,
            PlayerState::Hurt { .. } => StateKind::Hurt,
            PlayerState::Dead => StateKind::Dead,
        }
    }

    /// Terminal states accept no transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlayerState::Dead)
    }

    pub fn enter(&mut self, ctx: &mut StateContext<'_>) {
        let tuning = ctx.tuning;
        match self {
            PlayerState::Idle | PlayerState::Fall => {}
            PlayerState::Walk => {
                ctx.body.velocity.x = ctx.motion.facing.sign() * tuning.walk_speed;
            }
            PlayerState::Jump => {
                ctx.body.velocity.y = -tuning.jump_force;
                ctx.body.suppress_snap(tuning.snap_suppression);
                ctx.motion.coyote_timer = 0.0;
            }
            PlayerState::Climb { vertical } => {
                *vertical = 0.0;
                ctx.body.is_climbing = true;
                ctx.body.velocity = Vec2::ZERO;
            }
            PlayerState::Hurt { remaining } => {
                *remaining = tuning.hurt_duration;
                ctx.body.is_climbing = false;
                ctx.body.velocity.x = -ctx.motion.facing.sign() * tuning.hurt_knockback.x;
                ctx.body.velocity.y = -tuning.hurt_knockback.y;
                ctx.body.suppress_snap(tuning.snap_suppression);
            }
            PlayerState::Dead => {
                if let Some(collider) = ctx.body.collider.as_mut() {
                    collider.is_active = false;
                }
                ctx.body.is_climbing = false;
                ctx.body.velocity.x = 0.0;
                ctx.body.velocity.y = -tuning.death_knockback;
                ctx.body.suppress_snap(tuning.snap_suppression);
            }
        }
    }

    pub fn exit(&mut self, ctx: &mut StateContext<'_>) {
        if let PlayerState::Climb { .. } = self {
            ctx.body.is_climbing = false;
        }
    }

    /// React to this frame's input before physics runs.
    pub fn handle_input(
        &mut self,
        ctx: &mut StateContext<'_>,
        input: &dyn ActionQuery,
    ) -> Option<PlayerState> {
        let tuning = ctx.tuning;
        match self {
            PlayerState::Idle => {
                if let Some(next) = ctx.try_jump(input).or_else(|| ctx.try_climb(input)) {
                    return Some(next);
                }
                let axis = input.horizontal_axis();
                if axis != 0.0 {
                    ctx.motion.face(axis);
                    return Some(PlayerState::Walk);
                }
                None
            }
            PlayerState::Walk => {
                if let Some(next) = ctx.try_jump(input).or_else(|| ctx.try_climb(input)) {
                    return Some(next);
                }
                if ctx.steer(input, tuning.walk_speed) == 0.0 {
                    ctx.body.velocity.x = 0.0;
                    return Some(PlayerState::Idle);
                }
                None
            }
            PlayerState::Jump => {
                ctx.steer(input, tuning.air_speed);
                None
            }
            PlayerState::Fall => {
                if let Some(next) = ctx.try_climb(input) {
                    return Some(next);
                }
                ctx.steer(input, tuning.air_speed);
                None
            }
            PlayerState::Climb { vertical } => {
                if input.is_action_pressed(Action::Jump) {
                    return Some(PlayerState::Jump);
                }
                let axis = input.horizontal_axis();
                if axis != 0.0 && ctx.supported() {
                    ctx.motion.face(axis);
                    return Some(PlayerState::Walk);
                }
                *vertical = input.vertical_axis();
                ctx.body.velocity.x = 0.0;
                ctx.body.velocity.y = *vertical * tuning.climb_speed;
                None
            }
            PlayerState::Hurt { .. } | PlayerState::Dead => None,
        }
    }

    /// React to the physics step that just ran.
    pub fn update(&mut self, ctx: &mut StateContext<'_>, dt: f32) -> Option<PlayerState> {
        let tuning = ctx.tuning;
        match self {
            PlayerState::Idle => {
                if ctx.ground_lost() {
                    return Some(PlayerState::Fall);
                }
                if ctx.grounded() {
                    let vx = ctx.body.velocity.x * tuning.idle_friction;
                    ctx.body.velocity.x = if vx.abs() < tuning.stop_epsilon { 0.0 } else { vx };
                }
                None
            }
            PlayerState::Walk => ctx.ground_lost().then_some(PlayerState::Fall),
            PlayerState::Jump => (ctx.body.velocity.y >= 0.0).then_some(PlayerState::Fall),
            PlayerState::Fall => ctx.grounded().then(|| ctx.landing_state()),
            PlayerState::Climb { vertical } => {
                // Climbed down onto a floor.
                if *vertical > 0.0 && ctx.grounded() {
                    return Some(PlayerState::Idle);
                }
                let contact = ladder::sample(ctx.body, ctx.tiles, &tuning.ladder)?;
                if !contact.any() {
                    return Some(if ctx.supported() {
                        PlayerState::Idle
                    } else {
                        PlayerState::Fall
                    });
                }
                if *vertical < 0.0 && contact.straddling_top() {
                    ladder::clear_top(ctx.body, ctx.tiles, &tuning.ladder);
                    return Some(PlayerState::Fall);
                }
                None
            }
            PlayerState::Hurt { remaining } => {
                *remaining -= dt;
                if *remaining > 0.0 {
                    return None;
                }
                Some(if ctx.grounded() { PlayerState::Idle } else { PlayerState::Fall })
            }
            PlayerState::Dead => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
