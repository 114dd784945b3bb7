//! Fixed-timestep scene driver.
//!
//! A [`Scene`] owns the physics engine, the player controllers and the props
//! the players can touch. Each call to [`Scene::step`]:
//!
//! 1. Latches every player's held actions and runs their `handle_input`.
//! 2. Advances the physics engine by the fixed delta.
//! 3. Runs every player's `update` against the fresh contact flags and
//!    counts down invulnerability.
//! 4. Routes the frame's physics events into [`GameEvent`]s: hazards hurt
//!    (and eventually kill), pickups score and disappear, level exits are
//!    reported once per player.
//! 5. Advances the frame counter.
//!
//! Players are processed in the order they were added and props in body
//! handle order, so the same inputs always produce the same events.
//!
//! # Example
//!
//! ```
//! use gridrunner_engine::prelude::*;
//!
//! let tiles = TileGrid::from_ascii(&["......", "......", "######"], 16.0).unwrap();
//! let mut scene = Scene::new(SceneConfig::default(), PhysicsConfig::default(), tiles).unwrap();
//! let p1 = scene.add_player(Vec2::new(24.0, 32.0), PlayerTuning::default()).unwrap();
//!
//! scene.step(&[ActionSet::EMPTY.with(Action::MoveRight)]).unwrap();
//!
//! assert_eq!(scene.frame(), 1);
//! assert_eq!(scene.player(p1).unwrap().state_kind(), Some(StateKind::Walk));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use gridrunner_physics::prelude::*;
use gridrunner_player::prelude::*;

use crate::config::SceneConfig;
use crate::SceneError;

// ---------------------------------------------------------------------------
// PlayerId
// ---------------------------------------------------------------------------

/// Index of a player in the scene, in the order players were added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub usize);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0 + 1)
    }
}

// ---------------------------------------------------------------------------
// PropKind
// ---------------------------------------------------------------------------

/// What touching a prop does to a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropKind {
    /// Damages the player like a hazard tile.
    Hazard,
    /// Adds `value` to the player's score and is removed from the scene.
    Pickup { value: u32 },
    /// Reported as a contact and nothing else.
    Inert,
}

// ---------------------------------------------------------------------------
// GameEvent
// ---------------------------------------------------------------------------

/// Game-layer consequences of one frame, in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEvent {
    /// A player's collider overlapped another body.
    Contact {
        player: PlayerId,
        other: BodyHandle,
        /// The side of the player facing `other`.
        side: Side,
    },
    /// A player took damage and survived.
    PlayerHurt { player: PlayerId, health: u32 },
    PlayerDied { player: PlayerId },
    PickupCollected {
        player: PlayerId,
        prop: BodyHandle,
        value: u32,
    },
    /// Reported the first time a player touches a level exit.
    LevelExitReached { player: PlayerId },
}

// ---------------------------------------------------------------------------
// PlayerSlot
// ---------------------------------------------------------------------------

/// One player: controller, latched input and game-layer bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSlot {
    controller: PlayerController,
    input: ActionState,
    health: u32,
    /// Seconds left during which damage is ignored.
    invulnerable_for: f32,
    score: u32,
    exited: bool,
}

impl PlayerSlot {
    fn new(controller: PlayerController, health: u32) -> Self {
        Self {
            controller,
            input: ActionState::new(),
            health,
            invulnerable_for: 0.0,
            score: 0,
            exited: false,
        }
    }

    pub fn controller(&self) -> &PlayerController {
        &self.controller
    }

    pub fn body(&self) -> BodyHandle {
        self.controller.body()
    }

    pub fn state_kind(&self) -> Option<StateKind> {
        self.controller.state_kind()
    }

    /// The actions latched for the last frame.
    pub fn input(&self) -> &ActionState {
        &self.input
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_dead(&self) -> bool {
        self.controller.is_dead()
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_for > 0.0
    }

    pub fn has_exited(&self) -> bool {
        self.exited
    }
}

// ---------------------------------------------------------------------------
// FrameDiagnostics
// ---------------------------------------------------------------------------

/// Wall-clock timing of the last frame, per phase.
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    pub input_time: Duration,
    pub physics_time: Duration,
    pub update_time: Duration,
    pub routing_time: Duration,
    /// Total time for the frame (all phases).
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// The deterministic per-frame driver for one level.
///
/// # Determinism Guarantee
///
/// Given the same level, configuration, spawn order and per-frame inputs, a
/// scene produces bit-identical state and the same event sequence on every
/// run. Nothing in a frame depends on wall-clock time; the diagnostics are
/// measured but never fed back into the simulation.
#[derive(Debug, Clone)]
pub struct Scene {
    config: SceneConfig,
    physics: PhysicsEngine,
    players: Vec<PlayerSlot>,
    props: BTreeMap<BodyHandle, PropKind>,
    frame: u64,
    last_diagnostics: FrameDiagnostics,
}

impl Scene {
    /// Create a scene for one level.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidConfig`] for an unusable scene
    /// configuration and [`SceneError::Physics`] if the physics
    /// configuration is rejected.
    pub fn new(
        config: SceneConfig,
        physics: PhysicsConfig,
        tiles: TileGrid,
    ) -> Result<Self, SceneError> {
        config.validate()?;
        let mut engine = PhysicsEngine::new(physics)?;
        engine.set_tile_layer(tiles);
        Ok(Self {
            config,
            physics: engine,
            players: Vec::new(),
            props: BTreeMap::new(),
            frame: 0,
            last_diagnostics: FrameDiagnostics::default(),
        })
    }

    /// Spawn a player standing on `feet`. Input for this player is read from
    /// position `id.0` of the slice given to [`step`](Self::step).
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Player`] if the tuning is rejected or the body
    /// cannot be registered.
    pub fn add_player(&mut self, feet: Vec2, tuning: PlayerTuning) -> Result<PlayerId, SceneError> {
        let id = PlayerId(self.players.len());
        let controller = PlayerController::spawn(&mut self.physics, feet, tuning)?;
        debug!(player = %id, body = %controller.body(), "player added");
        self.players
            .push(PlayerSlot::new(controller, self.config.starting_health));
        Ok(id)
    }

    /// Register a prop body.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Physics`] if the engine refuses the body.
    pub fn add_prop(&mut self, body: PhysicsBody, kind: PropKind) -> Result<BodyHandle, SceneError> {
        let handle = self.physics.register_body(body)?;
        self.props.insert(handle, kind);
        debug!(%handle, ?kind, "prop added");
        Ok(handle)
    }

    /// Remove a prop, returning its body. `None` if `handle` is not a prop.
    pub fn remove_prop(&mut self, handle: BodyHandle) -> Option<PhysicsBody> {
        self.props.remove(&handle)?;
        self.physics.unregister_body(handle)
    }

    // -- stepping -----------------------------------------------------------

    /// Run one frame.
    ///
    /// `inputs[i]` holds the actions player `i` has down this frame; players
    /// past the end of the slice hold nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Player`] only for controller lifecycle bugs.
    /// Per-body problems are logged and skipped.
    pub fn step(&mut self, inputs: &[ActionSet]) -> Result<Vec<GameEvent>, SceneError> {
        let frame_start = Instant::now();
        let dt = self.config.fixed_dt;

        // Phase 1: input.
        let phase = Instant::now();
        for (i, slot) in self.players.iter_mut().enumerate() {
            slot.input.advance(inputs.get(i).copied().unwrap_or_default());
            slot.controller.handle_input(&mut self.physics, &slot.input)?;
        }
        let input_time = phase.elapsed();

        // Phase 2: physics.
        let phase = Instant::now();
        self.physics.advance(dt);
        let physics_time = phase.elapsed();

        // Phase 3: state updates.
        let phase = Instant::now();
        for slot in &mut self.players {
            slot.controller.update(&mut self.physics, dt)?;
            slot.invulnerable_for = (slot.invulnerable_for - dt).max(0.0);
        }
        let update_time = phase.elapsed();

        // Phase 4: game-layer routing.
        let phase = Instant::now();
        let events = self.route_events()?;
        let routing_time = phase.elapsed();

        self.frame += 1;
        trace!(frame = self.frame, events = events.len(), "scene frame complete");

        self.last_diagnostics = FrameDiagnostics {
            input_time,
            physics_time,
            update_time,
            routing_time,
            total_time: frame_start.elapsed(),
        };
        Ok(events)
    }

    /// Run `count` frames with the same held inputs, returning every event.
    ///
    /// # Errors
    ///
    /// Stops at the first error from [`step`](Self::step).
    pub fn run_frames(
        &mut self,
        count: u64,
        inputs: &[ActionSet],
    ) -> Result<Vec<GameEvent>, SceneError> {
        let mut events = Vec::new();
        for _ in 0..count {
            events.extend(self.step(inputs)?);
        }
        Ok(events)
    }

    fn route_events(&mut self) -> Result<Vec<GameEvent>, SceneError> {
        let mut events = Vec::new();
        let hazard_damage = self.config.hazard_damage;

        for trigger in self.physics.tile_trigger_events().to_vec() {
            let Some(id) = self.player_for(trigger.body) else {
                continue;
            };
            match trigger.kind {
                TileKind::Hazard => events.extend(self.damage_player(id, hazard_damage)?),
                TileKind::LevelExit => {
                    let slot = &mut self.players[id.0];
                    if !slot.exited && !slot.is_dead() {
                        slot.exited = true;
                        debug!(player = %id, cell = ?trigger.cell, "level exit reached");
                        events.push(GameEvent::LevelExitReached { player: id });
                    }
                }
                _ => {}
            }
        }

        for contact in self.physics.collision_events().to_vec() {
            for (body, other) in [(contact.a, contact.b), (contact.b, contact.a)] {
                let (Some(id), Some(side)) = (self.player_for(body), contact.side_for(body))
                else {
                    continue;
                };
                events.push(GameEvent::Contact {
                    player: id,
                    other,
                    side,
                });
                match self.props.get(&other).copied() {
                    Some(PropKind::Hazard) => events.extend(self.damage_player(id, hazard_damage)?),
                    Some(PropKind::Pickup { value }) => {
                        // A pickup touched by two players goes to the first.
                        self.remove_prop(other);
                        self.players[id.0].score += value;
                        debug!(player = %id, prop = %other, value, "pickup collected");
                        events.push(GameEvent::PickupCollected {
                            player: id,
                            prop: other,
                            value,
                        });
                    }
                    Some(PropKind::Inert) | None => {}
                }
            }
        }
        Ok(events)
    }

    /// Apply `amount` damage to a player, hurting or killing them.
    ///
    /// Returns the resulting event, or `None` when the damage was ignored
    /// because the player is dead or invulnerable.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownPlayer`] for an id this scene never
    /// issued.
    pub fn damage_player(
        &mut self,
        id: PlayerId,
        amount: u32,
    ) -> Result<Option<GameEvent>, SceneError> {
        let invulnerability = self.config.invulnerability;
        let slot = self
            .players
            .get_mut(id.0)
            .ok_or(SceneError::UnknownPlayer { player: id })?;
        if slot.is_dead() || slot.is_invulnerable() {
            return Ok(None);
        }

        slot.health = slot.health.saturating_sub(amount);
        slot.invulnerable_for = invulnerability;
        if slot.health == 0 {
            if !slot.controller.kill(&mut self.physics)? {
                return Ok(None);
            }
            debug!(player = %id, "player died");
            return Ok(Some(GameEvent::PlayerDied { player: id }));
        }
        if !slot.controller.hurt(&mut self.physics)? {
            return Ok(None);
        }
        debug!(player = %id, health = slot.health, "player hurt");
        Ok(Some(GameEvent::PlayerHurt {
            player: id,
            health: slot.health,
        }))
    }

    fn player_for(&self, body: BodyHandle) -> Option<PlayerId> {
        self.players
            .iter()
            .position(|slot| slot.body() == body)
            .map(PlayerId)
    }

    // -- accessors ----------------------------------------------------------

    /// The number of frames executed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Simulation time in seconds, computed as `frame * fixed_dt` to avoid
    /// drift from repeated addition.
    pub fn sim_time(&self) -> f64 {
        self.frame as f64 * f64::from(self.config.fixed_dt)
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn physics(&self) -> &PhysicsEngine {
        &self.physics
    }

    /// Mutable access to the physics engine, for level setup and tests.
    pub fn physics_mut(&mut self) -> &mut PhysicsEngine {
        &mut self.physics
    }

    pub fn players(&self) -> &[PlayerSlot] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerSlot> {
        self.players.get(id.0)
    }

    /// The body of a player, if both exist.
    pub fn player_body(&self, id: PlayerId) -> Option<&PhysicsBody> {
        self.player(id).and_then(|slot| self.physics.body(slot.body()))
    }

    /// Props in handle order.
    pub fn props(&self) -> impl Iterator<Item = (BodyHandle, PropKind)> + '_ {
        self.props.iter().map(|(handle, kind)| (*handle, *kind))
    }

    /// Whether every player is dead. `false` for a scene with no players.
    pub fn all_players_dead(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(PlayerSlot::is_dead)
    }

    /// Timing of the last frame.
    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }

    // -- snapshot plumbing --------------------------------------------------

    pub(crate) fn prop_list(&self) -> Vec<(BodyHandle, PropKind)> {
        self.props().collect()
    }

    pub(crate) fn restore_parts(
        &mut self,
        config: SceneConfig,
        frame: u64,
        players: Vec<PlayerSlot>,
        props: &[(BodyHandle, PropKind)],
    ) {
        self.config = config;
        self.frame = frame;
        self.players = players;
        self.props = props.iter().copied().collect();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ARENA: &[&str] = &[
        "............",
        "............",
        "............",
        "............",
        "............",
        "############",
    ];

    fn arena() -> Scene {
        let tiles = TileGrid::from_ascii(ARENA, 16.0).unwrap();
        Scene::new(SceneConfig::default(), PhysicsConfig::default(), tiles).unwrap()
    }

    fn right() -> ActionSet {
        ActionSet::EMPTY.with(Action::MoveRight)
    }

    #[test]
    fn new_scene_starts_at_zero() {
        let scene = arena();
        assert_eq!(scene.frame(), 0);
        assert_eq!(scene.sim_time(), 0.0);
        assert!(scene.players().is_empty());
        assert!(!scene.all_players_dead());
    }

    #[test]
    fn rejects_invalid_config() {
        let tiles = TileGrid::from_ascii(ARENA, 16.0).unwrap();
        let config = SceneConfig {
            fixed_dt: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            Scene::new(config, PhysicsConfig::default(), tiles),
            Err(SceneError::InvalidConfig { field: "fixed_dt", .. })
        ));
    }

    #[test]
    fn players_read_their_own_input_slot() {
        let mut scene = arena();
        let p1 = scene.add_player(Vec2::new(40.0, 80.0), PlayerTuning::default()).unwrap();
        let p2 = scene.add_player(Vec2::new(140.0, 80.0), PlayerTuning::default()).unwrap();
        assert_eq!(format!("{p1} {p2}"), "p1 p2");

        scene.step(&[]).unwrap();
        scene.step(&[ActionSet::EMPTY, right()]).unwrap();

        assert_eq!(scene.player(p1).unwrap().state_kind(), Some(StateKind::Idle));
        assert_eq!(scene.player(p2).unwrap().state_kind(), Some(StateKind::Walk));
        assert!(scene.player_body(p2).unwrap().position().x > 140.0);
        assert_eq!(scene.player_body(p1).unwrap().position().x, 40.0);
    }

    #[test]
    fn damage_hurts_then_kills() {
        let mut scene = arena();
        let p1 = scene.add_player(Vec2::new(120.0, 80.0), PlayerTuning::default()).unwrap();
        scene.step(&[]).unwrap();

        let event = scene.damage_player(p1, 1).unwrap();
        assert_eq!(event, Some(GameEvent::PlayerHurt { player: p1, health: 2 }));
        assert_eq!(scene.player(p1).unwrap().state_kind(), Some(StateKind::Hurt));

        // Invulnerable right after a hit.
        assert_eq!(scene.damage_player(p1, 1).unwrap(), None);
        assert_eq!(scene.player(p1).unwrap().health(), 2);

        // One second of invulnerability at 60 Hz.
        scene.run_frames(61, &[]).unwrap();
        assert!(!scene.player(p1).unwrap().is_invulnerable());

        let event = scene.damage_player(p1, 5).unwrap();
        assert_eq!(event, Some(GameEvent::PlayerDied { player: p1 }));
        assert!(scene.all_players_dead());
        assert_eq!(scene.player(p1).unwrap().health(), 0);

        scene.run_frames(61, &[]).unwrap();
        assert_eq!(scene.damage_player(p1, 1).unwrap(), None);
    }

    #[test]
    fn unknown_player_is_an_error() {
        let mut scene = arena();
        assert!(matches!(
            scene.damage_player(PlayerId(3), 1),
            Err(SceneError::UnknownPlayer { player: PlayerId(3) })
        ));
    }

    #[test]
    fn pickup_scores_once_and_disappears() {
        let mut scene = arena();
        let p1 = scene.add_player(Vec2::new(40.0, 80.0), PlayerTuning::default()).unwrap();
        let coin = PhysicsBody::new(Vec2::new(72.0, 72.0))
            .with_gravity(false)
            .with_collider(Collider::trigger(Shape::circle(4.0), Alignment::Center));
        let coin = scene.add_prop(coin, PropKind::Pickup { value: 10 }).unwrap();

        let mut collected = Vec::new();
        for _ in 0..60 {
            for event in scene.step(&[right()]).unwrap() {
                if let GameEvent::PickupCollected { .. } = event {
                    collected.push(event);
                }
            }
        }

        assert_eq!(
            collected,
            vec![GameEvent::PickupCollected {
                player: p1,
                prop: coin,
                value: 10
            }]
        );
        assert_eq!(scene.player(p1).unwrap().score(), 10);
        assert!(!scene.physics().contains_body(coin));
        assert_eq!(scene.props().count(), 0);
    }

    #[test]
    fn inert_props_only_report_contacts() {
        let mut scene = arena();
        let p1 = scene.add_player(Vec2::new(40.0, 80.0), PlayerTuning::default()).unwrap();
        let crate_body = PhysicsBody::new(Vec2::new(40.0, 64.0))
            .with_gravity(false)
            .with_collider(Collider::trigger(Shape::rect(8.0, 8.0), Alignment::Center));
        let prop = scene.add_prop(crate_body, PropKind::Inert).unwrap();

        let events = scene.step(&[]).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            GameEvent::Contact { player, other, .. } if player == p1 && other == prop
        ));
        assert_eq!(scene.player(p1).unwrap().health(), 3);
    }
}
