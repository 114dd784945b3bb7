//! Resolved input actions.
//!
//! Device mapping happens elsewhere. The state machine only ever asks
//! whether a named [`Action`] is held, was pressed this frame, or was
//! released this frame, through the [`ActionQuery`] trait.
//!
//! [`ActionState`] is the stock implementation: feed it the set of held
//! actions once per frame and it derives the press/release edges.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A logical player action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    Jump,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::MoveLeft,
        Action::MoveRight,
        Action::MoveUp,
        Action::MoveDown,
        Action::Jump,
    ];

    /// The action's binding name, e.g. `"move_right"`.
    pub fn name(self) -> &'static str {
        match self {
            Action::MoveLeft => "move_left",
            Action::MoveRight => "move_right",
            Action::MoveUp => "move_up",
            Action::MoveDown => "move_down",
            Action::Jump => "jump",
        }
    }

    pub fn from_name(name: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.name() == name)
    }

    fn bit(self) -> u8 {
        1 << self as u8
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// ActionQuery
// ---------------------------------------------------------------------------

/// Read-only view of this frame's input.
pub trait ActionQuery {
    /// The action is held this frame.
    fn is_action_down(&self, action: Action) -> bool;

    /// The action went down this frame.
    fn is_action_pressed(&self, action: Action) -> bool;

    /// The action went up this frame.
    fn is_action_released(&self, action: Action) -> bool;

    /// `-1`, `0` or `1` from the left/right actions. Holding both cancels.
    fn horizontal_axis(&self) -> f32 {
        axis(
            self.is_action_down(Action::MoveLeft),
            self.is_action_down(Action::MoveRight),
        )
    }

    /// `-1` (up), `0` or `1` (down). y grows downward.
    fn vertical_axis(&self) -> f32 {
        axis(
            self.is_action_down(Action::MoveUp),
            self.is_action_down(Action::MoveDown),
        )
    }
}

fn axis(negative: bool, positive: bool) -> f32 {
    match (negative, positive) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// ActionSet
// ---------------------------------------------------------------------------

/// A compact set of held actions; one frame of recorded input.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionSet(u8);

impl ActionSet {
    pub const EMPTY: ActionSet = ActionSet(0);

    pub fn with(mut self, action: Action) -> Self {
        self.insert(action);
        self
    }

    pub fn insert(&mut self, action: Action) {
        self.0 |= action.bit();
    }

    pub fn remove(&mut self, action: Action) {
        self.0 &= !action.bit();
    }

    pub fn contains(self, action: Action) -> bool {
        self.0 & action.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Action> {
        Action::ALL.into_iter().filter(move |a| self.contains(*a))
    }

    pub fn to_bits(self) -> u8 {
        self.0
    }

    /// Build a set from raw bits, dropping bits that name no action.
    pub fn from_bits(bits: u8) -> Self {
        let mask = Action::ALL.iter().fold(0u8, |m, a| m | a.bit());
        Self(bits & mask)
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        iter.into_iter().fold(ActionSet::EMPTY, ActionSet::with)
    }
}

impl fmt::Debug for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Action::name)).finish()
    }
}

// ---------------------------------------------------------------------------
// ActionState
// ---------------------------------------------------------------------------

/// Held actions for this frame and the previous one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionState {
    held: ActionSet,
    previous: ActionSet,
}

impl ActionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new frame with `held` as the current input.
    pub fn advance(&mut self, held: ActionSet) {
        self.previous = self.held;
        self.held = held;
    }

    /// Hold `action` in the current frame.
    pub fn press(&mut self, action: Action) {
        self.held.insert(action);
    }

    /// Let go of `action` in the current frame.
    pub fn release(&mut self, action: Action) {
        self.held.remove(action);
    }

    pub fn held(&self) -> ActionSet {
        self.held
    }
}

impl ActionQuery for ActionState {
    fn is_action_down(&self, action: Action) -> bool {
        self.held.contains(action)
    }

    fn is_action_pressed(&self, action: Action) -> bool {
        self.held.contains(action) && !self.previous.contains(action)
    }

    fn is_action_released(&self, action: Action) -> bool {
        !self.held.contains(action) && self.previous.contains(action)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for action in Action::ALL {
            assert_eq!(Action::from_name(action.name()), Some(action));
        }
        assert_eq!(Action::from_name("dash"), None);
    }

    #[test]
    fn pressed_is_an_edge() {
        let mut input = ActionState::new();
        input.advance(ActionSet::EMPTY.with(Action::Jump));
        assert!(input.is_action_pressed(Action::Jump));
        assert!(input.is_action_down(Action::Jump));

        input.advance(ActionSet::EMPTY.with(Action::Jump));
        assert!(!input.is_action_pressed(Action::Jump));
        assert!(input.is_action_down(Action::Jump));

        input.advance(ActionSet::EMPTY);
        assert!(input.is_action_released(Action::Jump));
        assert!(!input.is_action_down(Action::Jump));
    }

    #[test]
    fn opposing_directions_cancel() {
        let mut input = ActionState::new();
        input.advance([Action::MoveLeft, Action::MoveRight].into_iter().collect());
        assert_eq!(input.horizontal_axis(), 0.0);
        input.release(Action::MoveLeft);
        assert_eq!(input.horizontal_axis(), 1.0);
        input.press(Action::MoveUp);
        assert_eq!(input.vertical_axis(), -1.0);
    }

    #[test]
    fn set_bits_ignore_unknown_actions() {
        let set = ActionSet::from_bits(0xff);
        assert_eq!(set.iter().count(), Action::ALL.len());
        assert_eq!(format!("{:?}", ActionSet::EMPTY.with(Action::Jump)), "{\"jump\"}");
    }
}
