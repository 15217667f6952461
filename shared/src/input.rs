//! Keyboard snapshot and key bindings
//!
//! The snapshot is refreshed from the keyboard once per frame; the reconciler only ever
//! sees the derived [`MovementCommand`].

use std::collections::HashSet;

use bevy::prelude::*;

use crate::directions::{Direction, IntentSet};

/// Per-frame mapping of raw key identity to held state.
#[derive(Resource, Debug, Clone, Default)]
pub struct InputSnapshot {
    held: HashSet<KeyCode>,
}

impl InputSnapshot {
    pub fn from_held(keys: impl IntoIterator<Item = KeyCode>) -> Self {
        Self {
            held: keys.into_iter().collect(),
        }
    }

    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    pub fn any_held(&self, keys: &[KeyCode]) -> bool {
        keys.iter().any(|k| self.is_held(*k))
    }

    pub fn set(&mut self, key: KeyCode, held: bool) {
        if held {
            self.held.insert(key);
        } else {
            self.held.remove(&key);
        }
    }
}

/// Intents resolved from a snapshot for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementCommand {
    pub intents: IntentSet,
    pub running: bool,
}

impl MovementCommand {
    pub fn new(intents: impl IntoIterator<Item = Direction>, running: bool) -> Self {
        Self {
            intents: intents.into_iter().collect(),
            running,
        }
    }

    pub fn idle() -> Self {
        Self::default()
    }
}

/// Which keys map to which intent.
#[derive(Resource, Debug, Clone)]
pub struct KeyBindings {
    pub forward: Vec<KeyCode>,
    pub backward: Vec<KeyCode>,
    pub left: Vec<KeyCode>,
    pub right: Vec<KeyCode>,
    pub jump: Vec<KeyCode>,
    pub run: Vec<KeyCode>,
    pub toggle_camera: KeyCode,
    pub open_menu: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: vec![KeyCode::KeyW],
            backward: vec![KeyCode::KeyS],
            left: vec![KeyCode::KeyA],
            right: vec![KeyCode::KeyD],
            jump: vec![KeyCode::Space],
            run: vec![KeyCode::ShiftLeft, KeyCode::ShiftRight],
            toggle_camera: KeyCode::KeyC,
            open_menu: KeyCode::Tab,
        }
    }
}

impl KeyBindings {
    pub fn keys_for(&self, direction: Direction) -> &[KeyCode] {
        match direction {
            Direction::Forward => &self.forward,
            Direction::Backward => &self.backward,
            Direction::Left => &self.left,
            Direction::Right => &self.right,
            Direction::Jump => &self.jump,
        }
    }

    /// Resolve the held keys into this tick's movement command.
    pub fn command(&self, snapshot: &InputSnapshot) -> MovementCommand {
        let intents = Direction::EVALUATION_ORDER
            .into_iter()
            .filter(|d| snapshot.any_held(self.keys_for(*d)))
            .collect();

        MovementCommand {
            intents,
            running: snapshot.any_held(&self.run),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_from_snapshot() {
        let bindings = KeyBindings::default();
        let snapshot = InputSnapshot::from_held([KeyCode::KeyW, KeyCode::KeyD, KeyCode::ShiftLeft]);
        let command = bindings.command(&snapshot);

        assert!(command.running);
        assert!(command.intents.contains(Direction::Forward));
        assert!(command.intents.contains(Direction::Right));
        assert!(!command.intents.contains(Direction::Jump));
    }

    #[test]
    fn test_contradictory_keys_are_kept() {
        let bindings = KeyBindings::default();
        let snapshot = InputSnapshot::from_held([KeyCode::KeyW, KeyCode::KeyS]);
        let command = bindings.command(&snapshot);

        assert!(command.intents.contains(Direction::Forward));
        assert!(command.intents.contains(Direction::Backward));
        assert!(!command.running);
    }

    #[test]
    fn test_release_clears_intent() {
        let bindings = KeyBindings::default();
        let mut snapshot = InputSnapshot::from_held([KeyCode::Space]);
        assert!(bindings.command(&snapshot).intents.contains(Direction::Jump));

        snapshot.set(KeyCode::Space, false);
        assert!(bindings.command(&snapshot).intents.is_empty());
    }
}
