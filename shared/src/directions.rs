//! Movement intents a player can request each tick

use serde::{Deserialize, Serialize};

/// One discrete movement intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    Jump,
}

impl Direction {
    /// Order in which intents are evaluated and summed during a tick.
    pub const EVALUATION_ORDER: [Direction; 5] = [
        Direction::Forward,
        Direction::Backward,
        Direction::Right,
        Direction::Left,
        Direction::Jump,
    ];

    /// Whether the run modifier boosts this intent.
    ///
    /// Backward and jump never run.
    pub fn supports_running(self) -> bool {
        matches!(self, Direction::Forward | Direction::Left | Direction::Right)
    }

    fn bit(self) -> u8 {
        match self {
            Direction::Forward => 1 << 0,
            Direction::Backward => 1 << 1,
            Direction::Left => 1 << 2,
            Direction::Right => 1 << 3,
            Direction::Jump => 1 << 4,
        }
    }
}

/// Set of intents active in a single tick. Contradictory pairs are allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IntentSet(u8);

impl IntentSet {
    pub const EMPTY: IntentSet = IntentSet(0);

    pub fn insert(&mut self, direction: Direction) {
        self.0 |= direction.bit();
    }

    pub fn remove(&mut self, direction: Direction) {
        self.0 &= !direction.bit();
    }

    pub fn contains(&self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Active intents in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::EVALUATION_ORDER
            .into_iter()
            .filter(move |d| self.contains(*d))
    }
}

impl FromIterator<Direction> for IntentSet {
    fn from_iter<T: IntoIterator<Item = Direction>>(iter: T) -> Self {
        let mut set = IntentSet::EMPTY;
        for direction in iter {
            set.insert(direction);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_follows_evaluation_order() {
        let set: IntentSet = [Direction::Jump, Direction::Left, Direction::Forward, Direction::Right]
            .into_iter()
            .collect();
        let order: Vec<_> = set.iter().collect();
        assert_eq!(
            order,
            vec![Direction::Forward, Direction::Right, Direction::Left, Direction::Jump]
        );
    }

    #[test]
    fn test_running_support() {
        assert!(Direction::Forward.supports_running());
        assert!(Direction::Left.supports_running());
        assert!(Direction::Right.supports_running());
        assert!(!Direction::Backward.supports_running());
        assert!(!Direction::Jump.supports_running());
    }

    #[test]
    fn test_insert_remove() {
        let mut set = IntentSet::EMPTY;
        assert!(set.is_empty());
        set.insert(Direction::Backward);
        set.insert(Direction::Forward);
        assert!(set.contains(Direction::Backward));
        set.remove(Direction::Backward);
        assert!(!set.contains(Direction::Backward));
        assert!(set.contains(Direction::Forward));
    }
}
