//! Directional animation latch
//!
//! One directional clip at a time. A trigger that arrives while a clip is playing is dropped,
//! not queued. The latch is released by the clip's own completion or by an explicit stop.

use crate::config::AnimationTuning;
use crate::directions::Direction;

/// Clip ranges of the avatar rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationRange {
    Idle,
    WalkingForward,
    WalkingBackward,
    StrafeLeft,
    StrafeRight,
    Jumping,
}

impl AnimationRange {
    pub const ALL: [AnimationRange; 6] = [
        AnimationRange::Idle,
        AnimationRange::WalkingForward,
        AnimationRange::WalkingBackward,
        AnimationRange::StrafeLeft,
        AnimationRange::StrafeRight,
        AnimationRange::Jumping,
    ];

    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Forward => AnimationRange::WalkingForward,
            Direction::Backward => AnimationRange::WalkingBackward,
            Direction::Left => AnimationRange::StrafeLeft,
            Direction::Right => AnimationRange::StrafeRight,
            Direction::Jump => AnimationRange::Jumping,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationLatch {
    #[default]
    Idle,
    Playing(AnimationRange),
}

/// Animation playback collaborator.
pub trait AnimationSink {
    /// Play a range once at `speed`.
    fn play_range(&mut self, range: AnimationRange, speed: f32);
    fn stop_all(&mut self);
}

#[derive(Debug, Clone, Default)]
pub struct AnimationReactor {
    pub tuning: AnimationTuning,
    latch: AnimationLatch,
}

impl AnimationReactor {
    pub fn new(tuning: AnimationTuning) -> Self {
        Self {
            tuning,
            latch: AnimationLatch::Idle,
        }
    }

    pub fn latch(&self) -> AnimationLatch {
        self.latch
    }

    pub fn is_free(&self) -> bool {
        self.latch == AnimationLatch::Idle
    }

    /// Returns the range started, or `None` when the latch is held.
    pub fn on_moving(
        &mut self,
        direction: Direction,
        running: bool,
        sink: &mut impl AnimationSink,
    ) -> Option<AnimationRange> {
        if !self.is_free() {
            return None;
        }

        let range = AnimationRange::for_direction(direction);
        let speed = if running && direction.supports_running() {
            self.tuning.running_rate
        } else {
            self.tuning.base_rate
        };

        sink.play_range(range, speed);
        self.latch = AnimationLatch::Playing(range);
        Some(range)
    }

    /// Completion of `range`. Stale completions from a stopped clip are ignored.
    pub fn on_clip_finished(&mut self, range: AnimationRange) {
        if self.latch == AnimationLatch::Playing(range) {
            self.latch = AnimationLatch::Idle;
        }
    }

    pub fn stop_all(&mut self, sink: &mut impl AnimationSink) {
        sink.stop_all();
        self.latch = AnimationLatch::Idle;
    }

    /// Whether the idle loop should be showing.
    pub fn wants_idle(&self, is_moving: bool) -> bool {
        self.is_free() && !is_moving
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        played: Vec<(AnimationRange, f32)>,
        stops: usize,
    }

    impl AnimationSink for RecordingSink {
        fn play_range(&mut self, range: AnimationRange, speed: f32) {
            self.played.push((range, speed));
        }

        fn stop_all(&mut self) {
            self.stops += 1;
        }
    }

    #[test]
    fn test_latch_blocks_second_trigger() {
        let mut reactor = AnimationReactor::default();
        let mut sink = RecordingSink::default();

        assert_eq!(
            reactor.on_moving(Direction::Forward, false, &mut sink),
            Some(AnimationRange::WalkingForward)
        );
        assert_eq!(reactor.on_moving(Direction::Left, false, &mut sink), None);
        assert_eq!(sink.played.len(), 1);

        reactor.on_clip_finished(AnimationRange::WalkingForward);
        assert!(reactor.is_free());
        assert_eq!(
            reactor.on_moving(Direction::Left, false, &mut sink),
            Some(AnimationRange::StrafeLeft)
        );
    }

    #[test]
    fn test_running_boosts_only_supported_intents() {
        let mut reactor = AnimationReactor::default();
        let mut sink = RecordingSink::default();

        reactor.on_moving(Direction::Forward, true, &mut sink);
        reactor.on_clip_finished(AnimationRange::WalkingForward);
        reactor.on_moving(Direction::Backward, true, &mut sink);

        assert_eq!(
            sink.played,
            vec![
                (AnimationRange::WalkingForward, 1.5),
                (AnimationRange::WalkingBackward, 1.0),
            ]
        );
    }

    #[test]
    fn test_stop_all_clears_latch() {
        let mut reactor = AnimationReactor::default();
        let mut sink = RecordingSink::default();

        reactor.on_moving(Direction::Jump, false, &mut sink);
        reactor.stop_all(&mut sink);

        assert!(reactor.is_free());
        assert_eq!(sink.stops, 1);
        assert!(reactor.wants_idle(false));
    }

    #[test]
    fn test_stale_completion_ignored() {
        let mut reactor = AnimationReactor::default();
        let mut sink = RecordingSink::default();

        reactor.on_moving(Direction::Right, false, &mut sink);
        reactor.on_clip_finished(AnimationRange::WalkingForward);
        assert_eq!(reactor.latch(), AnimationLatch::Playing(AnimationRange::StrafeRight));
        assert!(!reactor.wants_idle(false));
    }
}
