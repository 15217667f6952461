//! Per-tick movement reconciliation
//!
//! Reads the resolved [`MovementCommand`], the floor and the physics body, then:
//! - Keeps the avatar from sinking under the floor
//! - Tracks airborne state and reports touchdowns
//! - Sums intent contributions into one velocity command
//! - Picks a gravity factor (heavier on the ground, floatier in the air)
//!
//! The reconciler never fails. A bad tick is corrected on the next one.

use bevy::prelude::*;

use crate::config::MovementTuning;
use crate::directions::Direction;
use crate::input::MovementCommand;
use crate::player::PlayerState;
use crate::surface::FloorQuery;
use crate::world::Containment;

/// Physics body collaborator driven by the reconciler.
pub trait PhysicsBody {
    fn linear_velocity(&self) -> Vec3;
    fn set_linear_velocity(&mut self, velocity: Vec3);
    fn set_gravity_factor(&mut self, factor: f32);
}

/// Emitted by the reconciler for the animation and sound reactors.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub enum MovementEvent {
    Moving { direction: Direction, running: bool },
    TouchDown,
}

/// Outcome of one reconciliation tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// In emission order: touchdown first, then intents in evaluation order.
    pub events: Vec<MovementEvent>,
    /// Velocity handed to the body, `None` when no intent fired.
    pub velocity_command: Option<Vec3>,
    pub gravity_factor: f32,
    /// Floor height plus capsule offset.
    pub ground_height: f32,
    /// Moving last tick, idle this one.
    pub stopped_moving: bool,
}

impl TickReport {
    pub fn touched_down(&self) -> bool {
        self.events.contains(&MovementEvent::TouchDown)
    }
}

/// Owns the avatar state and advances it one tick at a time.
#[derive(Component, Debug, Clone)]
pub struct MovementReconciler {
    pub tuning: MovementTuning,
    pub state: PlayerState,
}

impl MovementReconciler {
    pub fn new(tuning: MovementTuning, state: PlayerState) -> Self {
        Self { tuning, state }
    }

    /// Height the avatar center rests at over `(x, z)`.
    pub fn ground_height(&self, floor: &impl FloorQuery, x: f32, z: f32) -> f32 {
        floor.height_at(x, z) + self.tuning.capsule_offset
    }

    /// Place the avatar at rest on the floor.
    pub fn spawn_on(&mut self, floor: &impl FloorQuery, x: f32, z: f32) {
        let y = self.ground_height(floor, x, z);
        self.state.position = Vec3::new(x, y, z);
        self.state.is_falling = false;
        self.state.walking_on = floor.surface_below(self.state.position);
    }

    pub fn reconcile(
        &mut self,
        command: &MovementCommand,
        floor: &impl FloorQuery,
        body: &mut impl PhysicsBody,
    ) -> TickReport {
        let tuning = &self.tuning;
        let state = &mut self.state;
        let mut events = Vec::new();

        let ground_height = floor.height_at(state.position.x, state.position.z) + tuning.capsule_offset;
        if state.position.y < ground_height {
            state.position.y = ground_height;
        }

        let airborne_threshold = ground_height + tuning.airborne_clearance;
        if state.is_falling && state.position.y <= airborne_threshold {
            events.push(MovementEvent::TouchDown);
        }
        state.is_falling = state.position.y > airborne_threshold;

        state.walking_on = floor.surface_below(state.position);
        state.interacting_with = floor.interactable_ahead(state.position, state.forward());

        let forward = state.forward();
        let right = state.right();
        let up = state.up();

        let mut sum = Vec3::ZERO;
        let mut fired = false;
        let mut jumped = false;

        for direction in command.intents.iter() {
            let (basis, speed) = match direction {
                Direction::Forward => (forward, tuning.forward_speed),
                Direction::Backward => (-forward, tuning.backward_speed),
                Direction::Right => (right, tuning.strafe_speed),
                Direction::Left => (-right, tuning.strafe_speed),
                Direction::Jump => {
                    // No double jump
                    if state.is_falling {
                        continue;
                    }
                    jumped = true;
                    (up, tuning.jump_speed)
                }
            };

            let running = command.running && direction.supports_running();
            let multiplier = if running { tuning.running_multiplier } else { 1.0 };
            sum += basis * speed * multiplier;
            fired = true;
            events.push(MovementEvent::Moving { direction, running });
        }

        let airborne = state.is_falling || jumped;

        let velocity_command = fired.then(|| {
            let base = if airborne {
                body.linear_velocity().y
            } else {
                tuning.grounded_vertical_bias
            };
            let velocity = Vec3::new(sum.x, sum.y + base, sum.z);
            body.set_linear_velocity(velocity);
            velocity
        });

        let gravity_factor = if airborne {
            tuning.gravity_factor_airborne
        } else {
            tuning.gravity_factor_grounded
        };
        body.set_gravity_factor(gravity_factor);

        let stopped_moving = state.is_moving && !fired;
        state.is_moving = fired;

        TickReport {
            events,
            velocity_command,
            gravity_factor,
            ground_height,
            stopped_moving,
        }
    }

    /// Nudge the avatar back toward the world center when it has left the walls.
    /// Returns the corrected position, if any.
    pub fn contain(&mut self, bounds: &impl Containment) -> Option<Vec3> {
        if bounds.is_inside_boundary(self.state.position) {
            return None;
        }

        let step = self.tuning.containment_step;
        let position = &mut self.state.position;
        position.x += if position.x > 0.0 { -step } else { step };
        position.z += if position.z > 0.0 { -step } else { step };
        Some(*position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{InteractableLabel, SurfaceLabel};

    const OFFSET: f32 = 3.8;

    struct FlatFloor(f32);

    impl FloorQuery for FlatFloor {
        fn height_at(&self, _x: f32, _z: f32) -> f32 {
            self.0
        }
    }

    /// Rises one unit per unit of x.
    struct SlopeFloor;

    impl FloorQuery for SlopeFloor {
        fn height_at(&self, x: f32, _z: f32) -> f32 {
            x
        }
    }

    struct IcyFloor;

    impl FloorQuery for IcyFloor {
        fn height_at(&self, _x: f32, _z: f32) -> f32 {
            0.0
        }

        fn surface_below(&self, _position: Vec3) -> SurfaceLabel {
            SurfaceLabel::Ice
        }

        fn interactable_ahead(&self, _position: Vec3, _forward: Vec3) -> Option<InteractableLabel> {
            Some(InteractableLabel::SupplyCrate)
        }
    }

    #[derive(Default)]
    struct RecordingBody {
        velocity: Vec3,
        gravity_factor: Option<f32>,
        sets: usize,
    }

    impl PhysicsBody for RecordingBody {
        fn linear_velocity(&self) -> Vec3 {
            self.velocity
        }

        fn set_linear_velocity(&mut self, velocity: Vec3) {
            self.velocity = velocity;
            self.sets += 1;
        }

        fn set_gravity_factor(&mut self, factor: f32) {
            self.gravity_factor = Some(factor);
        }
    }

    struct Walls(f32);

    impl Containment for Walls {
        fn is_inside_boundary(&self, position: Vec3) -> bool {
            position.x.abs() <= self.0 && position.z.abs() <= self.0
        }
    }

    fn reconciler_at(y: f32) -> MovementReconciler {
        MovementReconciler::new(MovementTuning::default(), PlayerState::at(Vec3::new(0.0, y, 0.0)))
    }

    fn command(intents: &[Direction], running: bool) -> MovementCommand {
        MovementCommand::new(intents.iter().copied(), running)
    }

    #[test]
    fn test_at_rest_with_no_keys() {
        let mut reconciler = reconciler_at(OFFSET);
        let mut body = RecordingBody {
            velocity: Vec3::new(1.0, 2.0, 3.0),
            ..Default::default()
        };

        let report = reconciler.reconcile(&MovementCommand::idle(), &FlatFloor(0.0), &mut body);

        assert!(!reconciler.state.is_moving);
        assert!(!reconciler.state.is_falling);
        assert!(report.events.is_empty());
        assert_eq!(report.velocity_command, None);
        assert_eq!(body.sets, 0);
        assert_eq!(body.velocity, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(body.gravity_factor, Some(200.0));
    }

    #[test]
    fn test_never_below_ground() {
        let mut reconciler = reconciler_at(-50.0);
        let mut body = RecordingBody::default();
        let floor = SlopeFloor;

        for step in 0..20 {
            reconciler.state.position.x = step as f32 * 3.0;
            reconciler.state.position.y -= 10.0;
            reconciler.reconcile(&command(&[Direction::Forward], false), &floor, &mut body);
            let ground = floor.height_at(reconciler.state.position.x, 0.0) + OFFSET;
            assert!(reconciler.state.position.y >= ground);
        }
    }

    #[test]
    fn test_falling_threshold() {
        let mut body = RecordingBody::default();

        let mut reconciler = reconciler_at(OFFSET + 1.0);
        reconciler.reconcile(&MovementCommand::idle(), &FlatFloor(0.0), &mut body);
        assert!(!reconciler.state.is_falling);

        let mut reconciler = reconciler_at(OFFSET + 1.01);
        reconciler.reconcile(&MovementCommand::idle(), &FlatFloor(0.0), &mut body);
        assert!(reconciler.state.is_falling);
        assert_eq!(body.gravity_factor, Some(40.0));
    }

    #[test]
    fn test_landing_emits_one_touchdown() {
        let mut reconciler = reconciler_at(OFFSET + 5.0);
        let mut body = RecordingBody::default();
        let floor = FlatFloor(0.0);

        let report = reconciler.reconcile(&MovementCommand::idle(), &floor, &mut body);
        assert!(reconciler.state.is_falling);
        assert!(!report.touched_down());

        reconciler.state.position.y = OFFSET + 0.5;
        let report = reconciler.reconcile(&MovementCommand::idle(), &floor, &mut body);
        assert_eq!(report.events, vec![MovementEvent::TouchDown]);
        assert!(!reconciler.state.is_falling);

        let report = reconciler.reconcile(&MovementCommand::idle(), &floor, &mut body);
        assert!(!report.touched_down());
    }

    #[test]
    fn test_touchdown_precedes_moving_events() {
        let mut reconciler = reconciler_at(OFFSET + 5.0);
        let mut body = RecordingBody::default();
        let floor = FlatFloor(0.0);
        reconciler.reconcile(&MovementCommand::idle(), &floor, &mut body);

        reconciler.state.position.y = OFFSET;
        let report = reconciler.reconcile(&command(&[Direction::Forward], false), &floor, &mut body);
        assert_eq!(
            report.events,
            vec![
                MovementEvent::TouchDown,
                MovementEvent::Moving { direction: Direction::Forward, running: false },
            ]
        );
    }

    #[test]
    fn test_no_double_jump() {
        let mut reconciler = reconciler_at(OFFSET + 20.0);
        let mut body = RecordingBody {
            velocity: Vec3::new(0.0, -7.0, 0.0),
            ..Default::default()
        };

        let with_jump = reconciler
            .clone()
            .reconcile(&command(&[Direction::Forward, Direction::Jump], false), &FlatFloor(0.0), &mut body);
        body.velocity = Vec3::new(0.0, -7.0, 0.0);
        let without_jump = reconciler.reconcile(&command(&[Direction::Forward], false), &FlatFloor(0.0), &mut body);

        assert_eq!(with_jump.velocity_command, without_jump.velocity_command);
        // Airborne: the existing vertical velocity is preserved
        assert_eq!(with_jump.velocity_command.map(|v| v.y), Some(-7.0));
        assert!(!with_jump
            .events
            .iter()
            .any(|e| matches!(e, MovementEvent::Moving { direction: Direction::Jump, .. })));
    }

    #[test]
    fn test_jump_from_ground() {
        let mut reconciler = reconciler_at(OFFSET);
        let mut body = RecordingBody::default();

        let report = reconciler.reconcile(&command(&[Direction::Jump], false), &FlatFloor(0.0), &mut body);

        assert_eq!(report.velocity_command, Some(Vec3::new(0.0, 80.0, 0.0)));
        assert_eq!(report.gravity_factor, 40.0);
        // Airborne state itself is still height-derived
        assert!(!reconciler.state.is_falling);
        assert!(reconciler.state.is_moving);
    }

    #[test]
    fn test_running_forward() {
        let mut reconciler = reconciler_at(OFFSET);
        let mut body = RecordingBody::default();

        let report = reconciler.reconcile(&command(&[Direction::Forward], true), &FlatFloor(0.0), &mut body);
        let velocity = report.velocity_command.unwrap_or_default();

        assert!((velocity.xz().length() - 60.0 * 1.5).abs() < 1e-4);
        assert_eq!(velocity.y, crate::GRAVITY_ON_LAND);
        assert_eq!(
            report.events,
            vec![MovementEvent::Moving { direction: Direction::Forward, running: true }]
        );
    }

    #[test]
    fn test_running_leaves_backward_unscaled() {
        let mut body = RecordingBody::default();

        let velocity = reconciler_at(OFFSET)
            .reconcile(&command(&[Direction::Backward], true), &FlatFloor(0.0), &mut body)
            .velocity_command
            .unwrap_or_default();
        assert!((velocity.xz().length() - 45.0).abs() < 1e-4);
        assert!(velocity.z > 0.0);

        for strafe in [Direction::Left, Direction::Right] {
            let velocity = reconciler_at(OFFSET)
                .reconcile(&command(&[strafe], true), &FlatFloor(0.0), &mut body)
                .velocity_command
                .unwrap_or_default();
            assert!((velocity.xz().length() - 45.0 * 1.5).abs() < 1e-4);
        }
    }

    #[test]
    fn test_contradictory_intents_cancel() {
        let mut reconciler = reconciler_at(OFFSET);
        let mut body = RecordingBody::default();

        let report = reconciler.reconcile(
            &command(&[Direction::Forward, Direction::Backward, Direction::Left, Direction::Right], false),
            &FlatFloor(0.0),
            &mut body,
        );
        let velocity = report.velocity_command.unwrap_or_default();

        // 60 forward against 45 backward
        assert!((velocity.z + 15.0).abs() < 1e-4);
        assert!(velocity.x.abs() < 1e-4);
        assert_eq!(report.events.len(), 4);
    }

    #[test]
    fn test_stopped_moving_once() {
        let mut reconciler = reconciler_at(OFFSET);
        let mut body = RecordingBody::default();
        let floor = FlatFloor(0.0);

        reconciler.reconcile(&command(&[Direction::Right], false), &floor, &mut body);
        assert!(reconciler.reconcile(&MovementCommand::idle(), &floor, &mut body).stopped_moving);
        assert!(!reconciler.reconcile(&MovementCommand::idle(), &floor, &mut body).stopped_moving);
    }

    #[test]
    fn test_picks_surface_and_interactable() {
        let mut reconciler = reconciler_at(OFFSET);
        let mut body = RecordingBody::default();

        reconciler.reconcile(&MovementCommand::idle(), &IcyFloor, &mut body);
        assert_eq!(reconciler.state.walking_on, SurfaceLabel::Ice);
        assert_eq!(reconciler.state.interacting_with, Some(InteractableLabel::SupplyCrate));
    }

    #[test]
    fn test_containment_nudges_toward_origin() {
        let mut reconciler = MovementReconciler::new(
            MovementTuning::default(),
            PlayerState::at(Vec3::new(105.0, 10.0, -103.0)),
        );

        assert_eq!(reconciler.contain(&Walls(100.0)), Some(Vec3::new(104.0, 10.0, -102.0)));

        reconciler.state.position = Vec3::new(50.0, 10.0, 50.0);
        assert_eq!(reconciler.contain(&Walls(100.0)), None);
    }

    #[test]
    fn test_spawn_rests_on_floor() {
        let mut reconciler = reconciler_at(0.0);
        reconciler.spawn_on(&FlatFloor(12.0), 4.0, -100.0);
        assert_eq!(reconciler.state.position, Vec3::new(4.0, 12.0 + OFFSET, -100.0));
    }
}
