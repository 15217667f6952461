//! First-person and orbit camera pair
//!
//! Exactly one camera is active at a time. The active camera is both the one rendered and the
//! one mouse look is routed to, so switching can never leave zero or two cameras attached.

use bevy::prelude::*;

use crate::config::CameraTuning;
use crate::player::PlayerState;

/// Orbit pitch limits (0 = level behind the avatar, positive = above)
const ORBIT_PITCH_MIN: f32 = -0.2;
const ORBIT_PITCH_MAX: f32 = 1.3;
/// First-person pitch limit, just short of straight up/down
const LOOK_PITCH_LIMIT: f32 = 1.54;
/// Yaw difference below which the avatar is not re-rotated
const YAW_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CameraMode {
    #[default]
    FirstPerson,
    ThirdPerson,
}

impl CameraMode {
    pub fn other(self) -> Self {
        match self {
            CameraMode::FirstPerson => CameraMode::ThirdPerson,
            CameraMode::ThirdPerson => CameraMode::FirstPerson,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FirstPersonRig {
    pub yaw: f32,
    pub pitch: f32,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitRig {
    pub yaw: f32,
    pub pitch: f32,
    pub radius: f32,
    pub target: Vec3,
}

impl OrbitRig {
    pub fn eye(&self) -> Vec3 {
        orbit_position(self.target, self.yaw, self.pitch, self.radius)
    }

    /// Horizontal heading of the camera's view ray.
    pub fn view_yaw(&self) -> f32 {
        let d = self.target - self.eye();
        if d.x.abs() < f32::EPSILON && d.z.abs() < f32::EPSILON {
            return self.yaw;
        }
        (-d.x).atan2(-d.z)
    }
}

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct CameraController {
    active: CameraMode,
    pub first_person: FirstPersonRig,
    pub orbit: OrbitRig,
    pub eye_height: f32,
}

impl CameraController {
    pub fn new(tuning: &CameraTuning, player: &PlayerState) -> Self {
        let yaw = player.yaw();
        Self {
            active: CameraMode::FirstPerson,
            first_person: FirstPersonRig {
                yaw,
                pitch: 0.0,
                position: player.position + Vec3::Y * tuning.eye_height,
            },
            orbit: OrbitRig {
                yaw,
                pitch: tuning.orbit_pitch,
                radius: tuning.orbit_radius,
                target: player.position,
            },
            eye_height: tuning.eye_height,
        }
    }

    pub fn active(&self) -> CameraMode {
        self.active
    }

    /// The camera mouse look is routed to. Always the active one.
    pub fn attached(&self) -> CameraMode {
        self.active
    }

    pub fn is_active(&self, mode: CameraMode) -> bool {
        self.active == mode
    }

    /// Swap the active camera and the input attachment in one step.
    pub fn toggle(&mut self) -> CameraMode {
        self.active = self.active.other();
        self.active
    }

    /// Route a mouse delta to the attached camera.
    pub fn apply_look(&mut self, delta: Vec2, sensitivity: f32) {
        match self.active {
            CameraMode::FirstPerson => {
                let rig = &mut self.first_person;
                rig.yaw -= delta.x * sensitivity;
                rig.pitch = (rig.pitch - delta.y * sensitivity).clamp(-LOOK_PITCH_LIMIT, LOOK_PITCH_LIMIT);
            }
            CameraMode::ThirdPerson => {
                let rig = &mut self.orbit;
                rig.yaw -= delta.x * sensitivity;
                // Mouse down orbits up and over
                rig.pitch = (rig.pitch + delta.y * sensitivity).clamp(ORBIT_PITCH_MIN, ORBIT_PITCH_MAX);
            }
        }
    }

    /// Re-derive avatar facing from the active camera and move the cameras with it.
    pub fn reproject(&mut self, player: &mut PlayerState) {
        match self.active {
            CameraMode::FirstPerson => {
                let rig = &mut self.first_person;
                if yaw_delta(rig.yaw, player.yaw()).abs() > YAW_EPSILON {
                    player.face_yaw(rig.yaw);
                }
                rig.position = player.position + Vec3::Y * self.eye_height;
            }
            CameraMode::ThirdPerson => {
                let yaw = if player.is_moving {
                    self.orbit.view_yaw()
                } else {
                    player.yaw()
                };
                player.face_yaw(yaw);
                self.orbit.target = player.position;
            }
        }
    }

    pub fn first_person_transform(&self) -> Transform {
        Transform::from_translation(self.first_person.position).with_rotation(Quat::from_euler(
            EulerRot::YXZ,
            self.first_person.yaw,
            self.first_person.pitch,
            0.0,
        ))
    }

    pub fn orbit_transform(&self) -> Transform {
        Transform::from_translation(self.orbit.eye()).looking_at(self.orbit.target, Vec3::Y)
    }
}

/// Camera position orbiting around a pivot point.
///
/// - yaw rotates around Y (behind the pivot at yaw = 0 is +Z)
/// - pitch rotates up/down (0 = level, positive = above)
pub fn orbit_position(pivot: Vec3, yaw: f32, pitch: f32, distance: f32) -> Vec3 {
    let horizontal = distance * pitch.cos();
    let behind = Vec3::new(yaw.sin(), 0.0, yaw.cos());
    pivot + behind * horizontal + Vec3::Y * (distance * pitch.sin())
}

/// Smallest signed difference between two headings.
fn yaw_delta(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(std::f32::consts::TAU);
    if d > std::f32::consts::PI {
        d - std::f32::consts::TAU
    } else {
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn controller() -> (CameraController, PlayerState) {
        let player = PlayerState::at(Vec3::new(0.0, 10.0, 0.0));
        (CameraController::new(&CameraTuning::default(), &player), player)
    }

    #[test]
    fn test_starts_first_person() {
        let (camera, _) = controller();
        assert_eq!(camera.active(), CameraMode::FirstPerson);
        assert_eq!(camera.attached(), CameraMode::FirstPerson);
    }

    #[test]
    fn test_double_toggle_is_identity() {
        let (mut camera, _) = controller();
        let before = camera.clone();

        assert_eq!(camera.toggle(), CameraMode::ThirdPerson);
        assert!(camera.is_active(CameraMode::ThirdPerson));
        assert_eq!(camera.attached(), CameraMode::ThirdPerson);

        camera.toggle();
        assert_eq!(camera, before);
    }

    #[test]
    fn test_look_goes_to_attached_camera_only() {
        let (mut camera, _) = controller();
        camera.apply_look(Vec2::new(2.0, 0.0), 0.5);
        assert_eq!(camera.first_person.yaw, -1.0);
        assert_eq!(camera.orbit.yaw, 0.0);

        camera.toggle();
        camera.apply_look(Vec2::new(0.0, 1000.0), 0.01);
        assert_eq!(camera.orbit.pitch, ORBIT_PITCH_MAX);
        assert_eq!(camera.first_person.pitch, 0.0);
    }

    #[test]
    fn test_first_person_turns_avatar_and_follows_eye() {
        let (mut camera, mut player) = controller();
        camera.first_person.yaw = FRAC_PI_2;
        player.position = Vec3::new(5.0, 12.0, -3.0);

        camera.reproject(&mut player);

        assert!((player.yaw() - FRAC_PI_2).abs() < 1e-5);
        assert_eq!(camera.first_person.position, Vec3::new(5.0, 14.0, -3.0));
    }

    #[test]
    fn test_third_person_idle_keeps_facing() {
        let (mut camera, mut player) = controller();
        camera.toggle();
        player.face_yaw(0.7);
        camera.orbit.yaw = -1.2;
        player.position = Vec3::new(1.0, 2.0, 3.0);

        camera.reproject(&mut player);

        assert!((player.yaw() - 0.7).abs() < 1e-5);
        assert_eq!(camera.orbit.target, player.position);
    }

    #[test]
    fn test_third_person_moving_faces_view_direction() {
        let (mut camera, mut player) = controller();
        camera.toggle();
        camera.orbit.yaw = -1.2;
        player.is_moving = true;

        camera.reproject(&mut player);

        assert!((player.yaw() + 1.2).abs() < 1e-4);
    }

    #[test]
    fn test_orbit_sits_behind_target() {
        let eye = orbit_position(Vec3::ZERO, 0.0, 0.0, 20.0);
        assert!(eye.abs_diff_eq(Vec3::new(0.0, 0.0, 20.0), 1e-5));
    }

    #[test]
    fn test_yaw_delta_wraps() {
        assert!((yaw_delta(0.1, std::f32::consts::TAU - 0.1) - 0.2).abs() < 1e-5);
    }
}
