//! Observable player state
//!
//! In Bevy: +X is right, +Y is up, -Z is forward.

use bevy::prelude::*;

use crate::surface::{InteractableLabel, SurfaceLabel};

/// Avatar state owned by the movement reconciler and read by every reactor.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub position: Vec3,
    pub rotation: Quat,
    /// A movement intent fired this tick.
    pub is_moving: bool,
    /// Higher than the airborne threshold above the floor.
    pub is_falling: bool,
    pub walking_on: SurfaceLabel,
    pub interacting_with: Option<InteractableLabel>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            is_moving: false,
            is_falling: false,
            walking_on: SurfaceLabel::Ground,
            interacting_with: None,
        }
    }
}

impl PlayerState {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Heading around +Y.
    pub fn yaw(&self) -> f32 {
        self.rotation.to_euler(EulerRot::YXZ).0
    }

    pub fn face_yaw(&mut self, yaw: f32) {
        self.rotation = Quat::from_rotation_y(yaw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_follows_yaw() {
        let mut player = PlayerState::default();
        assert!(player.forward().abs_diff_eq(Vec3::NEG_Z, 1e-6));

        player.face_yaw(std::f32::consts::FRAC_PI_2);
        // Quarter turn left: forward points along -X
        assert!(player.forward().abs_diff_eq(Vec3::NEG_X, 1e-5));
        assert!(player.right().abs_diff_eq(Vec3::NEG_Z, 1e-5));
        assert!(player.up().abs_diff_eq(Vec3::Y, 1e-6));
        assert!((player.yaw() - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }
}
