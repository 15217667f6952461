//! First-person and third-person camera system
//!
//! Both cameras always exist. [`CameraController`] decides which one renders and which one
//! mouse look drives; these systems mirror that decision onto the Bevy cameras.

use bevy::prelude::*;
use shared::{CameraController, CameraMode, MovementReconciler};

use crate::systems::LocalPlayer;

/// Eye camera that rides along with the avatar.
#[derive(Component)]
pub struct FirstPersonCamera;

/// Camera orbiting the avatar at a fixed radius.
#[derive(Component)]
pub struct OrbitCamera;

/// Re-derive avatar facing from the active camera after movement has been reconciled.
pub fn reproject_cameras(
    controller: Option<ResMut<CameraController>>,
    mut player_query: Query<(&mut MovementReconciler, &mut Transform), With<LocalPlayer>>,
) {
    let Some(mut controller) = controller else {
        return;
    };
    let Ok((mut reconciler, mut transform)) = player_query.single_mut() else {
        return;
    };

    controller.reproject(&mut reconciler.state);
    transform.rotation = reconciler.state.rotation;
}

/// Render only through the active camera.
pub fn sync_active_camera(
    controller: Option<Res<CameraController>>,
    mut cameras: Query<(&mut Camera, Has<FirstPersonCamera>), Or<(With<FirstPersonCamera>, With<OrbitCamera>)>>,
) {
    let Some(controller) = controller else {
        return;
    };
    if !controller.is_changed() {
        return;
    }

    for (mut camera, is_first_person) in cameras.iter_mut() {
        let mode = if is_first_person {
            CameraMode::FirstPerson
        } else {
            CameraMode::ThirdPerson
        };
        let active = controller.is_active(mode);
        if camera.is_active != active {
            camera.is_active = active;
        }
    }
}

/// Place both cameras from the controller rigs.
pub fn update_camera(
    controller: Option<Res<CameraController>>,
    mut first_person: Query<&mut Transform, (With<FirstPersonCamera>, Without<OrbitCamera>)>,
    mut orbit: Query<&mut Transform, (With<OrbitCamera>, Without<FirstPersonCamera>)>,
) {
    let Some(controller) = controller else {
        return;
    };

    if let Ok(mut transform) = first_person.single_mut() {
        *transform = controller.first_person_transform();
    }
    if let Ok(mut transform) = orbit.single_mut() {
        *transform = controller.orbit_transform();
    }
}

/// Back to the first-person camera when leaving gameplay.
pub fn reset_cameras(
    mut cameras: Query<(&mut Camera, Has<FirstPersonCamera>), Or<(With<FirstPersonCamera>, With<OrbitCamera>)>>,
) {
    for (mut camera, is_first_person) in cameras.iter_mut() {
        camera.is_active = is_first_person;
    }
}
