//! Rendering systems
//!
//! Camera setup, fog and the cold-weather light levels.

use bevy::camera::{ClearColorConfig, Exposure};
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::light::DirectionalLightShadowMap;
use bevy::pbr::{DistanceFog, FogFalloff};
use bevy::prelude::*;
use bevy::render::view::Msaa;
use bevy::ui::IsDefaultUiCamera;
use shared::GameTuning;

use crate::camera::{FirstPersonCamera, OrbitCamera};

/// Haze color of the snowfield, also used as the sky fallback.
pub const FOG_COLOR: Color = Color::srgb(0.792, 0.886, 0.965);

// =============================================================================
// SETUP
// =============================================================================

/// One-time rendering setup: both gameplay cameras and the UI overlay camera.
pub fn setup_rendering(mut commands: Commands, tuning: Res<GameTuning>) {
    commands.insert_resource(DirectionalLightShadowMap { size: 1024 });
    commands.insert_resource(ClearColor(FOG_COLOR));

    commands.spawn((
        FirstPersonCamera,
        Camera3d::default(),
        Camera {
            is_active: true,
            ..default()
        },
        Msaa::Off,
        Tonemapping::AcesFitted,
        Exposure::SUNLIGHT,
        snow_fog(tuning.world.fog_end),
        Transform::from_xyz(0.0, 10.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        OrbitCamera,
        Camera3d::default(),
        Camera {
            is_active: false,
            ..default()
        },
        Msaa::Off,
        Tonemapping::AcesFitted,
        Exposure::SUNLIGHT,
        snow_fog(tuning.world.fog_end),
        Transform::from_xyz(0.0, 10.0, 20.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // Menus draw on top of whichever 3D camera is active
    commands.spawn((
        Camera2d,
        Camera {
            order: 1,
            clear_color: ClearColorConfig::None,
            ..default()
        },
        IsDefaultUiCamera,
    ));

    info!("Client rendering initialized (fog out to {})", tuning.world.fog_end);
}

/// Linear fog from the eye to `end`.
fn snow_fog(end: f32) -> DistanceFog {
    DistanceFog {
        color: FOG_COLOR,
        falloff: FogFalloff::Linear { start: 0.0, end },
        ..default()
    }
}
