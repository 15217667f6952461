//! World systems
//!
//! Static environment: lights and the frozen lake.

use bevy::light::{light_consts::lux, CascadeShadowConfigBuilder};
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use shared::{GameTuning, SurfaceLabel};

use super::rendering::FOG_COLOR;
use crate::terrain::surface_friction;

/// Thickness of the ice slab collider
const ICE_THICKNESS: f32 = 0.5;

// =============================================================================
// COMPONENTS
// =============================================================================

/// Root entity for all client-side world visuals
#[derive(Component)]
pub struct ClientWorldRoot;

/// The frozen lake surface
#[derive(Component)]
pub struct IceSheet;

// =============================================================================
// SPAWNING
// =============================================================================

/// Spawn the world root, lights and ice. Returns the root so terrain and structures can be
/// parented to it.
pub fn spawn_world(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    tuning: &GameTuning,
) -> Entity {
    let root = commands
        // Parent of terrain chunks / structures / lights; needs a full spatial bundle
        .spawn((
            ClientWorldRoot,
            Transform::default(),
            Visibility::default(),
        ))
        .id();

    // Low winter sun
    let sun = commands
        .spawn((
            DirectionalLight {
                illuminance: lux::OVERCAST_DAY,
                shadows_enabled: true,
                color: Color::srgb(0.92, 0.95, 1.0),
                ..default()
            },
            CascadeShadowConfigBuilder {
                num_cascades: 3,
                maximum_distance: 200.0,
                first_cascade_far_bound: 20.0,
                ..default()
            }
            .build(),
            Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -0.6, 0.4, 0.0)),
        ))
        .id();
    commands.entity(root).add_child(sun);

    // Snow bounces a lot of light back up
    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.85, 0.9, 1.0),
        brightness: 400.0,
        affects_lightmapped_meshes: true,
    });
    commands.insert_resource(ClearColor(FOG_COLOR));

    let size = tuning.world.world_size;
    let ice_level = tuning.world.ice_level;
    let ice = commands
        .spawn((
            IceSheet,
            Mesh3d(meshes.add(Plane3d::default().mesh().size(size, size))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgb(0.70, 0.85, 0.95),
                perceptual_roughness: 0.1,
                reflectance: 0.8,
                ..default()
            })),
            Transform::from_xyz(0.0, ice_level, 0.0),
        ))
        .id();
    let ice_collider = commands
        .spawn((
            Collider::cuboid(size / 2.0, ICE_THICKNESS / 2.0, size / 2.0),
            surface_friction(SurfaceLabel::Ice),
            Restitution::coefficient(0.0),
            Transform::from_xyz(0.0, -ICE_THICKNESS / 2.0, 0.0),
        ))
        .id();
    commands.entity(ice).add_child(ice_collider);
    commands.entity(root).add_child(ice);

    info!("Spawned world root, lights and ice sheet ({0} x {0} at y={1})", size, ice_level);
    root
}
