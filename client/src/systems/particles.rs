//! Particle systems
//!
//! Snowfall in a box around the avatar. Flakes are children of one emitter that follows the
//! avatar horizontally, so they only ever move in local space.

use bevy::prelude::*;
use rand::Rng;
use shared::GameTuning;

use super::player::LocalPlayer;

// =============================================================================
// COMPONENTS & RESOURCES
// =============================================================================

/// Parent of every snowflake; tracks the avatar's x/z.
#[derive(Component)]
pub struct SnowEmitter {
    pub box_size: f32,
}

/// A single flake, recycled to the top of the box when it falls out of the bottom
#[derive(Component)]
pub struct SnowParticle {
    pub fall_speed: f32,
    pub drift: Vec2,
}

/// Pre-made assets for particles (avoid recreating each session)
#[derive(Resource)]
pub struct ParticleAssets {
    pub flake_mesh: Handle<Mesh>,
    pub flake_material: Handle<StandardMaterial>,
}

// =============================================================================
// SETUP
// =============================================================================

/// Create the flake mesh and material on startup
pub fn setup_particle_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let flake_mesh = meshes.add(Sphere::new(0.08).mesh().uv(6, 4));
    let flake_material = materials.add(StandardMaterial {
        base_color: Color::srgba(1.0, 1.0, 1.0, 0.9),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        ..default()
    });

    commands.insert_resource(ParticleAssets {
        flake_mesh,
        flake_material,
    });
}

// =============================================================================
// SPAWNING
// =============================================================================

/// Spawn the emitter and its flakes once per session.
pub fn spawn_snow(
    mut commands: Commands,
    tuning: Res<GameTuning>,
    assets: Option<Res<ParticleAssets>>,
    existing: Query<(), With<SnowEmitter>>,
    players: Query<&Transform, With<LocalPlayer>>,
) {
    if !existing.is_empty() {
        return;
    }
    let Some(assets) = assets else { return };

    let box_size = tuning.world.snow_box_size;
    let origin = players.single().map(|t| t.translation).unwrap_or(Vec3::ZERO);
    let half = box_size / 2.0;
    let mut rng = rand::thread_rng();

    let emitter = commands
        .spawn((
            SnowEmitter { box_size },
            Name::new("SnowEmitter"),
            Transform::from_translation(origin),
            Visibility::default(),
        ))
        .id();

    for _ in 0..tuning.world.snow_count {
        let offset = Vec3::new(
            rng.gen_range(-half..half),
            rng.gen_range(-half..half),
            rng.gen_range(-half..half),
        );
        let flake = commands
            .spawn((
                SnowParticle {
                    fall_speed: rng.gen_range(2.0..5.0),
                    drift: Vec2::new(rng.gen_range(-0.6..0.6), rng.gen_range(-0.6..0.6)),
                },
                Mesh3d(assets.flake_mesh.clone()),
                MeshMaterial3d(assets.flake_material.clone()),
                Transform::from_translation(offset),
            ))
            .id();
        commands.entity(emitter).add_child(flake);
    }

    info!("Snowfall started ({} flakes, {} m box)", tuning.world.snow_count, box_size);
}

// =============================================================================
// UPDATE
// =============================================================================

/// Keep the emitter over the avatar. Only x/z follow; the box stays level with the avatar's
/// spawn height so jumping doesn't drag the snow along.
pub fn follow_player_with_snow(
    players: Query<&Transform, (With<LocalPlayer>, Without<SnowEmitter>)>,
    mut emitters: Query<&mut Transform, With<SnowEmitter>>,
) {
    let Ok(player) = players.single() else {
        return;
    };
    for mut emitter in emitters.iter_mut() {
        emitter.translation.x = player.translation.x;
        emitter.translation.z = player.translation.z;
    }
}

/// Let flakes fall and wrap them back to the top of the box.
pub fn update_snow_particles(
    time: Res<Time>,
    emitters: Query<(&SnowEmitter, &Children)>,
    mut flakes: Query<(&SnowParticle, &mut Transform)>,
) {
    let dt = time.delta_secs();
    let mut rng = rand::thread_rng();

    for (emitter, children) in emitters.iter() {
        let half = emitter.box_size / 2.0;
        for child in children.iter() {
            let Ok((flake, mut transform)) = flakes.get_mut(child) else {
                continue;
            };
            transform.translation.y -= flake.fall_speed * dt;
            transform.translation.x += flake.drift.x * dt;
            transform.translation.z += flake.drift.y * dt;

            if transform.translation.y < -half {
                transform.translation = Vec3::new(
                    rng.gen_range(-half..half),
                    half,
                    rng.gen_range(-half..half),
                );
            }
        }
    }
}
