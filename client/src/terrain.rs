//! Client-side terrain rendering and collision
//!
//! Chunks stream in around the avatar. Each chunk carries a snow mesh and a Rapier heightfield
//! built from the same height samples, so what you see is what you stand on.

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology, VertexAttributeValues};
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use std::collections::HashSet;

use shared::terrain::{ChunkCoord, CHUNK_RESOLUTION, CHUNK_SIZE};
use shared::{GameTuning, SurfaceLabel, WorldTerrain};

use crate::states::GameState;
use crate::systems::{ClientWorldRoot, LocalPlayer};

/// Chunks spawned per frame while streaming
const MAX_CHUNKS_PER_FRAME: usize = 2;

/// Marker component for terrain chunk entities
#[derive(Component)]
pub struct TerrainChunk {
    pub coord: ChunkCoord,
}

/// Resource tracking which chunks are currently loaded
#[derive(Resource, Default)]
pub struct LoadedChunks {
    pub chunks: HashSet<ChunkCoord>,
}

/// Shared snow material for every chunk
#[derive(Resource)]
pub struct TerrainMaterial(pub Handle<StandardMaterial>);

/// Contact friction of a labelled surface's colliders.
pub fn surface_friction(surface: SurfaceLabel) -> Friction {
    Friction::coefficient(surface.info().friction)
}

/// Plugin for terrain rendering
pub struct TerrainPlugin;

impl Plugin for TerrainPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LoadedChunks>();
        app.add_systems(Startup, setup_terrain_material);
        app.add_systems(
            Update,
            (update_terrain_chunks, spawn_terrain_chunks)
                .chain()
                .run_if(in_state(GameState::Playing)),
        );
    }
}

fn setup_terrain_material(mut commands: Commands, mut materials: ResMut<Assets<StandardMaterial>>) {
    let material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        perceptual_roughness: 0.85,
        reflectance: 0.3,
        ..default()
    });
    commands.insert_resource(TerrainMaterial(material));
}

/// Chunks within view distance of `center` that lie inside the world.
pub fn desired_chunks(center: Vec3, tuning: &GameTuning) -> HashSet<ChunkCoord> {
    ChunkCoord::from_world_pos(center)
        .chunks_in_radius(tuning.world.view_distance_chunks)
        .into_iter()
        .filter(|coord| coord.overlaps_world(tuning.world.world_size))
        .collect()
}

/// Build the mesh + heightfield collider for one chunk, parented to the world root.
pub fn spawn_chunk(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    material: &TerrainMaterial,
    terrain: &WorldTerrain,
    world_root: Entity,
    coord: ChunkCoord,
) {
    let mesh_data = terrain.generator.generate_chunk_vertices(coord);

    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
    mesh.insert_attribute(
        Mesh::ATTRIBUTE_POSITION,
        VertexAttributeValues::Float32x3(mesh_data.positions),
    );
    mesh.insert_attribute(
        Mesh::ATTRIBUTE_NORMAL,
        VertexAttributeValues::Float32x3(mesh_data.normals),
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, VertexAttributeValues::Float32x2(mesh_data.uvs));
    // Vertex colors tint the snow in the hollows
    mesh.insert_attribute(
        Mesh::ATTRIBUTE_COLOR,
        VertexAttributeValues::Float32x4(mesh_data.colors),
    );
    mesh.insert_indices(Indices::U32(mesh_data.indices));

    let heights = terrain.generator.chunk_heightfield(coord);
    // Rapier heightfields are centred on their transform
    let collider = commands
        .spawn((
            Collider::heightfield(
                heights,
                CHUNK_RESOLUTION,
                CHUNK_RESOLUTION,
                Vec3::new(CHUNK_SIZE, 1.0, CHUNK_SIZE),
            ),
            surface_friction(SurfaceLabel::Ground),
            Restitution::coefficient(0.0),
            Transform::from_xyz(CHUNK_SIZE / 2.0, 0.0, CHUNK_SIZE / 2.0),
        ))
        .id();

    let chunk = commands
        .spawn((
            Mesh3d(meshes.add(mesh)),
            MeshMaterial3d(material.0.clone()),
            Transform::from_translation(coord.world_pos()),
            TerrainChunk { coord },
        ))
        .id();

    commands.entity(chunk).add_child(collider);
    commands.entity(world_root).add_child(chunk);
}

/// Determine which chunks should be unloaded based on player position
fn update_terrain_chunks(
    tuning: Res<GameTuning>,
    player_query: Query<&Transform, With<LocalPlayer>>,
    mut loaded_chunks: ResMut<LoadedChunks>,
    chunk_query: Query<(Entity, &TerrainChunk)>,
    mut commands: Commands,
) {
    let Ok(player) = player_query.single() else {
        return;
    };

    let desired = desired_chunks(player.translation, &tuning);

    for (entity, chunk) in chunk_query.iter() {
        if !desired.contains(&chunk.coord) {
            commands.entity(entity).despawn();
            loaded_chunks.chunks.remove(&chunk.coord);
        }
    }
}

/// Spawn terrain chunks that should be loaded but aren't yet
fn spawn_terrain_chunks(
    tuning: Res<GameTuning>,
    player_query: Query<&Transform, With<LocalPlayer>>,
    mut loaded_chunks: ResMut<LoadedChunks>,
    terrain: Option<Res<WorldTerrain>>,
    material: Option<Res<TerrainMaterial>>,
    mut meshes: ResMut<Assets<Mesh>>,
    world_root_query: Query<Entity, With<ClientWorldRoot>>,
    mut commands: Commands,
) {
    let (Some(terrain), Some(material)) = (terrain, material) else {
        return;
    };
    let Ok(player) = player_query.single() else {
        return;
    };
    let Ok(world_root) = world_root_query.single() else {
        return;
    };

    let missing: Vec<ChunkCoord> = desired_chunks(player.translation, &tuning)
        .into_iter()
        .filter(|coord| !loaded_chunks.chunks.contains(coord))
        .take(MAX_CHUNKS_PER_FRAME)
        .collect();

    for coord in missing {
        spawn_chunk(&mut commands, &mut meshes, &material, &terrain, world_root, coord);
        loaded_chunks.chunks.insert(coord);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desired_chunks_full_square_in_the_middle() {
        let tuning = GameTuning::default();
        let side = (2 * tuning.world.view_distance_chunks + 1) as usize;
        assert_eq!(desired_chunks(Vec3::ZERO, &tuning).len(), side * side);
    }

    #[test]
    fn test_surface_friction_follows_surface_table() {
        use shared::StructureKind;

        assert_eq!(surface_friction(SurfaceLabel::Ground).coefficient, 1.0);
        assert_eq!(surface_friction(SurfaceLabel::Ice).coefficient, 1.0);
        assert_eq!(
            surface_friction(SurfaceLabel::Structure(StructureKind::ModuleLarge)).coefficient,
            0.6
        );
    }

    #[test]
    fn test_desired_chunks_clipped_at_world_edge() {
        let tuning = GameTuning::default();
        let corner = Vec3::new(2490.0, 0.0, 2490.0);
        let chunks = desired_chunks(corner, &tuning);

        // Chunks 30..=39 on each axis start inside the 5000 world
        assert_eq!(chunks.len(), 100);
        assert!(chunks.iter().all(|c| c.overlaps_world(tuning.world.world_size)));
    }
}
