//! Session systems
//!
//! The staged setup pipeline (physics → terrain → structures → player), cursor management,
//! physics freezing for the in-game menu, and menu transitions.

use bevy::asset::RecursiveDependencyLoadState;
use bevy::prelude::*;
use bevy::window::{CursorGrabMode, CursorOptions, PrimaryWindow};
use bevy_rapier3d::prelude::*;
use shared::{
    AssetStatus, CameraController, Floor, GameTuning, SetupError, SetupPipeline, SetupStage, SurfaceRegistry,
    WorldBounds, WorldTerrain, GRAVITY_ON_LAND,
};

use crate::states::GameState;
use crate::structures::spawn_structures;
use crate::terrain::{spawn_chunk, LoadedChunks, TerrainMaterial};
use shared::terrain::ChunkCoord;

use super::particles::SnowEmitter;
use super::player::{
    clip_path, spawn_player, LocalPlayer, NeedsRigSetup, PlayerCharacterAssets, PlayerModelRoot, RigMissing,
    PLAYER_MODEL_PATH, RIG_ROOT_NAME,
};
use super::rendering::FOG_COLOR;
use super::world::{spawn_world, ClientWorldRoot};

/// Chunks around the spawn built before the avatar drops in
const SPAWN_CHUNK_RADIUS: i32 = 1;

// =============================================================================
// SETUP PIPELINE
// =============================================================================

/// Run condition: the pipeline is waiting on `stage`.
pub fn setup_stage_is(stage: SetupStage) -> impl Fn(Option<Res<SetupPipeline>>) -> bool + Clone {
    move |pipeline: Option<Res<SetupPipeline>>| pipeline.is_some_and(|p| p.current() == Some(stage))
}

/// Mark `stage` done, logging the handoff or the ordering error.
fn advance(pipeline: &mut SetupPipeline, stage: SetupStage) {
    match pipeline.complete(stage) {
        Ok(Some(next)) => info!("Setup: {} ready, starting {}", stage, next),
        Ok(None) => info!("Setup: {} ready, all stages complete", stage),
        Err(err) => error!("Setup aborted: {}", err),
    }
}

/// Fresh pipeline every time we leave the main menu.
pub fn begin_setup(mut commands: Commands) {
    info!("Setup: starting {}", SetupStage::Physics);
    commands.insert_resource(SetupPipeline::new());
}

/// Land gravity on, simulation running.
pub fn setup_physics_stage(
    mut pipeline: ResMut<SetupPipeline>,
    mut configs: Query<&mut RapierConfiguration>,
) {
    // The Rapier context is created by its plugin; wait for it
    let Ok(mut config) = configs.single_mut() else {
        return;
    };
    config.gravity = Vec3::new(0.0, GRAVITY_ON_LAND, 0.0);
    config.physics_pipeline_active = true;
    advance(&mut pipeline, SetupStage::Physics);
}

/// Height field, bounds, surfaces, lights, ice and the chunks under the spawn point.
pub fn setup_terrain_stage(
    mut commands: Commands,
    mut pipeline: ResMut<SetupPipeline>,
    tuning: Res<GameTuning>,
    material: Option<Res<TerrainMaterial>>,
    mut loaded_chunks: ResMut<LoadedChunks>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Some(material) = material else { return };

    let terrain = WorldTerrain::new(&tuning.world);
    let registry = SurfaceRegistry::new(&terrain, &tuning.world);
    let bounds = WorldBounds::new(&tuning.world);

    let root = spawn_world(&mut commands, &mut meshes, &mut materials, &tuning);

    let [spawn_x, spawn_z] = tuning.world.spawn;
    let center = ChunkCoord::from_world_pos(Vec3::new(spawn_x, 0.0, spawn_z));
    for coord in center
        .chunks_in_radius(SPAWN_CHUNK_RADIUS)
        .into_iter()
        .filter(|coord| coord.overlaps_world(tuning.world.world_size))
    {
        spawn_chunk(&mut commands, &mut meshes, &material, &terrain, root, coord);
        loaded_chunks.chunks.insert(coord);
    }

    commands.insert_resource(terrain);
    commands.insert_resource(registry);
    commands.insert_resource(bounds);
    advance(&mut pipeline, SetupStage::Terrain);
}

/// Dome, module and supply crate.
pub fn setup_structures_stage(
    mut commands: Commands,
    mut pipeline: ResMut<SetupPipeline>,
    registry: Option<Res<SurfaceRegistry>>,
    roots: Query<Entity, With<ClientWorldRoot>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // Terrain stage resources land at the next sync point
    let (Some(registry), Ok(root)) = (registry, roots.single()) else {
        return;
    };

    spawn_structures(&mut commands, &mut meshes, &mut materials, &registry, root);
    advance(&mut pipeline, SetupStage::Structures);
}

fn asset_status<A: Asset>(asset_server: &AssetServer, handle: &Handle<A>) -> AssetStatus {
    match asset_server.get_recursive_dependency_load_state(handle) {
        Some(RecursiveDependencyLoadState::Loaded) => AssetStatus::Loaded,
        Some(RecursiveDependencyLoadState::Failed(_)) => AssetStatus::Failed,
        _ => AssetStatus::Pending,
    }
}

/// Wait for the avatar model and its clips, drop the avatar in and frame the cameras on it,
/// then wait for [`setup_player_rig`](super::setup_player_rig) to wire the rig.
#[allow(clippy::too_many_arguments)]
pub fn setup_player_stage(
    mut commands: Commands,
    mut pipeline: ResMut<SetupPipeline>,
    tuning: Res<GameTuning>,
    assets: Option<Res<PlayerCharacterAssets>>,
    asset_server: Res<AssetServer>,
    terrain: Option<Res<WorldTerrain>>,
    registry: Option<Res<SurfaceRegistry>>,
    players: Query<(), With<LocalPlayer>>,
    models: Query<(Has<NeedsRigSetup>, Has<RigMissing>), With<PlayerModelRoot>>,
) {
    let (Some(assets), Some(terrain), Some(registry)) = (assets, terrain, registry) else {
        return;
    };

    if players.is_empty() {
        let statuses = std::iter::once((PLAYER_MODEL_PATH.to_string(), asset_status(&asset_server, &assets.scene)))
            .chain(
                assets
                    .clips
                    .iter()
                    .map(|(range, handle)| (clip_path(*range), asset_status(&asset_server, handle))),
            );
        if !pipeline.await_assets(SetupStage::Player, statuses) {
            return;
        }

        let floor = Floor::new(&terrain, &registry);
        let state = spawn_player(&mut commands, &assets, &tuning, &floor);
        commands.insert_resource(CameraController::new(&tuning.camera, &state));
        return;
    }

    let Ok((needs_rig, rig_missing)) = models.single() else {
        return;
    };
    if rig_missing {
        pipeline.fail(SetupError::MissingAsset {
            stage: SetupStage::Player,
            path: format!("{}#{}", PLAYER_MODEL_PATH, RIG_ROOT_NAME),
        });
    } else if !needs_rig {
        advance(&mut pipeline, SetupStage::Player);
    }
}

/// Start the simulation once every stage is done, or bail back to the menu.
pub fn finish_setup(pipeline: Option<Res<SetupPipeline>>, mut next_state: ResMut<NextState<GameState>>) {
    let Some(pipeline) = pipeline else { return };

    if pipeline.is_ready() {
        info!("Setup complete, entering the world");
        next_state.set(GameState::Playing);
    } else if let Some(err) = pipeline.error() {
        error!("Setup failed: {}", err);
        next_state.set(GameState::MainMenu);
    }
}

// =============================================================================
// PHYSICS
// =============================================================================

/// Stop stepping the simulation while the in-game menu is open
pub fn freeze_physics(mut configs: Query<&mut RapierConfiguration>) {
    for mut config in configs.iter_mut() {
        config.physics_pipeline_active = false;
    }
}

pub fn resume_physics(mut configs: Query<&mut RapierConfiguration>) {
    for mut config in configs.iter_mut() {
        config.physics_pipeline_active = true;
    }
}

// =============================================================================
// CURSOR
// =============================================================================

/// Grab cursor for mouse look when the game window is clicked
pub fn grab_cursor(
    windows: Query<Entity, With<PrimaryWindow>>,
    mut cursor_opts: Query<&mut CursorOptions>,
    mouse_button: Res<ButtonInput<MouseButton>>,
) {
    let Ok(window_entity) = windows.single() else {
        return;
    };

    if mouse_button.just_pressed(MouseButton::Left) {
        if let Ok(mut cursor) = cursor_opts.get_mut(window_entity) {
            cursor.grab_mode = CursorGrabMode::Locked;
            cursor.visible = false;
        }
    }
}

/// Hand the cursor back to the menus
pub fn release_cursor(windows: Query<Entity, With<PrimaryWindow>>, mut cursor_opts: Query<&mut CursorOptions>) {
    let Ok(window_entity) = windows.single() else {
        return;
    };
    if let Ok(mut cursor) = cursor_opts.get_mut(window_entity) {
        cursor.grab_mode = CursorGrabMode::None;
        cursor.visible = true;
    }
}

// =============================================================================
// MENU TRANSITIONS
// =============================================================================

/// Entering the main menu: tear the session down
pub fn enter_main_menu(
    mut commands: Commands,
    world_roots: Query<Entity, With<ClientWorldRoot>>,
    players: Query<Entity, With<LocalPlayer>>,
    snow: Query<Entity, With<SnowEmitter>>,
    mut loaded_chunks: ResMut<LoadedChunks>,
) {
    for entity in world_roots.iter().chain(players.iter()).chain(snow.iter()) {
        commands.entity(entity).despawn();
    }

    loaded_chunks.chunks.clear();
    commands.remove_resource::<CameraController>();
    commands.remove_resource::<WorldTerrain>();
    commands.remove_resource::<SurfaceRegistry>();
    commands.remove_resource::<WorldBounds>();
    commands.insert_resource(ClearColor(FOG_COLOR));
}
