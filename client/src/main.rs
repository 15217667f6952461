//! ColdEscape client - a snowy first/third-person exploration game
//!
//! Wires the shared movement, camera and reactor logic to Bevy rendering, Rapier physics,
//! audio, animation and UI.

mod audio;
mod camera;
mod input;
mod states;
mod structures;
mod systems;
mod terrain;
mod ui;

use bevy::asset::AssetPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::window::WindowResolution;
use bevy_rapier3d::prelude::*;
use shared::{GameTuning, InputSnapshot, KeyBindings, MovementEvent, SetupStage, TUNING_PATH};
use states::GameState;
use std::path::Path;

/// Get the asset path - for bundled macOS apps, use path relative to executable
fn get_asset_path() -> String {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let bundled_assets = exe_dir.join("assets");
            if bundled_assets.exists() {
                return bundled_assets.to_string_lossy().to_string();
            }
        }
    }
    // `cargo run` from the workspace root: the assets live next to this crate's manifest
    if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
        let dev_assets = Path::new(&manifest_dir).join("assets");
        if dev_assets.exists() {
            return dev_assets.to_string_lossy().to_string();
        }
    }
    // Fall back to default "assets" folder
    "assets".to_string()
}

/// Tunables from `assets/config/tuning.ron`, or the built-in defaults.
fn load_tuning(asset_path: &str) -> GameTuning {
    let path = Path::new(asset_path).join(TUNING_PATH);
    match GameTuning::load(&path) {
        Ok(tuning) => {
            info!("Loaded tuning from {:?}", path);
            tuning
        }
        Err(err) => {
            warn!("{}; using default tuning", err);
            GameTuning::default()
        }
    }
}

fn main() {
    let asset_path = get_asset_path();

    let mut app = App::new();

    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "ColdEscape".to_string(),
                    resolution: WindowResolution::new(1280, 720),
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                file_path: asset_path.clone(),
                ..default()
            })
            .set(LogPlugin {
                filter: "wgpu=error,naga=warn,cold_escape=info,shared=info".to_string(),
                ..default()
            }),
    );

    // Logging is up once the plugins are added
    app.insert_resource(load_tuning(&asset_path));

    app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());

    // Game state machine
    app.init_state::<GameState>();

    app.add_message::<MovementEvent>();
    app.add_message::<systems::StopMovements>();

    app.init_resource::<InputSnapshot>();
    app.init_resource::<KeyBindings>();
    app.init_resource::<input::CurrentCommand>();

    app.add_plugins(terrain::TerrainPlugin);
    app.add_plugins(audio::GameAudioPlugin);
    app.add_plugins(ui::MainMenuPlugin);
    app.add_plugins(ui::PauseMenuPlugin);

    // Setup systems (run once at startup - rendering and asset handles only)
    app.add_systems(
        Startup,
        (
            systems::setup_rendering,
            systems::setup_particle_assets,
            systems::setup_player_character_assets,
        ),
    );

    // Tear the session down and release the cursor whenever we land on the menu
    app.add_systems(
        OnEnter(GameState::MainMenu),
        (systems::enter_main_menu, systems::release_cursor, camera::reset_cameras),
    );

    // Setup pipeline: each stage runs only while the pipeline waits on it
    app.add_systems(OnEnter(GameState::Loading), systems::begin_setup);
    app.add_systems(
        Update,
        (
            systems::setup_physics_stage.run_if(systems::setup_stage_is(SetupStage::Physics)),
            systems::setup_terrain_stage.run_if(systems::setup_stage_is(SetupStage::Terrain)),
            systems::setup_structures_stage.run_if(systems::setup_stage_is(SetupStage::Structures)),
            systems::setup_player_stage.run_if(systems::setup_stage_is(SetupStage::Player)),
            systems::setup_player_rig.run_if(systems::setup_stage_is(SetupStage::Player)),
            systems::finish_setup,
        )
            .chain()
            .run_if(in_state(GameState::Loading)),
    );

    app.add_systems(OnEnter(GameState::Playing), systems::spawn_snow);

    // Per-tick chain. ORDER MATTERS: movement -> camera -> animation/sound reactions.
    app.add_systems(
        Update,
        (
            input::handle_keyboard_input,
            input::handle_camera_toggle,
            input::handle_mouse_input,
            systems::reconcile_player_movement,
            camera::reproject_cameras,
            camera::sync_active_camera,
            camera::update_camera,
            systems::update_player_animation,
            audio::collect_finished_sounds,
            audio::play_movement_sounds,
            systems::follow_player_with_snow,
        )
            .chain()
            .run_if(in_state(GameState::Playing)),
    );

    app.add_systems(
        Update,
        (
            systems::update_local_player_visibility,
            systems::update_snow_particles,
            systems::grab_cursor,
            input::handle_menu_key,
        )
            .run_if(in_state(GameState::Playing)),
    );

    // Containment sees the pose Rapier just wrote back
    app.add_systems(
        PostUpdate,
        systems::contain_player
            .after(PhysicsSet::Writeback)
            .run_if(in_state(GameState::Playing)),
    );

    info!("Starting ColdEscape");
    app.run();
}
