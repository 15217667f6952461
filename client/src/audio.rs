//! Audio system for game sounds
//!
//! Footsteps and landings chosen by the movement sound reactor, plus the wind loop.

use bevy::asset::RecursiveDependencyLoadState;
use bevy::audio::Volume;
use bevy::prelude::*;
use std::collections::HashMap;

use shared::{MovementEvent, MovementReconciler, MovementSoundReactor, SoundId, SoundRole, SoundSink};

use crate::states::GameState;
use crate::systems::{LocalPlayer, StopMovements};

const WIND_PATH: &str = "audio/ambient/wind.ogg";
const WIND_VOLUME: f32 = 0.1;

/// Resource holding all loaded audio assets
#[derive(Resource)]
pub struct GameAudio {
    pub movement: HashMap<SoundId, Handle<AudioSource>>,
    pub wind: Handle<AudioSource>,
}

/// Marker for the wind loop
#[derive(Component)]
pub struct AmbientSound;

/// A footstep or landing clip in flight.
#[derive(Component)]
pub struct MovementSound {
    pub id: SoundId,
    pub role: SoundRole,
}

/// Track audio state
#[derive(Resource, Default)]
pub struct AudioState {
    pub assets_ready: bool,
    pub reported_failure: bool,
}

/// Footstep latch shared by the movement sound systems.
#[derive(Resource, Default)]
pub struct MovementSounds(pub MovementSoundReactor);

/// Load all audio assets on startup
pub fn setup_audio(mut commands: Commands, asset_server: Res<AssetServer>) {
    info!("Audio system: Loading audio assets...");

    let movement = SoundId::ALL
        .into_iter()
        .map(|id| (id, asset_server.load(id.asset_path())))
        .collect();
    let wind = asset_server.load(WIND_PATH);

    commands.insert_resource(GameAudio { movement, wind });
}

/// Check if audio assets are loaded. Missing clips are reported once; the game runs silent.
pub fn check_audio_assets_loaded(
    audio: Option<Res<GameAudio>>,
    mut audio_state: ResMut<AudioState>,
    asset_server: Res<AssetServer>,
) {
    if audio_state.assets_ready || audio_state.reported_failure {
        return;
    }

    let Some(audio) = audio else { return };

    let mut all_loaded = true;
    let handles = audio
        .movement
        .iter()
        .map(|(id, handle)| (id.asset_path(), handle))
        .chain(std::iter::once((WIND_PATH, &audio.wind)));

    for (path, handle) in handles {
        match asset_server.get_recursive_dependency_load_state(handle) {
            Some(RecursiveDependencyLoadState::Loaded) => {}
            Some(RecursiveDependencyLoadState::Failed(_)) => {
                error!("Failed to load {}!", path);
                audio_state.reported_failure = true;
                all_loaded = false;
            }
            _ => all_loaded = false,
        }
    }

    if all_loaded {
        info!("Audio assets loaded successfully!");
        audio_state.assets_ready = true;
    }
}

/// Start the wind loop once per session.
pub fn spawn_ambient_sound(
    mut commands: Commands,
    audio: Option<Res<GameAudio>>,
    existing: Query<Entity, With<AmbientSound>>,
) {
    if !existing.is_empty() {
        return;
    }
    let Some(audio) = audio else { return };

    commands.spawn((
        AmbientSound,
        AudioPlayer::new(audio.wind.clone()),
        PlaybackSettings::LOOP.with_volume(Volume::Linear(WIND_VOLUME)),
    ));
}

// =============================================================================
// MOVEMENT SOUNDS
// =============================================================================

/// Plays clips as one-shot entities and stops them by despawning.
struct CommandSoundSink<'a, 'w, 's> {
    commands: &'a mut Commands<'w, 's>,
    audio: &'a GameAudio,
    in_flight: &'a [(Entity, SoundId)],
}

impl SoundSink for CommandSoundSink<'_, '_, '_> {
    fn play(&mut self, id: SoundId, role: SoundRole) {
        let Some(handle) = self.audio.movement.get(&id) else {
            return;
        };
        self.commands.spawn((
            MovementSound { id, role },
            AudioPlayer::new(handle.clone()),
            PlaybackSettings::REMOVE,
        ));
    }

    fn stop(&mut self, id: SoundId) {
        for (entity, _) in self.in_flight.iter().filter(|(_, playing)| *playing == id) {
            self.commands.entity(*entity).despawn();
        }
    }
}

/// Clips whose audio components were removed have finished; a finished footstep releases the latch.
pub fn collect_finished_sounds(
    mut commands: Commands,
    mut sounds: ResMut<MovementSounds>,
    finished: Query<(Entity, &MovementSound), Without<AudioPlayer>>,
) {
    for (entity, sound) in finished.iter() {
        sounds.0.on_sound_ended(sound.id, sound.role);
        commands.entity(entity).despawn();
    }
}

/// React to movement messages with footsteps and landing sounds.
pub fn play_movement_sounds(
    mut commands: Commands,
    audio: Option<Res<GameAudio>>,
    mut sounds: ResMut<MovementSounds>,
    mut movement_events: MessageReader<MovementEvent>,
    mut stop_events: MessageReader<StopMovements>,
    players: Query<&MovementReconciler, With<LocalPlayer>>,
    in_flight: Query<(Entity, &MovementSound), With<AudioPlayer>>,
) {
    let events: Vec<MovementEvent> = movement_events.read().copied().collect();
    let stop_requested = stop_events.read().count() > 0;

    let Some(audio) = audio else { return };
    let Ok(reconciler) = players.single() else {
        return;
    };

    let in_flight: Vec<(Entity, SoundId)> = in_flight.iter().map(|(e, s)| (e, s.id)).collect();
    let mut sink = CommandSoundSink {
        commands: &mut commands,
        audio: &*audio,
        in_flight: &in_flight,
    };

    if stop_requested {
        sounds.0.stop_all(&mut sink);
    }

    for event in events {
        match event {
            MovementEvent::Moving { .. } => {
                sounds.0.on_moving(&reconciler.state, &mut sink);
            }
            MovementEvent::TouchDown => {
                let id = sounds.0.on_touch_down(&reconciler.state, &mut sink);
                debug!("Landing sound {:?}", id);
            }
        }
    }
}

/// Stop footsteps and landings (menu opened or session ended).
pub fn stop_movement_sounds(
    mut commands: Commands,
    mut sounds: ResMut<MovementSounds>,
    in_flight: Query<Entity, With<MovementSound>>,
) {
    for entity in in_flight.iter() {
        commands.entity(entity).despawn();
    }
    sounds.0 = MovementSoundReactor::new();
}

// =============================================================================
// SUSPEND / RESUME
// =============================================================================

/// Suspend every playing sink while the in-game menu is open.
pub fn suspend_audio(sinks: Query<&AudioSink>) {
    for sink in sinks.iter() {
        if !sink.is_paused() {
            sink.pause();
        }
    }
}

pub fn resume_audio(sinks: Query<&AudioSink>) {
    for sink in sinks.iter() {
        if sink.is_paused() {
            sink.play();
        }
    }
}

/// Stop ambient sounds when leaving the session
pub fn stop_ambient_sounds(mut commands: Commands, ambient_sounds: Query<Entity, With<AmbientSound>>) {
    for entity in ambient_sounds.iter() {
        commands.entity(entity).despawn();
    }
}

/// Audio plugin for easy integration
pub struct GameAudioPlugin;

impl Plugin for GameAudioPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AudioState>();
        app.init_resource::<MovementSounds>();
        app.add_systems(Startup, setup_audio);
        app.add_systems(OnEnter(GameState::Playing), spawn_ambient_sound);
        app.add_systems(OnEnter(GameState::Paused), (stop_movement_sounds, suspend_audio).chain());
        app.add_systems(OnExit(GameState::Paused), resume_audio);
        app.add_systems(
            OnEnter(GameState::MainMenu),
            (stop_ambient_sounds, stop_movement_sounds),
        );
        app.add_systems(
            Update,
            check_audio_assets_loaded.run_if(in_state(GameState::Loading).or(in_state(GameState::Playing))),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;
    use shared::{PlayerState, StructureKind, SurfaceLabel};

    struct SilentSink;

    impl SoundSink for SilentSink {
        fn play(&mut self, _id: SoundId, _role: SoundRole) {}
        fn stop(&mut self, _id: SoundId) {}
    }

    fn latched_on_dome() -> MovementSoundReactor {
        let mut player = PlayerState::default();
        player.is_moving = true;
        player.walking_on = SurfaceLabel::Structure(StructureKind::Dome);
        let mut reactor = MovementSoundReactor::new();
        reactor.on_moving(&player, &mut SilentSink);
        reactor
    }

    #[test]
    fn test_finished_landing_keeps_footstep_latch() {
        let mut world = World::new();
        world.insert_resource(MovementSounds(latched_on_dome()));
        world.spawn(MovementSound {
            id: SoundId::WalkingOnTiles,
            role: SoundRole::Landing,
        });

        world.run_system_once(collect_finished_sounds).unwrap();

        assert_eq!(world.resource::<MovementSounds>().0.playing(), Some(SoundId::WalkingOnTiles));
        assert_eq!(world.query::<&MovementSound>().iter(&world).count(), 0);
    }

    #[test]
    fn test_finished_footstep_releases_latch() {
        let mut world = World::new();
        world.insert_resource(MovementSounds(latched_on_dome()));
        world.spawn(MovementSound {
            id: SoundId::WalkingOnTiles,
            role: SoundRole::Footstep,
        });

        world.run_system_once(collect_finished_sounds).unwrap();

        assert_eq!(world.resource::<MovementSounds>().0.playing(), None);
    }
}
