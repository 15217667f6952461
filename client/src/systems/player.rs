//! Player character systems
//!
//! Spawns the avatar, bridges the Rapier body to the movement reconciler, and drives the
//! rig animations from movement messages.

use bevy::animation::graph::{AnimationGraph, AnimationGraphHandle, AnimationNodeIndex};
use bevy::animation::{AnimationClip, AnimationPlayer, AnimationTarget, AnimationTargetId};
use bevy::gltf::GltfAssetLabel;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use shared::{
    AnimationLatch, AnimationRange, AnimationReactor, AnimationSink, CameraController, CameraMode, Floor,
    FloorQuery, GameTuning, InteractableLabel, MovementEvent, MovementReconciler, PhysicsBody, PlayerState,
    SurfaceLabel, SurfaceRegistry, WorldBounds, WorldTerrain,
};
use std::collections::HashMap;

use crate::input::CurrentCommand;

/// Avatar model with its baked animation ranges.
pub const PLAYER_MODEL_PATH: &str = "models/low_poly_male.glb";

/// Node the rig animations are authored against.
pub const RIG_ROOT_NAME: &str = "Armature";

const PLAYER_MASS: f32 = 60.0;
const CAPSULE_RADIUS: f32 = 2.0;

// =============================================================================
// COMPONENTS & RESOURCES
// =============================================================================

/// The avatar this client controls.
#[derive(Component)]
pub struct LocalPlayer;

/// The entity we spawn `SceneRoot` onto for the avatar model.
#[derive(Component)]
pub struct PlayerModelRoot;

/// Model spawned, but the glTF hierarchy might not be ready yet.
#[derive(Component)]
pub struct NeedsRigSetup;

/// The scene spawned without an `AnimationPlayer` or a rig root.
#[derive(Component)]
pub struct RigMissing;

/// Entity carrying the avatar's `AnimationPlayer`.
#[derive(Component)]
pub struct PlayerAnimationRoot;

/// Animation latch plus whether the idle loop is currently showing.
#[derive(Component, Default)]
pub struct PlayerAnimator {
    pub reactor: AnimationReactor,
    idle_playing: bool,
}

/// Stop every movement animation and sound. Written when the avatar stops moving.
#[derive(Message, Debug, Clone, Copy)]
pub struct StopMovements;

/// Loaded avatar assets (model + one graph node per animation range)
#[derive(Resource, Clone)]
pub struct PlayerCharacterAssets {
    pub scene: Handle<Scene>,
    pub clips: Vec<(AnimationRange, Handle<AnimationClip>)>,
    pub animation_graph: Handle<AnimationGraph>,
    pub nodes: HashMap<AnimationRange, AnimationNodeIndex>,
}

impl PlayerCharacterAssets {
    fn node(&self, range: AnimationRange) -> Option<AnimationNodeIndex> {
        self.nodes.get(&range).copied()
    }
}

/// Labeled asset path of a range's clip, as reported when it fails to load.
pub fn clip_path(range: AnimationRange) -> String {
    format!("{}#Animation{}", PLAYER_MODEL_PATH, clip_index(range))
}

/// Clip index of each range inside the avatar glTF.
fn clip_index(range: AnimationRange) -> usize {
    match range {
        AnimationRange::Idle => 0,
        AnimationRange::WalkingForward => 1,
        AnimationRange::WalkingBackward => 2,
        AnimationRange::StrafeLeft => 3,
        AnimationRange::StrafeRight => 4,
        AnimationRange::Jumping => 5,
    }
}

// =============================================================================
// ASSET LOADING
// =============================================================================

/// Load the avatar model and its animation ranges, and build an `AnimationGraph` with one node
/// per range.
pub fn setup_player_character_assets(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut animation_graphs: ResMut<Assets<AnimationGraph>>,
) {
    let scene: Handle<Scene> = asset_server.load(GltfAssetLabel::Scene(0).from_asset(PLAYER_MODEL_PATH));

    let clips: Vec<(AnimationRange, Handle<AnimationClip>)> = AnimationRange::ALL
        .into_iter()
        .map(|range| {
            let handle = asset_server.load(GltfAssetLabel::Animation(clip_index(range)).from_asset(PLAYER_MODEL_PATH));
            (range, handle)
        })
        .collect();

    let (graph, node_list) = AnimationGraph::from_clips(clips.iter().map(|(_, handle)| handle.clone()));
    let animation_graph = animation_graphs.add(graph);
    let nodes = AnimationRange::ALL.into_iter().zip(node_list).collect();

    commands.insert_resource(PlayerCharacterAssets {
        scene,
        clips,
        animation_graph,
        nodes,
    });

    info!("Loading avatar assets from {}", PLAYER_MODEL_PATH);
}

// =============================================================================
// PLAYER SPAWNING
// =============================================================================

/// Spawn the avatar resting on the floor at the configured spawn point.
/// Returns the initial state so the cameras can be framed on it.
pub fn spawn_player(
    commands: &mut Commands,
    assets: &PlayerCharacterAssets,
    tuning: &GameTuning,
    floor: &impl FloorQuery,
) -> PlayerState {
    let [spawn_x, spawn_z] = tuning.world.spawn;
    let mut reconciler = MovementReconciler::new(tuning.movement.clone(), PlayerState::default());
    reconciler.spawn_on(floor, spawn_x, spawn_z);
    let state = reconciler.state.clone();

    let capsule_offset = tuning.movement.capsule_offset;
    let half_segment = (capsule_offset - CAPSULE_RADIUS).max(0.1);

    let player = commands
        .spawn((
            LocalPlayer,
            Name::new("Player"),
            reconciler,
            PlayerAnimator {
                reactor: AnimationReactor::new(tuning.animation.clone()),
                idle_playing: false,
            },
            RigidBody::Dynamic,
            Collider::capsule_y(half_segment, CAPSULE_RADIUS),
            Velocity::zero(),
            GravityScale(tuning.movement.gravity_factor_grounded),
            LockedAxes::ROTATION_LOCKED,
            Friction::coefficient(1.0),
            Restitution::coefficient(0.0),
            AdditionalMassProperties::Mass(PLAYER_MASS),
            Transform::from_translation(state.position).with_rotation(state.rotation),
            Visibility::Inherited,
        ))
        .id();

    // glTF models face +Z; the avatar treats -Z as forward. Feet sit at the capsule bottom.
    let model = commands
        .spawn((
            PlayerModelRoot,
            NeedsRigSetup,
            SceneRoot(assets.scene.clone()),
            Transform::from_xyz(0.0, -capsule_offset, 0.0)
                .with_rotation(Quat::from_rotation_y(std::f32::consts::PI)),
            Visibility::Hidden,
        ))
        .id();
    commands.entity(player).add_child(model);

    info!(
        "Player spawned at ({:.1}, {:.1}, {:.1}) on {:?}",
        state.position.x, state.position.y, state.position.z, state.walking_on
    );
    state
}

// =============================================================================
// MOVEMENT
// =============================================================================

/// Rapier velocity and gravity scale seen as the reconciler's physics body.
struct RapierBody<'a> {
    velocity: &'a mut Velocity,
    gravity: &'a mut GravityScale,
}

impl PhysicsBody for RapierBody<'_> {
    fn linear_velocity(&self) -> Vec3 {
        self.velocity.linvel
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.velocity.linvel = velocity;
    }

    fn set_gravity_factor(&mut self, factor: f32) {
        self.gravity.0 = factor;
    }
}

/// Run one reconciliation tick and publish its events.
pub fn reconcile_player_movement(
    command: Res<CurrentCommand>,
    terrain: Option<Res<WorldTerrain>>,
    registry: Option<Res<SurfaceRegistry>>,
    mut players: Query<
        (&mut MovementReconciler, &mut Transform, &mut Velocity, &mut GravityScale),
        With<LocalPlayer>,
    >,
    mut movement_events: MessageWriter<MovementEvent>,
    mut stop_events: MessageWriter<StopMovements>,
    mut last_seen: Local<Option<(SurfaceLabel, Option<InteractableLabel>)>>,
) {
    let (Some(terrain), Some(registry)) = (terrain, registry) else {
        return;
    };
    let Ok((mut reconciler, mut transform, mut velocity, mut gravity)) = players.single_mut() else {
        return;
    };

    let floor = Floor::new(&terrain, &registry);
    reconciler.state.position = transform.translation;

    let mut body = RapierBody {
        velocity: &mut *velocity,
        gravity: &mut *gravity,
    };
    let report = reconciler.reconcile(&command.0, &floor, &mut body);

    // Only write back when the floor clamp moved the avatar
    if transform.translation != reconciler.state.position {
        transform.translation = reconciler.state.position;
    }

    if report.touched_down() {
        debug!(
            "Touch down on {:?} (ground {:.2}, gravity x{})",
            reconciler.state.walking_on, report.ground_height, report.gravity_factor
        );
    }
    for event in report.events.iter().copied() {
        movement_events.write(event);
    }
    if report.stopped_moving {
        stop_events.write(StopMovements);
    }

    let seen = (reconciler.state.walking_on, reconciler.state.interacting_with);
    if let Some((surface, target)) = *last_seen {
        if surface != seen.0 {
            info!("Walking on {}", seen.0.info().name);
        }
        if target != seen.1 {
            match seen.1 {
                Some(label) => info!("Interaction target: {:?}", label),
                None => info!("Interaction target cleared"),
            }
        }
    }
    *last_seen = Some(seen);
}

/// Nudge the avatar back inside the walls after physics has moved it.
pub fn contain_player(
    bounds: Option<Res<WorldBounds>>,
    mut players: Query<(&mut MovementReconciler, &mut Transform), With<LocalPlayer>>,
) {
    let Some(bounds) = bounds else {
        return;
    };
    let Ok((mut reconciler, mut transform)) = players.single_mut() else {
        return;
    };

    reconciler.state.position = transform.translation;
    if let Some(position) = reconciler.contain(&*bounds) {
        debug!("Avatar outside the walls, nudged to {:?}", position);
        transform.translation = position;
    }
}

// =============================================================================
// RIG SETUP & ANIMATION
// =============================================================================

/// Once the avatar scene hierarchy is spawned, attach the animation graph to its
/// `AnimationPlayer`. When the glTF loader did not add a player, build one on the rig root
/// with targets for the whole hierarchy. A spawned scene with neither is marked [`RigMissing`].
pub fn setup_player_rig(
    mut commands: Commands,
    assets: Option<Res<PlayerCharacterAssets>>,
    model_roots: Query<Entity, (With<PlayerModelRoot>, With<NeedsRigSetup>)>,
    children_q: Query<&Children>,
    names_q: Query<&Name>,
    players_q: Query<(), With<AnimationPlayer>>,
) {
    let Some(assets) = assets else { return };

    for model_root in model_roots.iter() {
        let mut stack: Vec<Entity> = vec![model_root];
        let mut existing_player: Option<Entity> = None;
        let mut rig_root: Option<Entity> = None;
        while let Some(e) = stack.pop() {
            if players_q.contains(e) {
                existing_player = Some(e);
                break;
            }
            if rig_root.is_none() && names_q.get(e).is_ok_and(|name| name.as_str() == RIG_ROOT_NAME) {
                rig_root = Some(e);
            }
            if let Ok(children) = children_q.get(e) {
                stack.extend(children.iter());
            }
        }

        let graph = AnimationGraphHandle(assets.animation_graph.clone());

        if let Some(player) = existing_player {
            commands.entity(player).insert((PlayerAnimationRoot, graph));
            commands.entity(model_root).remove::<NeedsRigSetup>();
            info!("Avatar rig ready");
            continue;
        }

        let Some(rig_root) = rig_root else {
            // No children means the scene instance has not spawned yet
            if children_q.get(model_root).is_ok_and(|children| !children.is_empty()) {
                error!("Avatar model has no AnimationPlayer and no {} node", RIG_ROOT_NAME);
                commands.entity(model_root).remove::<NeedsRigSetup>().insert(RigMissing);
            }
            continue;
        };
        let Ok(root_name) = names_q.get(rig_root) else {
            continue;
        };

        commands
            .entity(rig_root)
            .insert((PlayerAnimationRoot, AnimationPlayer::default(), graph));

        let mut stack: Vec<(Entity, Vec<Name>)> = vec![(rig_root, vec![root_name.clone()])];
        while let Some((e, path)) = stack.pop() {
            commands.entity(e).insert(AnimationTarget {
                id: AnimationTargetId::from_names(path.iter()),
                player: rig_root,
            });

            if let Ok(children) = children_q.get(e) {
                for child in children.iter() {
                    let mut child_path = path.clone();
                    if let Ok(child_name) = names_q.get(child) {
                        child_path.push(child_name.clone());
                    }
                    stack.push((child, child_path));
                }
            }
        }

        commands.entity(model_root).remove::<NeedsRigSetup>();
        info!("Avatar rig ready (targets generated)");
    }
}

/// Drives the avatar's `AnimationPlayer` for the latch.
struct RigAnimationSink<'a> {
    player: &'a mut AnimationPlayer,
    assets: &'a PlayerCharacterAssets,
}

impl AnimationSink for RigAnimationSink<'_> {
    fn play_range(&mut self, range: AnimationRange, speed: f32) {
        let Some(node) = self.assets.node(range) else {
            warn!("No animation node for {:?}", range);
            return;
        };
        self.player.stop_all();
        self.player.start(node).set_speed(speed);
    }

    fn stop_all(&mut self) {
        self.player.stop_all();
    }
}

/// React to movement messages:
/// - A directional clip plays once when the latch is free
/// - A finished clip releases the latch
/// - Stopping clears everything and the idle loop takes over
pub fn update_player_animation(
    assets: Option<Res<PlayerCharacterAssets>>,
    mut movement_events: MessageReader<MovementEvent>,
    mut stop_events: MessageReader<StopMovements>,
    mut avatars: Query<(&MovementReconciler, &mut PlayerAnimator), With<LocalPlayer>>,
    mut rigs: Query<&mut AnimationPlayer, With<PlayerAnimationRoot>>,
) {
    let events: Vec<MovementEvent> = movement_events.read().copied().collect();
    let stop_requested = stop_events.read().count() > 0;

    let Some(assets) = assets else { return };
    let Ok((reconciler, mut animator)) = avatars.single_mut() else {
        return;
    };
    let Ok(mut player) = rigs.single_mut() else {
        return;
    };

    if let AnimationLatch::Playing(range) = animator.reactor.latch() {
        let finished = assets
            .node(range)
            .and_then(|node| player.animation(node))
            .is_none_or(|active| active.is_finished());
        if finished {
            animator.reactor.on_clip_finished(range);
        }
    }

    let animator = &mut *animator;
    let mut sink = RigAnimationSink {
        player: &mut *player,
        assets: &*assets,
    };

    if stop_requested {
        animator.reactor.stop_all(&mut sink);
        animator.idle_playing = false;
    }

    for event in events {
        if let MovementEvent::Moving { direction, running } = event {
            if animator.reactor.on_moving(direction, running, &mut sink).is_some() {
                animator.idle_playing = false;
            }
        }
    }

    if animator.reactor.wants_idle(reconciler.state.is_moving) && !animator.idle_playing {
        if let Some(idle) = assets.node(AnimationRange::Idle) {
            sink.player.stop_all();
            sink.player.start(idle).repeat();
            animator.idle_playing = true;
        }
    }
}

/// Stop animations directly (the in-game menu opens outside the movement chain).
pub fn stop_player_animation(
    assets: Option<Res<PlayerCharacterAssets>>,
    mut avatars: Query<&mut PlayerAnimator, With<LocalPlayer>>,
    mut rigs: Query<&mut AnimationPlayer, With<PlayerAnimationRoot>>,
) {
    let Some(assets) = assets else { return };
    let (Ok(mut animator), Ok(mut player)) = (avatars.single_mut(), rigs.single_mut()) else {
        return;
    };

    let mut sink = RigAnimationSink {
        player: &mut *player,
        assets: &*assets,
    };
    animator.reactor.stop_all(&mut sink);
    animator.idle_playing = false;
}

/// Hide the avatar model in first person so it doesn't block the view.
pub fn update_local_player_visibility(
    controller: Option<Res<CameraController>>,
    mut models: Query<&mut Visibility, With<PlayerModelRoot>>,
) {
    let Some(controller) = controller else {
        return;
    };

    let wanted = if controller.is_active(CameraMode::FirstPerson) {
        Visibility::Hidden
    } else {
        Visibility::Inherited
    };

    for mut visibility in models.iter_mut() {
        if *visibility != wanted {
            *visibility = wanted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    fn placeholder_assets() -> PlayerCharacterAssets {
        PlayerCharacterAssets {
            scene: Handle::default(),
            clips: Vec::new(),
            animation_graph: Handle::default(),
            nodes: HashMap::new(),
        }
    }

    fn named(world: &mut World, name: &str) -> Option<Entity> {
        world
            .query::<(Entity, &Name)>()
            .iter(world)
            .find(|(_, n)| n.as_str() == name)
            .map(|(e, _)| e)
    }

    #[test]
    fn test_clip_path_labels_animation_index() {
        assert_eq!(clip_path(AnimationRange::Idle), "models/low_poly_male.glb#Animation0");
        assert_eq!(clip_path(AnimationRange::Jumping), "models/low_poly_male.glb#Animation5");
    }

    #[test]
    fn test_rig_waits_for_scene_instance() {
        let mut world = World::new();
        world.insert_resource(placeholder_assets());
        let root = world.spawn((PlayerModelRoot, NeedsRigSetup)).id();

        world.run_system_once(setup_player_rig).unwrap();

        let root = world.entity(root);
        assert!(root.contains::<NeedsRigSetup>());
        assert!(!root.contains::<RigMissing>());
    }

    #[test]
    fn test_scene_without_rig_is_reported() {
        let mut world = World::new();
        world.insert_resource(placeholder_assets());
        let root = world
            .spawn((PlayerModelRoot, NeedsRigSetup))
            .with_children(|scene| {
                scene.spawn(Name::new("Body"));
            })
            .id();

        world.run_system_once(setup_player_rig).unwrap();

        let root = world.entity(root);
        assert!(root.contains::<RigMissing>());
        assert!(!root.contains::<NeedsRigSetup>());
    }

    #[test]
    fn test_armature_gets_player_and_targets() {
        let mut world = World::new();
        world.insert_resource(placeholder_assets());
        let root = world
            .spawn((PlayerModelRoot, NeedsRigSetup))
            .with_children(|scene| {
                scene.spawn(Name::new(RIG_ROOT_NAME)).with_children(|rig| {
                    rig.spawn(Name::new("Hips"));
                });
            })
            .id();

        world.run_system_once(setup_player_rig).unwrap();

        let armature = named(&mut world, RIG_ROOT_NAME).unwrap();
        let hips = named(&mut world, "Hips").unwrap();
        assert!(world.entity(armature).contains::<AnimationPlayer>());
        assert!(world.entity(armature).contains::<PlayerAnimationRoot>());
        assert_eq!(world.entity(hips).get::<AnimationTarget>().map(|t| t.player), Some(armature));
        assert!(!world.entity(root).contains::<NeedsRigSetup>());
        assert!(!world.entity(root).contains::<RigMissing>());
    }
}
