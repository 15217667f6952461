//! ColdEscape game logic
//!
//! Everything here is independent of rendering, audio and the physics engine. The client
//! wires these types to Bevy and Rapier.

pub mod animation;
pub mod camera;
pub mod config;
pub mod directions;
pub mod input;
pub mod movement;
pub mod player;
pub mod setup;
pub mod sound;
pub mod surface;
pub mod terrain;
pub mod world;

pub use animation::{AnimationLatch, AnimationRange, AnimationReactor, AnimationSink};
pub use camera::{CameraController, CameraMode};
pub use config::GameTuning;
pub use directions::{Direction, IntentSet};
pub use input::{InputSnapshot, KeyBindings, MovementCommand};
pub use movement::{MovementEvent, MovementReconciler, PhysicsBody, TickReport};
pub use player::PlayerState;
pub use setup::{AssetStatus, SetupError, SetupPipeline, SetupStage};
pub use sound::{MovementSoundReactor, SoundId, SoundRole, SoundSink};
pub use surface::{Floor, FloorQuery, InteractableLabel, StructureKind, SurfaceLabel, SurfaceRegistry};
pub use terrain::WorldTerrain;
pub use world::{Containment, WorldBounds};

/// Vertical velocity that keeps a walking avatar pressed to the ground.
pub const GRAVITY_ON_LAND: f32 = -9.81;

/// Path of the tunables file, relative to the asset root.
pub const TUNING_PATH: &str = "config/tuning.ron";
