//! Game tunables
//!
//! Every number that shapes game feel lives here instead of being scattered as constants.
//! Values are loaded from `assets/config/tuning.ron`; missing fields keep their defaults.

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Movement reconciler tunables (speeds in units per second).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementTuning {
    pub forward_speed: f32,
    pub backward_speed: f32,
    pub strafe_speed: f32,
    pub jump_speed: f32,
    pub running_multiplier: f32,
    /// Capsule half-height: the avatar center rests this far above the floor.
    pub capsule_offset: f32,
    /// Clearance above the floor before the avatar counts as airborne.
    pub airborne_clearance: f32,
    /// Vertical velocity applied while moving on the ground.
    pub grounded_vertical_bias: f32,
    pub gravity_factor_grounded: f32,
    pub gravity_factor_airborne: f32,
    /// Per-axis step used to push the avatar back inside the world walls.
    pub containment_step: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            forward_speed: 60.0,
            backward_speed: 45.0,
            strafe_speed: 45.0,
            jump_speed: 80.0,
            running_multiplier: 1.5,
            capsule_offset: 3.8,
            airborne_clearance: 1.0,
            grounded_vertical_bias: crate::GRAVITY_ON_LAND,
            gravity_factor_grounded: 200.0,
            gravity_factor_airborne: 40.0,
            containment_step: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraTuning {
    /// First-person eye height above the avatar center.
    pub eye_height: f32,
    pub orbit_radius: f32,
    /// Initial orbit pitch (0 = level behind the avatar).
    pub orbit_pitch: f32,
    pub mouse_sensitivity: f32,
}

impl Default for CameraTuning {
    fn default() -> Self {
        Self {
            eye_height: 2.0,
            orbit_radius: 20.0,
            orbit_pitch: 0.35,
            mouse_sensitivity: 0.003,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationTuning {
    pub base_rate: f32,
    /// Playback rate for intents that support running while the run key is held.
    pub running_rate: f32,
}

impl Default for AnimationTuning {
    fn default() -> Self {
        Self {
            base_rate: 1.0,
            running_rate: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTuning {
    pub seed: u32,
    /// Edge length of the square world.
    pub world_size: f32,
    /// Edge length of the walkable area enclosed by the invisible walls.
    pub walkable_size: f32,
    pub wall_height: f32,
    pub ice_level: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub floor_ray_length: f32,
    pub interaction_reach: f32,
    /// Horizontal spawn position `[x, z]`.
    pub spawn: [f32; 2],
    pub fog_end: f32,
    pub view_distance_chunks: i32,
    pub snow_count: usize,
    pub snow_box_size: f32,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            seed: 1337,
            world_size: 5000.0,
            walkable_size: 5000.0,
            wall_height: 500.0,
            ice_level: 0.0,
            min_height: -30.0,
            max_height: 200.0,
            floor_ray_length: 8.0,
            interaction_reach: 5.0,
            spawn: [0.0, -100.0],
            fog_end: 1200.0,
            view_distance_chunks: 8,
            snow_count: 400,
            snow_box_size: 100.0,
        }
    }
}

/// All tunables, inserted as a resource at startup.
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameTuning {
    pub movement: MovementTuning,
    pub camera: CameraTuning,
    pub animation: AnimationTuning,
    pub world: WorldTuning,
}

impl GameTuning {
    pub fn from_ron(text: &str) -> Result<Self, String> {
        ron::from_str(text).map_err(|e| format!("Failed to parse tuning: {e}"))
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_ron(&text).map_err(|e| format!("{}: {}", path.display(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shipped_feel() {
        let tuning = GameTuning::default();
        assert_eq!(tuning.movement.forward_speed, 60.0);
        assert_eq!(tuning.movement.running_multiplier, 1.5);
        assert_eq!(tuning.movement.gravity_factor_grounded, 200.0);
        assert_eq!(tuning.movement.gravity_factor_airborne, 40.0);
        assert_eq!(tuning.camera.orbit_radius, 20.0);
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let text = "(movement: (forward_speed: 75.0), world: (ice_level: -2.5))";
        let tuning = GameTuning::from_ron(text).unwrap();
        assert_eq!(tuning.movement.forward_speed, 75.0);
        assert_eq!(tuning.movement.backward_speed, 45.0);
        assert_eq!(tuning.world.ice_level, -2.5);
        assert_eq!(tuning.camera, CameraTuning::default());
    }

    #[test]
    fn test_malformed_ron_is_an_error() {
        assert!(GameTuning::from_ron("(movement: (forward_speed: \"fast\"))").is_err());
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = GameTuning::load(Path::new("definitely/not/here.ron")).unwrap_err();
        assert!(err.contains("definitely/not/here.ron"));
    }
}
