//! Invisible world walls

use bevy::prelude::*;

use crate::config::WorldTuning;

/// Boundary containment collaborator.
pub trait Containment {
    fn is_inside_boundary(&self, position: Vec3) -> bool;
}

/// Axis-aligned box of walls centred on the origin.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub half_extent: f32,
    pub height: f32,
}

impl WorldBounds {
    pub fn new(world: &WorldTuning) -> Self {
        Self {
            half_extent: world.walkable_size / 2.0,
            height: world.wall_height,
        }
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self::new(&WorldTuning::default())
    }
}

impl Containment for WorldBounds {
    fn is_inside_boundary(&self, position: Vec3) -> bool {
        let half_height = self.height / 2.0;
        position.x.abs() <= self.half_extent
            && position.z.abs() <= self.half_extent
            && position.y.abs() <= half_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_and_outside() {
        let bounds = WorldBounds { half_extent: 100.0, height: 50.0 };
        assert!(bounds.is_inside_boundary(Vec3::new(99.0, 10.0, -99.0)));
        assert!(!bounds.is_inside_boundary(Vec3::new(101.0, 10.0, 0.0)));
        assert!(!bounds.is_inside_boundary(Vec3::new(0.0, 26.0, 0.0)));
    }
}
