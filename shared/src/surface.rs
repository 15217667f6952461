//! Floor surfaces, structures and the floor query
//!
//! The floor query answers two questions for the movement reconciler: how high is the
//! floor at a horizontal position, and which labelled surface lies directly below the
//! avatar. Both always answer; when nothing specific is hit the answer degrades to the
//! plain ground.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::WorldTuning;
use crate::sound::SoundId;
use crate::terrain::WorldTerrain;

/// Friction of walkable structures.
pub const STRUCTURES_FRICTION: f32 = 0.6;

/// Named structures placed in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    Dome,
    ModuleLarge,
}

impl StructureKind {
    pub const ALL: [StructureKind; 2] = [StructureKind::Dome, StructureKind::ModuleLarge];

    pub fn name(self) -> &'static str {
        match self {
            StructureKind::Dome => "Dome",
            StructureKind::ModuleLarge => "ModuleLarge",
        }
    }

    /// Horizontal position `(x, z)` of the structure center.
    pub fn site(self) -> Vec2 {
        match self {
            StructureKind::Dome => Vec2::new(0.0, 230.0),
            StructureKind::ModuleLarge => Vec2::new(250.0, 100.0),
        }
    }

    /// Vertical offset of the structure base above the ground at its site.
    pub fn elevation(self) -> f32 {
        match self {
            StructureKind::Dome => 0.1,
            StructureKind::ModuleLarge => 0.0,
        }
    }

    pub fn footprint(self) -> Footprint {
        match self {
            StructureKind::Dome => Footprint::Circle { radius: 40.0 },
            StructureKind::ModuleLarge => Footprint::Rect {
                half_extents: Vec2::new(30.0, 20.0),
            },
        }
    }

    pub fn height(self) -> f32 {
        match self {
            StructureKind::Dome => 40.0,
            StructureKind::ModuleLarge => 30.0,
        }
    }

    /// Radius of flattened terrain around the site.
    pub fn pad_radius(self) -> f32 {
        match self.footprint() {
            Footprint::Circle { radius } => radius * 1.5,
            Footprint::Rect { half_extents } => half_extents.length() * 1.5,
        }
    }
}

/// Horizontal shape of a structure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Footprint {
    Circle { radius: f32 },
    Rect { half_extents: Vec2 },
}

impl Footprint {
    pub fn contains(&self, center: Vec2, point: Vec2) -> bool {
        let d = point - center;
        match *self {
            Footprint::Circle { radius } => d.length_squared() <= radius * radius,
            Footprint::Rect { half_extents } => {
                d.x.abs() <= half_extents.x && d.y.abs() <= half_extents.y
            }
        }
    }
}

/// Classification of what lies directly below the avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SurfaceLabel {
    #[default]
    Ground,
    Ice,
    Structure(StructureKind),
}

/// Per-surface data looked up from a [`SurfaceLabel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceInfo {
    pub name: &'static str,
    pub footstep: SoundId,
    pub landing: SoundId,
    pub friction: f32,
}

impl SurfaceLabel {
    pub fn info(self) -> SurfaceInfo {
        match self {
            SurfaceLabel::Ground => SurfaceInfo {
                name: "ground",
                footstep: SoundId::WalkingOnSnow,
                landing: SoundId::FallingOnSnow,
                friction: 1.0,
            },
            SurfaceLabel::Ice => SurfaceInfo {
                name: "ice",
                footstep: SoundId::WalkingOnIce,
                landing: SoundId::FallingOnIce,
                friction: 1.0,
            },
            SurfaceLabel::Structure(kind) => SurfaceInfo {
                name: kind.name(),
                footstep: SoundId::WalkingOnTiles,
                landing: SoundId::WalkingOnTiles,
                friction: STRUCTURES_FRICTION,
            },
        }
    }
}

/// Props the player can look at and interact with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractableLabel {
    SupplyCrate,
}

/// A structure resolved against the terrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureSite {
    pub kind: StructureKind,
    pub center: Vec2,
    pub base_height: f32,
}

impl StructureSite {
    pub fn top(&self) -> f32 {
        self.base_height + self.kind.height()
    }

    pub fn contains_xz(&self, point: Vec2) -> bool {
        self.kind.footprint().contains(self.center, point)
    }
}

/// An interactable prop, as an axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractableSite {
    pub label: InteractableLabel,
    pub center: Vec3,
    pub half_extents: Vec3,
}

/// Read-only lookup of every labelled surface and prop in the level.
#[derive(Resource, Debug, Clone)]
pub struct SurfaceRegistry {
    pub ice_level: f32,
    pub floor_ray_length: f32,
    pub interaction_reach: f32,
    pub structures: Vec<StructureSite>,
    pub interactables: Vec<InteractableSite>,
}

impl SurfaceRegistry {
    /// Place every structure on the terrain.
    pub fn new(terrain: &WorldTerrain, world: &WorldTuning) -> Self {
        let structures: Vec<StructureSite> = StructureKind::ALL
            .into_iter()
            .map(|kind| {
                let center = kind.site();
                StructureSite {
                    kind,
                    center,
                    base_height: terrain.ground_height(center.x, center.y) + kind.elevation(),
                }
            })
            .collect();

        // The supply crate sits inside the dome.
        let interactables = structures
            .iter()
            .filter(|s| s.kind == StructureKind::Dome)
            .map(|dome| InteractableSite {
                label: InteractableLabel::SupplyCrate,
                center: Vec3::new(dome.center.x, dome.base_height + 6.0, dome.center.y + 20.0),
                half_extents: Vec3::splat(5.0),
            })
            .collect();

        Self {
            ice_level: world.ice_level,
            floor_ray_length: world.floor_ray_length,
            interaction_reach: world.interaction_reach,
            structures,
            interactables,
        }
    }

    /// Cast a ray straight down from `position` and classify the first labelled hit.
    pub fn surface_below(&self, position: Vec3) -> SurfaceLabel {
        let xz = position.xz();
        let ray_bottom = position.y - self.floor_ray_length;

        let structure = self
            .structures
            .iter()
            .filter(|s| s.contains_xz(xz) && s.base_height <= position.y && s.top() >= ray_bottom)
            // Closest to the ray origin wins.
            .max_by(|a, b| a.top().min(position.y).total_cmp(&b.top().min(position.y)));

        if let Some(site) = structure {
            return SurfaceLabel::Structure(site.kind);
        }

        if self.ice_level <= position.y && self.ice_level >= ray_bottom {
            return SurfaceLabel::Ice;
        }

        SurfaceLabel::Ground
    }

    /// Cast a ray along `forward` and return the closest interactable within reach.
    pub fn interactable_ahead(&self, position: Vec3, forward: Vec3) -> Option<InteractableLabel> {
        let dir = forward.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }

        self.interactables
            .iter()
            .filter_map(|site| {
                ray_aabb_distance(position, dir, site.center, site.half_extents)
                    .filter(|t| *t <= self.interaction_reach)
                    .map(|t| (t, site.label))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, label)| label)
    }
}

/// Distance along a normalized ray to an axis-aligned box, if hit (slab method).
fn ray_aabb_distance(origin: Vec3, dir: Vec3, center: Vec3, half_extents: Vec3) -> Option<f32> {
    let min = center - half_extents;
    let max = center + half_extents;
    let mut t_near = 0.0_f32;
    let mut t_far = f32::INFINITY;

    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        if d.abs() < f32::EPSILON {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let t1 = (min[axis] - o) / d;
        let t2 = (max[axis] - o) / d;
        t_near = t_near.max(t1.min(t2));
        t_far = t_far.min(t1.max(t2));
        if t_near > t_far {
            return None;
        }
    }

    Some(t_near)
}

/// Floor collaborator consumed by the movement reconciler.
pub trait FloorQuery {
    /// Walkable floor height at a horizontal position.
    fn height_at(&self, x: f32, z: f32) -> f32;

    /// Labelled surface directly below a position.
    fn surface_below(&self, position: Vec3) -> SurfaceLabel {
        let _ = position;
        SurfaceLabel::Ground
    }

    fn interactable_ahead(&self, position: Vec3, forward: Vec3) -> Option<InteractableLabel> {
        let _ = (position, forward);
        None
    }
}

/// The level floor: terrain heights plus the surface registry.
pub struct Floor<'a> {
    pub terrain: &'a WorldTerrain,
    pub registry: &'a SurfaceRegistry,
}

impl<'a> Floor<'a> {
    pub fn new(terrain: &'a WorldTerrain, registry: &'a SurfaceRegistry) -> Self {
        Self { terrain, registry }
    }
}

impl FloorQuery for Floor<'_> {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        self.terrain.height_at(x, z)
    }

    fn surface_below(&self, position: Vec3) -> SurfaceLabel {
        self.registry.surface_below(position)
    }

    fn interactable_ahead(&self, position: Vec3, forward: Vec3) -> Option<InteractableLabel> {
        self.registry.interactable_ahead(position, forward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SurfaceRegistry {
        SurfaceRegistry {
            ice_level: 0.0,
            floor_ray_length: 8.0,
            interaction_reach: 5.0,
            structures: vec![StructureSite {
                kind: StructureKind::ModuleLarge,
                center: Vec2::new(100.0, 0.0),
                base_height: 20.0,
            }],
            interactables: vec![InteractableSite {
                label: InteractableLabel::SupplyCrate,
                center: Vec3::new(0.0, 10.0, -10.0),
                half_extents: Vec3::splat(5.0),
            }],
        }
    }

    #[test]
    fn test_surface_below_defaults_to_ground() {
        assert_eq!(registry().surface_below(Vec3::new(0.0, 50.0, 0.0)), SurfaceLabel::Ground);
    }

    #[test]
    fn test_surface_below_ice_within_ray() {
        let registry = registry();
        assert_eq!(registry.surface_below(Vec3::new(0.0, 3.8, 0.0)), SurfaceLabel::Ice);
        // Too high above the ice for the ray to reach.
        assert_eq!(registry.surface_below(Vec3::new(0.0, 8.5, 0.0)), SurfaceLabel::Ground);
    }

    #[test]
    fn test_surface_below_structure() {
        let registry = registry();
        // Standing on the roof (top = 50).
        assert_eq!(
            registry.surface_below(Vec3::new(110.0, 53.8, 5.0)),
            SurfaceLabel::Structure(StructureKind::ModuleLarge)
        );
        // Outside the footprint.
        assert_eq!(registry.surface_below(Vec3::new(140.0, 53.8, 5.0)), SurfaceLabel::Ground);
        // Far above the roof.
        assert_eq!(registry.surface_below(Vec3::new(110.0, 80.0, 5.0)), SurfaceLabel::Ground);
    }

    #[test]
    fn test_interactable_ahead_respects_reach() {
        let registry = registry();
        // Crate face at z = -5, player at z = -1 looking down -Z: 4 units away.
        assert_eq!(
            registry.interactable_ahead(Vec3::new(0.0, 10.0, -1.0), Vec3::NEG_Z),
            Some(InteractableLabel::SupplyCrate)
        );
        // Looking away.
        assert_eq!(registry.interactable_ahead(Vec3::new(0.0, 10.0, -1.0), Vec3::Z), None);
        // Out of reach.
        assert_eq!(registry.interactable_ahead(Vec3::new(0.0, 10.0, 5.0), Vec3::NEG_Z), None);
    }

    #[test]
    fn test_surface_table() {
        assert_eq!(SurfaceLabel::Ground.info().footstep, SoundId::WalkingOnSnow);
        assert_eq!(SurfaceLabel::Ice.info().landing, SoundId::FallingOnIce);
        assert_eq!(
            SurfaceLabel::Structure(StructureKind::Dome).info().friction,
            STRUCTURES_FRICTION
        );
    }

    #[test]
    fn test_footprints() {
        let circle = Footprint::Circle { radius: 2.0 };
        assert!(circle.contains(Vec2::ZERO, Vec2::new(1.0, 1.0)));
        assert!(!circle.contains(Vec2::ZERO, Vec2::new(2.0, 2.0)));

        let rect = Footprint::Rect { half_extents: Vec2::new(3.0, 1.0) };
        assert!(rect.contains(Vec2::ZERO, Vec2::new(2.5, -0.5)));
        assert!(!rect.contains(Vec2::ZERO, Vec2::new(0.0, 1.5)));
    }
}
