//! Base structures - client-side rendering and collision
//!
//! The dome shell (with a doorway facing the spawn), the large module and the supply crate.
//! Placement comes from the [`SurfaceRegistry`] so footsteps and physics agree.

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use std::f32::consts::{PI, TAU};

use shared::surface::{Footprint, InteractableSite, StructureSite};
use shared::{StructureKind, SurfaceLabel, SurfaceRegistry};

use crate::terrain::surface_friction;

/// Tiled floors and metal panels
const HULL_COLOR: Color = Color::srgb(0.78, 0.80, 0.84);
const TILE_COLOR: Color = Color::srgb(0.55, 0.58, 0.62);
const CRATE_COLOR: Color = Color::srgb(0.85, 0.45, 0.15);

/// Doorway half-angle, measured around the dome's -Z side
const DOOR_HALF_ANGLE: f32 = 0.18;
/// Fraction of the dome height the doorway reaches
const DOOR_HEIGHT_FRACTION: f32 = 0.35;
const FLOOR_THICKNESS: f32 = 0.2;

/// Marker for structure entities
#[derive(Component)]
pub struct BaseStructure {
    pub kind: StructureKind,
}

/// Marker for the supply crate
#[derive(Component)]
pub struct SupplyCrate;

/// Ensure triangle winding matches the intended vertex normals.
///
/// Backface culling uses triangle winding, not the normal attribute. This flips triangles
/// whose geometric normal points opposite the average of their vertex normals.
fn fix_winding_against_vertex_normals(positions: &[[f32; 3]], normals: &[[f32; 3]], indices: &mut [u32]) {
    if positions.len() != normals.len() {
        return;
    }

    for tri in indices.chunks_exact_mut(3) {
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }

        let p0 = Vec3::from(positions[i0]);
        let ng = (Vec3::from(positions[i1]) - p0).cross(Vec3::from(positions[i2]) - p0);
        let na = Vec3::from(normals[i0]) + Vec3::from(normals[i1]) + Vec3::from(normals[i2]);
        if ng.length_squared() < 1e-10 || na.length_squared() < 1e-10 {
            continue;
        }

        if ng.dot(na) < 0.0 {
            tri.swap(1, 2);
        }
    }
}

/// Raw triangle data shared by the render mesh and the trimesh collider.
struct ShellGeometry {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    indices: Vec<u32>,
}

impl ShellGeometry {
    fn to_mesh(&self) -> Mesh {
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, self.positions.clone());
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals.clone());
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, self.uvs.clone());
        mesh.insert_indices(Indices::U32(self.indices.clone()));
        mesh
    }

    fn to_collider(&self) -> Option<Collider> {
        let vertices = self.positions.iter().map(|p| Vec3::from(*p)).collect();
        let triangles = self
            .indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect();
        Collider::trimesh(vertices, triangles).ok()
    }
}

/// Hemisphere shell with a doorway cut into its -Z side.
fn generate_dome_shell(radius: f32, height: f32, segments: usize, rings: usize) -> ShellGeometry {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    // Ring 0 is the rim at ground level, the last ring the apex
    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let phi = v * PI * 0.5;

        for seg in 0..=segments {
            let u = seg as f32 / segments as f32;
            let theta = u * TAU;

            let x = radius * phi.cos() * theta.sin();
            let z = radius * phi.cos() * theta.cos();
            let y = height * phi.sin();

            positions.push([x, y, z]);
            let normal = Vec3::new(x / radius, y / height, z / radius).normalize_or_zero();
            normals.push(normal.to_array());
            uvs.push([u, v]);
        }
    }

    for ring in 0..rings {
        let ring_top = (ring + 1) as f32 / rings as f32;
        for seg in 0..segments {
            // Segment midpoint angle, 0 = +Z, PI = -Z
            let theta = (seg as f32 + 0.5) / segments as f32 * TAU;
            let in_doorway = (theta - PI).abs() < DOOR_HALF_ANGLE;
            if in_doorway && (ring_top * PI * 0.5).sin() <= DOOR_HEIGHT_FRACTION {
                continue;
            }

            let current = ring * (segments + 1) + seg;
            let next = current + segments + 1;

            indices.extend_from_slice(&[current as u32, (current + 1) as u32, next as u32]);
            indices.extend_from_slice(&[(current + 1) as u32, (next + 1) as u32, next as u32]);
        }
    }

    fix_winding_against_vertex_normals(&positions, &normals, &mut indices);
    ShellGeometry {
        positions,
        normals,
        uvs,
        indices,
    }
}

/// Spawn every structure and the supply crate from the registry, parented to `root`.
pub fn spawn_structures(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    registry: &SurfaceRegistry,
    root: Entity,
) {
    let hull = materials.add(StandardMaterial {
        base_color: HULL_COLOR,
        perceptual_roughness: 0.4,
        metallic: 0.3,
        // The dome is seen from inside too
        double_sided: true,
        cull_mode: None,
        ..default()
    });
    let tiles = materials.add(StandardMaterial {
        base_color: TILE_COLOR,
        perceptual_roughness: 0.6,
        ..default()
    });

    for site in &registry.structures {
        let entity = match site.kind {
            StructureKind::Dome => spawn_dome(commands, meshes, site, hull.clone(), tiles.clone()),
            StructureKind::ModuleLarge => spawn_module(commands, meshes, site, hull.clone()),
        };
        commands.entity(root).add_child(entity);
        info!(
            "Placed {} at ({:.0}, {:.1}, {:.0})",
            site.kind.name(),
            site.center.x,
            site.base_height,
            site.center.y
        );
    }

    let crate_material = materials.add(StandardMaterial {
        base_color: CRATE_COLOR,
        perceptual_roughness: 0.8,
        ..default()
    });
    for site in &registry.interactables {
        let entity = spawn_supply_crate(commands, meshes, site, crate_material.clone());
        commands.entity(root).add_child(entity);
    }
}

fn spawn_dome(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    site: &StructureSite,
    hull: Handle<StandardMaterial>,
    tiles: Handle<StandardMaterial>,
) -> Entity {
    let Footprint::Circle { radius } = site.kind.footprint() else {
        return spawn_module(commands, meshes, site, hull);
    };

    let shell = generate_dome_shell(radius, site.kind.height(), 48, 16);
    let position = Vec3::new(site.center.x, site.base_height, site.center.y);

    let dome = commands
        .spawn((
            BaseStructure { kind: site.kind },
            Name::new(site.kind.name()),
            Mesh3d(meshes.add(shell.to_mesh())),
            MeshMaterial3d(hull),
            Transform::from_translation(position),
        ))
        .id();

    match shell.to_collider() {
        Some(collider) => {
            commands.entity(dome).insert((
                RigidBody::Fixed,
                collider,
                surface_friction(SurfaceLabel::Structure(site.kind)),
            ));
        }
        None => warn!("Dome shell produced no valid collider; it will be walk-through"),
    }

    // Tiled floor, top flush with the dome base
    let floor = commands
        .spawn((
            Mesh3d(meshes.add(Cylinder::new(radius, FLOOR_THICKNESS))),
            MeshMaterial3d(tiles),
            Transform::from_xyz(0.0, -FLOOR_THICKNESS / 2.0, 0.0),
            RigidBody::Fixed,
            Collider::cylinder(FLOOR_THICKNESS / 2.0, radius),
            surface_friction(SurfaceLabel::Structure(site.kind)),
        ))
        .id();
    commands.entity(dome).add_child(floor);

    dome
}

fn spawn_module(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    site: &StructureSite,
    hull: Handle<StandardMaterial>,
) -> Entity {
    let half = match site.kind.footprint() {
        Footprint::Rect { half_extents } => half_extents,
        Footprint::Circle { radius } => Vec2::splat(radius),
    };
    let half_height = site.kind.height() / 2.0;

    commands
        .spawn((
            BaseStructure { kind: site.kind },
            Name::new(site.kind.name()),
            Mesh3d(meshes.add(Cuboid::new(half.x * 2.0, half_height * 2.0, half.y * 2.0))),
            MeshMaterial3d(hull),
            Transform::from_xyz(site.center.x, site.base_height + half_height, site.center.y),
            RigidBody::Fixed,
            Collider::cuboid(half.x, half_height, half.y),
            surface_friction(SurfaceLabel::Structure(site.kind)),
        ))
        .id()
}

fn spawn_supply_crate(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    site: &InteractableSite,
    material: Handle<StandardMaterial>,
) -> Entity {
    let size = site.half_extents * 2.0;
    commands
        .spawn((
            SupplyCrate,
            Name::new(format!("{:?}", site.label)),
            Mesh3d(meshes.add(Cuboid::new(size.x, size.y, size.z))),
            MeshMaterial3d(material),
            Transform::from_translation(site.center),
            RigidBody::Fixed,
            Collider::cuboid(site.half_extents.x, site.half_extents.y, site.half_extents.z),
        ))
        .id()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dome_shell_leaves_doorway_open() {
        let full = generate_dome_shell(40.0, 40.0, 48, 16);
        let vertex_count = 17 * 49;
        assert_eq!(full.positions.len(), vertex_count);

        let closed_triangles = 16 * 48 * 2;
        let open_triangles = full.indices.len() / 3;
        assert!(open_triangles < closed_triangles);
        assert!(open_triangles > closed_triangles - 48);
    }

    #[test]
    fn test_dome_rim_sits_on_base() {
        let shell = generate_dome_shell(10.0, 5.0, 8, 4);
        for p in &shell.positions[..9] {
            assert!(p[1].abs() < 1e-5);
            assert!((Vec2::new(p[0], p[2]).length() - 10.0).abs() < 1e-4);
        }
        let apex = shell.positions[shell.positions.len() - 1];
        assert!((apex[1] - 5.0).abs() < 1e-4);
    }
}
