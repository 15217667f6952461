//! Snowfield terrain
//! Deterministic Perlin heightfield, so every run with the same seed walks the same hills
//!
//! Scale: 1 unit = 1 meter
//! - The avatar capsule is ~7.6 units tall
//! - Chunks are 64 x 64
//! - Heights span `min_height..=max_height` from the world tunables

use bevy::prelude::*;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::config::WorldTuning;
use crate::surface::StructureKind;

/// Chunk size in world units
pub const CHUNK_SIZE: f32 = 64.0;
/// Number of vertices per chunk side
pub const CHUNK_RESOLUTION: usize = 33;
/// Spacing between vertices
pub const VERTEX_SPACING: f32 = CHUNK_SIZE / (CHUNK_RESOLUTION - 1) as f32;

const SNOW_COLOR: Color = Color::srgb(0.93, 0.96, 1.0);
const SHADOW_COLOR: Color = Color::srgb(0.72, 0.80, 0.90);

/// Chunk coordinate (integer grid position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Component, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn from_world_pos(pos: Vec3) -> Self {
        Self {
            x: (pos.x / CHUNK_SIZE).floor() as i32,
            z: (pos.z / CHUNK_SIZE).floor() as i32,
        }
    }

    /// World position of the chunk's corner (min x, min z)
    pub fn world_pos(&self) -> Vec3 {
        Vec3::new(self.x as f32 * CHUNK_SIZE, 0.0, self.z as f32 * CHUNK_SIZE)
    }

    pub fn chunks_in_radius(&self, radius: i32) -> Vec<ChunkCoord> {
        let mut chunks = Vec::with_capacity(((2 * radius + 1) * (2 * radius + 1)) as usize);
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                chunks.push(ChunkCoord::new(self.x + dx, self.z + dz));
            }
        }
        chunks
    }

    /// Whether any part of the chunk lies inside a square world of edge `world_size`.
    pub fn overlaps_world(&self, world_size: f32) -> bool {
        let half = world_size / 2.0;
        let origin = self.world_pos();
        origin.x < half && origin.x + CHUNK_SIZE > -half && origin.z < half && origin.z + CHUNK_SIZE > -half
    }
}

/// A flattened disc of terrain under a structure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainPad {
    pub center: Vec2,
    pub radius: f32,
    pub height: f32,
}

/// Heightfield generator
pub struct TerrainGenerator {
    ridge_noise: Perlin,
    hill_noise: Perlin,
    detail_noise: Perlin,
    min_height: f32,
    max_height: f32,
    pads: Vec<TerrainPad>,
}

impl TerrainGenerator {
    pub fn new(seed: u32, min_height: f32, max_height: f32) -> Self {
        Self {
            ridge_noise: Perlin::new(seed),
            hill_noise: Perlin::new(seed.wrapping_add(1000)),
            detail_noise: Perlin::new(seed.wrapping_add(3000)),
            min_height,
            max_height,
            pads: Vec::new(),
        }
    }

    /// Flatten a pad around every structure site.
    pub fn with_structure_pads(mut self) -> Self {
        self.pads = StructureKind::ALL
            .into_iter()
            .map(|kind| {
                let center = kind.site();
                TerrainPad {
                    center,
                    radius: kind.pad_radius(),
                    height: self.raw_height(center.x, center.y),
                }
            })
            .collect();
        self
    }

    /// Unflattened height in `min_height..=max_height`.
    fn raw_height(&self, x: f32, z: f32) -> f32 {
        // Broad mountain ridges
        let ridge_scale = 0.0012;
        let ridges = self.ridge_noise.get([x as f64 * ridge_scale, z as f64 * ridge_scale]) as f32;
        let ridge_shape = (1.0 - ridges.abs()).powf(2.0);

        // Rolling snow drifts
        let hill_scale = 0.004;
        let hills = self.hill_noise.get([x as f64 * hill_scale, z as f64 * hill_scale]) as f32;

        let detail_scale = 0.03;
        let detail = self.detail_noise.get([x as f64 * detail_scale, z as f64 * detail_scale]) as f32;

        // Weighted sum mapped to 0..1
        let t = (ridge_shape * 0.6 + (hills * 0.5 + 0.5) * 0.35 + (detail * 0.5 + 0.5) * 0.05).clamp(0.0, 1.0);
        self.min_height + t * (self.max_height - self.min_height)
    }

    /// Terrain height with structure pads applied.
    pub fn get_height(&self, x: f32, z: f32) -> f32 {
        let raw = self.raw_height(x, z);
        let point = Vec2::new(x, z);

        for pad in &self.pads {
            let dist = point.distance(pad.center);
            if dist >= pad.radius {
                continue;
            }
            let edge_start = pad.radius * 0.7;
            if dist < edge_start {
                return pad.height;
            }
            let t = (dist - edge_start) / (pad.radius - edge_start);
            let smooth_t = t * t * (3.0 - 2.0 * t);
            return pad.height * (1.0 - smooth_t) + raw * smooth_t;
        }

        raw
    }

    /// Generate vertex data for a chunk
    pub fn generate_chunk_vertices(&self, coord: ChunkCoord) -> ChunkMeshData {
        let origin = coord.world_pos();
        let count = CHUNK_RESOLUTION * CHUNK_RESOLUTION;
        let mut positions = Vec::with_capacity(count);
        let mut normals = Vec::with_capacity(count);
        let mut uvs = Vec::with_capacity(count);
        let mut colors = Vec::with_capacity(count);
        let mut indices = Vec::with_capacity((CHUNK_RESOLUTION - 1) * (CHUNK_RESOLUTION - 1) * 6);

        let snow = SNOW_COLOR.to_srgba();
        let shadow = SHADOW_COLOR.to_srgba();

        for zi in 0..CHUNK_RESOLUTION {
            for xi in 0..CHUNK_RESOLUTION {
                let local_x = xi as f32 * VERTEX_SPACING;
                let local_z = zi as f32 * VERTEX_SPACING;
                let height = self.get_height(origin.x + local_x, origin.z + local_z);

                positions.push([local_x, height, local_z]);
                uvs.push([local_x / CHUNK_SIZE, local_z / CHUNK_SIZE]);

                // Valleys a little bluer than the peaks
                let t = ((height - self.min_height) / (self.max_height - self.min_height)).clamp(0.0, 1.0);
                colors.push([
                    shadow.red + (snow.red - shadow.red) * t,
                    shadow.green + (snow.green - shadow.green) * t,
                    shadow.blue + (snow.blue - shadow.blue) * t,
                    1.0,
                ]);
            }
        }

        for zi in 0..CHUNK_RESOLUTION {
            for xi in 0..CHUNK_RESOLUTION {
                let idx = zi * CHUNK_RESOLUTION + xi;
                let h = positions[idx][1];
                let h_left = if xi > 0 { positions[idx - 1][1] } else { h };
                let h_right = if xi < CHUNK_RESOLUTION - 1 { positions[idx + 1][1] } else { h };
                let h_down = if zi > 0 { positions[idx - CHUNK_RESOLUTION][1] } else { h };
                let h_up = if zi < CHUNK_RESOLUTION - 1 { positions[idx + CHUNK_RESOLUTION][1] } else { h };

                let normal = Vec3::new(h_left - h_right, 2.0 * VERTEX_SPACING, h_down - h_up).normalize();
                normals.push([normal.x, normal.y, normal.z]);
            }
        }

        for zi in 0..(CHUNK_RESOLUTION - 1) {
            for xi in 0..(CHUNK_RESOLUTION - 1) {
                let top_left = (zi * CHUNK_RESOLUTION + xi) as u32;
                let top_right = top_left + 1;
                let bottom_left = top_left + CHUNK_RESOLUTION as u32;
                let bottom_right = bottom_left + 1;

                indices.extend_from_slice(&[top_left, bottom_left, top_right]);
                indices.extend_from_slice(&[top_right, bottom_left, bottom_right]);
            }
        }

        ChunkMeshData {
            positions,
            normals,
            uvs,
            colors,
            indices,
        }
    }

    /// Heights laid out for a rapier heightfield: `rows` along z, `cols` along x, column-major.
    pub fn chunk_heightfield(&self, coord: ChunkCoord) -> Vec<f32> {
        let origin = coord.world_pos();
        let mut heights = Vec::with_capacity(CHUNK_RESOLUTION * CHUNK_RESOLUTION);
        for xi in 0..CHUNK_RESOLUTION {
            for zi in 0..CHUNK_RESOLUTION {
                heights.push(self.get_height(
                    origin.x + xi as f32 * VERTEX_SPACING,
                    origin.z + zi as f32 * VERTEX_SPACING,
                ));
            }
        }
        heights
    }
}

/// Generated mesh data for a terrain chunk
pub struct ChunkMeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
}

/// Terrain plus the frozen lake surface
#[derive(Resource)]
pub struct WorldTerrain {
    pub generator: TerrainGenerator,
    pub ice_level: f32,
}

impl WorldTerrain {
    pub fn new(world: &WorldTuning) -> Self {
        Self {
            generator: TerrainGenerator::new(world.seed, world.min_height, world.max_height)
                .with_structure_pads(),
            ice_level: world.ice_level,
        }
    }

    /// Height of the snow itself, ignoring the ice sheet.
    pub fn ground_height(&self, x: f32, z: f32) -> f32 {
        self.generator.get_height(x, z)
    }

    /// Walkable height: the ice sheet covers everything below the ice level.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        self.ground_height(x, z).max(self.ice_level)
    }
}

impl Default for WorldTerrain {
    fn default() -> Self {
        Self::new(&WorldTuning::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heights_within_range() {
        let terrain = WorldTerrain::default();
        for i in -20..20 {
            let h = terrain.ground_height(i as f32 * 97.0, i as f32 * -53.0);
            assert!((-30.0..=200.0).contains(&h), "height {h} out of range");
        }
    }

    #[test]
    fn test_deterministic_from_seed() {
        let a = WorldTerrain::default();
        let b = WorldTerrain::default();
        assert_eq!(a.ground_height(123.4, -56.7), b.ground_height(123.4, -56.7));
    }

    #[test]
    fn test_ice_covers_low_ground() {
        let terrain = WorldTerrain {
            generator: TerrainGenerator::new(7, -30.0, -10.0),
            ice_level: 0.0,
        };
        assert_eq!(terrain.height_at(10.0, 10.0), 0.0);
        assert!(terrain.ground_height(10.0, 10.0) < 0.0);
    }

    #[test]
    fn test_structure_pads_are_flat() {
        let terrain = WorldTerrain::default();
        for kind in StructureKind::ALL {
            let site = kind.site();
            let center = terrain.ground_height(site.x, site.y);
            let near = terrain.ground_height(site.x + 5.0, site.y - 5.0);
            assert_eq!(center, near, "{} pad is not flat", kind.name());
        }
    }

    #[test]
    fn test_chunk_from_world_pos() {
        assert_eq!(ChunkCoord::from_world_pos(Vec3::new(-1.0, 0.0, 65.0)), ChunkCoord::new(-1, 1));
        assert!(ChunkCoord::new(0, 0).overlaps_world(5000.0));
        assert!(!ChunkCoord::new(100, 0).overlaps_world(5000.0));
    }

    #[test]
    fn test_heightfield_layout() {
        let generator = TerrainGenerator::new(1, 0.0, 100.0);
        let heights = generator.chunk_heightfield(ChunkCoord::new(0, 0));
        assert_eq!(heights.len(), CHUNK_RESOLUTION * CHUNK_RESOLUTION);
        // Second entry steps along z
        assert_eq!(heights[1], generator.get_height(0.0, VERTEX_SPACING));
    }
}
