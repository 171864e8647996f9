//! Noise-driven height field and column fill

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use super::biome::{Biome, BiomeSampler};
use crate::generation::GenerationConfig;
use crate::voxel::{Chunk, ChunkCoord, VoxelDictionary, VoxelId};

/// Parameters controlling the height field
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainParams {
    pub seed: u32,
    pub scale: f64,
    pub amplitude: f64,
    pub octaves: usize,
    pub persistence: f64,
    pub lacunarity: f64,
    pub surface_features_begin_at: i32,
    pub water_level: i32,
    pub mountain_depth: i32,
}

impl TerrainParams {
    /// Build params from a generation config and a drawn persistence/lacunarity pair
    pub fn from_config(config: &GenerationConfig, jitter: NoiseJitter) -> Self {
        Self {
            // Noise seeds are 32-bit; larger world seeds wrap
            seed: config.seed as u32,
            scale: config.noise_scale,
            amplitude: config.noise_amplitude,
            octaves: config.octaves,
            persistence: jitter.persistence,
            lacunarity: jitter.lacunarity,
            surface_features_begin_at: config.surface_features_begin_at,
            water_level: config.water_level(),
            mountain_depth: config.mountain_depth,
        }
    }
}

/// Persistence and lacunarity drawn once per world initialization
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseJitter {
    pub persistence: f64,
    pub lacunarity: f64,
}

impl NoiseJitter {
    /// Draw persistence from [0.50, 0.70) and lacunarity from [0.00, 0.50)
    pub fn draw(rng: &mut fastrand::Rng) -> Self {
        Self {
            persistence: (50 + rng.u32(0..20)) as f64 / 100.0,
            lacunarity: rng.u32(0..50) as f64 / 100.0,
        }
    }
}

/// Voxel ids the column fill writes, resolved once per chunk
#[derive(Clone, Copy, Debug)]
struct Palette {
    air: VoxelId,
    water: VoxelId,
    stone: VoxelId,
    sand: VoxelId,
    dirt: VoxelId,
}

impl Palette {
    fn new(dictionary: &VoxelDictionary) -> Self {
        Self {
            air: dictionary.pointer_to("Air"),
            water: dictionary.pointer_to("Water"),
            stone: dictionary.pointer_to("Stone"),
            sand: dictionary.pointer_to("Sand"),
            dirt: dictionary.pointer_to("Dirt"),
        }
    }
}

/// Height-field terrain generator using fractal Brownian motion
pub struct TerrainGenerator {
    params: TerrainParams,
    noise: Fbm<Perlin>,
}

impl TerrainGenerator {
    pub fn new(params: TerrainParams) -> Self {
        let noise = Fbm::<Perlin>::new(params.seed)
            .set_octaves(params.octaves)
            .set_persistence(params.persistence)
            .set_lacunarity(params.lacunarity);

        Self { params, noise }
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Amplified noise at a global column, before any depth scaling
    pub fn base_noise(&self, global_x: i32, global_y: i32) -> f64 {
        let nx = global_x as f64 * self.params.scale;
        let ny = global_y as f64 * self.params.scale;
        self.noise.get([nx, ny]) * self.params.amplitude
    }

    /// Noise at depth `z`: steeper below water and above the mountain depth
    pub fn noise_at_depth(&self, base: f64, z: i32) -> f64 {
        let mut value = base;
        if z < self.params.water_level {
            value *= 2.0;
        }
        if z > self.params.mountain_depth {
            value *= 2.0;
        }
        value
    }

    /// Fill every column of `chunk` from the height field and biome map
    pub fn fill_chunk(&self, chunk: &mut Chunk, coord: ChunkCoord, biomes: &BiomeSampler) {
        let dictionary = chunk.dictionary().clone();
        let palette = Palette::new(&dictionary);
        let (w, h) = (chunk.width() as i32, chunk.height() as i32);

        for x in 0..w {
            for y in 0..h {
                let base = self.base_noise(coord.x * w + x, coord.y * h + y);
                let biome = biomes.biome_at(coord, x, y);
                let column = self.fill_column(base, biome, chunk.depth(), &dictionary, &palette);
                for (z, id) in column.into_iter().enumerate() {
                    chunk.set(x, y, z as i32, id);
                }
            }
        }
    }

    /// Voxel column for a given base noise value and biome, bottom to top
    pub fn column(&self, base: f64, biome: Biome, dictionary: &VoxelDictionary, depth: usize) -> Vec<VoxelId> {
        self.fill_column(base, biome, depth, dictionary, &Palette::new(dictionary))
    }

    fn fill_column(
        &self,
        base: f64,
        biome: Biome,
        depth: usize,
        dictionary: &VoxelDictionary,
        palette: &Palette,
    ) -> Vec<VoxelId> {
        let surface_level = self.params.surface_features_begin_at;
        let water_level = self.params.water_level;
        let subsurface = dictionary.pointer_to(biome.subsurface_block());
        let surface = dictionary.pointer_to(biome.surface_block());

        // Later rules overwrite earlier ones
        let mut column: Vec<VoxelId> = (0..depth as i32)
            .map(|z| {
                let noise = self.noise_at_depth(base, z);
                let level = noise.floor() as i32;
                let top = surface_level + level + 2;

                let mut id = palette.air;
                if z <= water_level {
                    id = palette.water;
                }
                if z <= top {
                    id = subsurface;
                }
                if z == top && top >= water_level {
                    id = surface;
                }
                if z <= surface_level + level - 1
                    || z <= surface_level - (2 + (noise / 10.0).floor() as i32)
                {
                    id = palette.stone;
                }
                id
            })
            .collect();

        // Beaches: ground right under water turns to sand
        for z in 0..depth {
            let above = column.get(z + 1).copied();
            if above != Some(palette.water) {
                continue;
            }
            if z as i32 == surface_level + 2 && column[z] != palette.water {
                column[z] = palette.sand;
            }
            if column[z] == palette.dirt {
                column[z] = palette.sand;
            }
        }

        column
    }
}
