//! Chunk generation pipeline.
//!
//! The pipeline runs, per chunk:
//! 1. Height-field column fill (noise + Voronoi biome per column)
//! 2. Decoration pass (tall grass, flowers, trees)

pub mod config;
pub mod decoration;

pub use config::GenerationConfig;
pub use decoration::Decorator;

use std::sync::Arc;

use crate::terrain::biome::{Biome, BiomeSampler};
use crate::terrain::generator::{NoiseJitter, TerrainGenerator, TerrainParams};
use crate::voxel::{Chunk, ChunkCoord, VoxelDictionary};

/// Builds complete chunks from a seed and a chunk coordinate.
///
/// Shared between the world and the streaming task; every method takes
/// `&self`.
pub struct ChunkGenerator {
    config: GenerationConfig,
    terrain: TerrainGenerator,
    biomes: BiomeSampler,
    decorator: Decorator,
}

impl ChunkGenerator {
    /// Create a generator with persistence/lacunarity drawn from `rng`.
    pub fn new(config: &GenerationConfig, rng: &mut fastrand::Rng) -> Self {
        Self::with_jitter(config, NoiseJitter::draw(rng))
    }

    /// Create a generator with fixed noise parameters.
    pub fn with_jitter(config: &GenerationConfig, jitter: NoiseJitter) -> Self {
        let terrain = TerrainGenerator::new(TerrainParams::from_config(config, jitter));
        let biomes = BiomeSampler::new(config.chunk_size as i32, config.voronoi_cache_capacity);

        log::debug!(
            "Generator seed {} persistence {:.2} lacunarity {:.2}",
            config.seed,
            jitter.persistence,
            jitter.lacunarity
        );

        Self {
            config: config.clone(),
            terrain,
            biomes,
            decorator: Decorator::new(),
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn terrain(&self) -> &TerrainGenerator {
        &self.terrain
    }

    pub fn biomes(&self) -> &BiomeSampler {
        &self.biomes
    }

    /// Biome at a local position in a chunk.
    pub fn biome_at(&self, coord: ChunkCoord, x: i32, y: i32) -> Biome {
        self.biomes.biome_at(coord, x, y)
    }

    /// Restart the decoration stream so the next chunks decorate reproducibly.
    pub fn reseed_decorations(&self, seed: u64) {
        self.decorator.reseed(seed);
    }

    /// Generate a chunk: terrain only, without decorations.
    pub fn generate_terrain(&self, coord: ChunkCoord, dictionary: Arc<VoxelDictionary>) -> Chunk {
        let air = dictionary.pointer_to("Air");
        let mut chunk = Chunk::filled(
            self.config.chunk_size,
            self.config.chunk_size,
            self.config.chunk_depth,
            air,
            dictionary,
        );
        self.terrain.fill_chunk(&mut chunk, coord, &self.biomes);
        chunk
    }

    /// Generate a complete chunk.
    pub fn generate(&self, coord: ChunkCoord, dictionary: Arc<VoxelDictionary>) -> Chunk {
        let mut chunk = self.generate_terrain(coord, dictionary);
        self.decorator.decorate(&mut chunk, coord, &self.biomes);
        log::trace!("Generated chunk ({}, {})", coord.x, coord.y);
        chunk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> GenerationConfig {
        GenerationConfig {
            chunk_size: 8,
            chunk_depth: 40,
            ..GenerationConfig::with_seed(4311080085)
        }
    }

    fn jitter() -> NoiseJitter {
        NoiseJitter { persistence: 0.55, lacunarity: 0.3 }
    }

    #[test]
    fn test_generate_dimensions() {
        let generator = ChunkGenerator::with_jitter(&small_config(), jitter());
        let chunk = generator.generate(ChunkCoord::new(0, 0), VoxelDictionary::default_dictionary());
        assert_eq!((chunk.width(), chunk.height(), chunk.depth()), (8, 8, 40));
        assert!(chunk.kinds().all(|kind| !kind.is_error()));
    }

    #[test]
    fn test_terrain_deterministic_across_generators() {
        let dictionary = VoxelDictionary::default_dictionary();
        let coord = ChunkCoord::new(2, -3);

        let mut rng = fastrand::Rng::with_seed(1);
        let a = ChunkGenerator::new(&small_config(), &mut rng);
        let mut rng = fastrand::Rng::with_seed(1);
        let b = ChunkGenerator::new(&small_config(), &mut rng);

        assert_eq!(
            a.generate_terrain(coord, dictionary.clone()),
            b.generate_terrain(coord, dictionary)
        );
    }

    #[test]
    fn test_generate_deterministic_with_reseeded_decorations() {
        let generator = ChunkGenerator::with_jitter(&small_config(), jitter());
        let dictionary = VoxelDictionary::default_dictionary();
        let coord = ChunkCoord::new(-1, 4);

        generator.reseed_decorations(99);
        let first = generator.generate(coord, dictionary.clone());
        generator.reseed_decorations(99);
        let second = generator.generate(coord, dictionary);

        assert_eq!(first, second);
    }

    #[test]
    fn test_bottom_layer_is_solid() {
        let generator = ChunkGenerator::with_jitter(&small_config(), jitter());
        let chunk = generator.generate_terrain(ChunkCoord::new(5, 5), VoxelDictionary::default_dictionary());
        for x in 0..8 {
            for y in 0..8 {
                assert_eq!(chunk.name_at(x, y, 0), "Stone");
            }
        }
    }
}
