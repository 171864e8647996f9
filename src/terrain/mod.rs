//! Procedural terrain generation

pub mod generator;
pub use generator::{NoiseJitter, TerrainGenerator, TerrainParams};

pub mod biome;
pub use biome::{Biome, BiomeSampler, VoronoiPoint};
