//! Generation configuration shared by the world and the generator.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Configuration for chunk generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// World seed for the height field.
    pub seed: i64,
    /// Chunk width and height in voxels.
    pub chunk_size: usize,
    /// Chunk depth (vertical extent) in voxels.
    pub chunk_depth: usize,
    /// Base level terrain features are built on.
    pub surface_features_begin_at: i32,
    /// Water level sits this far above the surface-features level.
    pub water_offset: i32,
    /// Noise sampling scale per global voxel.
    pub noise_scale: f64,
    /// Height-field amplitude.
    pub noise_amplitude: f64,
    /// Depth above which the height field is doubled.
    pub mountain_depth: i32,
    /// FBM octaves.
    pub octaves: usize,
    /// Max Voronoi points kept in the biome cache.
    pub voronoi_cache_capacity: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: 4311080085,
            chunk_size: 32,
            chunk_depth: 64,
            surface_features_begin_at: 10,
            water_offset: 5,
            noise_scale: 0.02,
            noise_amplitude: 10.0,
            mountain_depth: 30,
            octaves: 3,
            voronoi_cache_capacity: 4096,
        }
    }
}

impl GenerationConfig {
    /// Default configuration with a different seed.
    pub fn with_seed(seed: i64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file; missing fields take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|e| Error::decode(path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject chunk dimensions no chunk can be built with.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_depth == 0 {
            return Err(Error::InvalidConfig(format!(
                "chunk dimensions must be non-zero (chunk_size {}, chunk_depth {})",
                self.chunk_size, self.chunk_depth
            )));
        }
        Ok(())
    }

    pub fn water_level(&self) -> i32 {
        self.surface_features_begin_at + self.water_offset
    }
}
