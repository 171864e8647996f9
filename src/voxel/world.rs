//! World container managing the loaded chunks and their generator

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::chunk::{Chunk, ChunkCoord};
use super::dictionary::VoxelDictionary;
use super::voxel::VoxelKind;
use crate::generation::{ChunkGenerator, GenerationConfig};
use crate::streaming::disk_io;

/// World shared between the foreground loop and the streaming task
pub type SharedWorld = Arc<RwLock<World>>;

/// Sparse map of loaded chunks plus the parameters they are generated from
pub struct World {
    config: GenerationConfig,
    save_path: PathBuf,
    surface_features_begin_at: i32,
    water_level: i32,
    dictionary: Arc<VoxelDictionary>,
    generator: Arc<ChunkGenerator>,
    /// Map from chunk coordinates to loaded chunks
    chunks: HashMap<ChunkCoord, Chunk>,
}

impl World {
    /// Create an empty world, initialized from `config.seed`
    pub fn new(config: GenerationConfig, save_path: impl Into<PathBuf>) -> Self {
        Self::with_dictionary(config, save_path, VoxelDictionary::default_dictionary())
    }

    /// Create an empty world that generates chunks against `dictionary`
    pub fn with_dictionary(
        config: GenerationConfig,
        save_path: impl Into<PathBuf>,
        dictionary: Arc<VoxelDictionary>,
    ) -> Self {
        let mut rng = fastrand::Rng::new();
        let generator = Arc::new(ChunkGenerator::new(&config, &mut rng));

        Self {
            surface_features_begin_at: config.surface_features_begin_at,
            water_level: config.water_level(),
            config,
            save_path: save_path.into(),
            dictionary,
            generator,
            chunks: HashMap::new(),
        }
    }

    /// Open the save at `save_path`, or start a fresh world when there is none
    ///
    /// A malformed save is logged and replaced by a fresh world rather than
    /// aborting startup. No chunks are loaded here.
    pub fn open_or_create(config: GenerationConfig, save_path: impl Into<PathBuf>) -> Self {
        let save_path = save_path.into();

        match disk_io::read_metadata(&save_path) {
            Ok(Some(metadata)) => {
                log::info!("Loaded world seed {} from {}", metadata.seed, save_path.display());
                let config = GenerationConfig {
                    seed: metadata.seed,
                    ..config
                };
                Self::new(config, save_path)
            }
            Ok(None) => {
                log::info!("No save at {}, creating a new world", save_path.display());
                Self::new(config, save_path)
            }
            Err(e) => {
                log::warn!("Failed to read save at {}: {}; creating a new world", save_path.display(), e);
                Self::new(config, save_path)
            }
        }
    }

    /// Reset the noise field and terrain levels for a new seed
    ///
    /// Draws a fresh persistence/lacunarity pair and drops the biome cache.
    /// Loaded chunks are kept.
    pub fn initialize(&mut self, seed: i64) {
        self.initialize_with(seed, &mut fastrand::Rng::new());
    }

    /// `initialize` with the persistence/lacunarity draw taken from `rng`
    pub fn initialize_with(&mut self, seed: i64, rng: &mut fastrand::Rng) {
        self.config.seed = seed;
        self.generator = Arc::new(ChunkGenerator::new(&self.config, rng));
        self.surface_features_begin_at = self.config.surface_features_begin_at;
        self.water_level = self.config.water_level();
    }

    pub fn seed(&self) -> i64 {
        self.config.seed
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn chunk_size(&self) -> usize {
        self.config.chunk_size
    }

    pub fn chunk_depth(&self) -> usize {
        self.config.chunk_depth
    }

    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    pub fn surface_features_begin_at(&self) -> i32 {
        self.surface_features_begin_at
    }

    pub fn water_level(&self) -> i32 {
        self.water_level
    }

    pub fn dictionary(&self) -> &Arc<VoxelDictionary> {
        &self.dictionary
    }

    /// Generator handle usable without holding the world lock
    pub fn generator(&self) -> Arc<ChunkGenerator> {
        self.generator.clone()
    }

    /// Get immutable reference to a chunk by coordinate
    pub fn chunk_at(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// Get mutable reference to a chunk by coordinate
    pub fn chunk_at_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord)
    }

    /// Chunk containing a global voxel column
    pub fn chunk_coord_of(&self, global_x: i32, global_y: i32) -> ChunkCoord {
        ChunkCoord::from_global(global_x, global_y, self.config.chunk_size as i32)
    }

    /// Voxel kind at a global position
    ///
    /// `None` means the owning chunk is not loaded: unknown, not empty.
    pub fn voxel_at(&self, global_x: i32, global_y: i32, global_z: i32) -> Option<&VoxelKind> {
        let size = self.config.chunk_size as i32;
        let chunk = self.chunk_at(self.chunk_coord_of(global_x, global_y))?;
        Some(chunk.get(global_x.rem_euclid(size), global_y.rem_euclid(size), global_z))
    }

    /// Generate the chunk at `coord` and insert it
    ///
    /// With `force` an existing chunk is overwritten; otherwise a loaded chunk
    /// is left alone. Returns whether a chunk was inserted.
    pub fn generate_chunk(&mut self, coord: ChunkCoord, force: bool) -> bool {
        if !force && self.chunks.contains_key(&coord) {
            return false;
        }

        let chunk = self.generator.generate(coord, self.dictionary.clone());
        self.chunks.insert(coord, chunk);
        true
    }

    /// Insert a chunk, replacing and returning any chunk already at `coord`
    pub fn insert_chunk(&mut self, coord: ChunkCoord, chunk: Chunk) -> Option<Chunk> {
        self.chunks.insert(coord, chunk)
    }

    /// Remove a chunk from the world and return it
    pub fn remove_chunk(&mut self, coord: ChunkCoord) -> Option<Chunk> {
        self.chunks.remove(&coord)
    }

    pub fn contains_chunk(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Get the number of loaded chunks
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Coordinates of every loaded chunk, in no particular order
    pub fn loaded_coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunks.keys().copied()
    }

    /// Iterate over all loaded chunks
    pub fn chunks(&self) -> impl Iterator<Item = (&ChunkCoord, &Chunk)> {
        self.chunks.iter()
    }

    /// Wrap the world for sharing with the streaming task
    pub fn into_shared(self) -> SharedWorld {
        Arc::new(RwLock::new(self))
    }
}
