//! Voronoi biome partitioning over chunk space
//!
//! Every chunk owns one jittered sample point with a biome. A column takes the
//! biome of the nearest sample among the 3×3 chunks around its own chunk.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::voxel::ChunkCoord;

/// Terrain style of a region
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Biome {
    Plains,
    Snowy,
    Forest,
    Desert,
    /// Has terrain rules but is never drawn by the sampler
    Mountains,
}

impl Biome {
    /// Biomes the Voronoi sampler draws from, in draw order
    pub const SAMPLED: [Biome; 4] = [Biome::Plains, Biome::Snowy, Biome::Forest, Biome::Desert];

    /// Kind filling the ground between bedrock and surface
    pub fn subsurface_block(&self) -> &'static str {
        match self {
            Biome::Plains | Biome::Snowy | Biome::Forest => "Dirt",
            Biome::Mountains => "Stone",
            Biome::Desert => "Sand",
        }
    }

    /// Kind placed on the top layer of dry land
    pub fn surface_block(&self) -> &'static str {
        match self {
            Biome::Snowy => "Snowy_Grass",
            Biome::Mountains => "Stone",
            Biome::Desert => "Sand",
            Biome::Plains | Biome::Forest => "Grass",
        }
    }

    /// Flower and tall-grass kinds, if this biome grows plants
    pub fn plants(&self) -> Option<Plants> {
        match self {
            Biome::Snowy => Some(Plants {
                flower: "Snowy_Flower",
                tall_grass: "Snowy_Tall_Grass",
            }),
            Biome::Plains | Biome::Forest => Some(Plants {
                flower: "Flower",
                tall_grass: "Tall_Grass",
            }),
            Biome::Desert | Biome::Mountains => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Biome::Plains => "Plains",
            Biome::Snowy => "Snowy",
            Biome::Forest => "Forest",
            Biome::Desert => "Desert",
            Biome::Mountains => "Mountains",
        }
    }
}

/// Small decorations a biome scatters over its surface block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Plants {
    pub flower: &'static str,
    pub tall_grass: &'static str,
}

/// One biome sample: a chunk, a jittered offset inside it, and its biome
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoronoiPoint {
    pub chunk: ChunkCoord,
    /// Offset within the chunk in voxels
    pub x: i32,
    pub y: i32,
    pub biome: Biome,
}

impl VoronoiPoint {
    /// Global voxel position of the sample
    pub fn global_position(&self, chunk_size: i32) -> (i32, i32) {
        (
            self.chunk.x * chunk_size + self.x,
            self.chunk.y * chunk_size + self.y,
        )
    }
}

/// Deterministic Voronoi sampler with a bounded point cache
pub struct BiomeSampler {
    chunk_size: i32,
    cache: Mutex<LruCache<ChunkCoord, VoronoiPoint>>,
}

impl BiomeSampler {
    pub fn new(chunk_size: i32, cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            chunk_size,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The sample point owned by a chunk
    ///
    /// Seeded only from `x + y`, so it does not depend on the world seed.
    pub fn point(&self, chunk: ChunkCoord) -> VoronoiPoint {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(point) = cache.get(&chunk) {
            return *point;
        }

        let point = Self::draw_point(chunk, self.chunk_size);
        cache.put(chunk, point);
        point
    }

    fn draw_point(chunk: ChunkCoord, chunk_size: i32) -> VoronoiPoint {
        let mut rng = fastrand::Rng::with_seed((chunk.x as i64 + chunk.y as i64) as u64);
        let x = rng.i32(0..chunk_size);
        let y = rng.i32(0..chunk_size);
        let biome = Biome::SAMPLED[rng.usize(0..Biome::SAMPLED.len())];

        VoronoiPoint { chunk, x, y, biome }
    }

    /// Nearest sample to a local position among the 3×3 chunk neighborhood
    ///
    /// Ties go to the first point in x-major neighborhood order.
    pub fn nearest_point(&self, chunk: ChunkCoord, local_x: i32, local_y: i32) -> VoronoiPoint {
        let global_x = (chunk.x * self.chunk_size + local_x) as f64;
        let global_y = (chunk.y * self.chunk_size + local_y) as f64;

        let mut nearest = self.point(chunk);
        let mut min_distance = f64::MAX;
        for neighbor in chunk.neighborhood(1) {
            let point = self.point(neighbor);
            let (px, py) = point.global_position(self.chunk_size);
            let distance = (global_x - px as f64).hypot(global_y - py as f64);
            if distance < min_distance {
                min_distance = distance;
                nearest = point;
            }
        }

        nearest
    }

    /// Biome at a local position
    pub fn biome_at(&self, chunk: ChunkCoord, local_x: i32, local_y: i32) -> Biome {
        self.nearest_point(chunk, local_x, local_y).biome
    }

    /// Drop every cached point
    pub fn clear(&self) {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn cached_points(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
