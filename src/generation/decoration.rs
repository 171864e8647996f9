//! Surface decorations: tall grass, flowers and trees.
//!
//! Decorations are dropped onto an existing column: the scan starts at the
//! top of the chunk and moves down until it finds an Air cell sitting on the
//! required support block.

use std::sync::Mutex;

use crate::terrain::biome::BiomeSampler;
use crate::voxel::{Chunk, ChunkCoord, VoxelId};

/// Odds (1 in n) of each decoration per column
const TALL_GRASS_ODDS: u32 = 2;
const FLOWER_ODDS: u32 = 5;
const TREE_ODDS: u32 = 50;

impl Chunk {
    /// Drop `decoration` onto the highest `support` block in column (x, y)
    /// that has Air above it. Returns whether anything was placed.
    pub fn place_decoration(&mut self, x: i32, y: i32, decoration: VoxelId, support: VoxelId) -> bool {
        let support_name = self.dictionary().kind(support).name.clone();

        for z in (0..self.depth() as i32).rev() {
            if self.name_at(x, y, z - 1) == support_name && self.get(x, y, z).is_air() {
                return self.set(x, y, z, decoration);
            }
        }

        false
    }

    /// Grow a tree on the highest grass block in column (x, y)
    ///
    /// The trunk runs four blocks up from the grass. Leaves cover a 3×3 square
    /// at the trunk top and a rounded cap one block higher. Fails without
    /// touching the chunk when the grass has anything but Air above it.
    pub fn place_tree(&mut self, x: i32, y: i32) -> bool {
        let Some(ground) = (0..self.depth() as i32).rev().find(|&z| {
            matches!(self.name_at(x, y, z), "Grass" | "Snowy_Grass")
        }) else {
            return false;
        };

        if !self.get(x, y, ground + 1).is_air() {
            return false;
        }

        let dictionary = self.dictionary().clone();
        let leaves = if self.name_at(x, y, ground) == "Snowy_Grass" {
            dictionary.pointer_to("Snowy_Leaves")
        } else {
            dictionary.pointer_to("Leaves")
        };
        let wood = dictionary.pointer_to("Wood");

        for dx in -1..=1i32 {
            for dy in -1..=1i32 {
                self.set(x + dx, y + dy, ground + 4, leaves);
                if dx.abs() != dy.abs() {
                    self.set(x + dx, y + dy, ground + 5, leaves);
                }
            }
        }
        self.set(x, y, ground + 5, leaves);

        for z in ground + 1..=ground + 4 {
            self.set(x, y, z, wood);
        }

        true
    }
}

/// Scatters decorations using one random stream shared by every chunk
///
/// Placement depends on the order chunks are generated in, so it only repeats
/// within a run unless the stream is reseeded.
pub struct Decorator {
    rng: Mutex<fastrand::Rng>,
}

impl Decorator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Restart the stream from a fixed seed
    pub fn reseed(&self, seed: u64) {
        self.rng.lock().unwrap_or_else(|e| e.into_inner()).seed(seed);
    }

    /// Decorate every column of a freshly filled chunk
    pub fn decorate(&self, chunk: &mut Chunk, coord: ChunkCoord, biomes: &BiomeSampler) {
        let dictionary = chunk.dictionary().clone();
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        for x in 0..chunk.width() as i32 {
            for y in 0..chunk.height() as i32 {
                let biome = biomes.biome_at(coord, x, y);
                let support = dictionary.pointer_to(biome.surface_block());
                let plants = biome.plants();

                // One draw of each kind per column, whatever the biome
                if rng.u32(0..TALL_GRASS_ODDS) == 0 {
                    if let Some(plants) = plants {
                        chunk.place_decoration(x, y, dictionary.pointer_to(plants.tall_grass), support);
                    }
                }

                if rng.u32(0..FLOWER_ODDS) == 0 {
                    if let Some(plants) = plants {
                        chunk.place_decoration(x, y, dictionary.pointer_to(plants.flower), support);
                    }
                }

                if rng.u32(0..TREE_ODDS) == 0 {
                    chunk.place_tree(x, y);
                }
            }
        }
    }
}

impl Default for Decorator {
    fn default() -> Self {
        Self::new()
    }
}
