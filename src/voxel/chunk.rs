//! Chunk system for managing dense blocks of voxel space

use std::sync::Arc;

use super::dictionary::VoxelDictionary;
use super::voxel::{VoxelId, VoxelKind};
use crate::core::{Error, Result};

/// Integer coordinate identifying a chunk column in the world grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    /// Create a new chunk coordinate
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk containing the global voxel column (x, y)
    pub fn from_global(x: i32, y: i32, chunk_size: i32) -> Self {
        Self {
            x: x.div_euclid(chunk_size),
            y: y.div_euclid(chunk_size),
        }
    }

    /// Chebyshev distance in chunk units
    pub fn chebyshev_distance(&self, other: ChunkCoord) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// All coordinates within `radius` of this one (inclusive square), x-major
    pub fn neighborhood(&self, radius: i32) -> impl Iterator<Item = ChunkCoord> + use<> {
        let center = *self;
        (center.x - radius..=center.x + radius).flat_map(move |x| {
            (center.y - radius..=center.y + radius).map(move |y| ChunkCoord::new(x, y))
        })
    }
}

/// A dense width × height × depth block of voxels
///
/// Cells are stored flat at `x + y * width + z * width * height`. Every
/// accessor is bounds-checked: reads outside the chunk resolve to the Error
/// kind and writes outside it are rejected.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    width: usize,
    height: usize,
    depth: usize,
    voxels: Vec<VoxelId>,
    dictionary: Arc<VoxelDictionary>,
}

impl Chunk {
    /// Create a chunk with every cell set to `fill`
    pub fn filled(
        width: usize,
        height: usize,
        depth: usize,
        fill: VoxelId,
        dictionary: Arc<VoxelDictionary>,
    ) -> Self {
        assert!(width > 0 && height > 0 && depth > 0, "chunk dimensions must be non-zero");
        Self {
            width,
            height,
            depth,
            voxels: vec![fill; width * height * depth],
            dictionary,
        }
    }

    /// Create a chunk from a pre-sized flat array in `x + y*w + z*w*h` order
    pub fn from_flat(
        width: usize,
        height: usize,
        depth: usize,
        voxels: Vec<VoxelId>,
        dictionary: Arc<VoxelDictionary>,
    ) -> Result<Self> {
        // Dimensions may come from untrusted save data
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(depth))
            .unwrap_or(usize::MAX);
        if expected == 0 || voxels.len() != expected {
            return Err(Error::ChunkShape {
                expected,
                actual: voxels.len(),
            });
        }

        Ok(Self {
            width,
            height,
            depth,
            voxels,
            dictionary,
        })
    }

    /// Create a chunk from nested `[x][y][z]` data, as used by hand-authored chunks
    pub fn from_nested(
        voxels: &[Vec<Vec<VoxelId>>],
        dictionary: Arc<VoxelDictionary>,
    ) -> Result<Self> {
        let width = voxels.len();
        let height = voxels.first().map_or(0, |plane| plane.len());
        let depth = voxels
            .first()
            .and_then(|plane| plane.first())
            .map_or(0, |column| column.len());
        let expected = width * height * depth;

        let rectangular = voxels.iter().all(|plane| {
            plane.len() == height && plane.iter().all(|column| column.len() == depth)
        });
        if !rectangular {
            let actual = voxels.iter().flatten().map(Vec::len).sum();
            return Err(Error::ChunkShape { expected, actual });
        }

        let mut flat = vec![VoxelId::ERROR; expected];
        for (x, plane) in voxels.iter().enumerate() {
            for (y, column) in plane.iter().enumerate() {
                for (z, id) in column.iter().enumerate() {
                    flat[x + y * width + z * width * height] = *id;
                }
            }
        }

        Self::from_flat(width, height, depth, flat, dictionary)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// The dictionary this chunk's ids refer to
    pub fn dictionary(&self) -> &Arc<VoxelDictionary> {
        &self.dictionary
    }

    /// Raw cell ids in storage order
    pub fn voxels(&self) -> &[VoxelId] {
        &self.voxels
    }

    /// Check if a local coordinate lies inside the chunk
    pub fn is_in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.width
            && (y as usize) < self.height
            && (z as usize) < self.depth
    }

    /// Storage index of a local coordinate, if in bounds
    pub fn index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        self.is_in_bounds(x, y, z).then(|| {
            x as usize + y as usize * self.width + z as usize * self.width * self.height
        })
    }

    /// Id at a local coordinate, `VoxelId::ERROR` when out of bounds
    pub fn get_id(&self, x: i32, y: i32, z: i32) -> VoxelId {
        self.index(x, y, z)
            .map_or(VoxelId::ERROR, |index| self.voxels[index])
    }

    /// Kind at a local coordinate, the Error kind when out of bounds
    pub fn get(&self, x: i32, y: i32, z: i32) -> &VoxelKind {
        self.dictionary.kind(self.get_id(x, y, z))
    }

    /// Kind name at a local coordinate
    pub fn name_at(&self, x: i32, y: i32, z: i32) -> &str {
        &self.get(x, y, z).name
    }

    /// Set a cell; returns `false` without touching anything when out of bounds
    pub fn set(&mut self, x: i32, y: i32, z: i32, id: VoxelId) -> bool {
        match self.index(x, y, z) {
            Some(index) => {
                self.voxels[index] = id;
                true
            }
            None => false,
        }
    }

    /// Set a cell by kind name (unknown names store the Error id)
    pub fn set_named(&mut self, x: i32, y: i32, z: i32, name: &str) -> bool {
        let id = self.dictionary.pointer_to(name);
        self.set(x, y, z, id)
    }

    /// Kinds of every cell in storage order
    pub fn kinds(&self) -> impl Iterator<Item = &VoxelKind> {
        self.voxels.iter().map(|id| self.dictionary.kind(*id))
    }
}
