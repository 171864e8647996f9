//! Voxel data structures and operations

pub mod voxel;
pub mod dictionary;
pub mod chunk;
pub mod visibility;
pub mod world;

pub use voxel::{MaterialClass, VoxelId, VoxelKind};
pub use dictionary::VoxelDictionary;
pub use chunk::{Chunk, ChunkCoord};
pub use visibility::VisibleVoxel;
pub use world::{SharedWorld, World};
