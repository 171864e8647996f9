//! Player state consumed by streaming and persisted to `player.json`

use serde::{Deserialize, Serialize};

use crate::core::Vec3;
use crate::voxel::{ChunkCoord, World};

/// Player position and motion
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerState {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Per-axis velocity multiplier applied every step
    pub drag: Vec3,
    pub texture: String,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

impl PlayerState {
    pub const DEFAULT_DRAG: Vec3 = Vec3::new(0.9, 0.9, 0.9);
    pub const DEFAULT_TEXTURE: &'static str = "Default";

    /// A player standing still at `position`
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            drag: Self::DEFAULT_DRAG,
            texture: Self::DEFAULT_TEXTURE.to_string(),
        }
    }

    /// Chunk the player stands in
    pub fn chunk_coord(&self, chunk_size: usize) -> ChunkCoord {
        ChunkCoord::from_global(
            self.position.x.floor() as i32,
            self.position.y.floor() as i32,
            chunk_size as i32,
        )
    }

    /// Apply drag, move, then land on any solid voxel under the new position
    ///
    /// Returns `true` when the player is resting on ground.
    pub fn step(&mut self, world: &World) -> bool {
        self.velocity *= self.drag;
        self.position += self.velocity;

        let (x, y, z) = (
            self.position.x.floor() as i32,
            self.position.y.floor() as i32,
            self.position.z.floor() as i32,
        );
        match world.voxel_at(x, y, z) {
            Some(kind) if !kind.is_air() && !kind.class.is_transparent() => {
                self.position.z = (z + 1) as f32;
                self.velocity.z = self.velocity.z.max(0.0);
                true
            }
            _ => false,
        }
    }
}

/// Persisted subset of the player: drag and texture are restored to defaults
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub position: [f32; 3],
    pub velocity: [f32; 3],
}

impl From<&PlayerState> for PlayerRecord {
    fn from(player: &PlayerState) -> Self {
        Self {
            position: player.position.to_array(),
            velocity: player.velocity.to_array(),
        }
    }
}

impl From<PlayerRecord> for PlayerState {
    fn from(record: PlayerRecord) -> Self {
        Self {
            velocity: Vec3::from_array(record.velocity),
            ..Self::at(Vec3::from_array(record.position))
        }
    }
}
