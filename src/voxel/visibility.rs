//! Face-culling visibility pass over a chunk
//!
//! The isometric view only ever sees the +x, +y and +z faces of a voxel, so a
//! voxel is drawn when one of those three neighbors can be seen through, or
//! when it sits on the chunk boundary where the neighbor chunk may be missing.

use super::chunk::Chunk;
use super::voxel::{MaterialClass, VoxelKind};

/// A voxel that survives culling, in local chunk coordinates
#[derive(Clone, Copy, Debug)]
pub struct VisibleVoxel<'a> {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub kind: &'a VoxelKind,
}

impl Chunk {
    /// Voxels the renderer should draw, in x → y → z order
    pub fn visible_voxels(&self) -> impl Iterator<Item = VisibleVoxel<'_>> {
        let transparent = self.dictionary().transparent_names();
        let (w, h, d) = (self.width() as i32, self.height() as i32, self.depth() as i32);

        (0..w)
            .flat_map(move |x| (0..h).flat_map(move |y| (0..d).map(move |z| (x, y, z))))
            .filter_map(move |(x, y, z)| {
                let kind = self.get(x, y, z);
                self.is_visible(x, y, z, kind, &transparent)
                    .then_some(VisibleVoxel { x, y, z, kind })
            })
    }

    fn is_visible(&self, x: i32, y: i32, z: i32, kind: &VoxelKind, transparent: &[&str]) -> bool {
        if kind.is_air() {
            return false;
        }

        let neighbors = [
            self.get(x + 1, y, z),
            self.get(x, y + 1, z),
            self.get(x, y, z + 1),
        ];

        let on_boundary = x == 0
            || y == 0
            || z == 0
            || x == self.width() as i32 - 1
            || y == self.height() as i32 - 1
            || z == self.depth() as i32 - 1;
        let exposed = neighbors
            .iter()
            .any(|neighbor| transparent.contains(&neighbor.name.as_str()));

        if !exposed && !on_boundary {
            return false;
        }

        // Water inside water: nothing to draw
        if kind.class == MaterialClass::Transparent
            && neighbors.iter().all(|neighbor| neighbor.name == kind.name)
        {
            return false;
        }

        true
    }
}
