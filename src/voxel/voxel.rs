//! Voxel kind data type

use serde::{Deserialize, Serialize};

/// How a voxel kind takes part in face culling
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialClass {
    /// Hides whatever is behind it
    Opaque,
    /// Lets neighbors show through, but hides adjacent voxels of the same kind
    Transparent,
    /// Never takes part in culling (flowers, tall grass)
    TransparentNoCulling,
}

impl MaterialClass {
    /// Whether neighbors of this class can be seen through
    pub fn is_transparent(self) -> bool {
        !matches!(self, MaterialClass::Opaque)
    }
}

/// A named block type with its culling class and atlas rectangle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoxelKind {
    /// Unique name within its dictionary
    pub name: String,
    /// Culling class
    pub class: MaterialClass,
    /// Texture atlas rectangle `[x0, y0, x1, y1]` in pixels
    pub texture: [u32; 4],
}

impl VoxelKind {
    /// Name of the sentinel kind every invalid lookup resolves to
    pub const ERROR_NAME: &'static str = "Error";
    /// Name of empty space
    pub const AIR_NAME: &'static str = "Air";

    pub fn new(name: impl Into<String>, class: MaterialClass, texture: [u32; 4]) -> Self {
        Self {
            name: name.into(),
            class,
            texture,
        }
    }

    /// Check if this is the error sentinel
    pub fn is_error(&self) -> bool {
        self.name == Self::ERROR_NAME
    }

    /// Check if this is empty space
    pub fn is_air(&self) -> bool {
        self.name == Self::AIR_NAME
    }
}

/// Compact reference to a kind inside a chunk's dictionary
///
/// `VoxelId::ERROR` is reserved: every dictionary resolves it (and any other
/// index past its end) to the Error kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoxelId(pub u16);

impl VoxelId {
    /// Sentinel id for the Error kind
    pub const ERROR: VoxelId = VoxelId(u16::MAX);

    /// Index into the owning dictionary
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_error(self) -> bool {
        self == Self::ERROR
    }
}
