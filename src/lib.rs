//! Isoworld - a chunked voxel world with procedural terrain and disk streaming

pub mod core;
pub mod voxel;
pub mod terrain;
pub mod generation;
pub mod streaming;
pub mod player;
