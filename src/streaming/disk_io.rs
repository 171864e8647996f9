//! Chunk serialization and save-directory I/O
//!
//! Save layout:
//! ```text
//! <save>/world.json          seed, save path (and chunks, in snapshot layout)
//! <save>/player.json         position and velocity
//! <save>/terrain/chunkX_Y.json
//! <save>/entity/
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::player::{PlayerRecord, PlayerState};
use crate::voxel::{Chunk, ChunkCoord, VoxelDictionary, VoxelId};

pub const WORLD_FILE: &str = "world.json";
pub const PLAYER_FILE: &str = "player.json";
pub const TERRAIN_DIR: &str = "terrain";
pub const ENTITY_DIR: &str = "entity";

/// Serialized chunk: a name table of the kinds the chunk actually uses, and
/// one table index per cell in storage order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub voxel_names_short: BTreeMap<String, u32>,
    pub voxel_names: Vec<u32>,
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl ChunkRecord {
    /// Encode a chunk; table indices follow first use in storage order
    pub fn from_chunk(chunk: &Chunk) -> Self {
        let dictionary = chunk.dictionary();
        let mut voxel_names_short = BTreeMap::new();
        let mut by_id: HashMap<VoxelId, u32> = HashMap::new();

        let voxel_names = chunk
            .voxels()
            .iter()
            .map(|id| {
                *by_id.entry(*id).or_insert_with(|| {
                    let next = voxel_names_short.len() as u32;
                    *voxel_names_short
                        .entry(dictionary.kind(*id).name.clone())
                        .or_insert(next)
                })
            })
            .collect();

        Self {
            voxel_names_short,
            voxel_names,
            width: chunk.width(),
            height: chunk.height(),
            depth: chunk.depth(),
        }
    }

    /// Decode against `dictionary`
    ///
    /// Names the dictionary no longer has, and indices missing from the
    /// table, decode to the Error kind.
    pub fn into_chunk(self, dictionary: Arc<VoxelDictionary>) -> Result<Chunk> {
        let mut table = vec![VoxelId::ERROR; self.voxel_names_short.len()];
        for (name, index) in &self.voxel_names_short {
            if let Some(slot) = table.get_mut(*index as usize) {
                *slot = dictionary.pointer_to(name);
            }
        }

        let voxels = self
            .voxel_names
            .iter()
            .map(|index| table.get(*index as usize).copied().unwrap_or(VoxelId::ERROR))
            .collect();

        Chunk::from_flat(self.width, self.height, self.depth, voxels, dictionary)
    }
}

/// Contents of `world.json`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldMetadata {
    pub seed: i64,
    pub save_path: PathBuf,
    /// Chunk payloads keyed `"x,y"`; only used by the snapshot layout
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub chunks: BTreeMap<String, ChunkRecord>,
}

impl WorldMetadata {
    pub fn new(seed: i64, save_path: impl Into<PathBuf>) -> Self {
        Self {
            seed,
            save_path: save_path.into(),
            chunks: BTreeMap::new(),
        }
    }
}

/// Serialize a chunk to JSON bytes
pub fn encode_chunk(chunk: &Chunk) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&ChunkRecord::from_chunk(chunk))?)
}

/// Deserialize a chunk from JSON bytes; `path` names the source in errors
pub fn decode_chunk(data: &[u8], path: &Path, dictionary: Arc<VoxelDictionary>) -> Result<Chunk> {
    let record: ChunkRecord = serde_json::from_slice(data).map_err(|e| Error::decode(path, e))?;
    record.into_chunk(dictionary)
}

/// Snapshot key for a chunk
pub fn chunk_key(coord: ChunkCoord) -> String {
    format!("{},{}", coord.x, coord.y)
}

/// Parse a `"x,y"` snapshot key
pub fn parse_chunk_key(key: &str) -> Result<ChunkCoord> {
    let invalid = || Error::InvalidChunkKey(key.to_string());
    let (x, y) = key.split_once(',').ok_or_else(invalid)?;
    Ok(ChunkCoord::new(
        x.trim().parse().map_err(|_| invalid())?,
        y.trim().parse().map_err(|_| invalid())?,
    ))
}

/// File name of a chunk in the terrain directory
pub fn chunk_file_name(coord: ChunkCoord) -> String {
    format!("chunk{}_{}.json", coord.x, coord.y)
}

/// Parse a `chunk<x>_<y>.json` file name
pub fn parse_chunk_file_name(name: &str) -> Result<ChunkCoord> {
    let invalid = || Error::InvalidChunkKey(name.to_string());
    let stem = name
        .strip_prefix("chunk")
        .and_then(|rest| rest.strip_suffix(".json"))
        .ok_or_else(invalid)?;
    let (x, y) = stem.split_once('_').ok_or_else(invalid)?;
    Ok(ChunkCoord::new(
        x.parse().map_err(|_| invalid())?,
        y.parse().map_err(|_| invalid())?,
    ))
}

pub fn world_file(root: &Path) -> PathBuf {
    root.join(WORLD_FILE)
}

pub fn player_file(root: &Path) -> PathBuf {
    root.join(PLAYER_FILE)
}

pub fn terrain_dir(root: &Path) -> PathBuf {
    root.join(TERRAIN_DIR)
}

/// Path of a chunk file in the split layout
pub fn chunk_path(root: &Path, coord: ChunkCoord) -> PathBuf {
    terrain_dir(root).join(chunk_file_name(coord))
}

/// Create the save directory and its `terrain/` and `entity/` subdirectories
pub fn create_save_dirs(root: &Path) -> Result<()> {
    std::fs::create_dir_all(terrain_dir(root))?;
    std::fs::create_dir_all(root.join(ENTITY_DIR))?;
    Ok(())
}

/// Write through a temporary file so readers never see a partial file
fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Read a file, mapping "not found" to `None`
fn read_file(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write `world.json`
pub fn write_metadata(root: &Path, metadata: &WorldMetadata) -> Result<()> {
    write_file(&world_file(root), &serde_json::to_vec(metadata)?)
}

/// Read `world.json`; `None` means no save exists
pub fn read_metadata(root: &Path) -> Result<Option<WorldMetadata>> {
    let path = world_file(root);
    let Some(data) = read_file(&path)? else {
        return Ok(None);
    };
    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|e| Error::decode(path, e))
}

/// Write a chunk file in the split layout
pub fn write_chunk(root: &Path, coord: ChunkCoord, chunk: &Chunk) -> Result<()> {
    write_file(&chunk_path(root, coord), &encode_chunk(chunk)?)
}

/// Read a chunk file; `None` means the chunk was never saved
pub fn read_chunk(
    root: &Path,
    coord: ChunkCoord,
    dictionary: Arc<VoxelDictionary>,
) -> Result<Option<Chunk>> {
    let path = chunk_path(root, coord);
    match read_file(&path)? {
        Some(data) => decode_chunk(&data, &path, dictionary).map(Some),
        None => Ok(None),
    }
}

/// Check whether a chunk file exists in the split layout
pub fn chunk_exists(root: &Path, coord: ChunkCoord) -> bool {
    chunk_path(root, coord).is_file()
}

/// Coordinates of every chunk file in the terrain directory
pub fn list_chunks(root: &Path) -> Result<Vec<ChunkCoord>> {
    let dir = terrain_dir(root);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut coords = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let name = entry?.file_name();
        match parse_chunk_file_name(&name.to_string_lossy()) {
            Ok(coord) => coords.push(coord),
            Err(e) => log::debug!("Skipping {}", e),
        }
    }
    coords.sort();
    Ok(coords)
}

/// Write `player.json`
pub fn write_player(root: &Path, player: &PlayerState) -> Result<()> {
    write_file(&player_file(root), &serde_json::to_vec(&PlayerRecord::from(player))?)
}

/// Read `player.json`; `None` means no player was saved
pub fn read_player(root: &Path) -> Result<Option<PlayerState>> {
    let path = player_file(root);
    let Some(data) = read_file(&path)? else {
        return Ok(None);
    };
    let record: PlayerRecord = serde_json::from_slice(&data).map_err(|e| Error::decode(path, e))?;
    Ok(Some(record.into()))
}
