//! Chunk stores: where evicted chunks go and where reloaded chunks come from

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::config::SaveLayout;
use super::disk_io::{self, ChunkRecord, WorldMetadata};
use crate::core::Result;
use crate::voxel::{Chunk, ChunkCoord, VoxelDictionary};

/// Chunks still loaded in memory, collected on demand
pub type Resident<'a> = &'a dyn Fn() -> Vec<(ChunkCoord, Chunk)>;

/// Persistent home of unloaded chunks
pub trait ChunkStore: Send + Sync {
    /// Persist `evicted`, then return the chunks of `wanted` found on disk.
    ///
    /// Persisting finishes before anything is read, so a chunk evicted and
    /// wanted in the same call comes back in its evicted state. Stores that
    /// rewrite the whole save call `resident` when there is no save to build
    /// on yet.
    fn exchange(
        &self,
        evicted: &[(ChunkCoord, Chunk)],
        wanted: &[ChunkCoord],
        dictionary: &Arc<VoxelDictionary>,
        resident: Resident<'_>,
    ) -> Result<Vec<(ChunkCoord, Chunk)>>;

    fn layout(&self) -> SaveLayout;

    fn root(&self) -> &Path;
}

/// Open the store for `layout` at `root`, creating the save directories
pub fn open_store(layout: SaveLayout, root: impl Into<PathBuf>, seed: i64) -> Result<Arc<dyn ChunkStore>> {
    Ok(match layout {
        SaveLayout::SplitFiles => Arc::new(SplitFileStore::open(root, seed)?),
        SaveLayout::Snapshot => Arc::new(SnapshotStore::open(root, seed)?),
    })
}

/// One JSON file per chunk under `terrain/`
pub struct SplitFileStore {
    root: PathBuf,
    seed: i64,
}

impl SplitFileStore {
    pub fn open(root: impl Into<PathBuf>, seed: i64) -> Result<Self> {
        let root = root.into();
        disk_io::create_save_dirs(&root)?;
        Ok(Self { root, seed })
    }
}

impl ChunkStore for SplitFileStore {
    fn exchange(
        &self,
        evicted: &[(ChunkCoord, Chunk)],
        wanted: &[ChunkCoord],
        dictionary: &Arc<VoxelDictionary>,
        _resident: Resident<'_>,
    ) -> Result<Vec<(ChunkCoord, Chunk)>> {
        for (coord, chunk) in evicted {
            disk_io::write_chunk(&self.root, *coord, chunk)?;
        }
        disk_io::write_metadata(&self.root, &WorldMetadata::new(self.seed, &self.root))?;

        let mut found = Vec::new();
        for &coord in wanted {
            match disk_io::read_chunk(&self.root, coord, dictionary.clone()) {
                Ok(Some(chunk)) => found.push((coord, chunk)),
                Ok(None) => {}
                Err(e) => log::error!("Unreadable chunk ({}, {}), regenerating: {}", coord.x, coord.y, e),
            }
        }
        Ok(found)
    }

    fn layout(&self) -> SaveLayout {
        SaveLayout::SplitFiles
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

/// Every chunk embedded in `world.json`
///
/// Each exchange reads the whole snapshot, merges the evicted chunks in, and
/// writes it back. Without a readable snapshot the loaded chunks become the
/// base, and an unreadable `world.json` is moved aside to `world.json.bad`.
pub struct SnapshotStore {
    root: PathBuf,
    seed: i64,
}

impl SnapshotStore {
    pub fn open(root: impl Into<PathBuf>, seed: i64) -> Result<Self> {
        let root = root.into();
        disk_io::create_save_dirs(&root)?;
        Ok(Self { root, seed })
    }

    /// Current snapshot, or an empty one when nothing has been saved yet
    pub fn snapshot(&self) -> Result<WorldMetadata> {
        Ok(disk_io::read_metadata(&self.root)?
            .unwrap_or_else(|| WorldMetadata::new(self.seed, &self.root)))
    }

    fn base(&self, resident: Resident<'_>) -> WorldMetadata {
        match disk_io::read_metadata(&self.root) {
            Ok(Some(snapshot)) => return snapshot,
            Ok(None) => {}
            Err(e) => {
                let world_file = disk_io::world_file(&self.root);
                let aside = world_file.with_extension("json.bad");
                log::error!("Unreadable snapshot, moving it to {}: {}", aside.display(), e);
                if let Err(e) = std::fs::rename(&world_file, &aside) {
                    log::warn!("Could not move {} aside: {}", world_file.display(), e);
                }
            }
        }

        let mut snapshot = WorldMetadata::new(self.seed, &self.root);
        for (coord, chunk) in resident() {
            snapshot
                .chunks
                .insert(disk_io::chunk_key(coord), ChunkRecord::from_chunk(&chunk));
        }
        snapshot
    }
}

impl ChunkStore for SnapshotStore {
    fn exchange(
        &self,
        evicted: &[(ChunkCoord, Chunk)],
        wanted: &[ChunkCoord],
        dictionary: &Arc<VoxelDictionary>,
        resident: Resident<'_>,
    ) -> Result<Vec<(ChunkCoord, Chunk)>> {
        let mut snapshot = self.base(resident);
        snapshot.seed = self.seed;
        for (coord, chunk) in evicted {
            snapshot
                .chunks
                .insert(disk_io::chunk_key(*coord), ChunkRecord::from_chunk(chunk));
        }
        disk_io::write_metadata(&self.root, &snapshot)?;

        let mut found = Vec::with_capacity(wanted.len());
        for &coord in wanted {
            let Some(record) = snapshot.chunks.remove(&disk_io::chunk_key(coord)) else {
                continue;
            };
            match record.into_chunk(dictionary.clone()) {
                Ok(chunk) => found.push((coord, chunk)),
                Err(e) => log::error!("Unreadable chunk ({}, {}), regenerating: {}", coord.x, coord.y, e),
            }
        }
        Ok(found)
    }

    fn layout(&self) -> SaveLayout {
        SaveLayout::Snapshot
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chunk_of(name: &str) -> Chunk {
        let dict = VoxelDictionary::default_dictionary();
        Chunk::filled(2, 2, 4, dict.pointer_to(name), dict)
    }

    fn exercise(store: &dyn ChunkStore) {
        let dict = VoxelDictionary::default_dictionary();
        let a = ChunkCoord::new(0, 0);
        let b = ChunkCoord::new(5, -5);

        // Nothing saved yet
        assert!(store.exchange(&[], &[a, b], &dict, &Vec::new).unwrap().is_empty());

        let found = store
            .exchange(&[(a, chunk_of("Sand")), (b, chunk_of("Stone"))], &[b], &dict, &Vec::new)
            .unwrap();
        assert_eq!(found, vec![(b, chunk_of("Stone"))]);

        // Later evictions overwrite earlier ones
        store.exchange(&[(a, chunk_of("Water"))], &[], &dict, &Vec::new).unwrap();
        let found = store.exchange(&[], &[a], &dict, &Vec::new).unwrap();
        assert_eq!(found, vec![(a, chunk_of("Water"))]);
    }

    #[test]
    fn test_split_file_store() {
        let dir = TempDir::new().unwrap();
        let store = SplitFileStore::open(dir.path(), 7).unwrap();
        exercise(&store);

        assert!(disk_io::chunk_exists(dir.path(), ChunkCoord::new(5, -5)));
        let metadata = disk_io::read_metadata(dir.path()).unwrap().unwrap();
        assert_eq!(metadata.seed, 7);
        assert!(metadata.chunks.is_empty());
    }

    #[test]
    fn test_snapshot_store() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::open(dir.path(), 7).unwrap();
        exercise(&store);

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.seed, 7);
        assert!(snapshot.chunks.contains_key("0,0"));
        assert!(snapshot.chunks.contains_key("5,-5"));
        assert!(!disk_io::chunk_exists(dir.path(), ChunkCoord::new(0, 0)));
    }

    #[test]
    fn test_split_store_skips_unreadable_chunk() {
        let dir = TempDir::new().unwrap();
        let store = SplitFileStore::open(dir.path(), 1).unwrap();
        let coord = ChunkCoord::new(1, 1);
        std::fs::write(disk_io::chunk_path(dir.path(), coord), "garbage").unwrap();

        let dict = VoxelDictionary::default_dictionary();
        assert!(store.exchange(&[], &[coord], &dict, &Vec::new).unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_store_starts_from_resident_chunks() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::open(dir.path(), 7).unwrap();
        let dict = VoxelDictionary::default_dictionary();
        let loaded = ChunkCoord::new(0, 0);
        let far = ChunkCoord::new(9, 9);

        let resident = || vec![(loaded, chunk_of("Sand"))];
        store.exchange(&[(far, chunk_of("Stone"))], &[], &dict, &resident).unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.chunks.keys().collect::<Vec<_>>(), vec!["0,0", "9,9"]);

        // Once a snapshot exists it is the base, not the loaded chunks
        let other = || vec![(ChunkCoord::new(1, 1), chunk_of("Water"))];
        store.exchange(&[], &[], &dict, &other).unwrap();
        assert!(!store.snapshot().unwrap().chunks.contains_key("1,1"));
    }

    #[test]
    fn test_snapshot_store_recovers_from_unreadable_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::open(dir.path(), 7).unwrap();
        let dict = VoxelDictionary::default_dictionary();
        let coord = ChunkCoord::new(2, 3);
        std::fs::write(disk_io::world_file(dir.path()), "not json").unwrap();

        let resident = || vec![(coord, chunk_of("Dirt"))];
        let found = store.exchange(&[], &[coord], &dict, &resident).unwrap();
        assert_eq!(found, vec![(coord, chunk_of("Dirt"))]);

        assert!(dir.path().join("world.json.bad").is_file());
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.seed, 7);
        assert!(snapshot.chunks.contains_key("2,3"));
    }

    #[test]
    fn test_snapshot_store_skips_unreadable_record() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::open(dir.path(), 1).unwrap();
        let dict = VoxelDictionary::default_dictionary();
        let good = ChunkCoord::new(0, 0);
        let bad = ChunkCoord::new(1, 0);

        let mut snapshot = WorldMetadata::new(1, dir.path());
        snapshot
            .chunks
            .insert(disk_io::chunk_key(good), ChunkRecord::from_chunk(&chunk_of("Sand")));
        let mut record = ChunkRecord::from_chunk(&chunk_of("Stone"));
        record.voxel_names.pop();
        snapshot.chunks.insert(disk_io::chunk_key(bad), record);
        disk_io::write_metadata(dir.path(), &snapshot).unwrap();

        let found = store.exchange(&[], &[good, bad], &dict, &Vec::new).unwrap();
        assert_eq!(found, vec![(good, chunk_of("Sand"))]);
    }

    #[test]
    fn test_open_store_layout() {
        let dir = TempDir::new().unwrap();
        let store = open_store(SaveLayout::Snapshot, dir.path(), 3).unwrap();
        assert_eq!(store.layout(), SaveLayout::Snapshot);
        assert_eq!(store.root(), dir.path());
    }
}
