//! Background loop keeping the chunks around the player loaded
//!
//! Each pass diffs the loaded set against the square of chunks around the
//! player, persists and drops the far ones, then brings in the missing ones
//! from disk or from the generator. The world lock is held only to read the
//! loaded set and to move chunks in or out; disk I/O and generation run
//! without it.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::config::StreamingConfig;
use super::disk_io;
use super::store::{open_store, ChunkStore};
use crate::core::{Error, Result};
use crate::player::PlayerState;
use crate::voxel::{Chunk, ChunkCoord, SharedWorld};

/// Chunks to drop and chunks to bring in for one pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamingPlan {
    /// Loaded chunks farther than the load distance, sorted
    pub unload: Vec<ChunkCoord>,
    /// Chunks within the load distance that are not loaded, x-major
    pub load: Vec<ChunkCoord>,
}

impl StreamingPlan {
    pub fn compute(
        loaded: impl IntoIterator<Item = ChunkCoord>,
        center: ChunkCoord,
        distance: i32,
    ) -> Self {
        let loaded: HashSet<ChunkCoord> = loaded.into_iter().collect();

        let mut unload: Vec<ChunkCoord> = loaded
            .iter()
            .copied()
            .filter(|coord| coord.chebyshev_distance(center) > distance)
            .collect();
        unload.sort();

        let load = center
            .neighborhood(distance)
            .filter(|coord| !loaded.contains(coord))
            .collect();

        Self { unload, load }
    }

    pub fn is_empty(&self) -> bool {
        self.unload.is_empty() && self.load.is_empty()
    }
}

/// What one pass did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub unloaded: usize,
    pub loaded_from_disk: usize,
    pub generated: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.unloaded == 0 && self.loaded_from_disk == 0 && self.generated == 0
    }
}

/// Moves chunks between the shared world and a chunk store
pub struct ChunkStreamer {
    world: SharedWorld,
    store: Arc<dyn ChunkStore>,
    config: StreamingConfig,
}

impl ChunkStreamer {
    /// Create a streamer persisting into the world's save path
    pub fn new(world: SharedWorld, config: StreamingConfig) -> Result<Self> {
        let (root, seed) = {
            let world = world.read().unwrap_or_else(PoisonError::into_inner);
            (world.save_path().to_path_buf(), world.seed())
        };
        let store = open_store(config.layout, root, seed)?;
        Ok(Self::with_store(world, store, config))
    }

    pub fn with_store(world: SharedWorld, store: Arc<dyn ChunkStore>, config: StreamingConfig) -> Self {
        Self { world, store, config }
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    /// Run one synchronous pass around `player`
    ///
    /// If persisting fails the evicted chunks go back into the world, nothing
    /// is loaded, and the error is returned.
    pub fn tick(&self, player: &PlayerState) -> Result<TickReport> {
        let (plan, dictionary) = {
            let world = self.world.read().unwrap_or_else(PoisonError::into_inner);
            let center = player.chunk_coord(world.chunk_size());
            let plan = StreamingPlan::compute(
                world.loaded_coords(),
                center,
                self.config.chunk_load_distance,
            );
            (plan, world.dictionary().clone())
        };

        let mut report = TickReport::default();
        if !plan.is_empty() {
            let evicted: Vec<(ChunkCoord, Chunk)> = {
                let mut world = self.world.write().unwrap_or_else(PoisonError::into_inner);
                plan.unload
                    .iter()
                    .filter_map(|coord| world.remove_chunk(*coord).map(|chunk| (*coord, chunk)))
                    .collect()
            };
            report.unloaded = evicted.len();

            let resident = || self.loaded_chunks();
            let found = match self.store.exchange(&evicted, &plan.load, &dictionary, &resident) {
                Ok(found) => found,
                Err(e) => {
                    let mut world = self.world.write().unwrap_or_else(PoisonError::into_inner);
                    for (coord, chunk) in evicted {
                        if !world.contains_chunk(coord) {
                            world.insert_chunk(coord, chunk);
                        }
                    }
                    return Err(e);
                }
            };
            report.loaded_from_disk = found.len();

            let from_disk: HashSet<ChunkCoord> = found.iter().map(|(coord, _)| *coord).collect();
            let generator = self.world.read().unwrap_or_else(PoisonError::into_inner).generator();
            let generated: Vec<(ChunkCoord, Chunk)> = plan
                .load
                .iter()
                .filter(|coord| !from_disk.contains(coord))
                .map(|coord| (*coord, generator.generate(*coord, dictionary.clone())))
                .collect();
            report.generated = generated.len();

            // The foreground loop may have filled some of these in meanwhile
            let mut world = self.world.write().unwrap_or_else(PoisonError::into_inner);
            for (coord, chunk) in found.into_iter().chain(generated) {
                if !world.contains_chunk(coord) {
                    world.insert_chunk(coord, chunk);
                }
            }
        }

        disk_io::write_player(self.store.root(), player)?;
        log::trace!("Streaming pass: {:?}", report);
        Ok(report)
    }

    /// Persist every loaded chunk, the metadata and the player
    ///
    /// Chunks stay loaded. Returns how many chunks were written.
    pub fn flush(&self, player: &PlayerState) -> Result<usize> {
        let loaded = self.loaded_chunks();
        let dictionary = self.world.read().unwrap_or_else(PoisonError::into_inner).dictionary().clone();

        self.store.exchange(&loaded, &[], &dictionary, &Vec::new)?;
        disk_io::write_player(self.store.root(), player)?;
        log::info!("Flushed {} chunks to {}", loaded.len(), self.store.root().display());
        Ok(loaded.len())
    }

    fn loaded_chunks(&self) -> Vec<(ChunkCoord, Chunk)> {
        let world = self.world.read().unwrap_or_else(PoisonError::into_inner);
        world.chunks().map(|(coord, chunk)| (*coord, chunk.clone())).collect()
    }

    /// Start the streaming loop on the current tokio runtime
    ///
    /// The first pass runs immediately. Must be called from within a runtime.
    pub fn spawn(self, player: PlayerState) -> StreamingHandle {
        let (player_tx, player_rx) = watch::channel(player);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Arc::new(self).run(player_rx, shutdown_rx));

        StreamingHandle {
            player_tx,
            shutdown_tx,
            task,
        }
    }

    async fn run(
        self: Arc<Self>,
        player_rx: watch::Receiver<PlayerState>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<usize> {
        let mut interval = tokio::time::interval(self.config.io_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!(
            "Streaming started: distance {}, interval {:?}, layout {:?}",
            self.config.chunk_load_distance,
            self.config.io_interval(),
            self.store.layout()
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let player = player_rx.borrow().clone();
                    let streamer = self.clone();
                    match tokio::task::spawn_blocking(move || streamer.tick(&player)).await {
                        Ok(Ok(report)) if !report.is_idle() => log::debug!(
                            "Streaming: unloaded {}, loaded {}, generated {}",
                            report.unloaded,
                            report.loaded_from_disk,
                            report.generated
                        ),
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => log::error!("Streaming pass failed, will retry: {}", e),
                        Err(e) => log::error!("Streaming worker panicked: {}", e),
                    }
                }
                // Also fires when the handle is dropped
                _ = shutdown_rx.changed() => break,
            }
        }

        let player = player_rx.borrow().clone();
        let streamer = self.clone();
        tokio::task::spawn_blocking(move || streamer.flush(&player))
            .await
            .map_err(|e| Error::Streaming(e.to_string()))?
    }
}

/// Control handle for a running streaming loop
pub struct StreamingHandle {
    player_tx: watch::Sender<PlayerState>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<Result<usize>>,
}

impl StreamingHandle {
    /// Publish the latest player state; the next pass streams around it
    pub fn update_player(&self, player: &PlayerState) {
        self.player_tx.send_replace(player.clone());
    }

    /// Move the streaming center to the given chunk, keeping the rest of the player state
    pub fn set_player_chunk(&self, coord: ChunkCoord, chunk_size: usize) {
        let size = chunk_size as f32;
        self.player_tx.send_modify(|player| {
            player.position.x = coord.x as f32 * size + size / 2.0;
            player.position.y = coord.y as f32 * size + size / 2.0;
        });
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop and flush everything loaded; returns the chunks written
    pub async fn shutdown(self) -> Result<usize> {
        let _ = self.shutdown_tx.send(true);
        self.task
            .await
            .map_err(|e| Error::Streaming(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Vec3;
    use crate::generation::GenerationConfig;
    use crate::streaming::config::SaveLayout;
    use crate::streaming::store::SnapshotStore;
    use crate::voxel::World;
    use tempfile::TempDir;

    fn small_world(root: &std::path::Path) -> SharedWorld {
        let config = GenerationConfig {
            chunk_size: 4,
            chunk_depth: 24,
            ..GenerationConfig::with_seed(4311080085)
        };
        World::new(config, root).into_shared()
    }

    fn streaming_config(layout: SaveLayout) -> StreamingConfig {
        StreamingConfig {
            io_interval_ms: 10,
            chunk_load_distance: 1,
            layout,
        }
    }

    fn loaded(world: &SharedWorld) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = world.read().unwrap().loaded_coords().collect();
        coords.sort();
        coords
    }

    fn square(center: ChunkCoord, distance: i32) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = center.neighborhood(distance).collect();
        coords.sort();
        coords
    }

    #[test]
    fn test_plan_compute() {
        let loaded = [ChunkCoord::new(0, 0), ChunkCoord::new(2, 0), ChunkCoord::new(-1, -1)];
        let plan = StreamingPlan::compute(loaded, ChunkCoord::new(0, 0), 1);

        assert_eq!(plan.unload, vec![ChunkCoord::new(2, 0)]);
        assert_eq!(plan.load.len(), 7);
        assert!(!plan.load.contains(&ChunkCoord::new(0, 0)));
        assert!(!plan.load.contains(&ChunkCoord::new(-1, -1)));
    }

    #[test]
    fn test_plan_idle_when_settled() {
        let center = ChunkCoord::new(3, 3);
        let plan = StreamingPlan::compute(center.neighborhood(2), center, 2);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_tick_loads_square() {
        crate::core::logging::init_for_tests();
        let dir = TempDir::new().unwrap();
        let world = small_world(dir.path());
        let streamer = ChunkStreamer::new(world.clone(), streaming_config(SaveLayout::SplitFiles)).unwrap();

        let report = streamer.tick(&PlayerState::default()).unwrap();
        assert_eq!(report.generated, 9);
        assert_eq!(loaded(&world), square(ChunkCoord::new(0, 0), 1));
        assert!(dir.path().join("player.json").is_file());

        // Settled: a second pass does nothing
        assert!(streamer.tick(&PlayerState::default()).unwrap().is_idle());
    }

    #[test]
    fn test_tick_evicts_to_disk() {
        let dir = TempDir::new().unwrap();
        let world = small_world(dir.path());
        let streamer = ChunkStreamer::new(world.clone(), streaming_config(SaveLayout::SplitFiles)).unwrap();

        let far = ChunkCoord::new(10, 10);
        world.write().unwrap().generate_chunk(far, false);
        let far_chunk = world.read().unwrap().chunk_at(far).cloned().unwrap();

        streamer.tick(&PlayerState::default()).unwrap();
        assert_eq!(loaded(&world), square(ChunkCoord::new(0, 0), 1));
        assert!(disk_io::chunk_exists(dir.path(), far));

        let dictionary = world.read().unwrap().dictionary().clone();
        let on_disk = disk_io::read_chunk(dir.path(), far, dictionary).unwrap();
        assert_eq!(on_disk, Some(far_chunk));
    }

    #[test]
    fn test_walk_reloads_saved_chunk() {
        let dir = TempDir::new().unwrap();
        let world = small_world(dir.path());
        let streamer = ChunkStreamer::new(world.clone(), streaming_config(SaveLayout::Snapshot)).unwrap();

        let origin = ChunkCoord::new(0, 0);
        streamer.tick(&PlayerState::default()).unwrap();
        // Mark the origin chunk so a regenerated copy would differ
        world.write().unwrap().chunk_at_mut(origin).unwrap().set_named(0, 0, 23, "Wood");

        // Walk two chunks east: the origin is evicted into the snapshot
        let east = PlayerState::at(Vec3::new(10.0, 2.0, 20.0));
        let report = streamer.tick(&east).unwrap();
        assert_eq!(report.unloaded, 6);
        assert!(!world.read().unwrap().contains_chunk(origin));

        // Walk back: the origin comes from disk with the mark intact
        let report = streamer.tick(&PlayerState::default()).unwrap();
        assert_eq!(report.loaded_from_disk, 6);
        assert_eq!(report.generated, 0);
        assert_eq!(world.read().unwrap().voxel_at(0, 0, 23).unwrap().name, "Wood");
    }

    struct FailingStore(std::path::PathBuf);

    impl ChunkStore for FailingStore {
        fn exchange(
            &self,
            _evicted: &[(ChunkCoord, Chunk)],
            _wanted: &[ChunkCoord],
            _dictionary: &Arc<crate::voxel::VoxelDictionary>,
            _resident: crate::streaming::store::Resident<'_>,
        ) -> Result<Vec<(ChunkCoord, Chunk)>> {
            Err(std::io::Error::other("disk full").into())
        }

        fn layout(&self) -> SaveLayout {
            SaveLayout::SplitFiles
        }

        fn root(&self) -> &std::path::Path {
            &self.0
        }
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let dir = TempDir::new().unwrap();
        let world = small_world(dir.path());
        let far = ChunkCoord::new(-7, 2);
        world.write().unwrap().generate_chunk(far, false);

        let store = Arc::new(FailingStore(dir.path().to_path_buf()));
        let streamer = ChunkStreamer::with_store(world.clone(), store, streaming_config(SaveLayout::SplitFiles));

        assert!(streamer.tick(&PlayerState::default()).is_err());
        assert_eq!(loaded(&world), vec![far]);
    }

    #[test]
    fn test_first_snapshot_includes_loaded_chunks() {
        let dir = TempDir::new().unwrap();
        let world = small_world(dir.path());
        let far = ChunkCoord::new(9, 9);
        {
            let mut world = world.write().unwrap();
            for coord in ChunkCoord::new(0, 0).neighborhood(1) {
                world.generate_chunk(coord, false);
            }
            world.generate_chunk(far, false);
        }
        let streamer = ChunkStreamer::new(world.clone(), streaming_config(SaveLayout::Snapshot)).unwrap();

        let report = streamer.tick(&PlayerState::default()).unwrap();
        assert_eq!(report.unloaded, 1);

        let snapshot = disk_io::read_metadata(dir.path()).unwrap().unwrap();
        let mut keys: Vec<_> = snapshot.chunks.keys().map(|key| disk_io::parse_chunk_key(key).unwrap()).collect();
        keys.sort();
        let mut expected = square(ChunkCoord::new(0, 0), 1);
        expected.push(far);
        expected.sort();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_tick_survives_unreadable_snapshot() {
        let dir = TempDir::new().unwrap();
        let world = small_world(dir.path());
        let streamer = ChunkStreamer::new(world.clone(), streaming_config(SaveLayout::Snapshot)).unwrap();
        std::fs::write(disk_io::world_file(dir.path()), "not json").unwrap();

        let report = streamer.tick(&PlayerState::default()).unwrap();
        assert_eq!(report.generated, 9);
        assert_eq!(loaded(&world), square(ChunkCoord::new(0, 0), 1));
        assert!(disk_io::read_metadata(dir.path()).unwrap().is_some());
    }

    #[test]
    fn test_flush_keeps_chunks_loaded() {
        let dir = TempDir::new().unwrap();
        let world = small_world(dir.path());
        let store = Arc::new(SnapshotStore::open(dir.path(), 4311080085).unwrap());
        let streamer = ChunkStreamer::with_store(world.clone(), store.clone(), streaming_config(SaveLayout::Snapshot));

        streamer.tick(&PlayerState::default()).unwrap();
        assert_eq!(streamer.flush(&PlayerState::default()).unwrap(), 9);
        assert_eq!(world.read().unwrap().chunk_count(), 9);
        assert_eq!(store.snapshot().unwrap().chunks.len(), 9);
    }

    #[tokio::test]
    async fn test_spawn_and_shutdown() {
        crate::core::logging::init_for_tests();
        let dir = TempDir::new().unwrap();
        let world = small_world(dir.path());
        let streamer = ChunkStreamer::new(world.clone(), streaming_config(SaveLayout::SplitFiles)).unwrap();

        let handle = streamer.spawn(PlayerState::default());
        // The first pass runs immediately; give it time to complete
        for _ in 0..200 {
            if world.read().unwrap().chunk_count() == 9 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(loaded(&world), square(ChunkCoord::new(0, 0), 1));

        handle.set_player_chunk(ChunkCoord::new(5, 0), 4);
        for _ in 0..200 {
            if world.read().unwrap().contains_chunk(ChunkCoord::new(5, 0)) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let written = handle.shutdown().await.unwrap();
        assert_eq!(written, 9);
        assert_eq!(disk_io::list_chunks(dir.path()).unwrap().len(), 18);
        assert_eq!(loaded(&world), square(ChunkCoord::new(5, 0), 1));
    }
}
