//! Isoworld - headless walk through a streamed voxel world
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --save <DIR>          Save directory (default: "saves/world")
//!   --seed <SEED>         Seed for a new world (default: 4311080085)
//!   --steps <N>           Simulation steps to walk (default: 600)
//!   --streaming <FILE>    Streaming config JSON (default: built-in)

use std::path::PathBuf;
use std::time::Duration;

use isoworld::core::{logging, Vec3};
use isoworld::generation::GenerationConfig;
use isoworld::player::PlayerState;
use isoworld::streaming::{disk_io, ChunkStreamer, StreamingConfig};
use isoworld::voxel::World;

/// Downward acceleration per step
const GRAVITY: f32 = 0.01;
/// Eastward push per step
const WALK_SPEED: f32 = 0.05;
/// Simulation step length
const STEP: Duration = Duration::from_millis(16);

#[tokio::main]
async fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let save_path = PathBuf::from(parse_str_arg(&args, "--save").unwrap_or_else(|| "saves/world".to_string()));
    let seed = parse_i64_arg(&args, "--seed").unwrap_or(4311080085);
    let steps = parse_usize_arg(&args, "--steps").unwrap_or(600);
    let streaming_config = match parse_str_arg(&args, "--streaming") {
        Some(path) => StreamingConfig::from_file(&path).unwrap_or_else(|e| {
            log::warn!("Ignoring streaming config {}: {}", path, e);
            StreamingConfig::default()
        }),
        None => StreamingConfig::default(),
    };

    log::info!("World initializing ...");
    let world = World::open_or_create(GenerationConfig::with_seed(seed), &save_path);
    let chunk_size = world.chunk_size();
    let spawn_height = world.chunk_depth() as f32 - 1.0;
    let world = world.into_shared();

    let mut player = match disk_io::read_player(&save_path) {
        Ok(Some(player)) => player,
        Ok(None) => PlayerState::at(Vec3::new(16.0, 16.0, spawn_height)),
        Err(e) => {
            log::warn!("Unreadable player save, respawning: {}", e);
            PlayerState::at(Vec3::new(16.0, 16.0, spawn_height))
        }
    };

    let streamer = match ChunkStreamer::new(world.clone(), streaming_config) {
        Ok(streamer) => streamer,
        Err(e) => {
            log::error!("Cannot open save directory {}: {}", save_path.display(), e);
            std::process::exit(1);
        }
    };
    let handle = streamer.spawn(player.clone());
    log::info!("Done!");

    let mut ticker = tokio::time::interval(STEP);
    let mut last_chunk = player.chunk_coord(chunk_size);
    for step in 0..steps {
        ticker.tick().await;

        player.velocity.x += WALK_SPEED;
        player.velocity.z -= GRAVITY;

        let (grounded, visible) = {
            let world = world.read().unwrap_or_else(|e| e.into_inner());
            let grounded = player.step(&world);
            let chunk = player.chunk_coord(chunk_size);
            let visible = world.chunk_at(chunk).map(|c| c.visible_voxels().count());
            (grounded, visible)
        };
        handle.update_player(&player);

        let chunk = player.chunk_coord(chunk_size);
        if chunk != last_chunk {
            match visible {
                Some(count) => log::info!(
                    "Step {}: entered chunk ({}, {}), {} visible voxels",
                    step, chunk.x, chunk.y, count
                ),
                None => log::info!(
                    "Step {}: entered chunk ({}, {}), not loaded yet",
                    step, chunk.x, chunk.y
                ),
            }
            last_chunk = chunk;
        }

        if step % 100 == 0 {
            log::debug!(
                "Step {}: position ({:.1}, {:.1}, {:.1}) grounded {}",
                step, player.position.x, player.position.y, player.position.z, grounded
            );
        }
    }

    match handle.shutdown().await {
        Ok(written) => log::info!("Saved {} chunks to {}", written, save_path.display()),
        Err(e) => log::error!("Failed to save world: {}", e),
    }
}

fn parse_i64_arg(args: &[String], flag: &str) -> Option<i64> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
