//! World generator binary: pre-generates a square of chunks to disk.
//!
//! Usage: cargo run --release --bin generate_world -- [OPTIONS]
//!
//! Options:
//!   --radius <CHUNKS>   Chunks generated in each direction from the origin (default: 4)
//!   --seed <SEED>       World seed (default: 4311080085)
//!   --save <DIR>        Save directory (default: "saves/world")
//!   --layout <LAYOUT>   "split" or "snapshot" (default: split)
//!   --config <FILE>     Generation config JSON; --seed overrides its seed
//!   --jobs <N>          Max parallel chunk builds (default: 4)
//!
//! Output structure (split layout):
//!   <save>/
//!     world.json              # seed + save path
//!     terrain/
//!       chunk0_0.json
//!       ...
//!     entity/

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use isoworld::generation::GenerationConfig;
use isoworld::streaming::{open_store, SaveLayout};
use isoworld::voxel::{Chunk, ChunkCoord, World};

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let args: Vec<String> = std::env::args().collect();
    let radius = parse_i32_arg(&args, "--radius").unwrap_or(4);
    let save = parse_str_arg(&args, "--save").unwrap_or_else(|| "saves/world".to_string());
    let jobs = parse_usize_arg(&args, "--jobs").unwrap_or(4);
    let layout = match parse_str_arg(&args, "--layout").as_deref() {
        Some("snapshot") => SaveLayout::Snapshot,
        _ => SaveLayout::SplitFiles,
    };

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => GenerationConfig::from_file(&path).expect("Failed to read generation config"),
        None => GenerationConfig::default(),
    };
    if let Some(seed) = parse_i64_arg(&args, "--seed") {
        config.seed = seed;
    }

    // Limit rayon's thread pool to cap peak memory usage
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build_global()
        .expect("Failed to configure thread pool");

    let save_path = PathBuf::from(save);
    let side = radius * 2 + 1;

    println!("=== Isoworld Generator ===");
    println!("Seed:   {}", config.seed);
    println!("Chunks: {} x {} ({}x{}x{} voxels each)", side, side, config.chunk_size, config.chunk_size, config.chunk_depth);
    println!("Layout: {:?}", layout);
    println!("Jobs:   {} parallel", jobs);
    println!("Output: {}", save_path.display());
    println!();

    let world = World::new(config, &save_path);
    let generator = world.generator();
    let dictionary = world.dictionary().clone();

    let coords: Vec<ChunkCoord> = ChunkCoord::new(0, 0).neighborhood(radius).collect();
    let total = coords.len();

    let start = Instant::now();
    let generated = AtomicUsize::new(0);
    let chunks: Vec<(ChunkCoord, Chunk)> = coords
        .par_iter()
        .map(|&coord| {
            let chunk = generator.generate(coord, dictionary.clone());
            let done = generated.fetch_add(1, Ordering::Relaxed) + 1;

            if done % 25 == 0 || done == total {
                let elapsed = start.elapsed().as_secs_f64();
                let rate = done as f64 / elapsed;
                let remaining = (total - done) as f64 / rate;
                eprintln!("  [{}/{}] {:.0} chunks/sec, ~{:.0}s remaining",
                    done, total, rate, remaining);
            }

            (coord, chunk)
        })
        .collect();
    let generation_time = start.elapsed();

    let store = open_store(layout, &save_path, world.seed()).expect("Failed to open save directory");
    let write_start = Instant::now();
    store.exchange(&chunks, &[], &dictionary, &Vec::new).expect("Failed to write chunks");

    println!();
    println!("=== Generation Complete ===");
    println!("Generated: {} chunks in {:.1}s", chunks.len(), generation_time.as_secs_f64());
    println!("Written:   {:.1}s", write_start.elapsed().as_secs_f64());
    println!("Output:    {}", save_path.display());
}

fn parse_i32_arg(args: &[String], flag: &str) -> Option<i32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
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
