//! Chunk persistence and background streaming around the player

pub mod config;
pub mod disk_io;
pub mod store;
pub mod streamer;

pub use config::{SaveLayout, StreamingConfig};
pub use disk_io::{
    ChunkRecord, WorldMetadata,
    encode_chunk, decode_chunk,
    chunk_key, parse_chunk_key, chunk_file_name, parse_chunk_file_name,
    create_save_dirs, read_metadata, write_metadata, read_player, write_player,
    read_chunk, write_chunk, chunk_exists, list_chunks,
};
pub use store::{ChunkStore, Resident, SnapshotStore, SplitFileStore, open_store};
pub use streamer::{ChunkStreamer, StreamingHandle, StreamingPlan, TickReport};
