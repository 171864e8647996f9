//! Streaming configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// How chunks are laid out in the save directory
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveLayout {
    /// One `terrain/chunk<x>_<y>.json` file per chunk
    #[default]
    SplitFiles,
    /// Every chunk embedded in `world.json` under `"x,y"` keys
    Snapshot,
}

/// Parameters of the background streaming loop
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Milliseconds between streaming passes
    pub io_interval_ms: u64,
    /// Chebyshev radius, in chunks, kept loaded around the player
    pub chunk_load_distance: i32,
    pub layout: SaveLayout,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            io_interval_ms: 1000,
            chunk_load_distance: 2,
            layout: SaveLayout::SplitFiles,
        }
    }
}

impl StreamingConfig {
    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| Error::decode(path, e))
    }

    pub fn io_interval(&self) -> Duration {
        Duration::from_millis(self.io_interval_ms.max(1))
    }
}
