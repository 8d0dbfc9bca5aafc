//! Emission configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Chunk size used when a chunked request does not name a usable one.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitConfig {
    /// Cap on rows in one buffered response. 0 means unlimited.
    pub max_row_limit: usize,

    /// Rows per chunk when a chunked request gives no valid `chunk_size`.
    /// Never zero.
    pub default_chunk_size: usize,

    /// Slots in each level of the result stream. 0 is a rendezvous channel:
    /// the producer blocks on every send until the emitter reads.
    pub channel_capacity: usize,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            max_row_limit: 0,
            default_chunk_size: DEFAULT_CHUNK_SIZE,
            channel_capacity: 0,
        }
    }
}

impl EmitConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `TSEMIT_MAX_ROW_LIMIT`: row cap for buffered responses
    /// - `TSEMIT_DEFAULT_CHUNK_SIZE`: fallback chunk size (ignored if 0)
    /// - `TSEMIT_CHANNEL_CAPACITY`: result stream slots per level
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("TSEMIT_MAX_ROW_LIMIT") {
            if let Ok(v) = s.trim().parse::<usize>() {
                cfg.max_row_limit = v;
            }
        }

        if let Ok(s) = std::env::var("TSEMIT_DEFAULT_CHUNK_SIZE") {
            if let Ok(v) = s.trim().parse::<usize>() {
                if v > 0 {
                    cfg.default_chunk_size = v;
                }
            }
        }

        if let Ok(s) = std::env::var("TSEMIT_CHANNEL_CAPACITY") {
            if let Ok(v) = s.trim().parse::<usize>() {
                cfg.channel_capacity = v;
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_chunk_size == 0 {
            return Err(Error::Config("default_chunk_size must be positive".into()));
        }
        Ok(())
    }
}
