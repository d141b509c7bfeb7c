//! Configuration for the reservation core

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reservation core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Locking configuration
    pub locking: LockingConfig,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/reservations"),
            service_name: "reservation-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            locking: LockingConfig::default(),
            rocksdb: RocksDBConfig::default(),
        }
    }
}

/// Locking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockingConfig {
    /// Upper bound on waiting for a resource's exclusive lock (milliseconds)
    pub acquire_timeout_ms: u64,
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            acquire_timeout_ms: 5_000, // well above any single commit, below client timeouts
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Target file size (MB)
    pub target_file_size_mb: u64,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Level 0 file num compaction trigger
    pub level0_file_num_compaction_trigger: i32,

    /// Enable statistics
    pub enable_statistics: bool,

    /// Sync the WAL on every commit
    ///
    /// Leave enabled: a confirmed reservation must survive a crash. Turning
    /// this off trades that guarantee for write throughput.
    pub sync_writes: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,       // 64 MB; rows are small
            max_write_buffer_number: 4,
            target_file_size_mb: 64,        // 64 MB
            max_background_jobs: 4,
            level0_file_num_compaction_trigger: 4,
            enable_statistics: true,
            sync_writes: true,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("RESERVATION_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(timeout) = std::env::var("RESERVATION_LOCK_TIMEOUT_MS") {
            config.locking.acquire_timeout_ms = timeout.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid RESERVATION_LOCK_TIMEOUT_MS: {}", e))
            })?;
        }

        if let Ok(sync) = std::env::var("RESERVATION_SYNC_WRITES") {
            config.rocksdb.sync_writes = sync.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid RESERVATION_SYNC_WRITES: {}", e))
            })?;
        }

        Ok(config)
    }
}
