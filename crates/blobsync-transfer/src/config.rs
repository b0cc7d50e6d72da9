//! Configuration for the coordinator and the store handlers.

use std::time::Duration;

use blobsync_core::ports::{DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT};

/// Default number of concurrent workers.
pub const DEFAULT_MAX_CONCURRENT: usize = 16;

/// Default zlib level used when pushing.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 7;

/// Configuration for a [`TransferCoordinator`](crate::TransferCoordinator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Number of worker slots.
    pub max_concurrent: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl CoordinatorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of workers (at least one).
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }
}

/// Payload encoding on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Payloads are stored as-is.
    None,
    /// Payloads are zlib streams.
    Zlib {
        /// Compression level used for uploads (0-9).
        level: u32,
    },
}

impl Default for Compression {
    fn default() -> Self {
        Self::Zlib {
            level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

/// Settings shared by the fetch and push handlers.
///
/// # Example
///
/// ```
/// use blobsync_transfer::{Compression, StoreConfig};
/// use std::time::Duration;
///
/// let config = StoreConfig::new()
///     .with_namespace("default-gzip")
///     .with_compression(Compression::Zlib { level: 9 })
///     .with_timeout(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Namespace of the remote content store.
    pub namespace: String,
    pub compression: Compression,
    /// Attempt bound for each transfer request.
    pub max_attempts: u32,
    /// Base wall-clock budget for each transfer request.
    pub timeout: Duration,
    /// Slowest acceptable transfer rate in bytes per second; large items get
    /// `expected_size / min_throughput` added to their timeout.
    pub min_throughput: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            compression: Compression::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
            min_throughput: 10 * 1024,
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub const fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_min_throughput(mut self, bytes_per_second: u64) -> Self {
        self.min_throughput = bytes_per_second;
        self
    }

    /// Wall-clock budget for an item of `expected_size` bytes.
    pub fn timeout_for(&self, expected_size: Option<u64>) -> Duration {
        let extra = match (expected_size, self.min_throughput) {
            (Some(size), throughput) if throughput > 0 => Duration::from_secs(size / throughput),
            _ => Duration::ZERO,
        };
        self.timeout.saturating_add(extra)
    }
}
