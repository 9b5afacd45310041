//! Memory Store Configuration

use std::time::Duration;

/// Default interval between active expiry sweeps (5 minutes).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Shortest sweep interval accepted. Zero would spin the sweeper.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for a [`MemoryStore`](crate::MemoryStore).
///
/// Fixed once the store is built.
///
/// # Example
///
/// ```
/// use unikv::MemoryStoreConfig;
/// use std::time::Duration;
///
/// let config = MemoryStoreConfig::default()
///     .with_sweep_interval(Duration::from_secs(30))
///     .with_max_size(10_000);
///
/// assert_eq!(config.max_size, Some(10_000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStoreConfig {
    /// Interval between active expiry sweeps (default: 300 seconds)
    pub sweep_interval: Duration,

    /// Maximum number of entries (default: unbounded)
    pub max_size: Option<usize>,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            max_size: None,
        }
    }
}

impl MemoryStoreConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how often the background sweep removes expired entries.
    ///
    /// Intervals below [`MIN_SWEEP_INTERVAL`] are raised to it.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval.max(MIN_SWEEP_INTERVAL);
        self
    }

    /// Same as [`with_sweep_interval`](Self::with_sweep_interval), in milliseconds.
    pub fn with_sweep_interval_ms(self, interval_ms: u64) -> Self {
        self.with_sweep_interval(Duration::from_millis(interval_ms))
    }

    /// Caps the number of entries. Inserting a new key beyond it fails with
    /// [`StoreError::StoreFull`](crate::StoreError::StoreFull).
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }
}
