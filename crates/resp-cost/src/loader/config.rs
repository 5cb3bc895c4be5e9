use core::time::Duration;

/// Default number of concurrent loader workers.
pub const DEFAULT_WORKERS: usize = 12;

/// Tuning knobs for [`BulkLoader`](crate::BulkLoader).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Number of partitions, and therefore concurrent tasks.
    pub num_workers: usize,
    /// Upper bound on the whole load. `None` waits indefinitely.
    pub load_timeout: Option<Duration>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            num_workers: DEFAULT_WORKERS,
            load_timeout: None,
        }
    }
}
