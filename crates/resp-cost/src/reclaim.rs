//! Flush-and-settle: empty the store and wait for its memory to stop falling.
//!
//! Stores free memory lazily after `FLUSHALL`, so a measurement taken right
//! after the flush still includes memory that is about to be released.
//! [`reset_and_wait`] polls `INFO memory` until consecutive `used_memory`
//! readings stop dropping by more than a threshold.

use crate::{Error, MemorySample, Result, Store};
use core::time::Duration;

/// Polling parameters for [`reset_and_wait`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReclaimConfig {
    /// Delay between consecutive samples.
    pub poll_interval: Duration,
    /// Maximum number of samples before giving up.
    pub max_polls: usize,
    /// A drop larger than this percentage of the previous reading means the
    /// store is still reclaiming.
    pub drop_threshold_percent: u64,
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            max_polls: 600,
            drop_threshold_percent: 5,
        }
    }
}

/// Outcome of a settled reclaim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReclaimReport {
    /// Number of `INFO memory` samples taken, including the settling one.
    pub polls: usize,
    /// The sample at which memory was considered settled.
    pub settled: MemorySample,
}

/// Convergence rule over a stream of `used_memory` readings.
///
/// The first reading is only a baseline. After that, memory is still
/// draining while the drop since the previous reading exceeds
/// `threshold_percent` of that reading:
///
/// ```text
/// (prev - cur) * 100 > prev * threshold_percent
/// ```
///
/// A reading that rises counts as no drop.
#[derive(Clone, Copy, Debug)]
pub struct Convergence {
    threshold_percent: u64,
    prev: Option<u64>,
}

impl Convergence {
    pub const fn new(threshold_percent: u64) -> Self {
        Self {
            threshold_percent,
            prev: None,
        }
    }

    /// Feeds the next reading. Returns `true` while polling should continue.
    pub fn observe(&mut self, used: u64) -> bool {
        let draining = match self.prev {
            None => true,
            Some(prev) => {
                let drop = u128::from(prev.saturating_sub(used));
                drop * 100 > u128::from(prev) * u128::from(self.threshold_percent)
            }
        };
        self.prev = Some(used);
        draining
    }

    pub const fn last(&self) -> Option<u64> {
        self.prev
    }
}

/// Flushes the store, then samples `INFO memory` until `used_memory`
/// settles.
///
/// # Errors
///
/// - [`Error::Store`] if `FLUSHALL` or `INFO` fails.
/// - [`Error::ReclaimTimeout`] if memory is still dropping after
///   `config.max_polls` samples.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub async fn reset_and_wait<S: Store>(store: &S, config: &ReclaimConfig) -> Result<ReclaimReport> {
    store.flush_all().await?;

    let mut convergence = Convergence::new(config.drop_threshold_percent);
    for poll in 1..=config.max_polls {
        if poll > 1 && !config.poll_interval.is_zero() {
            tokio::time::sleep(config.poll_interval).await;
        }

        let sample = MemorySample::fetch(store).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(poll, used_memory = sample.used_bytes, "Reclaim sample");

        if !convergence.observe(sample.used_bytes) {
            #[cfg(feature = "tracing")]
            tracing::info!(
                "Memory settled at {} bytes after {poll} samples",
                sample.used_bytes
            );
            return Ok(ReclaimReport {
                polls: poll,
                settled: sample,
            });
        }
    }

    Err(Error::ReclaimTimeout {
        polls: config.max_polls,
        last_used: convergence.last().unwrap_or(0),
    })
}
