//! Partitioned bulk loading.
//!
//! [`BulkLoader`] splits the key-index domain `[0, key_count)` into one
//! contiguous [`Partition`] per worker and drives each partition on its own
//! Tokio task against a shared [`Store`](crate::Store). Workers never touch
//! each other's indices, so the only coordination is the final join and the
//! shared cancellation token that stops everyone on the first failure.
//!
//! ## Structure
//!
//! - `partition` - index-range arithmetic.
//! - `payload` - per-kind record construction and the write verb.
//! - `worker` - the per-partition task.
//! - `manager` - fan-out, error aggregation, cancellation and timeout.

mod config;
mod manager;
mod partition;
mod payload;
mod worker;

pub use config::*;
pub use manager::*;
pub use partition::*;
