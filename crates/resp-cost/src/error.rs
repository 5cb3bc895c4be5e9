//! Error types for workload generation and bulk loading.
//!
//! This module defines the central `Error` enum, which captures every
//! reportable failure of a populate run: malformed workloads, store I/O
//! failures, aborted or timed-out bulk loads, and a reclaim that never
//! settles.
//!
//! ## Error Cases
//! - `InvalidWorkload`: The workload shape is unusable (e.g. zero-width keys).
//! - `InsufficientLength`: Identifier width cannot encode the population and
//!   strict mode is on.
//! - `Store`: A store command failed.
//! - `LoadAborted`: A bulk load stopped early; carries the partial count.
//! - `LoadTimeout`: The aggregate load deadline elapsed.
//! - `Cancelled`: The caller cancelled the run.
//! - `WorkerPanicked`: A worker task panicked.
//! - `ReclaimTimeout`: Memory usage kept dropping past the polling budget.

use crate::store::StoreOp;
use core::time::Duration;

pub type Result<T> = core::result::Result<T, Error>;

/// Boxed error produced by a concrete store backend.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Unified error type for populate runs.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The workload description cannot be executed.
    #[error("Invalid workload: {reason}")]
    InvalidWorkload { reason: String },

    /// The identifier width is too small for the population (strict mode).
    #[error(
        "{subject} size {length} cannot encode {count} distinct identifiers (needs at least {required})"
    )]
    InsufficientLength {
        subject: &'static str,
        count: u64,
        length: usize,
        required: usize,
    },

    /// A store command failed.
    #[error("Store error during {op}: {source}")]
    Store {
        op: StoreOp,
        #[source]
        source: BoxError,
    },

    /// The bulk load stopped before every key was written.
    #[error("Bulk load aborted after {written}/{total} keys: {source}")]
    LoadAborted {
        written: u64,
        total: u64,
        #[source]
        source: Box<Error>,
    },

    /// The aggregate load deadline elapsed.
    #[error("Bulk load timed out after {0:?}")]
    LoadTimeout(Duration),

    /// The run was cancelled by the caller.
    #[error("Run cancelled")]
    Cancelled,

    /// A worker task panicked or was aborted by the runtime.
    #[error("Worker {worker_id} terminated abnormally: {reason}")]
    WorkerPanicked { worker_id: usize, reason: String },

    /// `used_memory` was still dropping when the polling budget ran out.
    #[error("Memory did not settle after {polls} samples (last used_memory: {last_used})")]
    ReclaimTimeout { polls: usize, last_used: u64 },
}

impl Error {
    /// Wraps a backend error raised while executing `op`.
    pub fn store(op: StoreOp, source: impl Into<BoxError>) -> Self {
        Self::Store {
            op,
            source: source.into(),
        }
    }

    /// Returns `true` for the error every sibling reports once a load has
    /// been cancelled.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
