use super::{
    LoaderConfig, Partition,
    payload::Payload,
    worker::{WorkerContext, worker_loop},
};
use crate::{Error, IdentGenerator, Result, Store, WorkloadSpec};
use core::time::Duration;
use futures::{StreamExt, stream::FuturesUnordered};
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Summary of a completed bulk load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadReport {
    pub keys_written: u64,
    pub workers: usize,
    pub elapsed: Duration,
}

impl LoadReport {
    pub fn keys_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.keys_written as f64 / secs
    }
}

/// Fans a workload out over a fixed pool of workers, one per partition.
///
/// All workers share one store handle and one [`IdentGenerator`]. Results are
/// collected as workers finish; the first failure cancels the remaining
/// workers through a child of the caller's [`CancellationToken`], and the load
/// returns [`Error::LoadAborted`] with the number of keys that did make it.
pub struct BulkLoader<S> {
    store: Arc<S>,
    idents: IdentGenerator,
    config: LoaderConfig,
}

impl<S: Store> BulkLoader<S> {
    pub const fn new(store: Arc<S>, idents: IdentGenerator, config: LoaderConfig) -> Self {
        Self {
            store,
            idents,
            config,
        }
    }

    /// Writes `spec.key_count` records and waits for every worker.
    ///
    /// Cancelling `cancel` stops all workers at their next write.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidWorkload`] if the workload is unwritable or the worker
    ///   count is zero. Nothing is written.
    /// - [`Error::LoadAborted`] if any worker failed, the caller cancelled, or
    ///   the configured timeout elapsed. `source` holds the first cause:
    ///   [`Error::Store`], [`Error::WorkerPanicked`], [`Error::Cancelled`] or
    ///   [`Error::LoadTimeout`].
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(kind = %spec.kind, keys = spec.key_count))
    )]
    pub async fn load(&self, spec: &WorkloadSpec, cancel: &CancellationToken) -> Result<LoadReport> {
        spec.validate()?;
        let workers = self.config.num_workers;
        if workers == 0 {
            return Err(Error::InvalidWorkload {
                reason: "worker count must be greater than 0".to_string(),
            });
        }

        let start = Instant::now();
        let token = cancel.child_token();
        let ctx = Arc::new(WorkerContext {
            store: Arc::clone(&self.store),
            idents: self.idents.clone(),
            payload: Payload::build(spec, &self.idents),
            key_size: spec.key_size,
            written: AtomicU64::new(0),
        });

        let mut pending: FuturesUnordered<_> = Partition::split(spec.key_count, workers)
            .enumerate()
            .map(|(worker_id, partition)| {
                let handle = tokio::spawn(worker_loop(
                    worker_id,
                    partition,
                    Arc::clone(&ctx),
                    token.clone(),
                ));
                async move { (worker_id, handle.await) }
            })
            .collect();

        let limit = self.config.load_timeout;
        let deadline = tokio::time::sleep(limit.unwrap_or(Duration::MAX));
        tokio::pin!(deadline);
        let mut timed_out = false;
        let mut failure: Option<Error> = None;

        loop {
            tokio::select! {
                joined = pending.next() => {
                    let Some((worker_id, joined)) = joined else {
                        break;
                    };
                    let err = match joined {
                        Ok(Ok(_written)) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!("Worker {worker_id} finished ({_written} keys)");
                            continue;
                        }
                        Ok(Err(e)) => e,
                        Err(join_err) => Error::WorkerPanicked {
                            worker_id,
                            reason: join_err.to_string(),
                        },
                    };
                    if !err.is_cancelled() {
                        token.cancel();
                    }
                    record_failure(&mut failure, err);
                }
                () = &mut deadline, if limit.is_some() && !timed_out => {
                    timed_out = true;
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Bulk load exceeded {:?}, cancelling workers", limit);
                    token.cancel();
                    record_failure(&mut failure, Error::LoadTimeout(limit.unwrap_or_default()));
                }
            }
        }

        let written = ctx.written.load(Ordering::Relaxed);
        let elapsed = start.elapsed();

        if let Some(source) = failure {
            #[cfg(feature = "tracing")]
            tracing::error!(
                "Bulk load aborted after {written}/{} keys: {source}",
                spec.key_count
            );
            return Err(Error::LoadAborted {
                written,
                total: spec.key_count,
                source: Box::new(source),
            });
        }

        let report = LoadReport {
            keys_written: written,
            workers,
            elapsed,
        };

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Loaded {} keys with {} workers in {:?} ({:.0} keys/s)",
            report.keys_written,
            report.workers,
            report.elapsed,
            report.keys_per_sec()
        );

        Ok(report)
    }
}

/// Keeps the first meaningful failure.
///
/// [`Error::Cancelled`] is only a placeholder: it is what siblings report
/// once someone else has cancelled them, so any later concrete cause replaces
/// it.
fn record_failure(slot: &mut Option<Error>, err: Error) {
    match slot {
        None => *slot = Some(err),
        Some(existing) if existing.is_cancelled() && !err.is_cancelled() => *slot = Some(err),
        Some(_) => {}
    }
}
