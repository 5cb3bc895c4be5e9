use super::{Partition, payload::Payload};
use crate::{Error, IdentGenerator, Result, Store};
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// State shared by every worker of one load.
pub(crate) struct WorkerContext<S> {
    pub store: Arc<S>,
    pub idents: IdentGenerator,
    pub payload: Payload,
    pub key_size: usize,
    /// Keys acknowledged by the store so far, across all workers.
    pub written: AtomicU64,
}

/// Writes every key of `partition`, one store call per index.
///
/// Designed to be spawned as a Tokio task. The loop checks `token` before
/// every write and abandons an in-flight write when it fires, returning
/// [`Error::Cancelled`]. The first store error ends the task and is returned
/// as-is; the manager decides whether siblings must stop.
///
/// Returns the number of keys this worker wrote.
pub(crate) async fn worker_loop<S: Store>(
    _worker_id: usize,
    partition: Partition,
    ctx: Arc<WorkerContext<S>>,
    token: CancellationToken,
) -> Result<u64> {
    #[cfg(feature = "tracing")]
    tracing::trace!(
        "Worker {_worker_id} started on [{}, {})",
        partition.start,
        partition.end
    );

    let mut written = 0;
    for index in partition.range() {
        let key = ctx.idents.generate(index, ctx.key_size);

        tokio::select! {
            biased;
            () = token.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {_worker_id} cancelled after {written} keys");
                return Err(Error::Cancelled);
            }
            res = ctx.payload.write(ctx.store.as_ref(), &key) => {
                if let Err(_e) = &res {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Worker {_worker_id} failed at index {index}: {_e}");
                }
                res?;
            }
        }

        written += 1;
        ctx.written.fetch_add(1, Ordering::Relaxed);
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {_worker_id} stopped after {written} keys");

    Ok(written)
}
