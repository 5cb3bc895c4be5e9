//! One end-to-end populate run.

use crate::{
    BulkLoader, Error, IdentGenerator, LoadReport, LoaderConfig, MemorySample, ReclaimConfig,
    ReclaimReport, Result, Store, UniquenessCheck, UniquenessPolicy, WorkloadSpec, reset_and_wait,
    walk_keys,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Default `COUNT` hint for the post-load key-space walk.
pub const DEFAULT_SCAN_BATCH: usize = 1_000;

/// Knobs for [`populate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Flush the store and wait for memory to settle before loading.
    pub empty_first: bool,
    /// `SCAN` the whole key space after loading.
    pub walk_keys: bool,
    pub scan_batch: usize,
    pub policy: UniquenessPolicy,
    pub reclaim: ReclaimConfig,
    pub loader: LoaderConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            empty_first: false,
            walk_keys: false,
            scan_batch: DEFAULT_SCAN_BATCH,
            policy: UniquenessPolicy::default(),
            reclaim: ReclaimConfig::default(),
            loader: LoaderConfig::default(),
        }
    }
}

/// Everything a populate run observed.
#[derive(Clone, Debug, PartialEq)]
pub struct PopulateReport {
    pub load: LoadReport,
    /// Present when the store was emptied first.
    pub reclaim: Option<ReclaimReport>,
    /// Distinct keys seen by the post-load walk, when enabled.
    pub walked_keys: Option<usize>,
    /// `INFO memory` taken after the load.
    pub memory: MemorySample,
    /// Identifier widths that could not guarantee uniqueness.
    pub warnings: Vec<UniquenessCheck>,
}

/// Runs the full workflow against `store`:
///
/// 1. validate `spec` and check every identifier width against its
///    population, warning or failing according to `config.policy`
/// 2. optionally flush and wait for memory to settle
/// 3. bulk load
/// 4. optionally walk the key space
/// 5. sample `INFO memory`
///
/// # Errors
///
/// - [`Error::InvalidWorkload`] or [`Error::InsufficientLength`] before
///   anything touches the store.
/// - [`Error::Cancelled`] if `cancel` fires while waiting for reclaim, during
///   the key-space walk or before the final memory sample.
/// - Any error from [`reset_and_wait`], [`BulkLoader::load`] or
///   [`walk_keys`].
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(skip_all, fields(kind = %spec.kind, keys = spec.key_count))
)]
pub async fn populate<S: Store>(
    store: Arc<S>,
    spec: &WorkloadSpec,
    idents: &IdentGenerator,
    config: &SessionConfig,
    cancel: &CancellationToken,
) -> Result<PopulateReport> {
    spec.validate()?;

    let mut warnings = Vec::new();
    for check in spec.uniqueness_checks(idents.alphabet()) {
        if check.is_sufficient() {
            continue;
        }
        check.enforce(config.policy)?;
        #[cfg(feature = "tracing")]
        tracing::warn!("{check}");
        warnings.push(check);
    }

    let reclaim = if config.empty_first {
        let report = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            res = reset_and_wait(store.as_ref(), &config.reclaim) => res?,
        };
        Some(report)
    } else {
        None
    };

    let loader = BulkLoader::new(Arc::clone(&store), idents.clone(), config.loader.clone());
    let load = loader.load(spec, cancel).await?;

    let walked_keys = if config.walk_keys {
        let walked = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            res = walk_keys(store.as_ref(), "*", config.scan_batch) => res?,
        };
        Some(walked)
    } else {
        None
    };

    let memory = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(Error::Cancelled),
        res = MemorySample::fetch(store.as_ref()) => res?,
    };

    #[cfg(feature = "tracing")]
    tracing::info!("{memory}");

    Ok(PopulateReport {
        load,
        reclaim,
        walked_keys,
        memory,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockStore;
    use crate::{DataKind, StoreOp};

    fn string_spec(key_count: u64, key_size: usize) -> WorkloadSpec {
        WorkloadSpec {
            kind: DataKind::String,
            key_count,
            key_size,
            field_count: 0,
            field_size: 0,
            value_size: 8,
        }
    }

    fn walking() -> SessionConfig {
        SessionConfig {
            walk_keys: true,
            scan_batch: 100,
            ..SessionConfig::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn loads_then_walks_every_key() {
        let store = Arc::new(MockStore::new().with_scan_page(100));
        let report = populate(
            Arc::clone(&store),
            &string_spec(1_000, 4),
            &IdentGenerator::default(),
            &walking(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.load.keys_written, 1_000);
        assert_eq!(store.calls(StoreOp::Set), 1_000);
        assert_eq!(report.walked_keys, Some(1_000));
        assert!(report.warnings.is_empty());
        assert!(report.reclaim.is_none());
        assert_eq!(store.calls(StoreOp::FlushAll), 0);
    }

    #[tokio::test]
    async fn short_keys_warn_but_still_load() {
        let store = Arc::new(MockStore::new());
        let report = populate(
            Arc::clone(&store),
            &string_spec(1_000, 1),
            &IdentGenerator::default(),
            &walking(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.warnings.len(), 1);
        let warning = &report.warnings[0];
        assert_eq!((warning.subject, warning.required), ("key", 4));
        assert_eq!(warning.distinct, 10);
        assert_eq!(store.calls(StoreOp::Set), 1_000);
        assert_eq!(report.walked_keys, Some(10));
    }

    #[tokio::test]
    async fn strict_policy_refuses_before_touching_the_store() {
        let store = Arc::new(MockStore::new());
        let config = SessionConfig {
            policy: UniquenessPolicy::Strict,
            empty_first: true,
            ..SessionConfig::default()
        };

        let err = populate(
            Arc::clone(&store),
            &string_spec(1_000, 2),
            &IdentGenerator::default(),
            &config,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            Error::InsufficientLength {
                subject: "key",
                count: 1_000,
                length: 2,
                required: 4,
            }
        ));
        assert_eq!(store.calls(StoreOp::FlushAll), 0);
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn short_member_width_is_reported_for_collections() {
        let store = Arc::new(MockStore::new());
        let spec = WorkloadSpec {
            kind: DataKind::Set,
            key_count: 5,
            key_size: 1,
            field_count: 20,
            field_size: 0,
            value_size: 1,
        };
        let report = populate(
            store,
            &spec,
            &IdentGenerator::default(),
            &SessionConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].subject, "member");
    }

    #[tokio::test]
    async fn empty_first_flushes_and_settles_before_loading() {
        let store = Arc::new(MockStore::new().with_used_memory([5_000, 1_000, 990, 40_000]));
        store.set("stale", "x").await.unwrap();

        let config = SessionConfig {
            empty_first: true,
            reclaim: ReclaimConfig {
                poll_interval: core::time::Duration::ZERO,
                ..ReclaimConfig::default()
            },
            ..SessionConfig::default()
        };
        let report = populate(
            Arc::clone(&store),
            &string_spec(100, 2),
            &IdentGenerator::default(),
            &config,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let reclaim = report.reclaim.unwrap();
        assert_eq!(reclaim.polls, 3);
        assert_eq!(reclaim.settled.used_bytes, 990);
        assert_eq!(report.memory.used_bytes, 40_000);
        assert!(store.value("stale").is_none());
        assert_eq!(store.key_count(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_the_key_walk() {
        let store = Arc::new(
            MockStore::new()
                .with_scan_page(100)
                .with_scan_delay(core::time::Duration::from_secs(3_600)),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(core::time::Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = populate(
            Arc::clone(&store),
            &string_spec(100, 3),
            &IdentGenerator::default(),
            &walking(),
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(store.calls(StoreOp::Set), 100);
        assert_eq!(store.scan_calls(), 1);
        assert_eq!(store.calls(StoreOp::Info), 0);
    }

    #[tokio::test]
    async fn invalid_workload_is_rejected() {
        let store = Arc::new(MockStore::new());
        let err = populate(
            Arc::clone(&store),
            &string_spec(10, 0),
            &IdentGenerator::default(),
            &SessionConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidWorkload { .. }));
        assert_eq!(store.calls(StoreOp::Info), 0);
    }
}
