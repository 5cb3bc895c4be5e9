//! Runs a matrix of workloads back to back and records the memory figures of
//! each one as a JSON line.
//!
//! A plan is a JSON array of groups. Every list in a group is one axis of a
//! cartesian product; omitted axes fall back to a single default value:
//!
//! ```json
//! [
//!   { "type": "string", "key_counts": [1000, 5000], "key_sizes": [16, 64], "value_sizes": [64, 256] },
//!   { "type": "hash", "key_counts": [500], "key_sizes": [32], "field_counts": [10, 50], "field_sizes": [16], "value_sizes": [128] }
//! ]
//! ```

use super::{config::SweepConfig, record_run, redis::RedisStore};
use anyhow::Context;
use resp_cost::{
    DataKind, Error, IdentGenerator, MemorySample, SessionConfig, Store, WorkloadSpec, populate,
};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One group of a sweep plan.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepGroup {
    #[serde(rename = "type", with = "data_kind")]
    pub kind: DataKind,
    #[serde(default = "default_key_counts")]
    pub key_counts: Vec<u64>,
    #[serde(default = "default_key_sizes")]
    pub key_sizes: Vec<usize>,
    #[serde(default = "default_zero")]
    pub field_counts: Vec<u64>,
    #[serde(default = "default_zero")]
    pub field_sizes: Vec<usize>,
    #[serde(default = "default_value_sizes")]
    pub value_sizes: Vec<usize>,
}

mod data_kind {
    use resp_cost::DataKind;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(kind: &DataKind, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(kind.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DataKind, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

fn default_key_counts() -> Vec<u64> {
    vec![1000]
}

fn default_key_sizes() -> Vec<usize> {
    vec![16]
}

fn default_zero<T: Default>() -> Vec<T> {
    vec![T::default()]
}

fn default_value_sizes() -> Vec<usize> {
    vec![64]
}

impl SweepGroup {
    /// Every combination of the group's axes, in plan order with
    /// `value_sizes` varying fastest.
    pub fn workloads(&self) -> Vec<WorkloadSpec> {
        let mut out = Vec::new();
        for &key_count in &self.key_counts {
            for &key_size in &self.key_sizes {
                for &field_count in &self.field_counts {
                    for &field_size in &self.field_sizes {
                        for &value_size in &self.value_sizes {
                            out.push(WorkloadSpec {
                                kind: self.kind,
                                key_count,
                                key_size,
                                field_count,
                                field_size,
                                value_size,
                            });
                        }
                    }
                }
            }
        }
        out
    }
}

pub fn parse_plan(json: &str) -> anyhow::Result<Vec<SweepGroup>> {
    let groups: Vec<SweepGroup> = serde_json::from_str(json).context("malformed sweep plan")?;
    if groups.is_empty() {
        anyhow::bail!("sweep plan has no groups");
    }
    Ok(groups)
}

pub fn load_plan(path: &Path) -> anyhow::Result<Vec<SweepGroup>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read sweep plan {}", path.display()))?;
    parse_plan(&json)
}

/// One result line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepRow {
    #[serde(rename = "type", with = "data_kind")]
    pub kind: DataKind,
    pub key_count: u64,
    pub key_size: usize,
    pub field_count: u64,
    pub field_size: usize,
    pub value_size: usize,
    pub used_memory: u64,
    pub total_system_memory: u64,
    pub maxmemory: u64,
}

impl SweepRow {
    pub fn new(spec: &WorkloadSpec, memory: &MemorySample) -> Self {
        Self {
            kind: spec.kind,
            key_count: spec.key_count,
            key_size: spec.key_size,
            field_count: spec.field_count,
            field_size: spec.field_size,
            value_size: spec.value_size,
            used_memory: memory.used_bytes,
            total_system_memory: memory.total_system_bytes,
            maxmemory: memory.max_bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Runs every workload of `groups` against `store` and writes one JSON line
/// per successful run to `out`.
///
/// A failing run is logged and skipped. Cancellation stops the sweep.
pub async fn run_plan<S: Store, W: Write>(
    store: Arc<S>,
    groups: &[SweepGroup],
    idents: &IdentGenerator,
    session: &SessionConfig,
    out: &mut W,
    cancel: &CancellationToken,
) -> anyhow::Result<SweepSummary> {
    let mut summary = SweepSummary::default();

    for spec in groups.iter().flat_map(SweepGroup::workloads) {
        if cancel.is_cancelled() {
            anyhow::bail!(Error::Cancelled);
        }

        let result = populate(Arc::clone(&store), &spec, idents, session, cancel).await;
        record_run(&result);

        match result {
            Ok(report) => {
                let row = SweepRow::new(&spec, &report.memory);
                serde_json::to_writer(&mut *out, &row)?;
                out.write_all(b"\n")?;
                out.flush()?;
                summary.succeeded += 1;
            }
            Err(_) if cancel.is_cancelled() => anyhow::bail!(Error::Cancelled),
            Err(e) => {
                tracing::warn!(?spec, "Skipping failed run: {e}");
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

/// `resp-cost sweep`.
pub async fn run(config: SweepConfig, cancel: &CancellationToken) -> anyhow::Result<()> {
    let groups = load_plan(&config.plan)?;
    let store = Arc::new(RedisStore::connect(&config.connection).await?);
    let idents = IdentGenerator::new(config.run.alphabet);

    let runs: usize = groups.iter().map(|g| g.workloads().len()).sum();
    tracing::info!(
        "Sweeping {runs} workloads from {} against {}",
        config.plan.display(),
        config.connection
    );

    let summary = match &config.output {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            let mut out: BufWriter<File> = BufWriter::new(file);
            run_plan(store, &groups, &idents, &config.run.session, &mut out, cancel).await?
        }
        None => {
            let mut out = std::io::stdout();
            run_plan(store, &groups, &idents, &config.run.session, &mut out, cancel).await?
        }
    };

    tracing::info!(
        "Sweep finished: {} succeeded, {} failed",
        summary.succeeded,
        summary.failed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use resp_cost::{Result, StoreOp};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Counts keys and reports `used_memory` proportional to them.
    #[derive(Default)]
    struct CountingStore {
        keys: Mutex<HashMap<String, usize>>,
        flushes: Mutex<usize>,
    }

    impl CountingStore {
        fn put(&self, key: &str, elements: usize) {
            self.keys.lock().unwrap().insert(key.to_string(), elements);
        }
    }

    impl Store for CountingStore {
        async fn set(&self, key: &str, _value: &str) -> Result<()> {
            self.put(key, 1);
            Ok(())
        }

        async fn hset(&self, key: &str, fields: &[(Arc<str>, Arc<str>)]) -> Result<()> {
            self.put(key, fields.len());
            Ok(())
        }

        async fn rpush(&self, key: &str, elements: &[Arc<str>]) -> Result<()> {
            self.put(key, elements.len());
            Ok(())
        }

        async fn sadd(&self, key: &str, members: &[Arc<str>]) -> Result<()> {
            self.put(key, members.len());
            Ok(())
        }

        async fn zadd(&self, key: &str, members: &[(f64, Arc<str>)]) -> Result<()> {
            self.put(key, members.len());
            Ok(())
        }

        async fn flush_all(&self) -> Result<()> {
            self.keys.lock().unwrap().clear();
            *self.flushes.lock().unwrap() += 1;
            Ok(())
        }

        async fn info(&self, _section: &str) -> Result<String> {
            let used: usize = self.keys.lock().unwrap().values().map(|n| 100 + n * 10).sum();
            Ok(format!(
                "# Memory\r\nused_memory:{used}\r\ntotal_system_memory:1024\r\nmaxmemory:0\r\n"
            ))
        }

        async fn scan(&self, _cursor: u64, _pattern: &str, _count: usize) -> Result<(Vec<String>, u64)> {
            Err(Error::store(StoreOp::Scan, "unsupported"))
        }
    }

    fn session() -> SessionConfig {
        let mut session = SessionConfig {
            empty_first: true,
            ..SessionConfig::default()
        };
        session.reclaim.poll_interval = core::time::Duration::ZERO;
        session
    }

    #[test]
    fn omitted_axes_use_defaults() {
        let groups = parse_plan(r#"[{ "type": "string" }]"#).unwrap();
        assert_eq!(groups[0].workloads(), vec![WorkloadSpec {
            kind: DataKind::String,
            key_count: 1000,
            key_size: 16,
            field_count: 0,
            field_size: 0,
            value_size: 64,
        }]);
    }

    #[test]
    fn expands_the_cartesian_product_in_order() {
        let groups = parse_plan(
            r#"[{ "type": "string", "key_counts": [1000, 5000], "key_sizes": [16, 64], "value_sizes": [64, 256] }]"#,
        )
        .unwrap();
        let combos: Vec<_> = groups[0]
            .workloads()
            .iter()
            .map(|w| (w.key_count, w.key_size, w.value_size))
            .collect();
        assert_eq!(combos, vec![
            (1000, 16, 64),
            (1000, 16, 256),
            (1000, 64, 64),
            (1000, 64, 256),
            (5000, 16, 64),
            (5000, 16, 256),
            (5000, 64, 64),
            (5000, 64, 256),
        ]);
    }

    #[test]
    fn rejects_malformed_plans() {
        assert!(parse_plan("[]").is_err());
        assert!(parse_plan(r#"[{ "type": "stream" }]"#).is_err());
        assert!(parse_plan(r#"[{ "type": "hash", "fields": [1] }]"#).is_err());
        assert!(parse_plan(r#"{ "type": "hash" }"#).is_err());
    }

    #[test]
    fn rows_serialize_with_flat_field_names() {
        let spec = WorkloadSpec::default();
        let memory = MemorySample {
            used_bytes: 1,
            total_system_bytes: 2,
            max_bytes: 3,
        };
        let json = serde_json::to_value(SweepRow::new(&spec, &memory)).unwrap();
        assert_eq!(json["type"], "string");
        assert_eq!(json["key_count"], 1000);
        assert_eq!(json["used_memory"], 1);
        assert_eq!(json["total_system_memory"], 2);
        assert_eq!(json["maxmemory"], 3);
    }

    #[tokio::test]
    async fn writes_one_line_per_run_and_skips_failures() {
        let store = Arc::new(CountingStore::default());
        // The zero field count makes the second hash workload invalid.
        let groups = parse_plan(
            r#"[
                { "type": "string", "key_counts": [10, 20], "key_sizes": [2] },
                { "type": "hash", "key_counts": [5], "key_sizes": [1], "field_counts": [3, 0], "field_sizes": [1] }
            ]"#,
        )
        .unwrap();

        let mut out = Vec::new();
        let summary = run_plan(
            Arc::clone(&store),
            &groups,
            &IdentGenerator::default(),
            &session(),
            &mut out,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary, SweepSummary {
            succeeded: 3,
            failed: 1,
        });
        // Invalid workloads are rejected before the store is flushed.
        assert_eq!(*store.flushes.lock().unwrap(), 3);

        let rows: Vec<SweepRow> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].key_count, 10);
        assert_eq!(rows[0].used_memory, 10 * 110);
        assert_eq!(rows[1].used_memory, 20 * 110);
        assert_eq!((rows[2].kind, rows[2].field_count), (DataKind::Hash, 3));
        assert_eq!(rows[2].used_memory, 5 * 130);
    }

    #[tokio::test]
    async fn cancellation_stops_the_sweep() {
        let store = Arc::new(CountingStore::default());
        let groups = parse_plan(r#"[{ "type": "string", "key_counts": [1, 2, 3] }]"#).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut out = Vec::new();
        let err = run_plan(store, &groups, &IdentGenerator::default(), &session(), &mut out, &cancel)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cancelled"));
        assert!(out.is_empty());
    }
}
