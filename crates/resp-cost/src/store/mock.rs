//! In-memory [`Store`] used by tests.
//!
//! Records every write, paginates `SCAN` over its sorted key set, serves a
//! scripted `used_memory` curve from `INFO`, and can fail the n-th call of a
//! given command.

use crate::{Error, Result, Store, StoreOp};
use core::time::Duration;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Value {
    String(String),
    Hash(Vec<(String, String)>),
    List(Vec<String>),
    Set(Vec<String>),
    ZSet(Vec<(f64, String)>),
}

/// One acknowledged write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Write {
    pub op: StoreOp,
    pub key: String,
    pub elements: usize,
}

enum MemoryScript {
    Sequence(Vec<u64>),
    Halving(u64),
}

#[derive(Debug, thiserror::Error)]
#[error("injected failure on {op} call #{call}")]
pub(crate) struct InjectedFailure {
    op: StoreOp,
    call: usize,
}

pub(crate) struct MockStore {
    data: Mutex<BTreeMap<String, Value>>,
    writes: Mutex<Vec<Write>>,
    calls: Mutex<HashMap<StoreOp, usize>>,
    failures: Vec<(StoreOp, usize)>,
    memory: MemoryScript,
    scan_page: usize,
    scan_overlap: bool,
    write_delay: Option<Duration>,
    scan_delay: Option<Duration>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::default(),
            writes: Mutex::default(),
            calls: Mutex::default(),
            failures: Vec::new(),
            memory: MemoryScript::Sequence(Vec::new()),
            scan_page: 10,
            scan_overlap: false,
            write_delay: None,
            scan_delay: None,
        }
    }

    /// `INFO memory` reports these `used_memory` values in order, then
    /// repeats the last one.
    pub fn with_used_memory(mut self, sequence: impl Into<Vec<u64>>) -> Self {
        self.memory = MemoryScript::Sequence(sequence.into());
        self
    }

    /// `used_memory` halves on every `INFO` call and never settles.
    pub fn with_halving_memory(mut self, start: u64) -> Self {
        self.memory = MemoryScript::Halving(start);
        self
    }

    pub fn with_scan_page(mut self, page: usize) -> Self {
        self.scan_page = page.max(1);
        self
    }

    /// Each `SCAN` page after the first repeats the previous page's last key.
    pub fn with_scan_overlap(mut self) -> Self {
        self.scan_overlap = true;
        self
    }

    /// Every write sleeps this long before being applied.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Every `SCAN` sleeps this long before answering.
    pub fn with_scan_delay(mut self, delay: Duration) -> Self {
        self.scan_delay = Some(delay);
        self
    }

    /// Fails the `nth` (1-based) call of `op`.
    pub fn fail_on(mut self, op: StoreOp, nth: usize) -> Self {
        self.failures.push((op, nth));
        self
    }

    pub fn calls(&self, op: StoreOp) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    pub fn scan_calls(&self) -> usize {
        self.calls(StoreOp::Scan)
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().clone()
    }

    pub fn key_count(&self) -> usize {
        self.data.lock().len()
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.data.lock().get(key).cloned()
    }

    fn enter(&self, op: StoreOp) -> Result<usize> {
        let call = {
            let mut calls = self.calls.lock();
            let count = calls.entry(op).or_insert(0);
            *count += 1;
            *count
        };
        if self.failures.contains(&(op, call)) {
            return Err(Error::store(op, InjectedFailure { op, call }));
        }
        Ok(call)
    }

    async fn write(&self, op: StoreOp, key: &str, value: Value, elements: usize) -> Result<()> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        self.enter(op)?;
        self.data.lock().insert(key.to_string(), value);
        self.writes.lock().push(Write {
            op,
            key: key.to_string(),
            elements,
        });
        Ok(())
    }

    fn used_memory(&self, call: usize) -> u64 {
        match &self.memory {
            MemoryScript::Sequence(seq) => seq
                .get(call - 1)
                .or_else(|| seq.last())
                .copied()
                .unwrap_or(0),
            MemoryScript::Halving(start) => {
                let shift = u32::try_from(call - 1).unwrap_or(u32::MAX).min(63);
                (start >> shift).max(1)
            }
        }
    }
}

fn strings(items: &[Arc<str>]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Store for MockStore {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write(StoreOp::Set, key, Value::String(value.to_string()), 1)
            .await
    }

    async fn hset(&self, key: &str, fields: &[(Arc<str>, Arc<str>)]) -> Result<()> {
        let pairs = fields
            .iter()
            .map(|(f, v)| (f.to_string(), v.to_string()))
            .collect();
        self.write(StoreOp::HSet, key, Value::Hash(pairs), fields.len())
            .await
    }

    async fn rpush(&self, key: &str, elements: &[Arc<str>]) -> Result<()> {
        self.write(
            StoreOp::RPush,
            key,
            Value::List(strings(elements)),
            elements.len(),
        )
        .await
    }

    async fn sadd(&self, key: &str, members: &[Arc<str>]) -> Result<()> {
        self.write(StoreOp::SAdd, key, Value::Set(strings(members)), members.len())
            .await
    }

    async fn zadd(&self, key: &str, members: &[(f64, Arc<str>)]) -> Result<()> {
        let scored = members
            .iter()
            .map(|(score, m)| (*score, m.to_string()))
            .collect();
        self.write(StoreOp::ZAdd, key, Value::ZSet(scored), members.len())
            .await
    }

    async fn flush_all(&self) -> Result<()> {
        self.enter(StoreOp::FlushAll)?;
        self.data.lock().clear();
        Ok(())
    }

    async fn info(&self, _section: &str) -> Result<String> {
        let call = self.enter(StoreOp::Info)?;
        Ok(format!(
            "# Memory\r\nused_memory:{}\r\ntotal_system_memory:{}\r\nmaxmemory:0\r\n",
            self.used_memory(call),
            16_u64 << 30
        ))
    }

    async fn scan(&self, cursor: u64, _pattern: &str, _count: usize) -> Result<(Vec<String>, u64)> {
        self.enter(StoreOp::Scan)?;
        if let Some(delay) = self.scan_delay {
            tokio::time::sleep(delay).await;
        }
        let data = self.data.lock();
        let start = usize::try_from(cursor).unwrap_or(usize::MAX);
        let from = if self.scan_overlap && start > 0 {
            start - 1
        } else {
            start
        };
        let end = (start + self.scan_page).min(data.len());
        let keys = data
            .keys()
            .skip(from)
            .take(end.saturating_sub(from))
            .cloned()
            .collect();
        let next = if end >= data.len() { 0 } else { end as u64 };
        Ok((keys, next))
    }
}
