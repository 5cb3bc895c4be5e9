//! The client-side surface a Redis-compatible store must expose.
//!
//! The loader, reclaim monitor and key-space walk only ever talk to a store
//! through [`Store`]. Wire protocol, connection pooling and reconnection are
//! the implementor's concern; the only contract is that one instance can be
//! shared across tasks (`Send + Sync`) and driven concurrently.

mod memory;
#[cfg(test)]
pub(crate) mod mock;
mod walk;

pub use memory::*;
pub use walk::*;

use crate::Result;
use core::{fmt, future::Future};
use std::sync::Arc;

/// Store command, used to tag [`crate::Error::Store`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Set,
    HSet,
    RPush,
    SAdd,
    ZAdd,
    FlushAll,
    Info,
    Scan,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Set => "SET",
            Self::HSet => "HSET",
            Self::RPush => "RPUSH",
            Self::SAdd => "SADD",
            Self::ZAdd => "ZADD",
            Self::FlushAll => "FLUSHALL",
            Self::Info => "INFO",
            Self::Scan => "SCAN",
        };
        f.write_str(name)
    }
}

/// Asynchronous client for a Redis-compatible store.
///
/// Every write is fire-and-check: success means the store acknowledged the
/// command, nothing more. No transactional guarantees are assumed.
pub trait Store: Send + Sync + 'static {
    /// `SET key value`.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;

    /// `HSET key field value [field value ...]`.
    fn hset(
        &self,
        key: &str,
        fields: &[(Arc<str>, Arc<str>)],
    ) -> impl Future<Output = Result<()>> + Send;

    /// `RPUSH key element [element ...]`.
    fn rpush(&self, key: &str, elements: &[Arc<str>]) -> impl Future<Output = Result<()>> + Send;

    /// `SADD key member [member ...]`.
    fn sadd(&self, key: &str, members: &[Arc<str>]) -> impl Future<Output = Result<()>> + Send;

    /// `ZADD key score member [score member ...]`.
    fn zadd(
        &self,
        key: &str,
        members: &[(f64, Arc<str>)],
    ) -> impl Future<Output = Result<()>> + Send;

    /// `FLUSHALL`.
    fn flush_all(&self) -> impl Future<Output = Result<()>> + Send;

    /// `INFO section`, returned verbatim.
    fn info(&self, section: &str) -> impl Future<Output = Result<String>> + Send;

    /// `SCAN cursor MATCH pattern COUNT count`.
    ///
    /// Returns the batch of keys and the next cursor; `0` ends the iteration.
    fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> impl Future<Output = Result<(Vec<String>, u64)>> + Send;
}
