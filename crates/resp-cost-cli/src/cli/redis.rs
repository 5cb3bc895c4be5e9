use super::config::ConnectionConfig;
use anyhow::Context;
use redis::{
    ConnectionAddr, ConnectionInfo, FromRedisValue, RedisConnectionInfo,
    aio::MultiplexedConnection,
};
use resp_cost::{Error, Result, Store, StoreOp};
use std::sync::Arc;

/// [`Store`] backed by a single multiplexed Redis connection.
///
/// The connection pipelines requests from any number of tasks, so every
/// loader worker clones the handle instead of opening its own socket.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(config: &ConnectionConfig) -> anyhow::Result<Self> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: RedisConnectionInfo {
                password: config.password.clone(),
                ..RedisConnectionInfo::default()
            },
        };
        let client = redis::Client::open(info).context("invalid Redis connection settings")?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .with_context(|| format!("failed to connect to {config}"))?;

        tracing::debug!("Connected to {config}");
        Ok(Self { conn })
    }

    async fn query<T: FromRedisValue>(&self, op: StoreOp, cmd: redis::Cmd) -> Result<T> {
        let mut conn = self.conn.clone();
        cmd.query_async(&mut conn)
            .await
            .map_err(|e| Error::store(op, e))
    }
}

impl Store for RedisStore {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        self.query(StoreOp::Set, cmd).await
    }

    async fn hset(&self, key: &str, fields: &[(Arc<str>, Arc<str>)]) -> Result<()> {
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in fields {
            cmd.arg(&**field).arg(&**value);
        }
        self.query(StoreOp::HSet, cmd).await
    }

    async fn rpush(&self, key: &str, elements: &[Arc<str>]) -> Result<()> {
        let mut cmd = redis::cmd("RPUSH");
        cmd.arg(key);
        for element in elements {
            cmd.arg(&**element);
        }
        self.query(StoreOp::RPush, cmd).await
    }

    async fn sadd(&self, key: &str, members: &[Arc<str>]) -> Result<()> {
        let mut cmd = redis::cmd("SADD");
        cmd.arg(key);
        for member in members {
            cmd.arg(&**member);
        }
        self.query(StoreOp::SAdd, cmd).await
    }

    async fn zadd(&self, key: &str, members: &[(f64, Arc<str>)]) -> Result<()> {
        let mut cmd = redis::cmd("ZADD");
        cmd.arg(key);
        for (score, member) in members {
            cmd.arg(*score).arg(&**member);
        }
        self.query(StoreOp::ZAdd, cmd).await
    }

    async fn flush_all(&self) -> Result<()> {
        self.query(StoreOp::FlushAll, redis::cmd("FLUSHALL")).await
    }

    async fn info(&self, section: &str) -> Result<String> {
        let mut cmd = redis::cmd("INFO");
        cmd.arg(section);
        self.query(StoreOp::Info, cmd).await
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(Vec<String>, u64)> {
        let mut cmd = redis::cmd("SCAN");
        cmd.arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count);
        let (next, keys): (u64, Vec<String>) = self.query(StoreOp::Scan, cmd).await?;
        Ok((keys, next))
    }
}
