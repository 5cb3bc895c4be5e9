use crate::{Result, Store};
use core::fmt;

/// Memory figures reported by `INFO memory` at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemorySample {
    /// `used_memory`
    pub used_bytes: u64,
    /// `total_system_memory`
    pub total_system_bytes: u64,
    /// `maxmemory`
    pub max_bytes: u64,
}

const USED: &str = "used_memory:";
const TOTAL_SYSTEM: &str = "total_system_memory:";
const MAX: &str = "maxmemory:";

impl MemorySample {
    /// Parses an `INFO memory` report.
    ///
    /// Lines are matched by exact prefix (`used_memory:` does not match
    /// `used_memory_rss:`). Missing or malformed fields read as zero; use
    /// [`Self::parse_with_caveats`] to find out which.
    pub fn parse(info: &str) -> Self {
        Self::parse_with_caveats(info).0
    }

    /// Like [`Self::parse`], also returning the names of fields that were
    /// missing or unparsable and therefore defaulted to zero.
    pub fn parse_with_caveats(info: &str) -> (Self, Vec<&'static str>) {
        let mut used = None;
        let mut total = None;
        let mut max = None;

        for line in info.lines() {
            let line = line.trim_end_matches('\r');
            if let Some(raw) = line.strip_prefix(USED) {
                used = raw.trim().parse::<u64>().ok();
            } else if let Some(raw) = line.strip_prefix(TOTAL_SYSTEM) {
                total = raw.trim().parse::<u64>().ok();
            } else if let Some(raw) = line.strip_prefix(MAX) {
                max = raw.trim().parse::<u64>().ok();
            }
        }

        let mut caveats = Vec::new();
        let mut take = |value: Option<u64>, name: &'static str| {
            value.unwrap_or_else(|| {
                caveats.push(name);
                0
            })
        };
        let sample = Self {
            used_bytes: take(used, "used_memory"),
            total_system_bytes: take(total, "total_system_memory"),
            max_bytes: take(max, "maxmemory"),
        };

        #[cfg(feature = "tracing")]
        if !caveats.is_empty() {
            tracing::warn!(
                fields = ?caveats,
                "INFO memory report incomplete, defaulting fields to 0"
            );
        }

        (sample, caveats)
    }

    /// Fetches and parses `INFO memory` from `store`.
    pub async fn fetch<S: Store>(store: &S) -> Result<Self> {
        let info = store.info("memory").await?;
        Ok(Self::parse(&info))
    }
}

impl fmt::Display for MemorySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "used_memory: {}, total_system_memory: {}, maxmemory: {}",
            self.used_bytes, self.total_system_bytes, self.max_bytes
        )
    }
}
