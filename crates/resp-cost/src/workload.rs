//! Declarative description of the dataset to generate.

use crate::{Alphabet, Error, Result, UniquenessCheck};
use core::{fmt, str::FromStr};

/// Shape of every generated record, which also decides the write verb.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// `SET key value`.
    #[default]
    String,
    /// `HSET key field value [field value ...]`.
    Hash,
    /// `RPUSH key element [element ...]`.
    List,
    /// `SADD key member [member ...]`.
    Set,
    /// `ZADD key score member [score member ...]`.
    ZSet,
}

impl DataKind {
    pub const ALL: [Self; 5] = [Self::String, Self::Hash, Self::List, Self::Set, Self::ZSet];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Hash => "hash",
            Self::List => "list",
            Self::Set => "set",
            Self::ZSet => "zset",
        }
    }

    /// Whether each record carries `field_count` sub-elements.
    pub const fn is_collection(self) -> bool {
        !matches!(self, Self::String)
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidWorkload {
                reason: format!("unsupported data type `{s}` (expected string|hash|list|set|zset)"),
            })
    }
}

/// Immutable description of one populate run.
///
/// Sizes are in characters (identifiers and values are ASCII, so also in
/// bytes). `field_count` and `field_size` are ignored by kinds that do not
/// use them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkloadSpec {
    pub kind: DataKind,
    pub key_count: u64,
    pub key_size: usize,
    pub field_count: u64,
    pub field_size: usize,
    pub value_size: usize,
}

impl Default for WorkloadSpec {
    fn default() -> Self {
        Self {
            kind: DataKind::String,
            key_count: 1_000,
            key_size: 16,
            field_count: 5,
            field_size: 16,
            value_size: 64,
        }
    }
}

impl WorkloadSpec {
    /// Rejects shapes that cannot be written at all.
    ///
    /// Identifier widths that are merely too short to stay unique pass; see
    /// [`Self::uniqueness_checks`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWorkload`] when:
    /// - `key_size` or `value_size` is zero
    /// - a collection kind has `field_count == 0`
    /// - a hash has `field_size == 0`
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(Error::InvalidWorkload {
                reason: reason.to_string(),
            })
        };

        if self.key_size == 0 {
            return invalid("key-size must be greater than 0");
        }
        if self.value_size == 0 {
            return invalid("value-size must be greater than 0");
        }
        if self.kind.is_collection() && self.field_count == 0 {
            return invalid("field-count must be greater than 0 for collection types");
        }
        if self.kind == DataKind::Hash && self.field_size == 0 {
            return invalid("field-size must be greater than 0 for hash");
        }
        Ok(())
    }

    /// Width checks for every identifier population this workload produces.
    ///
    /// Keys are always checked. Hash fields are checked against
    /// `field_size`; list, set and zset members are generated at
    /// `value_size`, so that is the width checked for them.
    pub fn uniqueness_checks(&self, alphabet: Alphabet) -> Vec<UniquenessCheck> {
        let mut checks = vec![UniquenessCheck::new(
            alphabet,
            "key",
            self.key_count,
            self.key_size,
        )];
        match self.kind {
            DataKind::String => {}
            DataKind::Hash => checks.push(UniquenessCheck::new(
                alphabet,
                "field",
                self.field_count,
                self.field_size,
            )),
            DataKind::List | DataKind::Set | DataKind::ZSet => checks.push(UniquenessCheck::new(
                alphabet,
                "member",
                self.field_count,
                self.value_size,
            )),
        }
        checks
    }
}
