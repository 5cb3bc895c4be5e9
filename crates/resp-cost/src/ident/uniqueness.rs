use super::Alphabet;
use crate::{Error, Result};
use core::fmt;

/// Minimum decimal width that keeps `0..count` collision free.
///
/// See [`Alphabet::min_length_for_uniqueness`] for other alphabets.
pub fn min_length_for_uniqueness(count: u64) -> usize {
    Alphabet::Decimal.min_length_for_uniqueness(count)
}

/// Whether decimal identifiers of `length` characters stay unique over
/// `0..count`.
pub fn is_length_sufficient(count: u64, length: usize) -> bool {
    Alphabet::Decimal.is_length_sufficient(count, length)
}

/// What to do when an identifier width cannot cover its population.
///
/// Under [`UniquenessPolicy::Warn`] the run proceeds and identifiers collide:
/// the store ends up with fewer distinct keys (or fields, or members) than
/// requested, which understates the real cardinality of the dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UniquenessPolicy {
    /// Report and continue.
    #[default]
    Warn,
    /// Refuse to run.
    Strict,
}

/// Outcome of checking one identifier population against its width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniquenessCheck {
    /// Which identifiers were checked: `"key"`, `"field"` or `"member"`.
    pub subject: &'static str,
    pub count: u64,
    pub length: usize,
    pub required: usize,
    /// Most distinct identifiers `length` characters can produce for
    /// `count` indices.
    pub distinct: u64,
}

impl UniquenessCheck {
    pub fn new(alphabet: Alphabet, subject: &'static str, count: u64, length: usize) -> Self {
        let capacity = u32::try_from(length)
            .ok()
            .and_then(|width| alphabet.radix().checked_pow(width))
            .unwrap_or(u64::MAX);
        Self {
            subject,
            count,
            length,
            required: alphabet.min_length_for_uniqueness(count),
            distinct: count.min(capacity),
        }
    }

    pub const fn is_sufficient(&self) -> bool {
        self.length >= self.required
    }

    /// Applies `policy`: `Ok(())` when the width suffices or the policy only
    /// warns.
    pub fn enforce(&self, policy: UniquenessPolicy) -> Result<()> {
        if self.is_sufficient() || policy == UniquenessPolicy::Warn {
            return Ok(());
        }
        Err(Error::InsufficientLength {
            subject: self.subject,
            count: self.count,
            length: self.length,
            required: self.required,
        })
    }
}

impl fmt::Display for UniquenessCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-count: {}, {}-size: {} does not guarantee uniqueness (needs {}, at most {} distinct)",
            self.subject, self.count, self.subject, self.length, self.required, self.distinct
        )
    }
}
