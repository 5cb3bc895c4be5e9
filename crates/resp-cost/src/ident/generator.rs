use super::{Alphabet, IdentCache};
use std::sync::Arc;

/// Deterministic, memoized identifier source.
///
/// `generate(index, length)` always yields the same `length`-character string
/// for the same arguments. Results are kept in an [`IdentCache`] owned by the
/// generator, so clones share one cache and repeated calls are lookups.
///
/// # Example
///
/// ```
/// use resp_cost::{Alphabet, IdentGenerator};
///
/// let idents = IdentGenerator::new(Alphabet::Decimal);
/// assert_eq!(&*idents.generate(42, 6), "000042");
/// assert_eq!(&*idents.generate(42, 6), "000042"); // served from the cache
/// assert_eq!(idents.cache().stats().hits, 1);
/// ```
#[derive(Clone, Default)]
pub struct IdentGenerator {
    alphabet: Alphabet,
    cache: Arc<IdentCache>,
}

impl IdentGenerator {
    pub fn new(alphabet: Alphabet) -> Self {
        Self::with_cache(alphabet, Arc::new(IdentCache::new()))
    }

    /// Builds a generator on top of an existing cache.
    ///
    /// The cache must only ever have been filled by generators using the same
    /// alphabet.
    pub const fn with_cache(alphabet: Alphabet, cache: Arc<IdentCache>) -> Self {
        Self { alphabet, cache }
    }

    /// Returns the identifier for `index` at the given width.
    ///
    /// A `length` of zero yields an empty string and is not cached.
    pub fn generate(&self, index: u64, length: usize) -> Arc<str> {
        if length == 0 {
            return Arc::from("");
        }
        self.cache
            .get_or_insert_with(length, index, || self.alphabet.encode(index, length))
    }

    pub const fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    pub fn cache(&self) -> &IdentCache {
        &self.cache
    }

    pub fn min_length_for_uniqueness(&self, count: u64) -> usize {
        self.alphabet.min_length_for_uniqueness(count)
    }

    pub fn is_length_sufficient(&self, count: u64, length: usize) -> bool {
        self.alphabet.is_length_sufficient(count, length)
    }
}
