use core::ops::Range;

/// Contiguous half-open slice `[start, end)` of the key-index domain assigned
/// to one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Partition {
    pub start: u64,
    pub end: u64,
}

impl Partition {
    /// The `worker`-th of `workers` partitions over `[0, total)`.
    ///
    /// Worker `i` receives `[i*N/W, (i+1)*N/W)`. Consecutive partitions share
    /// their boundary, so the union over `0..workers` is exactly `[0, total)`
    /// whether or not `workers` divides `total`. Sizes differ by at most one.
    ///
    /// # Panics
    ///
    /// Panics if `workers` is zero or `worker >= workers`.
    pub fn nth(total: u64, workers: usize, worker: usize) -> Self {
        assert!(worker < workers, "worker {worker} out of range 0..{workers}");
        Self {
            start: boundary(total, workers, worker),
            end: boundary(total, workers, worker + 1),
        }
    }

    /// All `workers` partitions of `[0, total)`, in order.
    ///
    /// # Panics
    ///
    /// Panics if `workers` is zero.
    pub fn split(total: u64, workers: usize) -> impl ExactSizeIterator<Item = Self> {
        assert!(workers > 0, "cannot split into zero partitions");
        (0..workers).map(move |worker| Self::nth(total, workers, worker))
    }

    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub const fn range(&self) -> Range<u64> {
        self.start..self.end
    }
}

// `i * N` can exceed u64 for large key counts, so the product is taken in
// u128. The quotient is at most `N` and always fits back.
fn boundary(total: u64, workers: usize, i: usize) -> u64 {
    (u128::from(total) * i as u128 / workers as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_exact_cover(total: u64, workers: usize) {
        let parts: Vec<_> = Partition::split(total, workers).collect();
        assert_eq!(parts.len(), workers);
        assert_eq!(parts[0].start, 0);
        assert_eq!(parts[workers - 1].end, total);
        for pair in parts.windows(2) {
            assert_eq!(pair[0].end, pair[1].start, "gap or overlap at {pair:?}");
        }
        let covered: u64 = parts.iter().map(Partition::len).sum();
        assert_eq!(covered, total);

        let (min, max) = parts.iter().fold((u64::MAX, 0), |(lo, hi), p| {
            (lo.min(p.len()), hi.max(p.len()))
        });
        assert!(max - min <= 1, "unbalanced split for {total}/{workers}");
    }

    #[test]
    fn covers_domain_exactly_once() {
        for total in [0, 1, 2, 7, 11, 12, 13, 100, 1_000, 1_001, 99_999] {
            for workers in [1, 2, 3, 5, 12, 16, 64] {
                assert_exact_cover(total, workers);
            }
        }
    }

    #[test]
    fn every_index_belongs_to_one_partition() {
        let total = 1_003;
        let workers = 12;
        let mut owners = vec![0_u8; total as usize];
        for part in Partition::split(total, workers) {
            for i in part.range() {
                owners[i as usize] += 1;
            }
        }
        assert!(owners.iter().all(|&n| n == 1));
    }

    #[test]
    fn zero_keys_yields_empty_partitions() {
        assert!(Partition::split(0, 12).all(|p| p.is_empty()));
    }

    #[test]
    fn more_workers_than_keys() {
        let parts: Vec<_> = Partition::split(3, 8).collect();
        assert_eq!(parts.iter().filter(|p| !p.is_empty()).count(), 3);
        assert_exact_cover(3, 8);
    }

    #[test]
    fn huge_domains_do_not_overflow() {
        assert_exact_cover(u64::MAX, 7);
        assert_eq!(Partition::nth(u64::MAX, 2, 1).end, u64::MAX);
    }

    #[test]
    #[should_panic(expected = "zero partitions")]
    fn zero_workers_panics() {
        let _ = Partition::split(10, 0);
    }
}
