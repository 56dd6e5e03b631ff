//! Microsecond latency histogram.

use crate::latency::LAT_MAX_US;
use core::fmt;

/// Where a sample went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleClass {
    /// Counted in this bucket.
    Bucket(usize),
    /// At or beyond [`LAT_MAX_US`].
    Missed,
}

/// [`LAT_MAX_US`] one-microsecond buckets.
///
/// Allocated once before a run and moved into the measurement thread;
/// recording never allocates.
#[derive(Clone, PartialEq, Eq)]
pub struct LatencyHistogram {
    buckets: Box<[u64]>,
}

impl LatencyHistogram {
    /// Allocate an empty histogram.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: vec![0; LAT_MAX_US].into_boxed_slice(),
        }
    }

    /// Count a sample of `latency_us` microseconds if it fits.
    pub fn record(&mut self, latency_us: u64) -> SampleClass {
        let Ok(idx) = usize::try_from(latency_us) else {
            return SampleClass::Missed;
        };
        match self.buckets.get_mut(idx) {
            Some(cell) => {
                *cell = cell.saturating_add(1);
                SampleClass::Bucket(idx)
            }
            None => SampleClass::Missed,
        }
    }

    /// Count in bucket `latency_us`, zero when out of range.
    #[must_use]
    pub fn count(&self, latency_us: usize) -> u64 {
        self.buckets.get(latency_us).copied().unwrap_or(0)
    }

    /// Sum of all buckets.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    /// Number of buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Check whether no sample was counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|&c| c == 0)
    }

    /// Non-empty buckets in ascending latency order.
    pub fn iter_nonempty(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, count)| **count != 0)
            .map(|(idx, count)| (idx, *count))
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LatencyHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatencyHistogram")
            .field("buckets", &self.len())
            .field("nonempty", &self.iter_nonempty().count())
            .field("total", &self.total())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_boundaries() {
        let mut hist = LatencyHistogram::new();
        let last = LAT_MAX_US - 1;
        assert_eq!(hist.record(0), SampleClass::Bucket(0));
        assert_eq!(hist.record(last as u64), SampleClass::Bucket(last));
        assert_eq!(hist.record(LAT_MAX_US as u64), SampleClass::Missed);
        assert_eq!(hist.record(u64::MAX), SampleClass::Missed);

        assert_eq!(hist.count(0), 1);
        assert_eq!(hist.count(last), 1);
        assert_eq!(hist.count(LAT_MAX_US), 0);
        assert_eq!(hist.total(), 2);
    }

    #[test]
    fn test_nonempty_iteration_is_ascending() {
        let mut hist = LatencyHistogram::new();
        for us in [42, 7, 42, 999_999, 7, 7] {
            hist.record(us);
        }
        let buckets: Vec<_> = hist.iter_nonempty().collect();
        assert_eq!(buckets, vec![(7, 3), (42, 2), (999_999, 1)]);
    }

    #[test]
    fn test_new_histogram_is_empty() {
        let hist = LatencyHistogram::default();
        assert!(hist.is_empty());
        assert_eq!(hist.len(), LAT_MAX_US);
        assert_eq!(hist.iter_nonempty().count(), 0);
    }

    #[quickcheck]
    fn prop_total_plus_missed_equals_recorded(samples: Vec<u32>) -> bool {
        let mut hist = LatencyHistogram::new();
        let missed = samples
            .iter()
            .filter(|&&us| hist.record(u64::from(us)) == SampleClass::Missed)
            .count() as u64;
        hist.total() + missed == samples.len() as u64
    }
}
