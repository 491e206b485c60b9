use crate::{aggregator::AggregationResult, group::GroupExtrema, record::GroupKey};
use serde::Serialize;
use tracing::warn;

/// What to do with a group whose oldest value is exactly zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ZeroDivisorPolicy {
    /// Divide by 1 instead.  The resulting percentage is the absolute change
    /// times 100, which is not a meaningful relative change; such results
    /// are flagged with [`MetricResult::clamped`].
    #[default]
    Clamp,
    /// Leave the group out of the output.
    Skip,
}

/// Percent change between the oldest and the newest value of one group.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricResult<K> {
    pub key: K,
    /// `(newest - oldest) / divisor * 100`.  Ingest only accepts finite
    /// values, but the quotient can still overflow to an infinity for
    /// extreme inputs (values near `f64::MAX`, or a subnormal oldest value).
    /// Check [`f64::is_finite`] before relying on it; JSON output writes a
    /// non-finite value as `null`.
    pub percent_change: f64,
    /// The denominator actually used.
    pub divisor: f64,
    /// `true` if `divisor` was substituted for a zero oldest value.
    pub clamped: bool,
}

/// Turns per-group extrema into percent-change metrics.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricCalculator {
    zero_divisor: ZeroDivisorPolicy,
}

impl MetricCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zero_divisor(zero_divisor: ZeroDivisorPolicy) -> Self {
        Self { zero_divisor }
    }

    pub fn zero_divisor(&self) -> ZeroDivisorPolicy {
        self.zero_divisor
    }

    /// Computes the metric for a single group, or `None` if the group is
    /// skipped by the zero-divisor policy.
    pub fn compute_group<K, T>(
        &self,
        key: &K,
        group: &GroupExtrema<K, T>,
    ) -> Option<MetricResult<K>>
    where
        K: GroupKey,
        T: Ord,
    {
        let oldest = group.oldest().value();
        let newest = group.newest().value();

        let (divisor, clamped) = if oldest == 0.0 {
            match self.zero_divisor {
                ZeroDivisorPolicy::Clamp => (1.0, true),
                ZeroDivisorPolicy::Skip => {
                    warn!(?key, "skipping group with zero oldest value");
                    return None;
                }
            }
        } else {
            (oldest, false)
        };

        Some(MetricResult {
            key: key.clone(),
            percent_change: (newest - oldest) / divisor * 100.0,
            divisor,
            clamped,
        })
    }

    /// Lazily computes one metric per group, in unspecified order.
    pub fn compute<'a, K, T>(
        &'a self,
        result: &'a AggregationResult<K, T>,
    ) -> impl Iterator<Item = MetricResult<K>> + 'a
    where
        K: GroupKey,
        T: Ord,
    {
        result
            .iter()
            .filter_map(move |(key, group)| self.compute_group(key, group))
    }

    /// Computes one metric per group, ordered by key.
    pub fn compute_sorted<K, T>(&self, result: &AggregationResult<K, T>) -> Vec<MetricResult<K>>
    where
        K: GroupKey + Ord,
        T: Ord,
    {
        let mut metrics: Vec<_> = self.compute(result).collect();
        metrics.sort_by(|left, right| left.key.cmp(&right.key));
        metrics
    }
}
