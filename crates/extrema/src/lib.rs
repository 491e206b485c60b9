//! Single-pass oldest/newest aggregation over grouped time series.
//!
//! Rows carrying a group key, a timestamp and a numeric value are fed one at
//! a time into a [`StreamingAggregator`], which keeps, for every key, the
//! record with the smallest and the record with the largest timestamp seen
//! so far.  Each row costs one hash lookup and at most two comparisons, so a
//! dataset of `n` rows is processed in `O(n)` expected time without sorting
//! or re-scanning it.
//!
//! Once the input is exhausted, [`StreamingAggregator::finalize`] returns the
//! per-group extrema and a [`MetricCalculator`] turns them into the percent
//! change between the oldest and the newest value of each group:
//!
//! ```
//! use extrema::{MetricCalculator, Record, StreamingAggregator};
//!
//! let mut aggregator = StreamingAggregator::new();
//! for (index, (key, year, value)) in [("A", 2000, 10.0), ("A", 2010, 15.0)]
//!     .into_iter()
//!     .enumerate()
//! {
//!     aggregator.ingest(Record::new(key, year, value, index)).unwrap();
//! }
//!
//! let result = aggregator.finalize();
//! let metrics = MetricCalculator::new().compute_sorted(&result);
//! assert_eq!(metrics[0].percent_change, 50.0);
//! ```
//!
//! The hash map gives expected `O(1)` lookups; adversarial key collisions can
//! degrade a lookup to `O(g)` for `g` distinct groups, which is a property of
//! the map rather than of the update rule.

mod aggregator;
mod error;
mod group;
mod metric;
mod record;
mod shard;

pub mod source;

pub use aggregator::{
    AggregationResult, Candidate, IngestReport, RejectedRow, StreamingAggregator, TiePolicy,
};
pub use error::{InvalidRecord, SourceError};
pub use group::GroupExtrema;
pub use metric::{MetricCalculator, MetricResult, ZeroDivisorPolicy};
pub use record::{GroupKey, RawRow, Record};
pub use shard::aggregate_sharded;
