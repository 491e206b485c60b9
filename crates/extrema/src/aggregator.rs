use crate::{
    error::InvalidRecord,
    group::GroupExtrema,
    record::{GroupKey, RawRow, Record},
};
use hashbrown::{hash_map::Entry, Equivalent, HashMap};
use itertools::Itertools;
use std::{hash::Hash, sync::Arc};
use tracing::{debug, trace};

pub use crate::group::TiePolicy;

/// Incrementally tracks the oldest and newest record of every group.
///
/// Each call to [`ingest`](Self::ingest) does one expected-constant-time
/// lookup in a hash map and at most two timestamp comparisons.  The
/// aggregator owns its map; independent runs use independent instances and
/// can be combined afterwards with [`merge`](Self::merge).
///
/// [`finalize`](Self::finalize) returns a snapshot and leaves the aggregator
/// usable: ingesting more rows afterwards continues the same run, and the
/// next `finalize` reflects every row ingested so far.
#[derive(Debug)]
pub struct StreamingAggregator<K, T> {
    groups: HashMap<K, GroupExtrema<K, T>>,
    ties: TiePolicy,
    ingested: u64,
}

impl<K, T> Default for StreamingAggregator<K, T> {
    fn default() -> Self {
        Self {
            groups: HashMap::new(),
            ties: TiePolicy::default(),
            ingested: 0,
        }
    }
}

impl<K, T> StreamingAggregator<K, T>
where
    K: GroupKey,
    T: Ord,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tie_policy(ties: TiePolicy) -> Self {
        Self {
            ties,
            ..Self::default()
        }
    }

    pub fn tie_policy(&self) -> TiePolicy {
        self.ties
    }

    /// Number of distinct groups seen so far.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of records accepted so far.
    pub fn ingested(&self) -> u64 {
        self.ingested
    }

    /// Looks up a group by any borrowed form of its key, e.g. a `&str`
    /// for `String` keys.
    pub fn get<Q>(&self, key: &Q) -> Option<&GroupExtrema<K, T>>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.groups.get(key)
    }

    /// Folds one record into its group.
    ///
    /// A record with a blank key or a non-finite value is rejected and the
    /// aggregator is left unchanged.
    pub fn ingest(&mut self, record: Record<K, T>) -> Result<(), InvalidRecord> {
        record.validate()?;

        let record = Arc::new(record);
        match self.groups.entry(record.key().clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().update(record, self.ties),
            Entry::Vacant(entry) => {
                entry.insert(GroupExtrema::new(record));
            }
        }
        self.ingested += 1;
        Ok(())
    }

    /// Validates a row produced by a row source and ingests it.
    pub fn ingest_row(&mut self, row: RawRow<K, T>) -> Result<(), InvalidRecord> {
        self.ingest(Record::try_from(row)?)
    }

    /// Ingests every row of `rows`, skipping and recording the ones that
    /// fail validation.
    pub fn ingest_all<I>(&mut self, rows: I) -> IngestReport
    where
        I: IntoIterator,
        I::Item: Into<Candidate<K, T>>,
    {
        let mut report = IngestReport::default();

        for row in rows {
            let result = match row.into() {
                Candidate::Record(record) => self.ingest(record),
                Candidate::Raw(row) => self.ingest_row(row),
            };
            match result {
                Ok(()) => report.accepted += 1,
                Err(reason) => {
                    trace!("skipping row: {reason}");
                    report.rejected.push(RejectedRow {
                        source_index: reason.source_index(),
                        reason,
                    });
                }
            }
        }

        report
    }

    /// Returns the extrema accumulated so far.
    ///
    /// Calling this twice without ingesting in between returns equal
    /// results.  Records are shared with the aggregator, not copied.
    pub fn finalize(&self) -> AggregationResult<K, T> {
        debug!(
            groups = self.groups.len(),
            records = self.ingested,
            "finalizing aggregation"
        );
        AggregationResult {
            groups: self.groups.clone(),
        }
    }

    /// Like [`finalize`](Self::finalize), but hands over the aggregator's
    /// map without cloning it.
    pub fn into_result(self) -> AggregationResult<K, T> {
        AggregationResult {
            groups: self.groups,
        }
    }

    /// Absorbs the partial aggregation `other`, which must have been built
    /// from rows that come after the rows ingested into `self`.
    ///
    /// Per key, the merged oldest (newest) record is the older (newer) of the
    /// two partials, with ties resolved by `self`'s tie policy as if the rows
    /// had been ingested sequentially.  Merging is associative; it is also
    /// commutative whenever no two records of a group share an extremal
    /// timestamp.
    pub fn merge(&mut self, other: Self) {
        debug!(
            groups = self.groups.len(),
            other_groups = other.groups.len(),
            "merging partial aggregation"
        );
        self.ingested += other.ingested;
        for (key, partial) in other.groups {
            match self.groups.entry(key) {
                Entry::Occupied(mut entry) => entry.get_mut().merge(partial, self.ties),
                Entry::Vacant(entry) => {
                    entry.insert(partial);
                }
            }
        }
    }
}

/// Either a validated record or a raw row; lets
/// [`StreamingAggregator::ingest_all`] consume both.
#[derive(Debug)]
pub enum Candidate<K, T> {
    Record(Record<K, T>),
    Raw(RawRow<K, T>),
}

impl<K, T> From<Record<K, T>> for Candidate<K, T> {
    fn from(record: Record<K, T>) -> Self {
        Candidate::Record(record)
    }
}

impl<K, T> From<RawRow<K, T>> for Candidate<K, T> {
    fn from(row: RawRow<K, T>) -> Self {
        Candidate::Raw(row)
    }
}

/// A row skipped by [`StreamingAggregator::ingest_all`].
#[derive(Clone, Debug, PartialEq)]
pub struct RejectedRow {
    pub source_index: usize,
    pub reason: InvalidRecord,
}

/// Outcome of feeding a sequence of rows to an aggregator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IngestReport {
    /// Number of rows folded into the aggregation.
    pub accepted: u64,
    /// Rows that failed validation, in input order.
    pub rejected: Vec<RejectedRow>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Appends `other`, which covers rows that come after this report's.
    pub fn extend(&mut self, other: IngestReport) {
        self.accepted += other.accepted;
        self.rejected.extend(other.rejected);
    }
}

/// The per-group extrema of a finished (or paused) aggregation run.
///
/// An empty result is valid: it is what an aggregator that accepted no
/// records returns.
#[derive(Debug)]
pub struct AggregationResult<K, T> {
    groups: HashMap<K, GroupExtrema<K, T>>,
}

impl<K, T> PartialEq for AggregationResult<K, T>
where
    K: GroupKey,
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.groups == other.groups
    }
}

impl<K, T> Clone for AggregationResult<K, T>
where
    K: Clone,
{
    fn clone(&self) -> Self {
        Self {
            groups: self.groups.clone(),
        }
    }
}

impl<K, T> AggregationResult<K, T>
where
    K: GroupKey,
    T: Ord,
{
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&GroupExtrema<K, T>>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.groups.get(key)
    }

    /// Iterates over groups in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &GroupExtrema<K, T>)> {
        self.groups.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.groups.keys()
    }

    /// Consumes the result, returning groups ordered by key.
    pub fn into_sorted(self) -> Vec<(K, GroupExtrema<K, T>)>
    where
        K: Ord,
    {
        self.groups
            .into_iter()
            .sorted_by(|(left, _), (right, _)| left.cmp(right))
            .collect()
    }
}

impl<K, T> IntoIterator for AggregationResult<K, T> {
    type Item = (K, GroupExtrema<K, T>);
    type IntoIter = hashbrown::hash_map::IntoIter<K, GroupExtrema<K, T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{end_to_end_rows, init_test_logger, rec};
    use pretty_assertions::assert_eq;

    #[test]
    fn new_key_creates_singleton() {
        let mut aggregator = StreamingAggregator::new();
        aggregator.ingest(rec("A", 2000, 10.0, 0)).unwrap();

        let group = aggregator.get(&"A").unwrap();
        assert!(group.is_singleton());
        assert_eq!(*group.oldest().timestamp(), 2000);
        assert_eq!(aggregator.len(), 1);
    }

    #[test]
    fn end_to_end_extrema() {
        let mut aggregator = StreamingAggregator::new();
        for record in end_to_end_rows() {
            aggregator.ingest(record).unwrap();
        }
        let result = aggregator.finalize();
        assert_eq!(result.len(), 2);

        let a = result.get(&"A").unwrap();
        assert_eq!((*a.oldest().timestamp(), a.oldest().value()), (2000, 10.0));
        assert_eq!((*a.newest().timestamp(), a.newest().value()), (2010, 15.0));

        let b = result.get(&"B").unwrap();
        assert_eq!((*b.oldest().timestamp(), b.oldest().value()), (2000, 5.0));
        assert_eq!((*b.newest().timestamp(), b.newest().value()), (2005, 5.0));
    }

    #[test]
    fn older_record_replaces_oldest() {
        let mut aggregator = StreamingAggregator::new();
        aggregator.ingest(rec("A", 2005, 1.0, 0)).unwrap();
        aggregator.ingest(rec("A", 2001, 2.0, 1)).unwrap();
        aggregator.ingest(rec("A", 2003, 3.0, 2)).unwrap();

        let group = aggregator.get(&"A").unwrap();
        assert_eq!(group.oldest().source_index(), 1);
        assert_eq!(group.newest().source_index(), 0);
        assert_eq!(group.count(), 3);
    }

    #[test]
    fn invalid_record_leaves_state_untouched() {
        let mut aggregator = StreamingAggregator::new();
        aggregator.ingest(rec("A", 2000, 1.0, 0)).unwrap();

        assert_eq!(
            aggregator.ingest(rec("", 1990, 1.0, 1)),
            Err(InvalidRecord::EmptyKey { source_index: 1 })
        );
        assert!(aggregator.ingest(rec("A", 1990, f64::NAN, 2)).is_err());

        assert_eq!(aggregator.len(), 1);
        assert_eq!(aggregator.ingested(), 1);
        assert_eq!(*aggregator.get(&"A").unwrap().oldest().timestamp(), 2000);
    }

    #[test]
    fn ingest_all_skips_bad_rows() {
        init_test_logger();
        let rows = vec![
            RawRow {
                key: Some("A"),
                timestamp: Some(2000),
                value: Some(1.0),
                source_index: 2,
            },
            RawRow {
                key: Some("A"),
                timestamp: None,
                value: Some(1.0),
                source_index: 3,
            },
            RawRow {
                key: None,
                timestamp: Some(2001),
                value: Some(1.0),
                source_index: 4,
            },
            RawRow {
                key: Some("A"),
                timestamp: Some(2002),
                value: Some(4.0),
                source_index: 5,
            },
        ];

        let mut aggregator: StreamingAggregator<&str, i32> = StreamingAggregator::new();
        let report = aggregator.ingest_all(rows);

        assert_eq!(report.accepted, 2);
        assert_eq!(
            report.rejected,
            vec![
                RejectedRow {
                    source_index: 3,
                    reason: InvalidRecord::MissingTimestamp { source_index: 3 },
                },
                RejectedRow {
                    source_index: 4,
                    reason: InvalidRecord::MissingKey { source_index: 4 },
                },
            ]
        );
        assert_eq!(aggregator.get(&"A").unwrap().newest().value(), 4.0);
    }

    #[test]
    fn empty_input_finalizes_to_empty_result() {
        let aggregator = StreamingAggregator::<String, i32>::new();
        let result = aggregator.finalize();
        assert!(result.is_empty());
        assert_eq!(result.iter().count(), 0);
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut aggregator: StreamingAggregator<&str, i32> = StreamingAggregator::new();
        aggregator.ingest_all(end_to_end_rows());
        assert_eq!(aggregator.finalize(), aggregator.finalize());
    }

    #[test]
    fn ingest_after_finalize_continues_run() {
        let mut aggregator: StreamingAggregator<&str, i32> = StreamingAggregator::new();
        aggregator.ingest_all(end_to_end_rows());
        let before = aggregator.finalize();

        aggregator.ingest(rec("A", 2020, 30.0, 9)).unwrap();
        let after = aggregator.finalize();

        assert_eq!(*before.get(&"A").unwrap().newest().timestamp(), 2010);
        assert_eq!(*after.get(&"A").unwrap().newest().timestamp(), 2020);
    }

    #[test]
    fn identical_timestamps_keep_first_record() {
        let mut aggregator = StreamingAggregator::new();
        aggregator.ingest(rec("A", 2000, 1.0, 0)).unwrap();
        aggregator.ingest(rec("A", 2000, 2.0, 1)).unwrap();
        aggregator.ingest(rec("A", 2000, 3.0, 2)).unwrap();

        let group = aggregator.get(&"A").unwrap();
        assert!(group.is_singleton());
        assert_eq!(group.oldest().source_index(), 0);
    }

    #[test]
    fn keep_last_policy_moves_both_extrema_on_ties() {
        let mut aggregator = StreamingAggregator::with_tie_policy(TiePolicy::KeepLast);
        aggregator.ingest(rec("A", 2000, 1.0, 0)).unwrap();
        aggregator.ingest(rec("A", 2000, 2.0, 1)).unwrap();

        let group = aggregator.get(&"A").unwrap();
        assert_eq!(group.oldest().source_index(), 1);
        assert_eq!(group.newest().source_index(), 1);
    }

    #[test]
    fn merge_matches_sequential_ingest() {
        let rows = end_to_end_rows();

        let mut sequential: StreamingAggregator<&str, i32> = StreamingAggregator::new();
        sequential.ingest_all(rows.clone());

        let mut left: StreamingAggregator<&str, i32> = StreamingAggregator::new();
        left.ingest_all(rows[..2].to_vec());
        let mut right: StreamingAggregator<&str, i32> = StreamingAggregator::new();
        right.ingest_all(rows[2..].to_vec());
        left.merge(right);

        assert_eq!(left.ingested(), sequential.ingested());
        assert_eq!(left.finalize(), sequential.finalize());
    }

    #[test]
    fn string_keys_are_found_by_str() {
        let mut aggregator = StreamingAggregator::new();
        aggregator
            .ingest(Record::new("Chile".to_string(), 2000, 1.0, 0))
            .unwrap();

        assert!(aggregator.get("Chile").is_some());
        let result = aggregator.finalize();
        assert_eq!(result.get("Chile").unwrap().count(), 1);
        assert!(result.get("Peru").is_none());
    }

    #[test]
    fn into_sorted_orders_by_key() {
        let mut aggregator = StreamingAggregator::new();
        for key in ["C", "A", "B"] {
            aggregator.ingest(rec(key, 2000, 1.0, 0)).unwrap();
        }
        let keys: Vec<_> = aggregator
            .into_result()
            .into_sorted()
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, vec!["A", "B", "C"]);
    }
}
