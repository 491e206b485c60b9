use crate::record::Record;
use serde::Serialize;
use std::sync::Arc;

/// How a record whose timestamp equals a current extremum is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum TiePolicy {
    /// Ties never replace an extremum: the first record seen at the oldest
    /// (newest) timestamp stays the oldest (newest) record.
    #[default]
    KeepFirst,
    /// Ties replace: the last record seen at the oldest (newest) timestamp
    /// becomes the oldest (newest) record.  Both extrema are checked, so a
    /// record tying both replaces both.
    KeepLast,
}

/// The oldest and the newest record seen so far for one group.
///
/// Both extrema are kept in one value so they are always updated together;
/// `oldest.timestamp() <= newest.timestamp()` holds after every update.
/// A group built from a single record points both extrema at the same
/// allocation.
#[derive(Debug, PartialEq, Serialize)]
pub struct GroupExtrema<K, T> {
    oldest: Arc<Record<K, T>>,
    newest: Arc<Record<K, T>>,
    count: u64,
}

impl<K, T> Clone for GroupExtrema<K, T> {
    fn clone(&self) -> Self {
        Self {
            oldest: self.oldest.clone(),
            newest: self.newest.clone(),
            count: self.count,
        }
    }
}

impl<K, T> GroupExtrema<K, T>
where
    T: Ord,
{
    pub fn new(record: Arc<Record<K, T>>) -> Self {
        Self {
            oldest: record.clone(),
            newest: record,
            count: 1,
        }
    }

    pub fn oldest(&self) -> &Record<K, T> {
        &self.oldest
    }

    pub fn newest(&self) -> &Record<K, T> {
        &self.newest
    }

    /// Number of records folded into this group.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns `true` if the oldest and the newest record are the same
    /// record, which is always the case for a group of one.
    pub fn is_singleton(&self) -> bool {
        Arc::ptr_eq(&self.oldest, &self.newest)
    }

    /// Folds one more record into the group.
    pub fn update(&mut self, record: Arc<Record<K, T>>, ties: TiePolicy) {
        self.count += 1;

        match ties {
            TiePolicy::KeepFirst => {
                // `oldest <= newest`, so at most one of these can hold.
                if record.timestamp() < self.oldest.timestamp() {
                    self.oldest = record;
                } else if record.timestamp() > self.newest.timestamp() {
                    self.newest = record;
                }
            }
            TiePolicy::KeepLast => {
                if record.timestamp() <= self.oldest.timestamp() {
                    self.oldest = record.clone();
                }
                if record.timestamp() >= self.newest.timestamp() {
                    self.newest = record;
                }
            }
        }
    }

    /// Combines two partial results for the same key.
    ///
    /// `self` is treated as the partial built from the earlier part of the
    /// input, so tie resolution matches what sequential ingestion of both
    /// parts would have produced.
    pub fn merge(&mut self, other: Self, ties: TiePolicy) {
        self.count += other.count;

        let (replace_oldest, replace_newest) = match ties {
            TiePolicy::KeepFirst => (
                other.oldest.timestamp() < self.oldest.timestamp(),
                other.newest.timestamp() > self.newest.timestamp(),
            ),
            TiePolicy::KeepLast => (
                other.oldest.timestamp() <= self.oldest.timestamp(),
                other.newest.timestamp() >= self.newest.timestamp(),
            ),
        };

        if replace_oldest {
            self.oldest = other.oldest;
        }
        if replace_newest {
            self.newest = other.newest;
        }
    }
}
