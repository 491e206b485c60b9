use crate::error::InvalidRecord;
use serde::Serialize;
use std::{fmt::Debug, hash::Hash, sync::Arc};

/// A value usable as a group key.
///
/// Keys are opaque tokens; the aggregator only hashes and compares them.
/// `is_blank` backs the empty-key check performed on ingest.
pub trait GroupKey: Eq + Hash + Clone + Debug {
    fn is_blank(&self) -> bool {
        false
    }
}

impl GroupKey for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl GroupKey for &str {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl GroupKey for Arc<str> {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

macro_rules! never_blank {
    ($($t:ty),*) => {
        $(impl GroupKey for $t {})*
    };
}

never_blank!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

/// One row of input: a group key, a timestamp, a measurement and the index
/// of the row it was read from.
///
/// Records are immutable once built.  After ingestion they live behind an
/// [`Arc`] and are shared, never copied, by the group that references them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record<K, T> {
    key: K,
    timestamp: T,
    value: f64,
    source_index: usize,
}

impl<K, T> Record<K, T> {
    pub fn new(key: K, timestamp: T, value: f64, source_index: usize) -> Self {
        Self {
            key,
            timestamp,
            value,
            source_index,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn timestamp(&self) -> &T {
        &self.timestamp
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Position of the originating row in its source (e.g. a line number).
    pub fn source_index(&self) -> usize {
        self.source_index
    }
}

impl<K, T> Record<K, T>
where
    K: GroupKey,
{
    /// Checks the ingest preconditions that the type system does not
    /// already enforce.
    pub(crate) fn validate(&self) -> Result<(), InvalidRecord> {
        if self.key.is_blank() {
            return Err(InvalidRecord::EmptyKey {
                source_index: self.source_index,
            });
        }
        if !self.value.is_finite() {
            return Err(InvalidRecord::NonFiniteValue {
                source_index: self.source_index,
                value: self.value,
            });
        }
        Ok(())
    }
}

/// A row as produced by a row source, before validation.
///
/// Any cell the source could not read or parse is `None`.  Converting into
/// a [`Record`] fails with the first missing field.
#[derive(Clone, Debug, PartialEq)]
pub struct RawRow<K, T> {
    pub key: Option<K>,
    pub timestamp: Option<T>,
    pub value: Option<f64>,
    pub source_index: usize,
}

impl<K, T> TryFrom<RawRow<K, T>> for Record<K, T>
where
    K: GroupKey,
{
    type Error = InvalidRecord;

    fn try_from(row: RawRow<K, T>) -> Result<Self, Self::Error> {
        let source_index = row.source_index;
        let key = row.key.ok_or(InvalidRecord::MissingKey { source_index })?;
        let timestamp = row
            .timestamp
            .ok_or(InvalidRecord::MissingTimestamp { source_index })?;
        let value = row
            .value
            .ok_or(InvalidRecord::MissingValue { source_index })?;

        let record = Record::new(key, timestamp, value, source_index);
        record.validate()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: Option<&str>, timestamp: Option<i32>, value: Option<f64>) -> RawRow<String, i32> {
        RawRow {
            key: key.map(String::from),
            timestamp,
            value,
            source_index: 7,
        }
    }

    #[test]
    fn complete_row_converts() {
        let record = Record::try_from(row(Some("Wales"), Some(2021), Some(3.5))).unwrap();
        assert_eq!(record.key(), "Wales");
        assert_eq!(*record.timestamp(), 2021);
        assert_eq!(record.value(), 3.5);
        assert_eq!(record.source_index(), 7);
    }

    #[test]
    fn missing_fields_are_reported_in_order() {
        assert_eq!(
            Record::try_from(row(None, None, None)),
            Err(InvalidRecord::MissingKey { source_index: 7 })
        );
        assert_eq!(
            Record::try_from(row(Some("Wales"), None, None)),
            Err(InvalidRecord::MissingTimestamp { source_index: 7 })
        );
        assert_eq!(
            Record::try_from(row(Some("Wales"), Some(2021), None)),
            Err(InvalidRecord::MissingValue { source_index: 7 })
        );
    }

    #[test]
    fn blank_key_is_rejected() {
        assert_eq!(
            Record::try_from(row(Some("  "), Some(2021), Some(1.0))),
            Err(InvalidRecord::EmptyKey { source_index: 7 })
        );
    }

    #[test]
    fn non_finite_value_is_rejected() {
        let record = Record::new(1u64, 2021, f64::INFINITY, 3);
        assert!(matches!(
            record.validate(),
            Err(InvalidRecord::NonFiniteValue { source_index: 3, .. })
        ));
        assert!(Record::new(1u64, 2021, f64::NAN, 3)
            .validate()
            .is_err());
    }
}
