use super::parse::{parse_date, parse_value, year_month};
use crate::{error::SourceError, record::RawRow};
use ::csv::{Reader, ReaderBuilder, StringRecord, Trim};
use chrono::NaiveDate;
use std::{fs::File, io::Read, path::Path};
use tracing::debug;

/// Where the timestamp of a row comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DateColumns {
    /// A single column holding `YYYY-MM-DD` or `YYYY-MM`.
    Date(String),
    /// A year column and a month column (name, abbreviation or number).
    YearMonth { year: String, month: String },
}

/// Names of the header columns a [`CsvSource`] reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsvColumns {
    pub key: String,
    pub date: DateColumns,
    pub value: String,
}

impl CsvColumns {
    pub fn new(key: impl Into<String>, date: DateColumns, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            date,
            value: value.into(),
        }
    }

    fn names(&self) -> Vec<&str> {
        let mut names = vec![self.key.as_str(), self.value.as_str()];
        match &self.date {
            DateColumns::Date(date) => names.push(date),
            DateColumns::YearMonth { year, month } => {
                names.push(year);
                names.push(month);
            }
        }
        names
    }

    fn validate(&self) -> Result<(), SourceError> {
        let names = self.names();
        if let Some(blank) = names.iter().find(|name| name.trim().is_empty()) {
            return Err(SourceError::InvalidConfig(format!(
                "column name {blank:?} is blank"
            )));
        }
        for (index, name) in names.iter().enumerate() {
            if names[..index].contains(name) {
                return Err(SourceError::InvalidConfig(format!(
                    "column {name:?} is used for more than one field"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
enum DateIndex {
    Date(usize),
    YearMonth { year: usize, month: usize },
}

/// Reads rows from CSV data with a header line.
///
/// Iterating yields one [`RawRow`] per data line, with `source_index` set to
/// the line number the row starts on (the header is line 1).  Structural
/// errors end the iteration with a [`SourceError`]; unparsable cells do not.
pub struct CsvSource<R> {
    reader: Reader<R>,
    key: usize,
    date: DateIndex,
    value: usize,
    record: StringRecord,
}

impl CsvSource<File> {
    pub fn from_path<P: AsRef<Path>>(path: P, columns: &CsvColumns) -> Result<Self, SourceError> {
        let path = path.as_ref();
        debug!("reading rows from {}", path.display());
        Self::from_reader(File::open(path)?, columns)
    }
}

impl<R: Read> CsvSource<R> {
    pub fn from_reader(reader: R, columns: &CsvColumns) -> Result<Self, SourceError> {
        columns.validate()?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| SourceError::MissingColumn(name.to_string()))
        };

        let key = find(&columns.key)?;
        let date = match &columns.date {
            DateColumns::Date(date) => DateIndex::Date(find(date)?),
            DateColumns::YearMonth { year, month } => DateIndex::YearMonth {
                year: find(year)?,
                month: find(month)?,
            },
        };
        let value = find(&columns.value)?;

        Ok(Self {
            reader,
            key,
            date,
            value,
            record: StringRecord::new(),
        })
    }

    fn parse_record(&self) -> RawRow<String, NaiveDate> {
        let cell = |index: usize| self.record.get(index).unwrap_or_default();

        let key = Some(cell(self.key))
            .filter(|key| !key.is_empty())
            .map(String::from);
        let timestamp = match self.date {
            DateIndex::Date(date) => parse_date(cell(date)),
            DateIndex::YearMonth { year, month } => year_month(cell(year), cell(month)),
        };

        RawRow {
            key,
            timestamp,
            value: parse_value(cell(self.value)),
            source_index: self
                .record
                .position()
                .map_or(0, |position| position.line() as usize),
        }
    }
}

impl<R: Read> Iterator for CsvSource<R> {
    type Item = Result<RawRow<String, NaiveDate>, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => Some(Ok(self.parse_record())),
            Ok(false) => None,
            Err(error) => Some(Err(error.into())),
        }
    }
}
