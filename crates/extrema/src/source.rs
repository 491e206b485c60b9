//! Row sources that turn tabular input into [`RawRow`](crate::RawRow)s.
//!
//! Sources only read and parse cells.  A cell that is blank or cannot be
//! parsed becomes `None` in the row; deciding what to do with such rows is
//! left to [`StreamingAggregator::ingest_all`](crate::StreamingAggregator::ingest_all).

mod csv;
mod parse;

pub use self::csv::{CsvColumns, CsvSource, DateColumns};
pub use parse::{parse_date, parse_month, parse_value, year_month};
