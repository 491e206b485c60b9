use clap::{Parser, ValueEnum, ValueHint};
use extrema::{
    source::{CsvColumns, DateColumns},
    TiePolicy, ZeroDivisorPolicy,
};
use std::path::PathBuf;

/// Report, for every group in a CSV file, the percent change between the
/// value of its oldest row and the value of its newest row.
#[derive(Clone, Debug, Parser)]
#[command(name = "extrema", version, about)]
pub struct Cli {
    /// CSV file to read. The first line must be a header.
    #[arg(value_hint = ValueHint::FilePath, env = "EXTREMA_INPUT")]
    pub path: PathBuf,

    /// Column holding the group key.
    #[arg(long, default_value = "country", env = "EXTREMA_KEY_COLUMN")]
    pub key_column: String,

    /// Column holding the numeric value.
    #[arg(long, default_value = "value", env = "EXTREMA_VALUE_COLUMN")]
    pub value_column: String,

    /// Column holding an ISO date (`YYYY-MM-DD` or `YYYY-MM`).
    ///
    /// When given, it takes precedence over `--year-column` and
    /// `--month-column`; otherwise the timestamp is assembled from those two.
    #[arg(long, env = "EXTREMA_DATE_COLUMN")]
    pub date_column: Option<String>,

    /// Column holding the year.
    #[arg(long, default_value = "year", env = "EXTREMA_YEAR_COLUMN")]
    pub year_column: String,

    /// Column holding the month, as a name, an abbreviation or a number.
    #[arg(long, default_value = "month", env = "EXTREMA_MONTH_COLUMN")]
    pub month_column: String,

    /// Number of threads to aggregate on.
    ///
    /// With more than one worker the whole file is read into memory first.
    #[arg(long, default_value = "1", env = "EXTREMA_WORKERS")]
    pub workers: usize,

    /// Which row wins when several rows of a group share its oldest or
    /// newest timestamp.
    #[arg(
        long,
        value_enum,
        default_value_t = TieChoice::KeepFirst,
        env = "EXTREMA_TIE_POLICY"
    )]
    pub tie_policy: TieChoice,

    /// How to treat groups whose oldest value is zero.
    #[arg(
        long,
        value_enum,
        default_value_t = ZeroDivisorChoice::Clamp,
        env = "EXTREMA_ZERO_DIVISOR"
    )]
    pub zero_divisor: ZeroDivisorChoice,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, env = "EXTREMA_FORMAT")]
    pub format: OutputFormat,

    /// Exit with an error if any row is rejected.
    #[arg(long, env = "EXTREMA_STRICT")]
    pub strict: bool,
}

impl Cli {
    pub fn columns(&self) -> CsvColumns {
        let date = match &self.date_column {
            Some(date) => DateColumns::Date(date.clone()),
            None => DateColumns::YearMonth {
                year: self.year_column.clone(),
                month: self.month_column.clone(),
            },
        };
        CsvColumns::new(self.key_column.clone(), date, self.value_column.clone())
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum TieChoice {
    /// The first row seen at an extremal timestamp is kept.
    KeepFirst,
    /// The last row seen at an extremal timestamp replaces earlier ones.
    KeepLast,
}

impl From<TieChoice> for TiePolicy {
    fn from(choice: TieChoice) -> Self {
        match choice {
            TieChoice::KeepFirst => TiePolicy::KeepFirst,
            TieChoice::KeepLast => TiePolicy::KeepLast,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum ZeroDivisorChoice {
    /// Divide by one and flag the result.
    Clamp,
    /// Leave the group out of the report.
    Skip,
}

impl From<ZeroDivisorChoice> for ZeroDivisorPolicy {
    fn from(choice: ZeroDivisorChoice) -> Self {
        match choice {
            ZeroDivisorChoice::Clamp => ZeroDivisorPolicy::Clamp,
            ZeroDivisorChoice::Skip => ZeroDivisorPolicy::Skip,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[value(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One human-readable line per group.
    Text,
    /// A table with the oldest and newest row of every group.
    Table,
    /// A JSON array.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serial_test::serial;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    #[serial]
    fn year_month_columns_by_default() {
        let cli = Cli::try_parse_from(["extrema", "data.csv", "--value-column", "users"]).unwrap();
        assert_eq!(
            cli.columns(),
            CsvColumns::new(
                "country",
                DateColumns::YearMonth {
                    year: "year".into(),
                    month: "month".into(),
                },
                "users",
            )
        );
        assert_eq!(cli.workers, 1);
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    #[serial]
    fn date_column_overrides_year_month() {
        let cli = Cli::try_parse_from([
            "extrema",
            "data.csv",
            "--date-column",
            "date",
            "--tie-policy",
            "keep-last",
            "--zero-divisor",
            "skip",
        ])
        .unwrap();
        assert_eq!(cli.columns().date, DateColumns::Date("date".into()));
        assert_eq!(TiePolicy::from(cli.tie_policy), TiePolicy::KeepLast);
        assert_eq!(ZeroDivisorPolicy::from(cli.zero_divisor), ZeroDivisorPolicy::Skip);
    }

    #[test]
    #[serial]
    fn date_column_wins_over_explicit_year_column() {
        let cli = Cli::try_parse_from([
            "extrema",
            "data.csv",
            "--date-column",
            "date",
            "--year-column",
            "yr",
        ])
        .unwrap();
        assert_eq!(cli.columns().date, DateColumns::Date("date".into()));
    }

    #[test]
    #[serial]
    fn date_column_wins_over_year_column_from_env() {
        std::env::set_var("EXTREMA_YEAR_COLUMN", "yr");
        std::env::set_var("EXTREMA_MONTH_COLUMN", "mo");
        let parsed = Cli::try_parse_from(["extrema", "data.csv", "--date-column", "date"]);
        std::env::remove_var("EXTREMA_YEAR_COLUMN");
        std::env::remove_var("EXTREMA_MONTH_COLUMN");

        let cli = parsed.unwrap();
        assert_eq!(cli.year_column, "yr");
        assert_eq!(cli.columns().date, DateColumns::Date("date".into()));
    }
}
