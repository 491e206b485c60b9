use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use extrema::{
    aggregate_sharded, source::CsvSource, IngestReport, MetricCalculator, StreamingAggregator,
    TiePolicy,
};
use tracing::{info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

mod cli;
mod report;

use cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let (aggregator, ingest) = aggregate(&cli)?;

    report_rejections(&ingest, cli.strict)?;

    let calculator = MetricCalculator::with_zero_divisor(cli.zero_divisor.into());
    let rows = report::build(aggregator.into_result(), &calculator);
    let output = report::render(&rows, &cli.key_column, cli.format)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

fn aggregate(cli: &Cli) -> Result<(StreamingAggregator<String, NaiveDate>, IngestReport)> {
    let ties = TiePolicy::from(cli.tie_policy);
    let source = CsvSource::from_path(&cli.path, &cli.columns())
        .with_context(|| format!("failed to open {}", cli.path.display()))?;

    if cli.workers > 1 {
        let rows = source
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("failed to read {}", cli.path.display()))?;
        info!(rows = rows.len(), workers = cli.workers, "aggregating in parallel");
        Ok(aggregate_sharded(rows, cli.workers, ties))
    } else {
        let mut aggregator = StreamingAggregator::with_tie_policy(ties);
        let ingest = itertools::process_results(source, |rows| aggregator.ingest_all(rows))
            .with_context(|| format!("failed to read {}", cli.path.display()))?;
        Ok((aggregator, ingest))
    }
}

fn report_rejections(ingest: &IngestReport, strict: bool) -> Result<()> {
    for row in &ingest.rejected {
        warn!("line {}: {}", row.source_index, row.reason);
    }
    info!(
        accepted = ingest.accepted,
        rejected = ingest.rejected.len(),
        "finished reading input"
    );
    if strict && !ingest.is_clean() {
        bail!(
            "{} row(s) rejected, first at line {}",
            ingest.rejected.len(),
            ingest.rejected[0].source_index
        );
    }
    Ok(())
}
