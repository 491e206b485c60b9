//! Parallel aggregation over contiguous shards of the input.

use crate::{
    aggregator::{Candidate, IngestReport, StreamingAggregator, TiePolicy},
    record::GroupKey,
};
use std::{panic, thread::Builder};
use tracing::debug;

/// Aggregates `rows` on `workers` threads.
///
/// The input is split into contiguous shards, each shard is ingested into its
/// own aggregator on a dedicated thread, and the partial aggregators are then
/// merged in shard order.  Because shards are contiguous and merged left to
/// right, the result is identical to ingesting `rows` sequentially with the
/// same tie policy, including which record wins a tie.
///
/// `workers == 0` is treated as `1`.  Rejected rows from every shard are
/// reported in input order.
pub fn aggregate_sharded<K, T, C>(
    rows: Vec<C>,
    workers: usize,
    ties: TiePolicy,
) -> (StreamingAggregator<K, T>, IngestReport)
where
    K: GroupKey + Send + Sync,
    T: Ord + Send + Sync,
    C: Into<Candidate<K, T>> + Send,
{
    let shards = split_contiguous(rows, workers.max(1));
    debug!(shards = shards.len(), "aggregating shards");

    let partials: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = shards
            .into_iter()
            .enumerate()
            .map(|(worker_index, shard)| {
                Builder::new()
                    .name(format!("extrema-worker-{worker_index}"))
                    .spawn_scoped(scope, move || {
                        let mut aggregator = StreamingAggregator::with_tie_policy(ties);
                        let report = aggregator.ingest_all(shard);
                        (aggregator, report)
                    })
                    .unwrap_or_else(|error| {
                        panic!("failed to spawn worker thread {worker_index}: {error}");
                    })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|payload| panic::resume_unwind(payload))
            })
            .collect()
    });

    let mut aggregator = StreamingAggregator::with_tie_policy(ties);
    let mut report = IngestReport::default();
    for (partial, partial_report) in partials {
        aggregator.merge(partial);
        report.extend(partial_report);
    }

    (aggregator, report)
}

/// Splits `rows` into at most `parts` contiguous, order-preserving chunks of
/// near-equal size.  Never returns an empty vector of chunks.
fn split_contiguous<C>(mut rows: Vec<C>, parts: usize) -> Vec<Vec<C>> {
    let chunk_size = rows.len().div_ceil(parts).max(1);
    let mut shards = Vec::with_capacity(parts);

    while rows.len() > chunk_size {
        let tail = rows.split_off(chunk_size);
        shards.push(rows);
        rows = tail;
    }
    shards.push(rows);
    shards
}
