//! Categorical aggregation for dashboard charts
//!
//! Turns a record sample into a ranked, bounded, percentage-labelled series:
//! count by key, sort by count (stable), keep the top N, fold the rest into
//! `OTHER`, then label every slice with its share of the total.

use ahash::AHashMap;
use serde::Serialize;
use sr_core::Record;

/// Label of the overflow bucket
pub const OTHER_LABEL: &str = "OTHER";

/// Label shown for blank values
pub const NONE_LABEL: &str = "NONE";

/// Serialized form of a blank value
pub const EMPTY_SENTINEL: &str = "\"\"";

/// A key with the number of sample rows carrying it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedBucket {
    pub label: String,
    pub count: u64,
}

/// One chart slice, ready for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSlice {
    /// Position in the output; stable rendering key
    pub id: usize,
    pub value: u64,
    pub label: String,
}

/// Values of one column across a sample
pub fn column_keys<'a>(records: &'a [Record], column: &'a str) -> impl Iterator<Item = String> + 'a {
    records.iter().filter_map(move |record| record.field(column))
}

/// Count keys, keeping first-seen order
pub fn count_keys<I>(keys: I) -> Vec<AggregatedBucket>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut positions: AHashMap<String, usize> = AHashMap::new();
    let mut buckets: Vec<AggregatedBucket> = Vec::new();

    for key in keys {
        let key = key.into();
        match positions.get(&key) {
            Some(&idx) => buckets[idx].count += 1,
            None => {
                positions.insert(key.clone(), buckets.len());
                buckets.push(AggregatedBucket { label: key, count: 1 });
            }
        }
    }

    buckets
}

/// Sort by count descending and keep `retain_top` buckets plus `OTHER`
///
/// Ties keep first-seen order. `OTHER` is only added when there are more
/// than `retain_top` distinct keys, and always comes last.
pub fn rank_buckets(mut buckets: Vec<AggregatedBucket>, retain_top: usize) -> Vec<AggregatedBucket> {
    buckets.sort_by(|a, b| b.count.cmp(&a.count));

    if buckets.len() <= retain_top {
        return buckets;
    }

    let rest: u64 = buckets[retain_top..].iter().map(|b| b.count).sum();
    buckets.truncate(retain_top);
    buckets.push(AggregatedBucket {
        label: OTHER_LABEL.to_string(),
        count: rest,
    });
    buckets
}

/// Display label for a bucket key
fn display_label(label: &str) -> &str {
    if label.is_empty() || label == EMPTY_SENTINEL {
        NONE_LABEL
    } else {
        label
    }
}

/// Prefix each bucket with its percentage of the total
pub fn label_buckets(buckets: &[AggregatedBucket]) -> Vec<ChartSlice> {
    let total: u64 = buckets.iter().map(|b| b.count).sum();

    buckets
        .iter()
        .enumerate()
        .map(|(id, bucket)| {
            let percent = bucket.count as f64 / total as f64 * 100.0;
            ChartSlice {
                id,
                value: bucket.count,
                label: format!("{:.1}%: {}", percent, display_label(&bucket.label)),
            }
        })
        .collect()
}

/// Full pipeline from raw keys to chart slices
pub fn aggregate<I>(keys: I, retain_top: usize) -> Vec<ChartSlice>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let ranked = rank_buckets(count_keys(keys), retain_top);
    tracing::debug!("Aggregated into {} buckets (top {})", ranked.len(), retain_top);
    label_buckets(&ranked)
}

/// Aggregate one column of a record sample
pub fn aggregate_column(records: &[Record], column: &str, retain_top: usize) -> Vec<ChartSlice> {
    aggregate(column_keys(records, column), retain_top)
}
