//! Descriptive statistics over indexed cast events
//!
//! Reduces indexed events into per-bucket [`AggregateRow`]s, derives the
//! inter-cast interval table, and computes confidence intervals for elapsed
//! -time samples. Mean and standard deviation use a two-pass computation so
//! large sample counts do not lose precision to naive running sums.

use crate::error::AnalysisError;
use crate::models::{AggregateRow, CastIntervalRow, EventType, IndexedEvent};
use std::collections::BTreeMap;

type BucketKey = (i64, u32, EventType, u32);

/// Aggregate `phase_time` statistics per (ability, phase, type, cast index)
/// bucket across all fights. Buckets with fewer than `min_count` samples are
/// dropped. A singleton bucket reports `std = 0`, never an error.
///
/// Rows come back in bucket-key order, which is also what makes the result
/// independent of input event order.
pub fn aggregate(events: &[IndexedEvent], min_count: usize) -> Vec<AggregateRow> {
    let mut buckets: BTreeMap<BucketKey, Vec<f64>> = BTreeMap::new();
    for indexed in events {
        let key = (
            indexed.event.ability_id,
            indexed.event.phase,
            indexed.event.kind,
            indexed.cast_index,
        );
        buckets.entry(key).or_default().push(indexed.event.phase_time);
    }

    buckets
        .into_iter()
        .filter(|(_, samples)| samples.len() >= min_count)
        .map(|((ability_id, phase, kind, cast_index), samples)| {
            let mean = mean(&samples);
            AggregateRow {
                ability_id,
                phase,
                kind,
                cast_index,
                count: samples.len(),
                mean,
                std: sample_std(&samples, mean),
                min: samples.iter().copied().fold(f64::INFINITY, f64::min),
                max: samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }
        })
        .collect()
}

/// Derive the average-cast-time table: for each (ability, phase, type) group
/// the mean phase times ordered by cast index, first-differenced. The first
/// entry stays as-is (time to the first cast); subsequent entries are the
/// gaps between consecutive casts. `mean_interval`/`std_interval` summarize
/// the gaps only.
pub fn cast_intervals(rows: &[AggregateRow]) -> Vec<CastIntervalRow> {
    let mut groups: BTreeMap<(i64, u32, EventType), Vec<(u32, f64)>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.ability_id, row.phase, row.kind))
            .or_default()
            .push((row.cast_index, row.mean));
    }

    groups
        .into_iter()
        .map(|((ability_id, phase, kind), mut means)| {
            means.sort_by_key(|(cast_index, _)| *cast_index);

            let mut intervals = Vec::with_capacity(means.len());
            let mut previous = 0.0;
            for (position, (_, mean_time)) in means.iter().enumerate() {
                if position == 0 {
                    intervals.push(*mean_time);
                } else {
                    intervals.push(mean_time - previous);
                }
                previous = *mean_time;
            }

            let gaps = &intervals[1..];
            let mean_interval = if gaps.is_empty() { 0.0 } else { mean(gaps) };
            let std_interval = if gaps.is_empty() {
                0.0
            } else {
                sample_std(gaps, mean_interval)
            };

            CastIntervalRow {
                ability_id,
                phase,
                kind,
                intervals,
                mean_interval,
                std_interval,
            }
        })
        .collect()
}

/// Two-sided confidence level for interval estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Confidence {
    #[value(name = "90")]
    P90,
    #[value(name = "95")]
    P95,
    #[value(name = "99")]
    P99,
}

impl Default for Confidence {
    fn default() -> Self {
        Confidence::P95
    }
}

impl Confidence {
    pub fn label(&self) -> &'static str {
        match self {
            Confidence::P90 => "90",
            Confidence::P95 => "95",
            Confidence::P99 => "99",
        }
    }
}

/// Confidence interval for a sample of elapsed times.
///
/// Uses the Student-t critical value with n-1 degrees of freedom below 30
/// samples and the normal critical value from there on.
/// `margin = crit * std / sqrt(n)`. Fewer than 2 samples is an error: a
/// variance estimate needs at least two observations.
pub fn confidence_interval(
    samples: &[f64],
    confidence: Confidence,
) -> Result<(f64, f64), AnalysisError> {
    let n = samples.len();
    if n < 2 {
        return Err(AnalysisError::InsufficientSample { count: n });
    }

    let mean = mean(samples);
    let std = sample_std(samples, mean);
    let margin = margin_of_error(std, n, confidence)?;
    Ok((mean - margin, mean + margin))
}

/// Margin of error from already-computed moments. Lets report rows carry a
/// confidence interval without retaining their raw samples.
pub fn margin_of_error(
    std: f64,
    count: usize,
    confidence: Confidence,
) -> Result<f64, AnalysisError> {
    if count < 2 {
        return Err(AnalysisError::InsufficientSample { count });
    }
    let critical = if count < 30 {
        critical_t(confidence, count - 1)
    } else {
        critical_z(confidence)
    };
    Ok(critical * std / (count as f64).sqrt())
}

pub fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Sample standard deviation (ddof = 1); 0 for a singleton.
pub fn sample_std(samples: &[f64], mean: f64) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|x| (x - mean).powi(2)).sum();
    (sum_sq / (samples.len() - 1) as f64).sqrt()
}

// Two-sided critical values of the t distribution, df 1..=29. Beyond that the
// caller switches to the normal value.
#[rustfmt::skip]
const T_90: [f64; 29] = [
    6.3138, 2.9200, 2.3534, 2.1318, 2.0150, 1.9432, 1.8946, 1.8595, 1.8331,
    1.8125, 1.7959, 1.7823, 1.7709, 1.7613, 1.7531, 1.7459, 1.7396, 1.7341,
    1.7291, 1.7247, 1.7207, 1.7171, 1.7139, 1.7109, 1.7081, 1.7056, 1.7033,
    1.7011, 1.6991,
];
#[rustfmt::skip]
const T_95: [f64; 29] = [
    12.7062, 4.3027, 3.1824, 2.7764, 2.5706, 2.4469, 2.3646, 2.3060, 2.2622,
    2.2281, 2.2010, 2.1788, 2.1604, 2.1448, 2.1314, 2.1199, 2.1098, 2.1009,
    2.0930, 2.0860, 2.0796, 2.0739, 2.0687, 2.0639, 2.0595, 2.0555, 2.0518,
    2.0484, 2.0452,
];
#[rustfmt::skip]
const T_99: [f64; 29] = [
    63.6567, 9.9248, 5.8409, 4.6041, 4.0321, 3.7074, 3.4995, 3.3554, 3.2498,
    3.1693, 3.1058, 3.0545, 3.0123, 2.9768, 2.9467, 2.9208, 2.8982, 2.8784,
    2.8609, 2.8453, 2.8314, 2.8188, 2.8073, 2.7969, 2.7874, 2.7787, 2.7707,
    2.7633, 2.7564,
];

fn critical_t(confidence: Confidence, df: usize) -> f64 {
    let table = match confidence {
        Confidence::P90 => &T_90,
        Confidence::P95 => &T_95,
        Confidence::P99 => &T_99,
    };
    table[df.min(table.len()) - 1]
}

fn critical_z(confidence: Confidence) -> f64 {
    match confidence {
        Confidence::P90 => 1.6449,
        Confidence::P95 => 1.9600,
        Confidence::P99 => 2.5758,
    }
}
