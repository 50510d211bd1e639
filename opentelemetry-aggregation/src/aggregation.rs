use std::fmt;
use std::sync::Arc;
use std::thread;

use crate::exemplar::{ExemplarFilter, ReservoirFactory};
use crate::storage::AggregateFns;
use crate::{
    Aggregator, Collector, CollectorConfig, HistogramAggregator, LastValueAggregator, MetricError,
    MetricResult, MetricStream, MinMaxSumCountAggregator, Number, SumAggregator,
};

/// The bucket boundaries used when a histogram is not configured with its
/// own.
pub const DEFAULT_HISTOGRAM_BOUNDARIES: [f64; 15] = [
    0.0, 5.0, 10.0, 25.0, 50.0, 75.0, 100.0, 250.0, 500.0, 750.0, 1000.0, 2500.0, 5000.0,
    7500.0, 10000.0,
];

/// The way recorded measurements are summarized.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Aggregation {
    /// An aggregation that drops all recorded data.
    Drop,

    /// An aggregation that summarizes a set of measurements as their arithmetic
    /// sum.
    Sum {
        /// Whether the sum only ever increases. Negative measurements are
        /// dropped for monotonic sums.
        monotonic: bool,
    },

    /// An aggregation that summarizes a set of measurements as the last one made.
    LastValue,

    /// An aggregation that summarizes a set of measurements as their count,
    /// sum, minimum and maximum.
    MinMaxSumCount,

    /// An aggregation that summarizes a set of measurements as a histogram with
    /// explicitly defined buckets.
    ExplicitBucketHistogram {
        /// The increasing bucket boundary values.
        ///
        /// Buckets include their lower boundary and exclude their upper one.
        /// Boundaries defined as `vec![0.0, 5.0, 10.0]` define these buckets:
        ///
        /// (-∞, 0.0), [0.0, 5.0), [5.0, 10.0), [10.0, +∞)
        boundaries: Vec<f64>,

        /// Whether the minimum and maximum are exported.
        record_min_max: bool,
    },
}

impl Default for Aggregation {
    fn default() -> Self {
        Aggregation::Sum { monotonic: true }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregation::Drop => "Drop",
            Aggregation::Sum { .. } => "Sum",
            Aggregation::LastValue => "LastValue",
            Aggregation::MinMaxSumCount => "MinMaxSumCount",
            Aggregation::ExplicitBucketHistogram { .. } => "ExplicitBucketHistogram",
        };

        f.write_str(name)
    }
}

impl Aggregation {
    /// A histogram over [`DEFAULT_HISTOGRAM_BOUNDARIES`] recording min and max.
    pub fn default_histogram() -> Self {
        Aggregation::ExplicitBucketHistogram {
            boundaries: DEFAULT_HISTOGRAM_BOUNDARIES.to_vec(),
            record_min_max: true,
        }
    }

    /// Validate that this aggregation has correct configuration
    pub fn validate(&self) -> MetricResult<()> {
        match self {
            Aggregation::Drop
            | Aggregation::Sum { .. }
            | Aggregation::LastValue
            | Aggregation::MinMaxSumCount => Ok(()),
            Aggregation::ExplicitBucketHistogram { boundaries, .. } => {
                validate_bucket_boundaries(boundaries).map_err(|err| {
                    MetricError::Config(format!(
                        "aggregation: explicit bucket histogram: {err}: {boundaries:?}"
                    ))
                })
            }
        }
    }

    /// Whether negative measurements must be dropped.
    pub(crate) fn is_monotonic(&self) -> bool {
        matches!(self, Aggregation::Sum { monotonic: true })
    }

    /// Builds one collector per reader config, all sharing one aggregator.
    ///
    /// [`Aggregation::Drop`] builds none.
    pub(crate) fn build<T: Number>(
        &self,
        stream: &MetricStream,
        exemplar_filter: ExemplarFilter,
        configs: &[CollectorConfig],
    ) -> MetricResult<Vec<AggregateFns<T>>> {
        let fns = match self {
            Aggregation::Drop => Vec::new(),
            Aggregation::Sum { monotonic } => collectors(
                SumAggregator::new(*monotonic, default_reservoir(exemplar_filter)?),
                stream,
                configs,
            ),
            Aggregation::LastValue => collectors(
                LastValueAggregator::new(default_reservoir(exemplar_filter)?),
                stream,
                configs,
            ),
            Aggregation::MinMaxSumCount => collectors(
                MinMaxSumCountAggregator::new(default_reservoir(exemplar_filter)?),
                stream,
                configs,
            ),
            Aggregation::ExplicitBucketHistogram {
                boundaries,
                record_min_max,
            } => {
                let boundaries: Arc<[f64]> = Arc::from(boundaries.as_slice());
                let reservoir = ReservoirFactory::aligned_histogram_buckets(
                    exemplar_filter,
                    Arc::clone(&boundaries),
                );
                collectors(
                    HistogramAggregator::new(boundaries, *record_min_max, reservoir)?,
                    stream,
                    configs,
                )
            }
        };
        Ok(fns)
    }
}

fn default_reservoir<T: Number>(filter: ExemplarFilter) -> MetricResult<ReservoirFactory<T>> {
    let size = thread::available_parallelism().map_or(1, |n| n.get());
    ReservoirFactory::fixed_size(filter, size)
}

fn collectors<T: Number, A: Aggregator<T>>(
    aggregator: A,
    stream: &MetricStream,
    configs: &[CollectorConfig],
) -> Vec<AggregateFns<T>> {
    let aggregator = Arc::new(aggregator);
    configs
        .iter()
        .map(|config| {
            AggregateFns::from(Collector::new(
                Arc::clone(&aggregator),
                stream.clone(),
                config.clone(),
            ))
        })
        .collect()
}

pub(crate) fn validate_bucket_boundaries(boundaries: &[f64]) -> Result<(), String> {
    // Validate boundaries do not contain f64::NAN, f64::INFINITY, or f64::NEG_INFINITY
    for boundary in boundaries {
        if boundary.is_nan() || boundary.is_infinite() {
            return Err(
                "Bucket boundaries must not contain NaN, Infinity, or -Infinity".to_string(),
            );
        }
    }

    // validate that buckets are sorted and non-duplicate
    for i in 1..boundaries.len() {
        if boundaries[i] <= boundaries[i - 1] {
            return Err(
                "Bucket boundaries must be sorted and not contain any duplicates".to_string(),
            );
        }
    }

    Ok(())
}
