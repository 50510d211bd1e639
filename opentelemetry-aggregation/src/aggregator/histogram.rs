use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use opentelemetry::InstrumentationScope;

use super::{Accumulator, Aggregator, AggregatorHandle};
use crate::aggregation::validate_bucket_boundaries;
use crate::data::{self, Exemplar, HistogramDataPoint, Metric, MetricData};
use crate::exemplar::ReservoirFactory;
use crate::{
    AttributeSet, CollectionWindow, MetricDescriptor, MetricError, MetricResult, Number, Resource,
    Temporality,
};

/// Bucket counts, count, sum and extremes of the measurements of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramAccumulation<T> {
    /// One count per bucket, `boundaries.len() + 1` in total.
    pub bucket_counts: Vec<u64>,
    /// Number of measurements.
    pub count: u64,
    /// Sum of the measurements.
    pub sum: T,
    /// Smallest measurement.
    pub min: T,
    /// Largest measurement.
    pub max: T,
    /// Exemplars sampled while the accumulation was built.
    pub exemplars: Vec<Exemplar<T>>,
}

/// Running buckets behind a [`HistogramAggregator`] handle.
#[derive(Debug)]
pub struct HistogramAccumulator<T> {
    boundaries: Arc<[f64]>,
    counts: Vec<u64>,
    count: u64,
    total: T,
    min: T,
    max: T,
}

impl<T: Number> HistogramAccumulator<T> {
    fn new(boundaries: Arc<[f64]>) -> Self {
        HistogramAccumulator {
            counts: vec![0; boundaries.len() + 1],
            boundaries,
            count: 0,
            total: T::default(),
            min: T::max(),
            max: T::min(),
        }
    }
}

impl<T: Number> Accumulator<T> for HistogramAccumulator<T> {
    type Accumulation = HistogramAccumulation<T>;

    fn record(&mut self, value: T) {
        // Buckets are upper-bound exclusive: a value equal to a boundary
        // lands in the bucket that boundary opens.
        let f = value.into_float();
        let idx = self.boundaries.partition_point(|&b| b <= f);
        if let Some(bucket) = self.counts.get_mut(idx) {
            *bucket = bucket.wrapping_add(1);
        }
        self.count = self.count.wrapping_add(1);
        self.total = self.total.wrapping_add(value);
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    fn accumulate_then_reset(
        &mut self,
        exemplars: Vec<Exemplar<T>>,
    ) -> HistogramAccumulation<T> {
        let zeroed = vec![0; self.counts.len()];
        HistogramAccumulation {
            bucket_counts: mem::replace(&mut self.counts, zeroed),
            count: mem::take(&mut self.count),
            sum: mem::take(&mut self.total),
            min: mem::replace(&mut self.min, T::max()),
            max: mem::replace(&mut self.max, T::min()),
            exemplars,
        }
    }
}

/// Summarizes a set of measurements as a histogram with explicitly defined
/// buckets.
#[derive(Debug)]
pub struct HistogramAggregator<T> {
    boundaries: Arc<[f64]>,
    record_min_max: bool,
    reservoir: ReservoirFactory<T>,
}

impl<T: Number> HistogramAggregator<T> {
    /// Returns a histogram aggregator over the buckets delimited by
    /// `boundaries`.
    ///
    /// Fails if a boundary is NaN or infinite, or if the boundaries are not
    /// strictly increasing.
    pub fn new(
        boundaries: impl Into<Arc<[f64]>>,
        record_min_max: bool,
        reservoir: ReservoirFactory<T>,
    ) -> MetricResult<Self> {
        let boundaries = boundaries.into();
        validate_bucket_boundaries(&boundaries).map_err(MetricError::Config)?;
        Ok(HistogramAggregator {
            boundaries,
            record_min_max,
            reservoir,
        })
    }

    /// The bucket boundaries.
    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }
}

fn merge_counts(previous: &[u64], current: &[u64]) -> Vec<u64> {
    previous
        .iter()
        .zip(current)
        .map(|(p, c)| p.wrapping_add(*c))
        .collect()
}

impl<T: Number> Aggregator<T> for HistogramAggregator<T> {
    type Accumulation = HistogramAccumulation<T>;
    type Accumulator = HistogramAccumulator<T>;

    fn create_handle(&self) -> AggregatorHandle<T, HistogramAccumulator<T>> {
        AggregatorHandle::new(
            HistogramAccumulator::new(Arc::clone(&self.boundaries)),
            self.reservoir.create(),
        )
    }

    fn merge(
        &self,
        previous: &HistogramAccumulation<T>,
        current: &HistogramAccumulation<T>,
    ) -> HistogramAccumulation<T> {
        HistogramAccumulation {
            bucket_counts: merge_counts(&previous.bucket_counts, &current.bucket_counts),
            count: previous.count.wrapping_add(current.count),
            sum: previous.sum.wrapping_add(current.sum),
            min: if current.min < previous.min {
                current.min
            } else {
                previous.min
            },
            max: if current.max > previous.max {
                current.max
            } else {
                previous.max
            },
            exemplars: current.exemplars.clone(),
        }
    }

    fn diff(
        &self,
        previous: &HistogramAccumulation<T>,
        current: &HistogramAccumulation<T>,
    ) -> HistogramAccumulation<T> {
        HistogramAccumulation {
            bucket_counts: previous
                .bucket_counts
                .iter()
                .zip(&current.bucket_counts)
                .map(|(p, c)| c.saturating_sub(*p))
                .collect(),
            count: current.count.saturating_sub(previous.count),
            sum: current.sum.delta(previous.sum),
            min: current.min,
            max: current.max,
            exemplars: current.exemplars.clone(),
        }
    }

    fn to_metric_data(
        &self,
        resource: &Resource,
        scope: &InstrumentationScope,
        descriptor: &MetricDescriptor,
        accumulations: HashMap<AttributeSet, HistogramAccumulation<T>>,
        temporality: Temporality,
        window: &CollectionWindow,
    ) -> Metric<T> {
        let data_points = accumulations
            .into_iter()
            .map(|(attributes, acc)| {
                let record_extremes = self.record_min_max && acc.count > 0;
                HistogramDataPoint {
                    attributes: attributes.into_vec(),
                    count: acc.count,
                    bounds: self.boundaries.to_vec(),
                    bucket_counts: acc.bucket_counts,
                    min: record_extremes.then_some(acc.min),
                    max: record_extremes.then_some(acc.max),
                    sum: acc.sum,
                    exemplars: acc.exemplars,
                }
            })
            .collect();

        Metric {
            resource: resource.clone(),
            scope: scope.clone(),
            descriptor: descriptor.clone(),
            data: MetricData::Histogram(data::Histogram {
                data_points,
                start_time: window.start_for(temporality),
                time: window.collection_time,
                temporality,
            }),
        }
    }
}
