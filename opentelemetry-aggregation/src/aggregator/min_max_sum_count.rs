use std::collections::HashMap;

use opentelemetry::InstrumentationScope;

use super::{Accumulator, Aggregator, AggregatorHandle};
use crate::data::{Exemplar, Metric, MetricData, QuantileValue, Summary, SummaryDataPoint};
use crate::exemplar::ReservoirFactory;
use crate::{AttributeSet, CollectionWindow, MetricDescriptor, Number, Resource, Temporality};

/// Count, sum and extremes of the measurements of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxSumCountAccumulation<T> {
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

impl<T> MinMaxSumCountAccumulation<T> {
    /// An accumulation without exemplars.
    pub fn new(count: u64, sum: T, min: T, max: T) -> Self {
        MinMaxSumCountAccumulation {
            count,
            sum,
            min,
            max,
            exemplars: Vec::new(),
        }
    }
}

/// Running count, sum, minimum and maximum behind a
/// [`MinMaxSumCountAggregator`] handle.
#[derive(Debug)]
pub struct MinMaxSumCountAccumulator<T> {
    count: u64,
    sum: T,
    min: T,
    max: T,
}

impl<T: Number> Default for MinMaxSumCountAccumulator<T> {
    fn default() -> Self {
        MinMaxSumCountAccumulator {
            count: 0,
            sum: T::default(),
            min: T::max(),
            max: T::min(),
        }
    }
}

impl<T: Number> Accumulator<T> for MinMaxSumCountAccumulator<T> {
    type Accumulation = MinMaxSumCountAccumulation<T>;

    fn record(&mut self, value: T) {
        self.count = self.count.wrapping_add(1);
        self.sum = self.sum.wrapping_add(value);
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
    ) -> MinMaxSumCountAccumulation<T> {
        let done = std::mem::take(self);
        MinMaxSumCountAccumulation {
            count: done.count,
            sum: done.sum,
            min: done.min,
            max: done.max,
            exemplars,
        }
    }
}

/// Summarizes measurements as their count, sum, minimum and maximum.
///
/// Exported as a summary whose 0.0 quantile is the minimum and whose 1.0
/// quantile is the maximum.
#[derive(Debug)]
pub struct MinMaxSumCountAggregator<T> {
    reservoir: ReservoirFactory<T>,
}

impl<T: Number> MinMaxSumCountAggregator<T> {
    /// Returns a min/max/sum/count aggregator.
    pub fn new(reservoir: ReservoirFactory<T>) -> Self {
        MinMaxSumCountAggregator { reservoir }
    }
}

fn lesser<T: Number>(a: T, b: T) -> T {
    if b < a {
        b
    } else {
        a
    }
}

fn greater<T: Number>(a: T, b: T) -> T {
    if b > a {
        b
    } else {
        a
    }
}

impl<T: Number> Aggregator<T> for MinMaxSumCountAggregator<T> {
    type Accumulation = MinMaxSumCountAccumulation<T>;
    type Accumulator = MinMaxSumCountAccumulator<T>;

    fn create_handle(&self) -> AggregatorHandle<T, MinMaxSumCountAccumulator<T>> {
        AggregatorHandle::new(MinMaxSumCountAccumulator::default(), self.reservoir.create())
    }

    fn merge(
        &self,
        previous: &MinMaxSumCountAccumulation<T>,
        current: &MinMaxSumCountAccumulation<T>,
    ) -> MinMaxSumCountAccumulation<T> {
        MinMaxSumCountAccumulation {
            count: previous.count.wrapping_add(current.count),
            sum: previous.sum.wrapping_add(current.sum),
            min: lesser(previous.min, current.min),
            max: greater(previous.max, current.max),
            exemplars: current.exemplars.clone(),
        }
    }

    fn diff(
        &self,
        previous: &MinMaxSumCountAccumulation<T>,
        current: &MinMaxSumCountAccumulation<T>,
    ) -> MinMaxSumCountAccumulation<T> {
        MinMaxSumCountAccumulation {
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
        accumulations: HashMap<AttributeSet, MinMaxSumCountAccumulation<T>>,
        temporality: Temporality,
        window: &CollectionWindow,
    ) -> Metric<T> {
        let data_points = accumulations
            .into_iter()
            .map(|(attributes, acc)| SummaryDataPoint {
                attributes: attributes.into_vec(),
                count: acc.count,
                sum: acc.sum,
                quantile_values: vec![
                    QuantileValue {
                        quantile: 0.0,
                        value: acc.min.into_float(),
                    },
                    QuantileValue {
                        quantile: 1.0,
                        value: acc.max.into_float(),
                    },
                ],
                exemplars: acc.exemplars,
            })
            .collect();

        Metric {
            resource: resource.clone(),
            scope: scope.clone(),
            descriptor: descriptor.clone(),
            data: MetricData::Summary(Summary {
                data_points,
                start_time: window.start_for(temporality),
                time: window.collection_time,
                temporality,
            }),
        }
    }
}
