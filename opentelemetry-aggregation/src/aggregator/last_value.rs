use std::collections::HashMap;
use std::time::SystemTime;

use opentelemetry::InstrumentationScope;

use super::{Accumulator, Aggregator, AggregatorHandle};
use crate::data::{Exemplar, Gauge, GaugeDataPoint, Metric, MetricData};
use crate::exemplar::ReservoirFactory;
use crate::{AttributeSet, CollectionWindow, MetricDescriptor, Number, Resource, Temporality};

/// The most recent measurement of one cycle and when it was recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct LastValueAccumulation<T> {
    /// The last recorded value.
    pub value: T,
    /// When `value` was recorded.
    pub recorded_at: SystemTime,
    /// Exemplars sampled while the accumulation was built.
    pub exemplars: Vec<Exemplar<T>>,
}

/// Latest value behind a [`LastValueAggregator`] handle.
#[derive(Debug)]
pub struct LastValueAccumulator<T> {
    value: T,
    recorded_at: SystemTime,
}

impl<T: Number> Default for LastValueAccumulator<T> {
    fn default() -> Self {
        LastValueAccumulator {
            value: T::default(),
            recorded_at: SystemTime::UNIX_EPOCH,
        }
    }
}

impl<T: Number> Accumulator<T> for LastValueAccumulator<T> {
    type Accumulation = LastValueAccumulation<T>;

    fn record(&mut self, value: T) {
        self.value = value;
        self.recorded_at = opentelemetry::time::now();
    }

    fn accumulate_then_reset(&mut self, exemplars: Vec<Exemplar<T>>) -> LastValueAccumulation<T> {
        let last = std::mem::take(self);
        LastValueAccumulation {
            value: last.value,
            recorded_at: last.recorded_at,
            exemplars,
        }
    }
}

/// Summarizes a set of measurements as the last one made.
#[derive(Debug)]
pub struct LastValueAggregator<T> {
    reservoir: ReservoirFactory<T>,
}

impl<T: Number> LastValueAggregator<T> {
    /// Returns a last value aggregator.
    pub fn new(reservoir: ReservoirFactory<T>) -> Self {
        LastValueAggregator { reservoir }
    }
}

impl<T: Number> Aggregator<T> for LastValueAggregator<T> {
    type Accumulation = LastValueAccumulation<T>;
    type Accumulator = LastValueAccumulator<T>;

    fn create_handle(&self) -> AggregatorHandle<T, LastValueAccumulator<T>> {
        AggregatorHandle::new(LastValueAccumulator::default(), self.reservoir.create())
    }

    /// Keeps the later of the two. Equal timestamps resolve to the larger
    /// value.
    fn merge(
        &self,
        previous: &LastValueAccumulation<T>,
        current: &LastValueAccumulation<T>,
    ) -> LastValueAccumulation<T> {
        let current_wins = match current.recorded_at.cmp(&previous.recorded_at) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => current.value >= previous.value,
        };
        let winner = if current_wins { current } else { previous };

        LastValueAccumulation {
            value: winner.value,
            recorded_at: winner.recorded_at,
            exemplars: current.exemplars.clone(),
        }
    }

    fn diff(
        &self,
        _previous: &LastValueAccumulation<T>,
        current: &LastValueAccumulation<T>,
    ) -> LastValueAccumulation<T> {
        current.clone()
    }

    fn to_metric_data(
        &self,
        resource: &Resource,
        scope: &InstrumentationScope,
        descriptor: &MetricDescriptor,
        accumulations: HashMap<AttributeSet, LastValueAccumulation<T>>,
        temporality: Temporality,
        window: &CollectionWindow,
    ) -> Metric<T> {
        let data_points = accumulations
            .into_iter()
            .map(|(attributes, acc)| GaugeDataPoint {
                attributes: attributes.into_vec(),
                value: acc.value,
                recorded_at: acc.recorded_at,
                exemplars: acc.exemplars,
            })
            .collect();

        Metric {
            resource: resource.clone(),
            scope: scope.clone(),
            descriptor: descriptor.clone(),
            data: MetricData::Gauge(Gauge {
                data_points,
                start_time: Some(window.start_for(temporality)),
                time: window.collection_time,
            }),
        }
    }
}
