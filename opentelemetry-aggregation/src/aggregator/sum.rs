use std::collections::HashMap;

use opentelemetry::InstrumentationScope;

use super::{Accumulator, Aggregator, AggregatorHandle};
use crate::data::{self, Exemplar, Metric, MetricData, SumDataPoint};
use crate::exemplar::ReservoirFactory;
use crate::{AttributeSet, CollectionWindow, MetricDescriptor, Number, Resource, Temporality};

/// The arithmetic sum of the measurements of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SumAccumulation<T> {
    /// The sum.
    pub value: T,
    /// Exemplars sampled while the sum was accumulated.
    pub exemplars: Vec<Exemplar<T>>,
}

/// Running total behind a [`SumAggregator`] handle.
#[derive(Debug, Default)]
pub struct SumAccumulator<T> {
    value: T,
}

impl<T: Number> Accumulator<T> for SumAccumulator<T> {
    type Accumulation = SumAccumulation<T>;

    fn record(&mut self, value: T) {
        self.value = self.value.wrapping_add(value);
    }

    fn accumulate_then_reset(&mut self, exemplars: Vec<Exemplar<T>>) -> SumAccumulation<T> {
        SumAccumulation {
            value: std::mem::take(&mut self.value),
            exemplars,
        }
    }
}

/// Summarizes a set of measurements as their arithmetic sum.
#[derive(Debug)]
pub struct SumAggregator<T> {
    monotonic: bool,
    reservoir: ReservoirFactory<T>,
}

impl<T: Number> SumAggregator<T> {
    /// Returns an aggregator that summarizes measurements as their sum.
    ///
    /// `monotonic` is only carried onto the exported data; the aggregator
    /// does not reject negative values.
    pub fn new(monotonic: bool, reservoir: ReservoirFactory<T>) -> Self {
        SumAggregator {
            monotonic,
            reservoir,
        }
    }

    /// Whether the exported sum is monotonic.
    pub fn is_monotonic(&self) -> bool {
        self.monotonic
    }
}

impl<T: Number> Aggregator<T> for SumAggregator<T> {
    type Accumulation = SumAccumulation<T>;
    type Accumulator = SumAccumulator<T>;

    fn create_handle(&self) -> AggregatorHandle<T, SumAccumulator<T>> {
        AggregatorHandle::new(SumAccumulator::default(), self.reservoir.create())
    }

    fn merge(
        &self,
        previous: &SumAccumulation<T>,
        current: &SumAccumulation<T>,
    ) -> SumAccumulation<T> {
        SumAccumulation {
            value: previous.value.wrapping_add(current.value),
            exemplars: current.exemplars.clone(),
        }
    }

    fn diff(
        &self,
        previous: &SumAccumulation<T>,
        current: &SumAccumulation<T>,
    ) -> SumAccumulation<T> {
        SumAccumulation {
            value: current.value.delta(previous.value),
            exemplars: current.exemplars.clone(),
        }
    }

    fn to_metric_data(
        &self,
        resource: &Resource,
        scope: &InstrumentationScope,
        descriptor: &MetricDescriptor,
        accumulations: HashMap<AttributeSet, SumAccumulation<T>>,
        temporality: Temporality,
        window: &CollectionWindow,
    ) -> Metric<T> {
        let data_points = accumulations
            .into_iter()
            .map(|(attributes, acc)| SumDataPoint {
                attributes: attributes.into_vec(),
                value: acc.value,
                exemplars: acc.exemplars,
            })
            .collect();

        Metric {
            resource: resource.clone(),
            scope: scope.clone(),
            descriptor: descriptor.clone(),
            data: MetricData::Sum(data::Sum {
                data_points,
                start_time: window.start_for(temporality),
                time: window.collection_time,
                temporality,
                is_monotonic: self.monotonic,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, SystemTime};

    use opentelemetry::KeyValue;
    use rstest::rstest;

    use super::*;

    fn acc<T>(value: T) -> SumAccumulation<T> {
        SumAccumulation {
            value,
            exemplars: vec![],
        }
    }

    #[test]
    fn concurrent_recordings_sum_up() {
        let aggregator = SumAggregator::<u64>::new(true, ReservoirFactory::none());
        let handle = Arc::new(aggregator.create_handle());

        thread::scope(|s| {
            for _ in 0..8 {
                let handle = Arc::clone(&handle);
                s.spawn(move || {
                    for v in 1..=100 {
                        handle.record(v);
                    }
                });
            }
        });

        assert_eq!(
            handle.accumulate_then_reset(&AttributeSet::default()),
            Some(acc(8 * 5050))
        );
    }

    #[rstest]
    #[case(10, 4, 6)]
    #[case(4, 10, 0)]
    fn unsigned_diff(#[case] current: u64, #[case] previous: u64, #[case] want: u64) {
        let aggregator = SumAggregator::<u64>::new(true, ReservoirFactory::none());
        assert_eq!(aggregator.diff(&acc(previous), &acc(current)), acc(want));
    }

    #[test]
    fn merge_and_diff_are_inverse() {
        let aggregator = SumAggregator::<i64>::new(false, ReservoirFactory::none());
        let previous = acc(-7);
        let current = acc(12);

        let merged = aggregator.merge(&previous, &current);
        assert_eq!(merged, acc(5));
        assert_eq!(aggregator.diff(&previous, &merged), current);
    }

    #[test]
    fn integer_sums_wrap_on_overflow() {
        let aggregator = SumAggregator::<i64>::new(false, ReservoirFactory::none());
        let handle = aggregator.create_handle();
        let empty = AttributeSet::default();

        handle.record(i64::MAX);
        handle.record(1);
        assert_eq!(handle.accumulate_then_reset(&empty), Some(acc(i64::MIN)));

        handle.record(i64::MAX);
        let first = handle.accumulate_then_reset(&empty).unwrap();
        handle.record(1);
        let second = handle.accumulate_then_reset(&empty).unwrap();
        let merged = aggregator.merge(&first, &second);
        assert_eq!(merged, acc(i64::MIN));
        assert_eq!(aggregator.diff(&first, &merged), second);
    }

    #[test]
    fn float_sums() {
        let aggregator = SumAggregator::<f64>::new(false, ReservoirFactory::none());
        let handle = aggregator.create_handle();
        handle.record(0.5);
        handle.record(1.25);

        let snapshot = handle.accumulate_then_reset(&AttributeSet::default()).unwrap();
        assert_eq!(snapshot.value, 1.75);
        assert_eq!(aggregator.merge(&snapshot, &acc(0.25)).value, 2.0);
    }

    #[rstest]
    #[case(Temporality::Cumulative, 0)]
    #[case(Temporality::Delta, 10)]
    fn exported_sum_shape(#[case] temporality: Temporality, #[case] start_offset: u64) {
        let aggregator = SumAggregator::<u64>::new(true, ReservoirFactory::none());
        let start = SystemTime::UNIX_EPOCH;
        let window = CollectionWindow {
            start_time: start,
            last_collection_time: start + Duration::from_secs(10),
            collection_time: start + Duration::from_secs(20),
        };
        let attrs = AttributeSet::from(&[KeyValue::new("a", "b")][..]);

        let metric = aggregator.to_metric_data(
            &Resource::empty(),
            &InstrumentationScope::builder("test").build(),
            &MetricDescriptor::new("requests"),
            HashMap::from([(attrs, acc(3))]),
            temporality,
            &window,
        );

        assert_eq!(metric.descriptor.name(), "requests");
        let MetricData::Sum(sum) = metric.data else {
            panic!("expected a sum");
        };
        assert!(sum.is_monotonic);
        assert_eq!(sum.temporality, temporality);
        assert_eq!(sum.start_time, start + Duration::from_secs(start_offset));
        assert_eq!(sum.time, start + Duration::from_secs(20));
        assert_eq!(sum.data_points.len(), 1);
        assert_eq!(sum.data_points[0].attributes, vec![KeyValue::new("a", "b")]);
        assert_eq!(sum.data_points[0].value, 3);
    }
}
