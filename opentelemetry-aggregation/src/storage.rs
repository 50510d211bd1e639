use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use opentelemetry::{otel_debug, Context, KeyValue};

use crate::data::Metric;
use crate::exemplar::ExemplarFilter;
use crate::{
    Aggregation, Aggregator, Collector, CollectorConfig, MetricError, MetricResult, MetricStream,
    Number,
};

/// Receives measurements to be aggregated.
pub(crate) trait Measure<T>: Send + Sync + 'static {
    /// Records `measurement` for `attrs`, sampling exemplars against `cx`
    /// when given and the current context otherwise.
    fn call(&self, measurement: T, attrs: &[KeyValue], cx: Option<&Context>);
}

/// Produces the data of one collection cycle.
pub(crate) trait ComputeAggregation<T>: Send + Sync + 'static {
    /// Collects the cycle ending at `collection_time`.
    fn collect(&self, start_time: SystemTime, collection_time: SystemTime) -> Option<Metric<T>>;

    /// Collects one last time and releases all state.
    fn shutdown(&self, start_time: SystemTime, collection_time: SystemTime) -> Option<Metric<T>>;
}

impl<T: Number, A: Aggregator<T>> Measure<T> for Collector<T, A> {
    fn call(&self, measurement: T, attrs: &[KeyValue], cx: Option<&Context>) {
        match cx {
            Some(cx) => self.record_with_context(measurement, attrs, cx),
            None => self.record(measurement, attrs),
        }
    }
}

impl<T: Number, A: Aggregator<T>> ComputeAggregation<T> for Collector<T, A> {
    fn collect(&self, start_time: SystemTime, collection_time: SystemTime) -> Option<Metric<T>> {
        Collector::collect(self, start_time, collection_time)
    }

    fn shutdown(&self, start_time: SystemTime, collection_time: SystemTime) -> Option<Metric<T>> {
        Collector::shutdown(self, start_time, collection_time)
    }
}

/// Separate `measure` and `collect` functions for an aggregate.
pub(crate) struct AggregateFns<T> {
    /// The recording side.
    pub(crate) measure: Arc<dyn Measure<T>>,
    /// The collecting side.
    pub(crate) collect: Arc<dyn ComputeAggregation<T>>,
}

impl<T> fmt::Debug for AggregateFns<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateFns").finish_non_exhaustive()
    }
}

/// Creates aggregate functions out of a collector
impl<T: Number, A: Aggregator<T>> From<Collector<T, A>> for AggregateFns<T> {
    fn from(value: Collector<T, A>) -> Self {
        let inst = Arc::new(value);
        Self {
            measure: inst.clone(),
            collect: inst,
        }
    }
}

/// The storage of one instrument: its recordings fan out to one collector
/// per registered reader.
///
/// Readers are identified by the position of their [`CollectorConfig`] in
/// the list the storage was created with.
pub struct InstrumentStorage<T> {
    stream: MetricStream,
    aggregation: Aggregation,
    reader_count: usize,
    collectors: Vec<AggregateFns<T>>,
}

impl<T> fmt::Debug for InstrumentStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentStorage")
            .field("descriptor", &self.stream.descriptor)
            .field("aggregation", &self.aggregation)
            .field("reader_count", &self.reader_count)
            .finish()
    }
}

impl<T: Number> InstrumentStorage<T> {
    /// Creates the storage of one instrument.
    ///
    /// Fails if `readers` is empty or `aggregation` is misconfigured.
    pub fn new(
        stream: MetricStream,
        aggregation: Aggregation,
        exemplar_filter: ExemplarFilter,
        readers: Vec<CollectorConfig>,
    ) -> MetricResult<Self> {
        if readers.is_empty() {
            return Err(MetricError::Config(format!(
                "instrument {} has no reader to report to",
                stream.descriptor.name()
            )));
        }
        aggregation.validate()?;
        let collectors = aggregation.build(&stream, exemplar_filter, &readers)?;

        Ok(InstrumentStorage {
            stream,
            aggregation,
            reader_count: readers.len(),
            collectors,
        })
    }

    /// The aggregation recordings are folded with.
    pub fn aggregation(&self) -> &Aggregation {
        &self.aggregation
    }

    /// The number of readers registered.
    pub fn reader_count(&self) -> usize {
        self.reader_count
    }

    /// Records `value` for `attributes` for every reader.
    pub fn record(&self, value: T, attributes: &[KeyValue]) {
        self.record_inner(value, attributes, None);
    }

    /// Records `value` for `attributes` for every reader, sampling exemplars
    /// against the span in `cx`.
    pub fn record_with_context(&self, value: T, attributes: &[KeyValue], cx: &Context) {
        self.record_inner(value, attributes, Some(cx));
    }

    fn record_inner(&self, value: T, attributes: &[KeyValue], cx: Option<&Context>) {
        if value.is_nan() {
            otel_debug!(
                name: "InstrumentStorage.MeasurementDropped",
                metric_name = self.stream.descriptor.name(),
                reason = "NaN measurement"
            );
            return;
        }
        if value.is_negative() && self.aggregation.is_monotonic() {
            otel_debug!(
                name: "InstrumentStorage.MeasurementDropped",
                metric_name = self.stream.descriptor.name(),
                reason = "negative measurement on a monotonic sum"
            );
            return;
        }
        for fns in &self.collectors {
            fns.measure.call(value, attributes, cx);
        }
    }

    /// Collects the cycle ending at `collection_time` for the reader at
    /// `reader`.
    ///
    /// Returns `None` for an unknown reader, a dropped aggregation, or when
    /// there is nothing to report.
    pub fn collect(
        &self,
        reader: usize,
        start_time: SystemTime,
        collection_time: SystemTime,
    ) -> Option<Metric<T>> {
        self.collectors
            .get(reader)?
            .collect
            .collect(start_time, collection_time)
    }

    /// Shuts every reader's collector down, returning each one's final data
    /// in reader order.
    pub fn shutdown(
        &self,
        start_time: SystemTime,
        collection_time: SystemTime,
    ) -> Vec<Option<Metric<T>>> {
        if self.collectors.is_empty() {
            return vec![None; self.reader_count];
        }
        self.collectors
            .iter()
            .map(|fns| fns.collect.shutdown(start_time, collection_time))
            .collect()
    }
}
