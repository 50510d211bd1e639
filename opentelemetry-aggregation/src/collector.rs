use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use opentelemetry::{otel_debug, otel_warn, Context, Key, KeyValue};

use crate::attributes::AttributeSetFilter;
use crate::data::Metric;
use crate::{
    Aggregator, AggregatorHandle, AttributeSet, CollectionWindow, MetricError, MetricResult,
    MetricStream, Number, Temporality, STREAM_OVERFLOW_ATTRIBUTES,
};

/// The number of distinct attribute sets a collector tracks before folding
/// new ones into the overflow series.
pub(crate) const DEFAULT_CARDINALITY_LIMIT: usize = 2000;

/// How one reader wants an instrument's data collected.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    temporality: Temporality,
    cardinality_limit: usize,
    max_idle_cycles: Option<u32>,
    allowed_attribute_keys: Option<Arc<HashSet<Key>>>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            temporality: Temporality::default(),
            cardinality_limit: DEFAULT_CARDINALITY_LIMIT,
            max_idle_cycles: None,
            allowed_attribute_keys: None,
        }
    }
}

impl CollectorConfig {
    /// Create a [CollectorConfigBuilder] starting from the defaults:
    /// cumulative temporality, a cardinality limit of 2000, no eviction and
    /// no attribute filtering.
    pub fn builder() -> CollectorConfigBuilder {
        CollectorConfigBuilder::default()
    }

    /// The temporality data is reported with.
    pub fn temporality(&self) -> Temporality {
        self.temporality
    }

    /// The maximum number of distinct attribute sets, overflow excluded.
    pub fn cardinality_limit(&self) -> usize {
        self.cardinality_limit
    }

    /// Consecutive cycles without recordings after which a series is
    /// evicted, if eviction is enabled.
    pub fn max_idle_cycles(&self) -> Option<u32> {
        self.max_idle_cycles
    }
}

/// Builder for [CollectorConfig].
#[derive(Debug, Default)]
pub struct CollectorConfigBuilder {
    temporality: Temporality,
    cardinality_limit: Option<usize>,
    max_idle_cycles: Option<u32>,
    allowed_attribute_keys: Option<Arc<HashSet<Key>>>,
}

impl CollectorConfigBuilder {
    /// Set the temporality. Defaults to [Temporality::Cumulative].
    pub fn with_temporality(mut self, temporality: Temporality) -> Self {
        self.temporality = temporality;
        self
    }

    /// Set the cardinality limit. If this is not set, the default limit of
    /// 2000 will be used.
    pub fn with_cardinality_limit(mut self, limit: usize) -> Self {
        self.cardinality_limit = Some(limit);
        self
    }

    /// Evict series that received no recordings for `cycles` consecutive
    /// collections.
    ///
    /// A cumulative series that is recorded again after its eviction starts
    /// over from zero, while points keep the instrument's start time. Readers
    /// exporting cumulative data should treat a decrease as a reset.
    pub fn with_max_idle_cycles(mut self, cycles: u32) -> Self {
        self.max_idle_cycles = Some(cycles);
        self
    }

    /// Keep only attributes with these keys.
    ///
    /// Any attribute recorded with a key not in this set is dropped before
    /// the series is looked up. If the set is empty, all attributes will be
    /// dropped.
    pub fn with_allowed_attribute_keys(mut self, keys: impl IntoIterator<Item = Key>) -> Self {
        self.allowed_attribute_keys = Some(Arc::new(keys.into_iter().collect()));
        self
    }

    /// Validate the options and build the config.
    pub fn build(self) -> MetricResult<CollectorConfig> {
        let cardinality_limit = self.cardinality_limit.unwrap_or(DEFAULT_CARDINALITY_LIMIT);
        if cardinality_limit == 0 {
            return Err(MetricError::Config(
                "Cardinality limit must be greater than 0".into(),
            ));
        }
        if self.max_idle_cycles == Some(0) {
            return Err(MetricError::Config(
                "Max idle cycles must be greater than 0".into(),
            ));
        }

        Ok(CollectorConfig {
            temporality: self.temporality,
            cardinality_limit,
            max_idle_cycles: self.max_idle_cycles,
            allowed_attribute_keys: self.allowed_attribute_keys,
        })
    }
}

#[derive(Debug)]
struct SeriesState<A> {
    cumulative: Option<A>,
    idle_cycles: u32,
}

impl<A> Default for SeriesState<A> {
    fn default() -> Self {
        SeriesState {
            cumulative: None,
            idle_cycles: 0,
        }
    }
}

#[derive(Debug)]
struct CollectState<A> {
    series: HashMap<AttributeSet, SeriesState<A>>,
    last_collection_time: Option<SystemTime>,
}

type HandleMap<T, S> = HashMap<AttributeSet, Arc<AggregatorHandle<T, S>>>;

/// Owns the attribute set to handle map of one instrument for one reader
/// and drives its collection cycles.
pub struct Collector<T: Number, A: Aggregator<T>> {
    aggregator: Arc<A>,
    stream: MetricStream,
    config: CollectorConfig,
    filter: AttributeSetFilter,
    handles: RwLock<HandleMap<T, A::Accumulator>>,
    collect_state: Mutex<CollectState<A::Accumulation>>,
    overflow_count: AtomicU64,
    overflow_reported: AtomicBool,
    shut_down: AtomicBool,
}

impl<T: Number, A: Aggregator<T>> fmt::Debug for Collector<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("aggregator", &self.aggregator)
            .field("descriptor", &self.stream.descriptor)
            .field("config", &self.config)
            .field("series", &self.read_handles().len())
            .field("overflow_count", &self.overflow_count())
            .finish()
    }
}

impl<T: Number, A: Aggregator<T>> Collector<T, A> {
    /// Creates an empty collector.
    pub fn new(aggregator: Arc<A>, stream: MetricStream, config: CollectorConfig) -> Self {
        Collector {
            filter: AttributeSetFilter::new(config.allowed_attribute_keys.clone()),
            aggregator,
            stream,
            config,
            handles: RwLock::new(HashMap::new()),
            collect_state: Mutex::new(CollectState {
                series: HashMap::new(),
                last_collection_time: None,
            }),
            overflow_count: AtomicU64::new(0),
            overflow_reported: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        }
    }

    /// The configuration this collector was created with.
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    fn read_handles(&self) -> RwLockReadGuard<'_, HandleMap<T, A::Accumulator>> {
        self.handles.read().unwrap_or_else(|err| err.into_inner())
    }

    fn write_handles(&self) -> RwLockWriteGuard<'_, HandleMap<T, A::Accumulator>> {
        self.handles.write().unwrap_or_else(|err| err.into_inner())
    }

    fn lock_state(&self) -> MutexGuard<'_, CollectState<A::Accumulation>> {
        self.collect_state
            .lock()
            .unwrap_or_else(|err| err.into_inner())
    }

    fn is_at_limit(&self, handles: &HandleMap<T, A::Accumulator>) -> bool {
        let overflow = usize::from(handles.contains_key(&*STREAM_OVERFLOW_ATTRIBUTES));
        handles.len() - overflow >= self.config.cardinality_limit
    }

    fn note_overflow(&self) {
        self.overflow_count.fetch_add(1, Ordering::Relaxed);
        if !self.overflow_reported.swap(true, Ordering::Relaxed) {
            otel_warn!(
                name: "Collector.CardinalityLimitReached",
                metric_name = self.stream.descriptor.name(),
                limit = self.config.cardinality_limit as u64,
                message = "Further attribute sets are folded into the overflow series."
            );
        }
    }

    /// Returns the handle for `attributes`, creating it on first use.
    ///
    /// Once the cardinality limit is reached, new attribute sets get the
    /// shared overflow handle instead.
    pub fn get_or_create_handle(
        &self,
        attributes: &AttributeSet,
    ) -> Arc<AggregatorHandle<T, A::Accumulator>> {
        {
            let handles = self.read_handles();
            if let Some(handle) = handles.get(attributes) {
                return Arc::clone(handle);
            }
            if self.is_at_limit(&handles) {
                if let Some(overflow) = handles.get(&*STREAM_OVERFLOW_ATTRIBUTES) {
                    self.note_overflow();
                    return Arc::clone(overflow);
                }
            }
        }

        let mut handles = self.write_handles();
        // Recheck again in case another thread already inserted
        if let Some(handle) = handles.get(attributes) {
            return Arc::clone(handle);
        }
        if !self.is_at_limit(&handles) {
            let handle = Arc::new(self.aggregator.create_handle());
            handles.insert(attributes.clone(), Arc::clone(&handle));
            return handle;
        }

        self.note_overflow();
        let overflow = handles
            .entry(STREAM_OVERFLOW_ATTRIBUTES.clone())
            .or_insert_with(|| Arc::new(self.aggregator.create_handle()));
        Arc::clone(overflow)
    }

    fn accepts_recordings(&self) -> bool {
        if self.shut_down.load(Ordering::Relaxed) {
            otel_debug!(
                name: "Collector.RecordingAfterShutdown",
                metric_name = self.stream.descriptor.name()
            );
            return false;
        }
        true
    }

    /// Records `value` for the series identified by `attributes`, after the
    /// attribute allow-list is applied.
    pub fn record(&self, value: T, attributes: &[KeyValue]) {
        if !self.accepts_recordings() {
            return;
        }
        let set = self.filter.apply(attributes);
        self.get_or_create_handle(&set)
            .record_with_attributes(value, attributes);
    }

    /// Like [`Collector::record`], sampling exemplars against `cx`.
    pub fn record_with_context(&self, value: T, attributes: &[KeyValue], cx: &Context) {
        if !self.accepts_recordings() {
            return;
        }
        let set = self.filter.apply(attributes);
        self.get_or_create_handle(&set)
            .record_with_context(value, attributes, cx);
    }

    /// Number of recordings redirected to the overflow series so far.
    pub fn overflow_count(&self) -> u64 {
        self.overflow_count.load(Ordering::Relaxed)
    }

    /// Number of live handles, the overflow handle included.
    pub fn series_count(&self) -> usize {
        self.read_handles().len()
    }

    /// Drains every handle and returns this cycle's data.
    ///
    /// Cumulative collectors report every series that ever had data, even
    /// when it was idle this cycle. Delta collectors report only series with
    /// recordings since the previous call. Returns `None` when there is
    /// nothing to report.
    pub fn collect(
        &self,
        start_time: SystemTime,
        collection_time: SystemTime,
    ) -> Option<Metric<T>> {
        let mut state = self.lock_state();
        self.collect_locked(&mut state, start_time, collection_time)
    }

    fn collect_locked(
        &self,
        state: &mut CollectState<A::Accumulation>,
        start_time: SystemTime,
        collection_time: SystemTime,
    ) -> Option<Metric<T>> {
        let window = CollectionWindow {
            start_time,
            last_collection_time: state.last_collection_time.unwrap_or(start_time),
            collection_time,
        };
        state.last_collection_time = Some(collection_time);

        let live: Vec<_> = self
            .read_handles()
            .iter()
            .map(|(attrs, handle)| (attrs.clone(), Arc::clone(handle)))
            .collect();

        let mut fresh = HashMap::with_capacity(live.len());
        for (attrs, handle) in live {
            let series = state.series.entry(attrs.clone()).or_default();
            match handle.accumulate_then_reset(&attrs) {
                Some(acc) => {
                    series.idle_cycles = 0;
                    fresh.insert(attrs, acc);
                }
                None => series.idle_cycles = series.idle_cycles.saturating_add(1),
            }
        }

        let evicted = self.evict_idle(state, &mut fresh);

        let output = match self.config.temporality {
            Temporality::Delta => fresh,
            _ => {
                for (attrs, acc) in fresh {
                    let series = state.series.entry(attrs).or_default();
                    series.cumulative = Some(match series.cumulative.take() {
                        Some(previous) => self.aggregator.merge(&previous, &acc),
                        None => acc,
                    });
                }
                state
                    .series
                    .iter()
                    .filter_map(|(attrs, series)| {
                        series
                            .cumulative
                            .as_ref()
                            .map(|acc| (attrs.clone(), acc.clone()))
                    })
                    .collect()
            }
        };

        for attrs in &evicted {
            state.series.remove(attrs);
        }

        if output.is_empty() {
            return None;
        }

        Some(self.aggregator.to_metric_data(
            &self.stream.resource,
            &self.stream.scope,
            &self.stream.descriptor,
            output,
            self.config.temporality,
            &window,
        ))
    }

    /// Removes series idle for at least `max_idle_cycles` that no recorder
    /// currently holds. Late recordings found in the final drain are folded
    /// into `fresh`.
    fn evict_idle(
        &self,
        state: &mut CollectState<A::Accumulation>,
        fresh: &mut HashMap<AttributeSet, A::Accumulation>,
    ) -> Vec<AttributeSet> {
        let Some(max_idle) = self.config.max_idle_cycles else {
            return Vec::new();
        };
        let candidates: Vec<AttributeSet> = state
            .series
            .iter()
            .filter(|(_, series)| series.idle_cycles >= max_idle)
            .map(|(attrs, _)| attrs.clone())
            .collect();
        if candidates.is_empty() {
            return candidates;
        }

        let mut evicted = Vec::with_capacity(candidates.len());
        let mut handles = self.write_handles();
        for attrs in candidates {
            // A recorder still holding the handle may record into it after
            // it is gone from the map.
            let in_use = handles
                .get(&attrs)
                .is_some_and(|handle| Arc::strong_count(handle) > 1);
            if in_use {
                continue;
            }
            if let Some(handle) = handles.remove(&attrs) {
                if let Some(late) = handle.accumulate_then_reset(&attrs) {
                    let merged = match fresh.remove(&attrs) {
                        Some(acc) => self.aggregator.merge(&acc, &late),
                        None => late,
                    };
                    fresh.insert(attrs.clone(), merged);
                }
            }
            evicted.push(attrs);
        }
        drop(handles);

        if !evicted.is_empty() {
            otel_debug!(
                name: "Collector.SeriesEvicted",
                metric_name = self.stream.descriptor.name(),
                count = evicted.len() as u64
            );
        }
        evicted
    }

    /// Collects one final time, then drops every handle and all retained
    /// state. Recordings made afterwards are ignored.
    ///
    /// Returns `None` if there was nothing left to report or the collector
    /// was already shut down.
    pub fn shutdown(
        &self,
        start_time: SystemTime,
        collection_time: SystemTime,
    ) -> Option<Metric<T>> {
        if self.shut_down.swap(true, Ordering::Relaxed) {
            return None;
        }
        let mut state = self.lock_state();
        let last = self.collect_locked(&mut state, start_time, collection_time);
        state.series.clear();
        self.write_handles().clear();

        otel_debug!(
            name: "Collector.Shutdown",
            metric_name = self.stream.descriptor.name()
        );
        last
    }
}
