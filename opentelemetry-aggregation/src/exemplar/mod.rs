//! Exemplar sampling.
//!
//! An exemplar is a raw measurement kept alongside an aggregated value,
//! together with the trace it was recorded in. Every [`AggregatorHandle`]
//! may own one reservoir; the reservoir is offered each measurement the
//! [`ExemplarFilter`] lets through and is drained together with the
//! accumulation at collection time.
//!
//! [`AggregatorHandle`]: crate::AggregatorHandle

mod fixed_size;
mod histogram_bucket;

pub use fixed_size::FixedSizeReservoir;
pub use histogram_bucket::AlignedHistogramBucketReservoir;

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, KeyValue};

use crate::data::Exemplar;
use crate::{AttributeSet, MetricError, MetricResult, Number};

/// Decides which measurements are offered to a reservoir.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExemplarFilter {
    /// Offer every measurement.
    AlwaysOn,
    /// Never offer a measurement.
    AlwaysOff,
    /// Offer measurements recorded inside a sampled span.
    #[default]
    TraceBased,
}

impl ExemplarFilter {
    /// Returns `true` if a measurement recorded in `cx` should be offered.
    pub fn should_sample(&self, cx: &Context) -> bool {
        match self {
            ExemplarFilter::AlwaysOn => true,
            ExemplarFilter::AlwaysOff => false,
            ExemplarFilter::TraceBased => cx.span().span_context().is_sampled(),
        }
    }
}

/// A bounded store of sampled measurements.
///
/// Implementations are driven under the owning handle's lock, so they need
/// no synchronization of their own.
pub trait ExemplarReservoir<T>: fmt::Debug + Send + 'static {
    /// Offers a measurement. The reservoir decides whether to keep it.
    fn offer(&mut self, value: T, attributes: &[KeyValue], cx: &Context);

    /// Returns the kept exemplars and empties the reservoir.
    ///
    /// `point_attributes` are the attributes of the data point the exemplars
    /// belong to; they are removed from every exemplar's filtered attributes.
    fn collect_and_reset(&mut self, point_attributes: &AttributeSet) -> Vec<Exemplar<T>>;
}

/// A measurement kept by a reservoir, before it is turned into an
/// [`Exemplar`].
#[derive(Debug, Clone)]
pub(crate) struct ReservoirCell<T> {
    value: T,
    time: SystemTime,
    attributes: Vec<KeyValue>,
    span_id: [u8; 8],
    trace_id: [u8; 16],
}

impl<T: Number> ReservoirCell<T> {
    pub(crate) fn new(value: T, attributes: &[KeyValue], cx: &Context) -> Self {
        let span = cx.span();
        let span_context = span.span_context();
        let (span_id, trace_id) = if span_context.is_valid() && span_context.is_sampled() {
            (
                span_context.span_id().to_bytes(),
                span_context.trace_id().to_bytes(),
            )
        } else {
            ([0; 8], [0; 16])
        };

        ReservoirCell {
            value,
            time: opentelemetry::time::now(),
            attributes: attributes.to_vec(),
            span_id,
            trace_id,
        }
    }

    pub(crate) fn into_exemplar(self, point_attributes: &AttributeSet) -> Exemplar<T> {
        let filtered_attributes = self
            .attributes
            .into_iter()
            .filter(|kv| !point_attributes.contains_key(&kv.key))
            .collect();

        Exemplar {
            filtered_attributes,
            time: self.time,
            value: self.value,
            span_id: self.span_id,
            trace_id: self.trace_id,
        }
    }
}

type CustomReservoirFn<T> = Arc<dyn Fn() -> Box<dyn ExemplarReservoir<T>> + Send + Sync>;

#[derive(Clone)]
enum ReservoirKind<T> {
    None,
    FixedSize(usize),
    AlignedHistogramBucket(Arc<[f64]>),
    Custom(CustomReservoirFn<T>),
}

/// Creates one reservoir per handle.
#[derive(Clone)]
pub struct ReservoirFactory<T> {
    filter: ExemplarFilter,
    kind: ReservoirKind<T>,
}

impl<T> fmt::Debug for ReservoirFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            ReservoirKind::None => "None".to_string(),
            ReservoirKind::FixedSize(size) => format!("FixedSize({size})"),
            ReservoirKind::AlignedHistogramBucket(b) => {
                format!("AlignedHistogramBucket({} boundaries)", b.len())
            }
            ReservoirKind::Custom(_) => "Custom".to_string(),
        };
        f.debug_struct("ReservoirFactory")
            .field("filter", &self.filter)
            .field("kind", &kind)
            .finish()
    }
}

impl<T: Number> ReservoirFactory<T> {
    /// Handles get no reservoir and never sample exemplars.
    pub fn none() -> Self {
        ReservoirFactory {
            filter: ExemplarFilter::AlwaysOff,
            kind: ReservoirKind::None,
        }
    }

    /// Each handle keeps a uniform random sample of at most `size`
    /// measurements per collection cycle.
    pub fn fixed_size(filter: ExemplarFilter, size: usize) -> MetricResult<Self> {
        if size == 0 {
            return Err(MetricError::Config(
                "exemplar reservoir size must be greater than zero".into(),
            ));
        }
        Ok(ReservoirFactory {
            filter,
            kind: ReservoirKind::FixedSize(size),
        })
    }

    /// Each handle keeps the last measurement that fell into every
    /// histogram bucket delimited by `boundaries`.
    pub fn aligned_histogram_buckets(filter: ExemplarFilter, boundaries: Arc<[f64]>) -> Self {
        ReservoirFactory {
            filter,
            kind: ReservoirKind::AlignedHistogramBucket(boundaries),
        }
    }

    /// Each handle gets the reservoir returned by `create`.
    pub fn custom<F>(filter: ExemplarFilter, create: F) -> Self
    where
        F: Fn() -> Box<dyn ExemplarReservoir<T>> + Send + Sync + 'static,
    {
        ReservoirFactory {
            filter,
            kind: ReservoirKind::Custom(Arc::new(create)),
        }
    }

    /// The filter reservoirs created by this factory apply.
    pub fn filter(&self) -> ExemplarFilter {
        self.filter
    }

    pub(crate) fn create(&self) -> Option<FilteredReservoir<T>> {
        if self.filter == ExemplarFilter::AlwaysOff {
            return None;
        }
        let reservoir: Box<dyn ExemplarReservoir<T>> = match &self.kind {
            ReservoirKind::None => return None,
            ReservoirKind::FixedSize(size) => Box::new(FixedSizeReservoir::new(*size)),
            ReservoirKind::AlignedHistogramBucket(boundaries) => {
                Box::new(AlignedHistogramBucketReservoir::new(Arc::clone(boundaries)))
            }
            ReservoirKind::Custom(create) => create(),
        };
        Some(FilteredReservoir {
            filter: self.filter,
            reservoir,
        })
    }
}

/// A reservoir together with the filter deciding what reaches it.
#[derive(Debug)]
pub(crate) struct FilteredReservoir<T> {
    filter: ExemplarFilter,
    reservoir: Box<dyn ExemplarReservoir<T>>,
}

impl<T: Number> FilteredReservoir<T> {
    pub(crate) fn offer(&mut self, value: T, attributes: &[KeyValue], cx: &Context) {
        if self.filter.should_sample(cx) {
            self.reservoir.offer(value, attributes, cx);
        }
    }

    pub(crate) fn collect_and_reset(
        &mut self,
        point_attributes: &AttributeSet,
    ) -> Vec<Exemplar<T>> {
        self.reservoir.collect_and_reset(point_attributes)
    }
}
