//! Aggregators and the per-attribute-set handles they create.
//!
//! An [`Aggregator`] is a stateless strategy describing one kind of
//! aggregation. It hands out [`AggregatorHandle`]s, each wrapping an
//! [`Accumulator`] that measurements are folded into, and knows how to
//! combine the immutable accumulations those handles produce.

mod handle;
mod histogram;
mod last_value;
mod min_max_sum_count;
mod sum;

pub use handle::AggregatorHandle;
pub use histogram::{HistogramAccumulation, HistogramAccumulator, HistogramAggregator};
pub use last_value::{LastValueAccumulation, LastValueAccumulator, LastValueAggregator};
pub use min_max_sum_count::{
    MinMaxSumCountAccumulation, MinMaxSumCountAccumulator, MinMaxSumCountAggregator,
};
pub use sum::{SumAccumulation, SumAccumulator, SumAggregator};

use std::collections::HashMap;
use std::fmt;

use opentelemetry::InstrumentationScope;

use crate::data::{Exemplar, Metric};
use crate::{AttributeSet, CollectionWindow, MetricDescriptor, Number, Resource, Temporality};

/// The mutable, in-progress state of one attribute set.
///
/// Accumulators are only ever touched under their handle's lock.
pub trait Accumulator<T: Number>: fmt::Debug + Send + 'static {
    /// The immutable snapshot this accumulator produces.
    type Accumulation;

    /// Folds one measurement in.
    fn record(&mut self, value: T);

    /// Returns a snapshot of everything recorded since the last reset,
    /// carrying `exemplars`, and restores the identity state.
    fn accumulate_then_reset(&mut self, exemplars: Vec<Exemplar<T>>) -> Self::Accumulation;
}

/// Forms and combines the aggregations of one metric kind.
pub trait Aggregator<T: Number>: fmt::Debug + Send + Sync + 'static {
    /// The immutable result of one collection cycle for one attribute set.
    type Accumulation: Clone + fmt::Debug + PartialEq + Send + Sync + 'static;

    /// The mutable state wrapped by this aggregator's handles.
    type Accumulator: Accumulator<T, Accumulation = Self::Accumulation>;

    /// Creates a handle in the identity state, with its own exemplar
    /// reservoir when the aggregator is configured with one.
    fn create_handle(&self) -> AggregatorHandle<T, Self::Accumulator>;

    /// Combines two accumulations of the same attribute set.
    ///
    /// Numeric fields merge commutatively and associatively. The exemplars
    /// of `current` are kept.
    fn merge(
        &self,
        previous: &Self::Accumulation,
        current: &Self::Accumulation,
    ) -> Self::Accumulation;

    /// Computes the change between two cumulative accumulations.
    ///
    /// Minimum and maximum cannot be subtracted; they are taken from
    /// `current` as is.
    fn diff(
        &self,
        previous: &Self::Accumulation,
        current: &Self::Accumulation,
    ) -> Self::Accumulation;

    /// Converts one cycle's accumulations into exportable metric data, one
    /// data point per attribute set.
    fn to_metric_data(
        &self,
        resource: &Resource,
        scope: &InstrumentationScope,
        descriptor: &MetricDescriptor,
        accumulations: HashMap<AttributeSet, Self::Accumulation>,
        temporality: Temporality,
        window: &CollectionWindow,
    ) -> Metric<T>;
}
