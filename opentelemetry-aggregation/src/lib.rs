//! # OpenTelemetry Metrics Aggregation
//!
//! The aggregation engine behind an OpenTelemetry metrics SDK. Application
//! threads record raw measurements into per-attribute-set
//! [`AggregatorHandle`]s; once per collection cycle a reader drains every
//! handle through its [`Collector`], reconciles the result with the reader's
//! [`Temporality`] and receives [`data::Metric`]s ready for export.
//!
//! The building blocks are:
//!
//! - [`Aggregator`]s, one per metric kind ([`SumAggregator`],
//!   [`MinMaxSumCountAggregator`], [`HistogramAggregator`],
//!   [`LastValueAggregator`]). They create handles and know how to merge,
//!   diff and export accumulations.
//! - [`AggregatorHandle`], the thread-safe cell measurements are folded into.
//! - [`exemplar`] reservoirs that sample raw measurements alongside the
//!   aggregated value.
//! - [`Collector`], owning the attribute set to handle map for one
//!   instrument and one reader.
//! - [`InstrumentStorage`], fanning one instrument out to every registered
//!   reader.
//!
//! ## Example
//!
//! ```
//! use opentelemetry::{InstrumentationScope, KeyValue};
//! use opentelemetry_aggregation::{
//!     data::MetricData, Aggregation, CollectorConfig, ExemplarFilter, InstrumentStorage,
//!     MetricDescriptor, MetricStream, Resource, Temporality,
//! };
//! use std::time::SystemTime;
//!
//! let stream = MetricStream::new(
//!     Resource::builder().with_attribute(KeyValue::new("service.name", "demo")).build(),
//!     InstrumentationScope::builder("my_app").build(),
//!     MetricDescriptor::new("requests").with_unit("1"),
//! );
//! let delta = CollectorConfig::builder()
//!     .with_temporality(Temporality::Delta)
//!     .build()
//!     .unwrap();
//!
//! let storage = InstrumentStorage::<u64>::new(
//!     stream,
//!     Aggregation::Sum { monotonic: true },
//!     ExemplarFilter::TraceBased,
//!     vec![delta],
//! )
//! .unwrap();
//!
//! storage.record(10, &[KeyValue::new("route", "/")]);
//!
//! let start = SystemTime::now();
//! let metric = storage.collect(0, start, SystemTime::now()).unwrap();
//! if let MetricData::Sum(sum) = metric.data {
//!     assert_eq!(sum.data_points[0].value, 10);
//! }
//! ```
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/open-telemetry/opentelemetry-rust/main/assets/logo.svg"
)]

mod aggregation;
mod aggregator;
mod attributes;
mod collector;
pub mod data;
mod descriptor;
mod error;
pub mod exemplar;
mod number;
pub mod resource;
mod storage;
mod temporality;

pub use aggregation::{Aggregation, DEFAULT_HISTOGRAM_BOUNDARIES};
pub use aggregator::{
    Accumulator, Aggregator, AggregatorHandle, HistogramAccumulation, HistogramAccumulator,
    HistogramAggregator, LastValueAccumulation, LastValueAccumulator, LastValueAggregator,
    MinMaxSumCountAccumulation, MinMaxSumCountAccumulator, MinMaxSumCountAggregator,
    SumAccumulation, SumAccumulator, SumAggregator,
};
pub use attributes::{AttributeSet, STREAM_OVERFLOW_ATTRIBUTES};
pub use collector::{Collector, CollectorConfig, CollectorConfigBuilder};
pub use descriptor::{MetricDescriptor, MetricStream};
pub use error::{MetricError, MetricResult};
pub use exemplar::{ExemplarFilter, ExemplarReservoir, ReservoirFactory};
pub use number::Number;
pub use resource::{Resource, ResourceBuilder};
pub use storage::InstrumentStorage;
pub use temporality::{CollectionWindow, Temporality};
