use std::result;
use thiserror::Error;

/// A specialized `Result` type for metric aggregation operations.
pub type MetricResult<T> = result::Result<T, MetricError>;

/// Errors returned while configuring the aggregation engine.
///
/// Recording and collecting never fail; only the construction of
/// aggregators, collectors and instrument storage can.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MetricError {
    /// Invalid configuration
    #[error("Config error {0}")]
    Config(String),
}
