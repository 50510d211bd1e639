use std::borrow::Cow;

use opentelemetry::InstrumentationScope;

use crate::Resource;

/// Describes the instrument a stream of metric data is produced for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricDescriptor {
    /// The name of the instrument.
    pub name: Cow<'static, str>,
    /// The description of the instrument, which can be used in documentation.
    pub description: Cow<'static, str>,
    /// The unit in which the instrument reports.
    pub unit: Cow<'static, str>,
}

impl MetricDescriptor {
    /// Create a descriptor with the given name and empty description and unit.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        MetricDescriptor {
            name: name.into(),
            description: Cow::Borrowed(""),
            unit: Cow::Borrowed(""),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the unit.
    pub fn with_unit(mut self, unit: impl Into<Cow<'static, str>>) -> Self {
        self.unit = unit.into();
        self
    }

    /// The name of the instrument.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The identity every exported metric of one instrument is stamped with.
#[derive(Debug, Clone)]
pub struct MetricStream {
    /// The entity producing telemetry.
    pub resource: Resource,
    /// The instrumentation scope the instrument belongs to.
    pub scope: InstrumentationScope,
    /// The instrument itself.
    pub descriptor: MetricDescriptor,
}

impl MetricStream {
    /// Bundle a resource, scope and descriptor.
    pub fn new(
        resource: Resource,
        scope: InstrumentationScope,
        descriptor: MetricDescriptor,
    ) -> Self {
        MetricStream {
            resource,
            scope,
            descriptor,
        }
    }
}
