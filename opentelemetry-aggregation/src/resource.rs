//! The entity producing telemetry.
//!
//! A [Resource] is an immutable set of attributes describing who emits the
//! metrics, for example a service name and version. The aggregation engine
//! never inspects it; it is carried onto every exported [`Metric`].
//!
//! [`Metric`]: crate::data::Metric

use opentelemetry::{Key, KeyValue, Value};
use std::borrow::Cow;
use std::collections::{hash_map, HashMap};
use std::sync::Arc;

#[derive(Debug, Default, PartialEq)]
struct ResourceInner {
    attrs: HashMap<Key, Value>,
    schema_url: Option<Cow<'static, str>>,
}

/// Attributes identifying the producer of the metrics, shared cheaply
/// between every metric that carries them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resource {
    inner: Arc<ResourceInner>,
}

impl Resource {
    /// Creates a [ResourceBuilder] starting from an empty resource.
    pub fn builder() -> ResourceBuilder {
        ResourceBuilder::default()
    }

    /// Creates an empty resource.
    pub fn empty() -> Self {
        Resource::default()
    }

    /// Return the schema url of the resource, if any.
    pub fn schema_url(&self) -> Option<&str> {
        self.inner.schema_url.as_deref()
    }

    /// Returns the number of attributes for this resource
    pub fn len(&self) -> usize {
        self.inner.attrs.len()
    }

    /// Returns `true` if the resource contains no attributes.
    pub fn is_empty(&self) -> bool {
        self.inner.attrs.is_empty()
    }

    /// Gets an iterator over the attributes of this resource.
    pub fn iter(&self) -> Iter<'_> {
        Iter(self.inner.attrs.iter())
    }

    /// Retrieve the value from resource associate with given key.
    pub fn get(&self, key: &Key) -> Option<Value> {
        self.inner.attrs.get(key).cloned()
    }
}

/// An iterator over the entries of a `Resource`.
#[derive(Debug)]
pub struct Iter<'a>(hash_map::Iter<'a, Key, Value>);

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Key, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl<'a> IntoIterator for &'a Resource {
    type Item = (&'a Key, &'a Value);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Builder for [Resource]
#[derive(Debug, Default)]
pub struct ResourceBuilder {
    attrs: HashMap<Key, Value>,
    schema_url: Option<Cow<'static, str>>,
}

impl ResourceBuilder {
    /// Add a [KeyValue] to the resource.
    pub fn with_attribute(self, kv: KeyValue) -> Self {
        self.with_attributes([kv])
    }

    /// Add multiple [KeyValue]s to the resource. Later values win.
    pub fn with_attributes<T: IntoIterator<Item = KeyValue>>(mut self, kvs: T) -> Self {
        self.attrs
            .extend(kvs.into_iter().map(|kv| (kv.key, kv.value)));
        self
    }

    /// Set the schema url the attributes follow. An empty url clears it.
    pub fn with_schema_url<S: Into<Cow<'static, str>>>(mut self, schema_url: S) -> Self {
        let schema_url = schema_url.into();
        self.schema_url = (!schema_url.is_empty()).then_some(schema_url);
        self
    }

    /// Create a [Resource] with the options provided to the [ResourceBuilder].
    pub fn build(self) -> Resource {
        Resource {
            inner: Arc::new(ResourceInner {
                attrs: self.attrs,
                schema_url: self.schema_url,
            }),
        }
    }
}
