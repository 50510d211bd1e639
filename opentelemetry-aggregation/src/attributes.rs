use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use opentelemetry::{Key, KeyValue, Value};

/// The attribute set all recordings beyond a collector's cardinality limit
/// are folded into.
pub static STREAM_OVERFLOW_ATTRIBUTES: LazyLock<AttributeSet> =
    LazyLock::new(|| AttributeSet::from(&[KeyValue::new("otel.metric.overflow", true)][..]));

/// A unique set of attributes that can be used as instrument identifiers.
///
/// Attributes are sorted by key and de-duplicated (the last value recorded
/// for a key wins), so two sets built from the same pairs in a different
/// order are equal and hash the same. The hash is computed once when the set
/// is created.
#[derive(Clone, Default, Debug)]
pub struct AttributeSet(Vec<KeyValue>, u64);

impl From<&[KeyValue]> for AttributeSet {
    fn from(values: &[KeyValue]) -> Self {
        let mut seen_keys = HashSet::with_capacity(values.len());
        let vec = values
            .iter()
            .rev()
            .filter(|kv| seen_keys.insert(kv.key.clone()))
            .cloned()
            .collect::<Vec<_>>();

        AttributeSet::new(vec)
    }
}

fn calculate_hash(values: &[KeyValue]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for item in values {
        item.key.hash(&mut hasher);
        hash_value(&item.value, &mut hasher);
    }
    hasher.finish()
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Bool(b) => b.hash(state),
        Value::I64(i) => i.hash(state),
        Value::F64(f) => f.to_bits().hash(state),
        Value::String(s) => s.as_str().hash(state),
        other => other.as_str().hash(state),
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::F64(x), Value::F64(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

impl AttributeSet {
    fn new(mut values: Vec<KeyValue>) -> Self {
        values.sort_unstable_by(|a, b| a.key.cmp(&b.key));
        let hash = calculate_hash(&values);
        AttributeSet(values, hash)
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if the set holds an attribute with the given key.
    pub fn contains_key(&self, key: &Key) -> bool {
        self.0.binary_search_by(|kv| kv.key.cmp(key)).is_ok()
    }

    /// Retains only the attributes specified by the predicate.
    pub fn retain<F>(&mut self, f: F)
    where
        F: Fn(&KeyValue) -> bool,
    {
        self.0.retain(|kv| f(kv));

        // Recalculate the hash as elements are changed.
        self.1 = calculate_hash(&self.0);
    }

    /// Iterate over key value pairs in the set
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.0.iter().map(|kv| (&kv.key, &kv.value))
    }

    /// Returns the attributes as a sorted slice.
    pub fn as_slice(&self) -> &[KeyValue] {
        &self.0
    }

    /// Consumes the set, returning the sorted attributes.
    pub fn into_vec(self) -> Vec<KeyValue> {
        self.0
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        self.1 == other.1
            && self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.key == b.key && value_eq(&a.value, &b.value))
    }
}

impl Eq for AttributeSet {}

impl Hash for AttributeSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.1)
    }
}

/// Applies an allow-list of attribute keys to recorded attributes.
/// No-op when no allow-list is configured.
#[derive(Clone, Debug, Default)]
pub(crate) struct AttributeSetFilter {
    allowed_keys: Option<Arc<HashSet<Key>>>,
}

impl AttributeSetFilter {
    pub(crate) fn new(allowed_keys: Option<Arc<HashSet<Key>>>) -> Self {
        Self { allowed_keys }
    }

    pub(crate) fn apply(&self, attrs: &[KeyValue]) -> AttributeSet {
        let mut set = AttributeSet::from(attrs);
        if let Some(allowed) = &self.allowed_keys {
            set.retain(|kv| allowed.contains(&kv.key));
        }
        set
    }
}
