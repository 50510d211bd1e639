use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::sync::{Mutex, MutexGuard};

use opentelemetry::{Context, KeyValue};

use super::Accumulator;
use crate::exemplar::FilteredReservoir;
use crate::{AttributeSet, Number};

struct HandleState<T, S> {
    accumulator: S,
    has_recordings: bool,
    reservoir: Option<FilteredReservoir<T>>,
}

/// The thread-safe cell measurements for one attribute set are folded into.
///
/// Recording and draining both take one exclusive lock, so a snapshot never
/// observes a half-applied measurement and no measurement is lost between
/// a snapshot and the reset that follows it.
pub struct AggregatorHandle<T, S> {
    state: Mutex<HandleState<T, S>>,
    samples_exemplars: bool,
    _marker: PhantomData<fn(T)>,
}

impl<T, S> fmt::Debug for AggregatorHandle<T, S>
where
    T: Number,
    S: Accumulator<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("AggregatorHandle")
            .field("accumulator", &state.accumulator)
            .field("has_recordings", &state.has_recordings)
            .field("samples_exemplars", &self.samples_exemplars)
            .finish()
    }
}

impl<T, S> AggregatorHandle<T, S>
where
    T: Number,
    S: Accumulator<T>,
{
    pub(crate) fn new(accumulator: S, reservoir: Option<FilteredReservoir<T>>) -> Self {
        AggregatorHandle {
            samples_exemplars: reservoir.is_some(),
            state: Mutex::new(HandleState {
                accumulator,
                has_recordings: false,
                reservoir,
            }),
            _marker: PhantomData,
        }
    }

    // Folding a measurement never panics because integer sums and counts
    // wrap. A lock poisoned by a panicking reservoir still guards a
    // consistent accumulator.
    fn lock(&self) -> MutexGuard<'_, HandleState<T, S>> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Folds `value` in. The current context is only consulted when the
    /// handle samples exemplars.
    pub fn record(&self, value: T) {
        self.record_with_attributes(value, &[]);
    }

    /// Folds `value` in, keeping `attributes` for exemplar sampling.
    pub fn record_with_attributes(&self, value: T, attributes: &[KeyValue]) {
        if self.samples_exemplars {
            self.record_with_context(value, attributes, &Context::current());
        } else {
            let mut state = self.lock();
            state.accumulator.record(value);
            state.has_recordings = true;
        }
    }

    /// Folds `value` in, offering it to the exemplar reservoir along with
    /// `attributes` and the span found in `cx`.
    pub fn record_with_context(&self, value: T, attributes: &[KeyValue], cx: &Context) {
        let mut state = self.lock();
        state.accumulator.record(value);
        state.has_recordings = true;
        if let Some(reservoir) = state.reservoir.as_mut() {
            reservoir.offer(value, attributes, cx);
        }
    }

    /// Returns everything recorded since the previous call and resets the
    /// handle to its identity state, or `None` if nothing was recorded.
    ///
    /// `attributes` are the attributes of the series the handle belongs to;
    /// they are stripped from the exemplars drained with the accumulation.
    pub fn accumulate_then_reset(&self, attributes: &AttributeSet) -> Option<S::Accumulation> {
        let mut state = self.lock();
        if !mem::take(&mut state.has_recordings) {
            return None;
        }

        let exemplars = state
            .reservoir
            .as_mut()
            .map(|reservoir| reservoir.collect_and_reset(attributes))
            .unwrap_or_default();
        Some(state.accumulator.accumulate_then_reset(exemplars))
    }

    /// Returns `true` if a measurement was recorded since the last reset.
    pub fn has_recordings(&self) -> bool {
        self.lock().has_recordings
    }
}
