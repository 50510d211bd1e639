use opentelemetry::{Context, KeyValue};
use rand::Rng;

use super::{ExemplarReservoir, ReservoirCell};
use crate::data::Exemplar;
use crate::{AttributeSet, Number};

/// Keeps a uniform random sample of the measurements offered in one
/// collection cycle (Algorithm R).
#[derive(Debug)]
pub struct FixedSizeReservoir<T> {
    capacity: usize,
    cells: Vec<ReservoirCell<T>>,
    seen: u64,
}

impl<T> FixedSizeReservoir<T> {
    /// A reservoir keeping at most `capacity` exemplars.
    pub fn new(capacity: usize) -> Self {
        FixedSizeReservoir {
            capacity,
            cells: Vec::with_capacity(capacity),
            seen: 0,
        }
    }
}

impl<T: Number> ExemplarReservoir<T> for FixedSizeReservoir<T> {
    fn offer(&mut self, value: T, attributes: &[KeyValue], cx: &Context) {
        self.seen += 1;
        if self.cells.len() < self.capacity {
            self.cells.push(ReservoirCell::new(value, attributes, cx));
            return;
        }

        let slot = rand::rng().random_range(0..self.seen);
        if let Some(cell) = usize::try_from(slot)
            .ok()
            .and_then(|slot| self.cells.get_mut(slot))
        {
            *cell = ReservoirCell::new(value, attributes, cx);
        }
    }

    fn collect_and_reset(&mut self, point_attributes: &AttributeSet) -> Vec<Exemplar<T>> {
        self.seen = 0;
        self.cells
            .drain(..)
            .map(|cell| cell.into_exemplar(point_attributes))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_everything_below_capacity() {
        let mut reservoir = FixedSizeReservoir::new(4);
        for v in 1..=3_u64 {
            reservoir.offer(v, &[], &Context::new());
        }

        let values: Vec<u64> = reservoir
            .collect_and_reset(&AttributeSet::default())
            .into_iter()
            .map(|e| e.value)
            .collect();

        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn stays_bounded_and_resets() {
        let mut reservoir = FixedSizeReservoir::new(4);
        for v in 0..1000_i64 {
            reservoir.offer(v, &[], &Context::new());
        }

        let exemplars = reservoir.collect_and_reset(&AttributeSet::default());
        assert_eq!(exemplars.len(), 4);
        assert!(exemplars.iter().all(|e| (0..1000).contains(&e.value)));

        assert!(reservoir
            .collect_and_reset(&AttributeSet::default())
            .is_empty());
    }
}
