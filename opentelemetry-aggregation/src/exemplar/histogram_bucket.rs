use std::sync::Arc;

use opentelemetry::{Context, KeyValue};

use super::{ExemplarReservoir, ReservoirCell};
use crate::data::Exemplar;
use crate::{AttributeSet, Number};

/// Keeps the last measurement offered for every bucket of an explicit
/// bucket histogram, so exemplars line up with the exported buckets.
#[derive(Debug)]
pub struct AlignedHistogramBucketReservoir<T> {
    boundaries: Arc<[f64]>,
    cells: Vec<Option<ReservoirCell<T>>>,
}

impl<T> AlignedHistogramBucketReservoir<T> {
    /// A reservoir with one cell per bucket delimited by `boundaries`.
    pub fn new(boundaries: Arc<[f64]>) -> Self {
        let cells = std::iter::repeat_with(|| None)
            .take(boundaries.len() + 1)
            .collect();
        AlignedHistogramBucketReservoir { boundaries, cells }
    }
}

impl<T: Number> ExemplarReservoir<T> for AlignedHistogramBucketReservoir<T> {
    fn offer(&mut self, value: T, attributes: &[KeyValue], cx: &Context) {
        let f = value.into_float();
        let index = self.boundaries.partition_point(|&b| b <= f);
        if let Some(cell) = self.cells.get_mut(index) {
            *cell = Some(ReservoirCell::new(value, attributes, cx));
        }
    }

    fn collect_and_reset(&mut self, point_attributes: &AttributeSet) -> Vec<Exemplar<T>> {
        self.cells
            .iter_mut()
            .filter_map(Option::take)
            .map(|cell| cell.into_exemplar(point_attributes))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_measurement_per_bucket_wins() {
        let mut reservoir = AlignedHistogramBucketReservoir::new(Arc::from(vec![10.0, 20.0]));
        let cx = Context::new();

        reservoir.offer(1.0, &[], &cx);
        reservoir.offer(5.0, &[], &cx);
        reservoir.offer(10.0, &[], &cx);
        reservoir.offer(25.0, &[], &cx);

        let values: Vec<f64> = reservoir
            .collect_and_reset(&AttributeSet::default())
            .into_iter()
            .map(|e| e.value)
            .collect();

        assert_eq!(values, vec![5.0, 10.0, 25.0]);
        assert!(reservoir
            .collect_and_reset(&AttributeSet::default())
            .is_empty());
    }
}
