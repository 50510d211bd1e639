use std::time::{Duration, SystemTime};

use opentelemetry_aggregation::exemplar::ReservoirFactory;
use opentelemetry_aggregation::{
    Aggregator, AttributeSet, HistogramAggregator, LastValueAccumulation, LastValueAggregator,
    MinMaxSumCountAggregator, Number, SumAggregator,
};
use proptest::prelude::*;

const BOUNDARIES: [f64; 3] = [0.0, 10.0, 100.0];

fn integers() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-1_000_000_i64..1_000_000, 1..20)
}

// Quarters of bounded integers add up exactly, so float sums can be
// compared for equality whatever the order of addition.
fn floats() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(
        (-1_000_000_i32..1_000_000).prop_map(|v| f64::from(v) / 4.0),
        1..20,
    )
}

fn last_value() -> impl Strategy<Value = LastValueAccumulation<f64>> {
    // Few distinct timestamps so ties are common.
    (-100_i32..100, 0_u64..4).prop_map(|(value, secs)| LastValueAccumulation {
        value: f64::from(value),
        recorded_at: SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
        exemplars: vec![],
    })
}

fn accumulate<T: Number, A: Aggregator<T>>(aggregator: &A, values: &[T]) -> A::Accumulation {
    let handle = aggregator.create_handle();
    values.iter().for_each(|v| handle.record(*v));
    handle
        .accumulate_then_reset(&AttributeSet::default())
        .unwrap()
}

fn histogram<T: Number>() -> HistogramAggregator<T> {
    HistogramAggregator::new(BOUNDARIES.to_vec(), true, ReservoirFactory::none()).unwrap()
}

fn check_merge_algebra<T: Number, A: Aggregator<T>>(
    aggregator: &A,
    a: &[T],
    b: &[T],
    c: &[T],
) -> Result<(), TestCaseError> {
    let (a, b, c) = (
        accumulate(aggregator, a),
        accumulate(aggregator, b),
        accumulate(aggregator, c),
    );

    prop_assert_eq!(aggregator.merge(&a, &b), aggregator.merge(&b, &a));
    prop_assert_eq!(
        aggregator.merge(&aggregator.merge(&a, &b), &c),
        aggregator.merge(&a, &aggregator.merge(&b, &c))
    );
    Ok(())
}

proptest! {
    #[test]
    fn integer_sum_merge(a in integers(), b in integers(), c in integers()) {
        let aggregator = SumAggregator::<i64>::new(false, ReservoirFactory::none());
        check_merge_algebra(&aggregator, &a, &b, &c)?;
    }

    #[test]
    fn float_sum_merge(a in floats(), b in floats(), c in floats()) {
        let aggregator = SumAggregator::<f64>::new(false, ReservoirFactory::none());
        check_merge_algebra(&aggregator, &a, &b, &c)?;
    }

    #[test]
    fn integer_mmsc_merge(a in integers(), b in integers(), c in integers()) {
        let aggregator = MinMaxSumCountAggregator::<i64>::new(ReservoirFactory::none());
        check_merge_algebra(&aggregator, &a, &b, &c)?;
    }

    #[test]
    fn float_mmsc_merge(a in floats(), b in floats(), c in floats()) {
        let aggregator = MinMaxSumCountAggregator::<f64>::new(ReservoirFactory::none());
        check_merge_algebra(&aggregator, &a, &b, &c)?;
    }

    #[test]
    fn mmsc_merge_equals_recording_everything(a in integers(), b in integers()) {
        let aggregator = MinMaxSumCountAggregator::<i64>::new(ReservoirFactory::none());
        let all: Vec<i64> = a.iter().chain(&b).copied().collect();

        prop_assert_eq!(
            aggregator.merge(&accumulate(&aggregator, &a), &accumulate(&aggregator, &b)),
            accumulate(&aggregator, &all)
        );
    }

    #[test]
    fn integer_histogram_merge(a in integers(), b in integers(), c in integers()) {
        check_merge_algebra(&histogram::<i64>(), &a, &b, &c)?;
    }

    #[test]
    fn float_histogram_merge(a in floats(), b in floats(), c in floats()) {
        check_merge_algebra(&histogram::<f64>(), &a, &b, &c)?;
    }

    #[test]
    fn histogram_diff_undoes_merge(a in integers(), b in integers()) {
        let aggregator = histogram::<i64>();
        let (a, b) = (accumulate(&aggregator, &a), accumulate(&aggregator, &b));
        let merged = aggregator.merge(&a, &b);
        let delta = aggregator.diff(&a, &merged);

        prop_assert_eq!(delta.bucket_counts, b.bucket_counts);
        prop_assert_eq!(delta.count, b.count);
        prop_assert_eq!(delta.sum, b.sum);
    }

    #[test]
    fn last_value_merge(a in last_value(), b in last_value(), c in last_value()) {
        let aggregator = LastValueAggregator::<f64>::new(ReservoirFactory::none());

        prop_assert_eq!(aggregator.merge(&a, &b), aggregator.merge(&b, &a));
        prop_assert_eq!(
            aggregator.merge(&aggregator.merge(&a, &b), &c),
            aggregator.merge(&a, &aggregator.merge(&b, &c))
        );
    }
}
