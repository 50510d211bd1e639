use std::thread;
use std::time::{Duration, SystemTime};

use opentelemetry::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState};
use opentelemetry::{Context, InstrumentationScope, Key, KeyValue, Value};
use opentelemetry_aggregation::data::{Metric, MetricData};
use opentelemetry_aggregation::{
    Aggregation, CollectorConfig, ExemplarFilter, InstrumentStorage, MetricDescriptor,
    MetricStream, Resource, Temporality,
};

fn stream(name: &'static str) -> MetricStream {
    MetricStream::new(
        Resource::builder()
            .with_attribute(KeyValue::new("service.name", "checkout"))
            .build(),
        InstrumentationScope::builder("integration").build(),
        MetricDescriptor::new(name)
            .with_description("integration test instrument")
            .with_unit("1"),
    )
}

fn reader(temporality: Temporality) -> CollectorConfig {
    CollectorConfig::builder()
        .with_temporality(temporality)
        .build()
        .unwrap()
}

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn sum_value(metric: &Metric<u64>, route: &'static str) -> Option<u64> {
    let MetricData::Sum(sum) = &metric.data else {
        panic!("expected a sum, got {:?}", metric.data);
    };
    let attrs = vec![KeyValue::new("route", route)];
    sum.data_points
        .iter()
        .find(|p| p.attributes == attrs)
        .map(|p| p.value)
}

#[test]
fn readers_see_their_own_temporality() {
    let storage = InstrumentStorage::<u64>::new(
        stream("requests"),
        Aggregation::Sum { monotonic: true },
        ExemplarFilter::AlwaysOff,
        vec![reader(Temporality::Cumulative), reader(Temporality::Delta)],
    )
    .unwrap();
    let (cumulative, delta) = (0, 1);

    storage.record(2, &[KeyValue::new("route", "/a")]);
    storage.record(3, &[KeyValue::new("route", "/b")]);

    let first_cumulative = storage.collect(cumulative, at(0), at(10)).unwrap();
    let first_delta = storage.collect(delta, at(0), at(10)).unwrap();
    assert_eq!(sum_value(&first_cumulative, "/a"), Some(2));
    assert_eq!(sum_value(&first_delta, "/a"), Some(2));

    storage.record(5, &[KeyValue::new("route", "/a")]);

    let second_cumulative = storage.collect(cumulative, at(0), at(20)).unwrap();
    assert_eq!(sum_value(&second_cumulative, "/a"), Some(7));
    assert_eq!(sum_value(&second_cumulative, "/b"), Some(3));

    let second_delta = storage.collect(delta, at(0), at(20)).unwrap();
    assert_eq!(sum_value(&second_delta, "/a"), Some(5));
    assert_eq!(sum_value(&second_delta, "/b"), None);

    assert_eq!(
        second_cumulative.resource.get(&Key::new("service.name")),
        Some(Value::from("checkout"))
    );
    assert_eq!(second_cumulative.descriptor.unit, "1");
}

#[test]
fn a_slow_reader_does_not_lose_data() {
    let storage = InstrumentStorage::<u64>::new(
        stream("requests"),
        Aggregation::Sum { monotonic: true },
        ExemplarFilter::AlwaysOff,
        vec![reader(Temporality::Delta), reader(Temporality::Delta)],
    )
    .unwrap();

    storage.record(1, &[KeyValue::new("route", "/")]);
    storage.collect(0, at(0), at(1));
    storage.record(1, &[KeyValue::new("route", "/")]);

    // Reader 1 never collected, so it sees both recordings at once.
    let metric = storage.collect(1, at(0), at(2)).unwrap();
    assert_eq!(sum_value(&metric, "/"), Some(2));
}

#[test]
fn histogram_end_to_end() {
    let storage = InstrumentStorage::<f64>::new(
        stream("latency"),
        Aggregation::default_histogram(),
        ExemplarFilter::AlwaysOff,
        vec![reader(Temporality::Delta)],
    )
    .unwrap();

    for v in [0.5, 4.0, 5.0, 12.0, 20000.0] {
        storage.record(v, &[]);
    }

    let metric = storage.collect(0, at(0), at(1)).unwrap();
    let MetricData::Histogram(histogram) = metric.data else {
        panic!("expected a histogram");
    };
    let point = &histogram.data_points[0];
    assert_eq!(point.count, 5);
    assert_eq!(point.bucket_counts.len(), 16);
    assert_eq!(point.bucket_counts[1], 2);
    assert_eq!(point.bucket_counts[2], 1);
    assert_eq!(point.bucket_counts[3], 1);
    assert_eq!(point.bucket_counts[15], 1);
    assert_eq!(point.min, Some(0.5));
    assert_eq!(point.max, Some(20000.0));
}

#[test]
fn exemplars_follow_sampled_spans() {
    let storage = InstrumentStorage::<u64>::new(
        stream("requests"),
        Aggregation::Sum { monotonic: true },
        ExemplarFilter::TraceBased,
        vec![CollectorConfig::builder()
            .with_temporality(Temporality::Delta)
            .with_allowed_attribute_keys([Key::new("route")])
            .build()
            .unwrap()],
    )
    .unwrap();
    let cx = Context::new().with_remote_span_context(SpanContext::new(
        TraceId::from_bytes([7; 16]),
        SpanId::from_bytes([9; 8]),
        TraceFlags::SAMPLED,
        true,
        TraceState::default(),
    ));

    storage.record_with_context(
        4,
        &[KeyValue::new("route", "/"), KeyValue::new("user", "carol")],
        &cx,
    );
    storage.record(6, &[KeyValue::new("route", "/")]);

    let metric = storage.collect(0, at(0), at(1)).unwrap();
    let MetricData::Sum(sum) = metric.data else {
        panic!("expected a sum");
    };
    assert_eq!(sum.data_points.len(), 1);
    let point = &sum.data_points[0];
    assert_eq!(point.attributes, vec![KeyValue::new("route", "/")]);
    assert_eq!(point.value, 10);
    assert_eq!(point.exemplars.len(), 1);
    let exemplar = &point.exemplars[0];
    assert_eq!(exemplar.value, 4);
    assert_eq!(exemplar.trace_id, [7; 16]);
    assert_eq!(exemplar.span_id, [9; 8]);
    assert_eq!(
        exemplar.filtered_attributes,
        vec![KeyValue::new("user", "carol")]
    );
}

#[test]
fn concurrent_recording_while_collecting() {
    let storage = InstrumentStorage::<i64>::new(
        stream("queue_depth"),
        Aggregation::MinMaxSumCount,
        ExemplarFilter::AlwaysOff,
        vec![reader(Temporality::Cumulative)],
    )
    .unwrap();

    thread::scope(|s| {
        for t in 0..4_i64 {
            let storage = &storage;
            s.spawn(move || {
                for v in 1..=250_i64 {
                    storage.record(v * if t % 2 == 0 { 1 } else { -1 }, &[]);
                }
            });
        }
        s.spawn(|| {
            for i in 0..20 {
                storage.collect(0, at(0), at(i));
            }
        });
    });

    let metric = storage.collect(0, at(0), at(100)).unwrap();
    let MetricData::Summary(summary) = metric.data else {
        panic!("expected a summary");
    };
    let point = &summary.data_points[0];
    assert_eq!(point.count, 1000);
    assert_eq!(point.sum, 0);
    assert_eq!(point.quantile_values[0].value, -250.0);
    assert_eq!(point.quantile_values[1].value, 250.0);
}

#[test]
fn shutdown_flushes_every_reader() {
    let storage = InstrumentStorage::<u64>::new(
        stream("requests"),
        Aggregation::Sum { monotonic: true },
        ExemplarFilter::AlwaysOff,
        vec![reader(Temporality::Cumulative), reader(Temporality::Delta)],
    )
    .unwrap();
    storage.record(3, &[KeyValue::new("route", "/")]);

    let last = storage.shutdown(at(0), at(1));
    assert_eq!(last.len(), 2);
    for metric in &last {
        assert_eq!(sum_value(metric.as_ref().unwrap(), "/"), Some(3));
    }

    storage.record(3, &[KeyValue::new("route", "/")]);
    assert!(storage.collect(0, at(0), at(2)).is_none());
}
