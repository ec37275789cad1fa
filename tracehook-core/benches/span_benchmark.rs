//! Per-call overhead of the hot paths: policy lookup and span completion

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::time::Instant;
use tracehook_core::policy::{PolicyBuilder, PolicyDocument};
use tracehook_core::telemetry::{SpanFactory, TelemetryRecord, TelemetrySink};

struct DiscardSink;

impl TelemetrySink for DiscardSink {
    fn track(&self, record: TelemetryRecord) {
        black_box(record);
    }
}

fn policy_document(classes: usize) -> PolicyDocument {
    let mut xml = String::from("<ApplicationInsightsAgent><Instrumentation>");
    for i in 0..classes {
        xml.push_str(&format!(
            r#"<Class name="com.bench.Class{i}" thresholdInMS="100">
                 <Method name="run"/>
                 <Method name="call" signature="(I)V" thresholdInMS="5"/>
               </Class>"#
        ));
    }
    xml.push_str("</Instrumentation></ApplicationInsightsAgent>");
    PolicyDocument::from_source(xml)
}

fn bench_policy(c: &mut Criterion) {
    let document = policy_document(500);

    c.bench_function("policy_build_500_classes", |b| {
        b.iter(|| PolicyBuilder::build_document(black_box(&document)).unwrap())
    });

    let policy = PolicyBuilder::build_document(&document).unwrap();
    c.bench_function("policy_method_lookup", |b| {
        b.iter(|| {
            policy.method_threshold(
                black_box("com.bench.Class250"),
                black_box("call"),
                black_box("(I)V"),
            )
        })
    });
}

fn bench_span(c: &mut Criterion) {
    let factory = SpanFactory::new(Arc::new(DiscardSink));

    c.bench_function("span_start_end", |b| {
        b.iter(|| {
            let span = factory.start_at(black_box("__custom,com.foo.Bar,doWork"), Instant::now());
            span.end()
        })
    });

    c.bench_function("span_start_end_with_error", |b| {
        b.iter(|| {
            let span = factory.start(black_box("__custom,com.foo.Bar,doWork"));
            span.end_with_error("failed")
        })
    });
}

criterion_group!(benches, bench_policy, bench_span);
criterion_main!(benches);
