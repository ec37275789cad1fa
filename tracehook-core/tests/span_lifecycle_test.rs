//! Span emission under concurrent completion and error reporting

use anyhow::Result;
use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;
use tracehook_core::telemetry::{
    JsonLinesSink, MemorySink, SpanFactory, SpanOutcome, TelemetrySink,
};

#[test]
fn test_racing_completions_emit_once() {
    let sink = Arc::new(MemorySink::new());
    let factory = SpanFactory::new(sink.clone());

    for _ in 0..50 {
        let span = Arc::new(factory.start("__custom,com.foo.Bar,doWork"));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let span = Arc::clone(&span);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    span.end()
                })
            })
            .collect();

        let emitted = handles
            .into_iter()
            .map(|h| h.join().expect("completion thread panicked"))
            .filter(|outcome| *outcome == SpanOutcome::Emitted)
            .count();
        assert_eq!(emitted, 1);
    }

    assert_eq!(sink.dependencies().len(), 50);
    assert!(sink.exceptions().is_empty());
}

#[test]
fn test_error_from_other_thread_is_reported() {
    let sink = Arc::new(MemorySink::new());
    let factory = SpanFactory::new(sink.clone());
    let span = Arc::new(factory.start("__custom,com.foo.Client,call"));

    let callback = {
        let span = Arc::clone(&span);
        thread::spawn(move || span.record_error("upstream returned 503"))
    };
    assert!(callback.join().expect("callback thread panicked"));

    assert_eq!(span.end(), SpanOutcome::Emitted);

    let dependencies = sink.dependencies();
    let exceptions = sink.exceptions();
    assert_eq!(dependencies.len(), 1);
    assert!(!dependencies[0].success);
    assert_eq!(dependencies[0].name, "com/foo/Client.call");
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].message, "upstream returned 503");
}

#[test]
fn test_many_spans_from_many_threads() {
    let sink = Arc::new(MemorySink::new());
    let factory = SpanFactory::new(sink.clone());

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let factory = factory.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    let span = factory.start(format!("__custom,w{worker}.Task,run{i}"));
                    if i % 10 == 0 {
                        span.end_with_error("failed");
                    } else {
                        span.end();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker panicked");
    }

    assert_eq!(sink.dependencies().len(), 800);
    assert_eq!(sink.exceptions().len(), 80);
}

#[test]
fn test_json_lines_output() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("out").join("telemetry.jsonl");
    let sink: Arc<dyn TelemetrySink> = Arc::new(JsonLinesSink::create(&path)?);
    let factory = SpanFactory::new(sink);

    factory.start("__custom,a.B,ok").end();
    factory.start("__custom,a.B,bad").end_with_error("boom");

    let contents = fs::read_to_string(&path)?;
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["kind"], "dependency");
    assert_eq!(lines[0]["name"], "a/B.ok");
    assert_eq!(lines[0]["success"], true);
    assert_eq!(lines[1]["kind"], "dependency");
    assert_eq!(lines[1]["success"], false);
    assert_eq!(lines[2]["kind"], "exception");
    assert_eq!(lines[2]["message"], "boom");
    assert_eq!(lines[2]["span_id"], lines[1]["span_id"]);
    Ok(())
}
