//! Span bridge between the weaving engine and the telemetry transport.
//!
//! ```text
//! SpanFactory::start ──▶ SpanLifecycle ──end──▶ TelemetryRecord ──▶ TelemetrySink
//!                                                                    ├── MemorySink
//!                                                                    ├── TracingSink
//!                                                                    └── JsonLinesSink
//! ```
//!
//! Records are handed to the sink synchronously on the completing thread. A
//! sink that panics is contained at the span boundary.

pub mod record;
pub mod sink;
pub mod span;
pub mod writer;

pub use record::{DependencyRecord, ErrorRecord, SpanError, TelemetryRecord, CUSTOM_SPAN_CATEGORY};
pub use sink::{MemorySink, TelemetrySink, TracingSink};
pub use span::{telemetry_name, SpanFactory, SpanLifecycle, SpanOutcome, CUSTOM_SPAN_PREFIX};
pub use writer::JsonLinesSink;
