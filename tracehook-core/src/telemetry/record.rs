//! Finished telemetry records handed to a [`TelemetrySink`](super::TelemetrySink).

use serde::{Serialize, Serializer};
use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Category label of dependency records produced by custom in-process spans
pub const CUSTOM_SPAN_CATEGORY: &str = "OTHER";

/// Error reported against a span, shareable across threads.
pub type SpanError = Arc<dyn Error + Send + Sync + 'static>;

/// Generate a unique 16-character hex span ID (8 bytes).
pub(crate) fn generate_span_id() -> String {
    let uuid = Uuid::now_v7();
    hex::encode(&uuid.as_bytes()[8..16])
}

/// Serialize SystemTime as RFC3339 string.
fn serialize_system_time<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    use chrono::{DateTime, Utc};
    let datetime: DateTime<Utc> = (*time).into();
    serializer.serialize_str(&datetime.to_rfc3339())
}

fn serialize_duration_ms<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// One traced invocation, reported as a dependency call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRecord {
    /// Span identifier shared with the matching error record
    pub span_id: String,

    /// Display name, e.g. `com/foo/Bar.doWork`
    pub name: String,

    /// Always [`CUSTOM_SPAN_CATEGORY`] for custom spans
    pub category: String,

    /// Wall-clock time the invocation started
    #[serde(serialize_with = "serialize_system_time")]
    pub timestamp: SystemTime,

    #[serde(rename = "duration_ms", serialize_with = "serialize_duration_ms")]
    pub duration: Duration,

    /// False when an error was recorded against the span
    pub success: bool,
}

/// Error that terminated a traced invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub span_id: String,

    #[serde(serialize_with = "serialize_system_time")]
    pub timestamp: SystemTime,

    /// Rendered error message
    pub message: String,

    /// Messages of the `source()` chain, outermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,

    #[serde(skip)]
    pub error: SpanError,
}

impl ErrorRecord {
    pub fn new(span_id: impl Into<String>, error: SpanError) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            span_id: span_id.into(),
            timestamp: SystemTime::now(),
            message: error.to_string(),
            causes,
            error,
        }
    }
}

/// Anything a span hands to a sink.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryRecord {
    Dependency(DependencyRecord),
    Exception(ErrorRecord),
}

impl TelemetryRecord {
    pub fn span_id(&self) -> &str {
        match self {
            TelemetryRecord::Dependency(record) => &record.span_id,
            TelemetryRecord::Exception(record) => &record.span_id,
        }
    }

    pub fn as_dependency(&self) -> Option<&DependencyRecord> {
        match self {
            TelemetryRecord::Dependency(record) => Some(record),
            TelemetryRecord::Exception(_) => None,
        }
    }

    pub fn as_exception(&self) -> Option<&ErrorRecord> {
        match self {
            TelemetryRecord::Exception(record) => Some(record),
            TelemetryRecord::Dependency(_) => None,
        }
    }
}
