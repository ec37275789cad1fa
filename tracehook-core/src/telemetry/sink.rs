//! Sinks that accept finished telemetry records.
//!
//! Delivery is fire-and-forget from the span's point of view: a sink never
//! reports failure back to the span that produced the record.

use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use super::record::{DependencyRecord, ErrorRecord, TelemetryRecord};

/// Destination for finished telemetry records.
pub trait TelemetrySink: Send + Sync {
    fn track(&self, record: TelemetryRecord);
}

/// Keeps every record in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<TelemetryRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TelemetryRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.lock().clone()
    }

    pub fn dependencies(&self) -> Vec<DependencyRecord> {
        self.lock()
            .iter()
            .filter_map(TelemetryRecord::as_dependency)
            .cloned()
            .collect()
    }

    pub fn exceptions(&self) -> Vec<ErrorRecord> {
        self.lock()
            .iter()
            .filter_map(TelemetryRecord::as_exception)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove and return everything collected so far
    pub fn drain(&self) -> Vec<TelemetryRecord> {
        std::mem::take(&mut *self.lock())
    }
}

impl TelemetrySink for MemorySink {
    fn track(&self, record: TelemetryRecord) {
        self.lock().push(record);
    }
}

/// Emits each record as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn track(&self, record: TelemetryRecord) {
        match record {
            TelemetryRecord::Dependency(dependency) => info!(
                target: "tracehook::telemetry",
                span_id = %dependency.span_id,
                name = %dependency.name,
                category = %dependency.category,
                duration_ms = dependency.duration.as_millis() as u64,
                success = dependency.success,
                "dependency"
            ),
            TelemetryRecord::Exception(exception) => warn!(
                target: "tracehook::telemetry",
                span_id = %exception.span_id,
                causes = ?exception.causes,
                "exception: {}",
                exception.message
            ),
        }
    }
}
