//! Span bridge: one [`SpanLifecycle`] per traced invocation.
//!
//! The weaving engine starts a span on entry, may report an error (possibly
//! from another thread), and completes it once. Completion computes the
//! elapsed time and hands the records to the sink synchronously:
//!
//! ```text
//! start ──▶ [record_error]* ──▶ end / end_with_error
//!                                   │
//!                                   ├── DependencyRecord (success = no error)
//!                                   └── ErrorRecord      (only if an error was recorded)
//! ```
//!
//! Only the first completion emits; later completions are no-ops. Only the
//! first recorded error is kept.

use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{debug, error, warn};

use super::record::{
    generate_span_id, DependencyRecord, ErrorRecord, SpanError, TelemetryRecord,
    CUSTOM_SPAN_CATEGORY,
};
use super::sink::TelemetrySink;
use crate::guard;

/// Marker prefix of custom span identity text
pub const CUSTOM_SPAN_PREFIX: &str = "__custom,";

const MEMBER_SEPARATOR: char = ',';

// SpanLifecycle::state bits
const ERRORED: u8 = 0b01;
const ENDED: u8 = 0b10;

/// Derive the telemetry display name from span identity text.
///
/// `__custom,com.foo.Bar,doWork` becomes `com/foo/Bar.doWork`. Text that
/// lacks the prefix or the class/member separator is returned unchanged.
pub fn telemetry_name(identity: &str) -> String {
    let split = identity
        .strip_prefix(CUSTOM_SPAN_PREFIX)
        .and_then(|rest| rest.split_once(MEMBER_SEPARATOR));

    match split {
        Some((class_name, member)) => format!("{}.{}", class_name.replace('.', "/"), member),
        None => {
            warn!("unexpected local span message: {}", identity);
            identity.to_string()
        }
    }
}

/// Result of a completion call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanOutcome {
    /// This call completed the span and emitted its records
    Emitted,
    /// The span had already completed; nothing was emitted
    AlreadyEnded,
}

/// Creates spans bound to one sink.
#[derive(Clone)]
pub struct SpanFactory {
    sink: Arc<dyn TelemetrySink>,
}

impl SpanFactory {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self { sink }
    }

    /// Start a span now.
    pub fn start(&self, identity: impl Into<String>) -> SpanLifecycle {
        self.start_at(identity, Instant::now())
    }

    /// Start a span with an entry instant captured by the caller.
    pub fn start_at(&self, identity: impl Into<String>, started: Instant) -> SpanLifecycle {
        SpanLifecycle::start(identity, started, Arc::clone(&self.sink))
    }
}

impl fmt::Debug for SpanFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanFactory").finish_non_exhaustive()
    }
}

/// Runtime record of one traced invocation.
///
/// `Send + Sync`: an async completion callback may record the error from a
/// different thread than the one that ends the span.
pub struct SpanLifecycle {
    span_id: String,
    identity: String,
    started: Instant,
    timestamp: SystemTime,
    error: OnceCell<SpanError>,
    state: AtomicU8,
    sink: Arc<dyn TelemetrySink>,
}

impl SpanLifecycle {
    /// Capture the inputs. No other side effects.
    pub fn start(identity: impl Into<String>, started: Instant, sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            span_id: generate_span_id(),
            identity: identity.into(),
            started,
            timestamp: SystemTime::now(),
            error: OnceCell::new(),
            state: AtomicU8::new(0),
            sink,
        }
    }

    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn is_ended(&self) -> bool {
        self.state.load(Ordering::Acquire) & ENDED != 0
    }

    /// The error that completion reports (or has reported) for this span.
    pub fn error(&self) -> Option<&SpanError> {
        if self.has_error() {
            self.error.get()
        } else {
            None
        }
    }

    pub fn has_error(&self) -> bool {
        self.state.load(Ordering::Acquire) & ERRORED != 0
    }

    /// Record the terminal error.
    ///
    /// Returns `true` exactly when completion reports this error. Returns
    /// `false` if an error was already recorded or the span completed first,
    /// including a completion that races with this call.
    pub fn record_error<E>(&self, error: E) -> bool
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        if self.is_ended() {
            debug!(span_id = %self.span_id, "Ignoring error recorded after span completion");
            return false;
        }

        let error: SpanError = Arc::from(error.into());
        if self.error.set(error).is_err() {
            debug!(span_id = %self.span_id, "Span already has an error, keeping the first");
            return false;
        }

        // the cell is written at most once, so only completion can move the state
        match self
            .state
            .compare_exchange(0, ERRORED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(_) => {
                debug!(span_id = %self.span_id, "Span completed while the error was being recorded");
                false
            }
        }
    }

    /// Complete the span and emit its records.
    pub fn end(&self) -> SpanOutcome {
        let previous = self.state.fetch_or(ENDED, Ordering::AcqRel);
        if previous & ENDED != 0 {
            debug!(span_id = %self.span_id, "Span already ended, ignoring completion");
            return SpanOutcome::AlreadyEnded;
        }

        let duration = self.started.elapsed();
        let error = if previous & ERRORED != 0 {
            self.error.get().cloned()
        } else {
            None
        };

        self.emit(TelemetryRecord::Dependency(DependencyRecord {
            span_id: self.span_id.clone(),
            name: telemetry_name(&self.identity),
            category: CUSTOM_SPAN_CATEGORY.to_string(),
            timestamp: self.timestamp,
            duration,
            success: error.is_none(),
        }));

        if let Some(error) = error {
            self.emit(TelemetryRecord::Exception(ErrorRecord::new(
                self.span_id.clone(),
                error,
            )));
        }

        SpanOutcome::Emitted
    }

    /// Record `error` (unless one is already recorded) and complete the span.
    pub fn end_with_error<E>(&self, error: E) -> SpanOutcome
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        self.record_error(error);
        self.end()
    }

    fn emit(&self, record: TelemetryRecord) {
        if let Err(e) = guard::catch_recoverable(|| self.sink.track(record)) {
            error!(span_id = %self.span_id, "Telemetry sink failed: {}", e);
        }
    }
}

impl fmt::Debug for SpanLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanLifecycle")
            .field("span_id", &self.span_id)
            .field("identity", &self.identity)
            .field("started", &self.started)
            .field("error", &self.error().map(|e| e.to_string()))
            .field("ended", &self.is_ended())
            .finish()
    }
}

impl Drop for SpanLifecycle {
    fn drop(&mut self) {
        if *self.state.get_mut() & ENDED == 0 {
            debug!(span_id = %self.span_id, identity = %self.identity, "Span dropped without completion");
        }
    }
}
