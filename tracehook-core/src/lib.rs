//! Tracehook core: instrumentation policy engine and span bridge.
//!
//! [`policy`] turns the agent's `AI-Agent.xml` document into an immutable
//! [`InstrumentationPolicy`] that the weaving engine queries.
//! [`telemetry`] records each traced invocation as a [`SpanLifecycle`] and
//! reports it through a [`TelemetrySink`].

pub mod error;
pub mod guard;
pub mod policy;
pub mod telemetry;

pub use error::{PolicyError, Result, SinkError};
pub use policy::{
    BuiltInFeatureSet, ClassRule, InstrumentationPolicy, MethodRule, PolicyBuilder,
    PolicyDocument, PolicyDocumentLoader, PolicyStore,
};
pub use telemetry::{SpanFactory, SpanLifecycle, SpanOutcome, TelemetryRecord, TelemetrySink};
