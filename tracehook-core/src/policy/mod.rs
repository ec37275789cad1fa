//! Instrumentation policy: loading, resolution and publication.
//!
//! ```text
//! PolicyDocumentLoader ──read──▶ PolicyDocument ──parse──▶ tree
//!                                                            │
//!                                    PolicyBuilder::build ◀──┘
//!                                            │
//!                              InstrumentationPolicy (immutable)
//!                                            │
//!                                  PolicyStore (atomic swap)
//! ```

pub mod builder;
pub mod builtins;
pub mod document;
pub mod model;
pub mod store;
pub mod tree;

pub use builder::PolicyBuilder;
pub use builtins::{BuiltInFeatureSet, HttpFeature, LoggingFeature};
pub use document::{LoaderOptions, PolicyDocument, PolicyDocumentLoader, AGENT_DOCUMENT_NAME};
pub use model::{ClassRule, InstrumentationPolicy, MethodKey, MethodRule, OTHER_TYPE};
pub use store::{PolicyStore, ReloadOutcome};
