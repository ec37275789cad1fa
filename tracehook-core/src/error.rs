//! Error types for policy loading and telemetry output.

use std::path::PathBuf;
use thiserror::Error;

use crate::guard::RecoveredPanic;

/// Errors raised while turning a policy document into an instrumentation policy.
///
/// Every variant is recoverable: the outermost load boundary logs it once and
/// reports "no policy produced", which disables custom instrumentation. The
/// only thing that is never converted into a `PolicyError` is a
/// [`Termination`](crate::guard::Termination) panic.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// The document exists but could not be read
    #[error("Failed to read policy document {path}")]
    DocumentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is larger than the loader accepts
    #[error("Policy document {path} is {size} bytes, exceeding the {limit} byte limit")]
    DocumentTooLarge { path: PathBuf, size: u64, limit: u64 },

    /// Malformed markup, a DOCTYPE/entity declaration, or too many nodes
    #[error("Malformed policy document: {0}")]
    Malformed(#[from] roxmltree::Error),

    /// Unexpected failure while walking the parsed tree
    #[error("Policy build aborted: {0}")]
    BuildAborted(#[from] RecoveredPanic),
}

/// Errors raised by sinks that write telemetry records somewhere durable.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to open telemetry output {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write telemetry record")]
    Write(#[from] std::io::Error),

    #[error("Failed to serialize telemetry record")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PolicyError>;
