//! Panic containment for the policy build and telemetry emission boundaries.
//!
//! Two tiers of failure exist. Ordinary panics raised while walking a policy
//! tree or inside a telemetry sink are caught here and turned into a
//! [`RecoveredPanic`], which callers log and degrade on. A panic whose payload
//! is [`Termination`] is an unrecoverable shutdown request from the host: it is
//! re-raised immediately and never logged or swallowed.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Panic payload marking an unrecoverable termination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Termination;

/// Unwind the current thread with a [`Termination`] payload.
pub fn terminate() -> ! {
    panic::panic_any(Termination)
}

/// An ordinary panic that was caught at a guarded boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("panicked: {message}")]
pub struct RecoveredPanic {
    pub message: String,
}

/// Run `f`, converting ordinary panics into [`RecoveredPanic`].
///
/// A [`Termination`] panic is resumed unchanged.
pub fn catch_recoverable<T>(f: impl FnOnce() -> T) -> Result<T, RecoveredPanic> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => {
            if payload.is::<Termination>() {
                panic::resume_unwind(payload);
            }
            Err(RecoveredPanic {
                message: panic_message(payload.as_ref()),
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
