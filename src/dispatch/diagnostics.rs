//! Diagnostic channel for dispatch failures.
//!
//! Nothing that goes wrong inside the dispatcher is allowed to reach the
//! instrumented program. Failures are reported here and the call proceeds.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;

/// Stage of dispatch at which a handler failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The handler could not be resolved through the isolation domain.
    Resolution,
    /// The handler's constructor failed or panicked.
    Construction,
    /// An entry point failed, panicked, or could not be called.
    Invocation,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Resolution => write!(f, "resolution"),
            FailureKind::Construction => write!(f, "construction"),
            FailureKind::Invocation => write!(f, "invocation"),
        }
    }
}

/// A single handler failure during dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchFailure {
    pub at: DateTime<Utc>,
    pub kind: FailureKind,
    pub handler: String,
    /// Rendered method signature of the intercepted call.
    pub method: String,
    pub message: String,
}

impl DispatchFailure {
    pub fn new(
        kind: FailureKind,
        handler: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            at: Utc::now(),
            kind,
            handler: handler.into(),
            method: method.into(),
            message: message.into(),
        }
    }
}

/// Receiver of dispatch failures.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, failure: DispatchFailure);
}

/// Logs failures through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, failure: DispatchFailure) {
        tracing::warn!(
            kind = %failure.kind,
            handler = %failure.handler,
            method = %failure.method,
            "{}",
            failure.message
        );
    }
}

/// Keeps failures in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    failures: Mutex<Vec<DispatchFailure>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<DispatchFailure> {
        self.failures.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.failures.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.lock().is_empty()
    }

    pub fn clear(&self) {
        self.failures.lock().clear();
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, failure: DispatchFailure) {
        tracing::debug!(kind = %failure.kind, handler = %failure.handler, "collected dispatch failure");
        self.failures.lock().push(failure);
    }
}
