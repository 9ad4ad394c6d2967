//! Instrumentation hook invoked around each aggregator operation

use crate::errors::{AppError, Result};
use std::time::Duration;

/// How an operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    NotFound,
    MalformedReference,
    Timeout,
    Unavailable,
    Error,
}

impl Outcome {
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(AppError::NotFound { .. }) => Outcome::NotFound,
            Err(AppError::MalformedReference { .. }) => Outcome::MalformedReference,
            Err(AppError::Timeout { .. }) => Outcome::Timeout,
            Err(AppError::UpstreamUnavailable { .. }) => Outcome::Unavailable,
            Err(_) => Outcome::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::NotFound => "not_found",
            Outcome::MalformedReference => "malformed_reference",
            Outcome::Timeout => "timeout",
            Outcome::Unavailable => "unavailable",
            Outcome::Error => "error",
        }
    }
}

/// Observer notified at every operation boundary.
///
/// `argument` is the operation's argument rendered as text, `None` for
/// operations without one.
pub trait OperationObserver: Send + Sync {
    fn on_start(&self, operation: &'static str, argument: Option<&str>);

    fn on_complete(
        &self,
        operation: &'static str,
        argument: Option<&str>,
        elapsed: Duration,
        outcome: Outcome,
    );
}

/// Observer writing operation boundaries to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl OperationObserver for TracingObserver {
    fn on_start(&self, operation: &'static str, argument: Option<&str>) {
        tracing::debug!(operation, argument, "Operation started");
    }

    fn on_complete(
        &self,
        operation: &'static str,
        argument: Option<&str>,
        elapsed: Duration,
        outcome: Outcome,
    ) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match outcome {
            Outcome::Success => tracing::debug!(
                operation,
                argument,
                elapsed_ms,
                "Operation completed"
            ),
            _ => tracing::warn!(
                operation,
                argument,
                elapsed_ms,
                outcome = outcome.as_str(),
                "Operation failed"
            ),
        }
    }
}
