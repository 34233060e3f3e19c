//! Dispatch error types

use crate::connection::ConnectionId;
use std::fmt;

/// One handler that returned an error during dispatch
#[derive(Debug)]
pub struct HandlerFailure {
    /// Signal that was firing
    pub signal: String,
    /// Subscription whose handler failed
    pub connection: ConnectionId,
    /// Handler error
    pub error: anyhow::Error,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} handler {}: {:#}", self.signal, self.connection, self.error)
    }
}

/// Handler failures collected after every subscriber has run
#[derive(Debug, thiserror::Error)]
#[error("{} signal handler(s) failed; first: {}", .failures.len(), .failures[0])]
pub struct DispatchError {
    failures: Vec<HandlerFailure>,
}

impl DispatchError {
    /// Wrap failures; `None` when there are none
    #[must_use]
    pub fn from_failures(failures: Vec<HandlerFailure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }

    /// Failures in dispatch order
    #[inline]
    #[must_use]
    pub fn failures(&self) -> &[HandlerFailure] {
        &self.failures
    }

    /// Number of failed handlers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Never true for a constructed error
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Consume into the failure list
    #[inline]
    #[must_use]
    pub fn into_failures(self) -> Vec<HandlerFailure> {
        self.failures
    }
}

/// Accumulates dispatch results across several signals
///
/// A single mutation may fire several signals; each must run to completion
/// even if an earlier one failed, and the caller sees one combined error.
#[derive(Debug, Default)]
pub struct DispatchReport {
    failures: Vec<HandlerFailure>,
}

impl DispatchReport {
    /// Create empty report
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one dispatch
    pub fn record(&mut self, result: Result<(), DispatchError>) {
        if let Err(err) = result {
            self.failures.extend(err.failures);
        }
    }

    /// Whether any failure was recorded
    #[inline]
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Finish: `Ok` if nothing failed
    ///
    /// # Errors
    /// Returns every recorded failure, in order
    pub fn finish(self) -> Result<(), DispatchError> {
        match DispatchError::from_failures(self.failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
