//! Error types used by the stickybus payload API.
//!
//! The bus itself is deliberately infallible at its call surface: removal of
//! unknown or foreign handles, emission to names without subscribers, and
//! cross-thread calls are all silent no-ops. The only fallible seam is
//! *payload decoding* — recovering a typed value from the dynamically typed
//! event payload — which fails explicitly instead of yielding a default.

use thiserror::Error;

/// # Errors produced when reading typed values out of a [`Payload`](crate::Payload).
///
/// Decoding is a checked downcast: a missing key and a present-but-wrongly-typed
/// key are distinct failures so callers can tell a producer contract violation
/// from a simple absence.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// The requested key is not present in the payload.
    #[error("payload key {key:?} is missing")]
    MissingKey {
        /// The key that was looked up.
        key: String,
    },

    /// The key is present but holds a value of a different type.
    #[error("payload key {key:?} holds a value that is not a {expected}")]
    TypeMismatch {
        /// The key that was looked up.
        key: String,
        /// Type name the caller asked for.
        expected: &'static str,
    },
}

impl PayloadError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use stickybus::PayloadError;
    ///
    /// let err = PayloadError::MissingKey { key: "current".into() };
    /// assert_eq!(err.as_label(), "payload_missing_key");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            PayloadError::MissingKey { .. } => "payload_missing_key",
            PayloadError::TypeMismatch { .. } => "payload_type_mismatch",
        }
    }

    /// Returns the payload key the failed lookup was for.
    pub fn key(&self) -> &str {
        match self {
            PayloadError::MissingKey { key } => key,
            PayloadError::TypeMismatch { key, .. } => key,
        }
    }
}
