//! Error types for store and directory access
//!
//! Errors are classified by transience:
//! - Transient: the backing store was busy or a lookup timed out; a later
//!   attempt may succeed
//! - Permanent: the store is corrupt or the request can never be served
//!
//! The enrichment worker never propagates these: a failed lookup is logged
//! and cached as a miss, and the worker loop keeps draining.

use thiserror::Error;

/// Error raised by the call-record store or the identity directory.
#[derive(Debug, Error)]
pub enum StoreError {
    // Transient errors
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("lookup timed out after {0} seconds")]
    Timeout(u64),

    // Permanent errors
    #[error("I/O error: {0}")]
    Io(String),

    #[error("store corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Returns true if a later attempt against the same backend may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}
