//! Error types for the nested index.

use thiserror::Error;

/// Result type alias for index operations that can fail.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur while operating on the index.
///
/// Every public operation except `bulk_load`/`bulk_load_with` is infallible
/// and reports its outcome as a plain `bool`/`Option`: arena growth backing
/// every level of the tree is an ordinary `Vec` push, so there is no
/// allocator-exhaustion condition for a caller to observe (page-full,
/// superpage-full, and sub-node-full are resolved internally by splitting,
/// never propagated outward).
#[derive(Error, Debug)]
pub enum IndexError {
    /// `bulk_load` was given input that violates its precondition (sorted,
    /// unique keys).
    #[error("bulk_load input invalid: {0}")]
    InvalidBulkInput(String),

    /// A structural invariant was found broken during a debug-assertion
    /// guarded consistency check. Reserved for callers that layer their own
    /// consistency checker on top of the public API; the tree itself never
    /// constructs this variant since every structural operation leaves its
    /// own invariants intact by construction (see §5's "invariant repair
    /// window").
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl IndexError {
    pub fn invalid_bulk_input(msg: impl Into<String>) -> Self {
        Self::InvalidBulkInput(msg.into())
    }

    pub fn invariant_violation(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}
