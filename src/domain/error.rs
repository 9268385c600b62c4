//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent precondition violations in the discovery data.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed identifier '{identifier}': {reason}")]
    MalformedIdentifier { identifier: String, reason: String },

    #[error("malformed discovery row {line}: '{row}' (expected '<identifier> <path>')")]
    MalformedRow { line: usize, row: String },

    #[error("discovery produced no rows")]
    EmptyDiscovery,

    #[error("excluded package not found in discovery output: {0}")]
    ExcludedPackageMissing(String),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
