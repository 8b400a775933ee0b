//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Component crates keep their own error enums (storage, catalog, order
/// capture) and convert into this taxonomy at the cart/checkout boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A mutation was called with a missing identifier or an out-of-range value.
    /// The target state is left unchanged.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A requested product/order was not found.
    #[error("not found")]
    NotFound,

    /// Durable storage could not be read or written.
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    /// The order-capture collaborator rejected the order or could not be reached.
    ///
    /// Retryable: the cart is preserved exactly as before the attempt.
    #[error("order submission failed: {0}")]
    OrderSubmissionFailed(String),
}

impl DomainError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::PersistenceUnavailable(msg.into())
    }

    pub fn order_submission(msg: impl Into<String>) -> Self {
        Self::OrderSubmissionFailed(msg.into())
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::OrderSubmissionFailed(_) | Self::PersistenceUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_io_failures_are_retryable() {
        assert!(DomainError::order_submission("timeout").is_retryable());
        assert!(DomainError::persistence("quota").is_retryable());
        assert!(!DomainError::invalid_argument("empty id").is_retryable());
        assert!(!DomainError::not_found().is_retryable());
    }

    #[test]
    fn messages_carry_context() {
        let err = DomainError::invalid_argument("product id cannot be empty");
        assert_eq!(err.to_string(), "invalid argument: product id cannot be empty");
    }
}
