use thiserror::Error;

/// Error type shared by every domain operation.
///
/// Validation failures are rejected before any write is issued; storage
/// failures roll the whole batch back, so callers never observe a partial
/// operation either way.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Operator input was rejected; correct and resubmit.
    #[error("{0}")]
    Validation(String),

    /// The referenced document does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The operation needs explicit operator confirmation before it runs.
    /// The message is the question to put in front of the operator.
    #[error("confirmation required: {0}")]
    ConfirmationRequired(String),

    /// No USD -> display-currency rate is known; financial operations stay
    /// disabled rather than computing with a stale or zero rate.
    #[error("currency rate is not available yet; try refreshing the rate")]
    RateUnavailable,

    /// Underlying storage or I/O failure.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<sqlx::Error> for DomainError {
    fn from(e: sqlx::Error) -> Self {
        DomainError::Storage(anyhow::Error::new(e))
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
