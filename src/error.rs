use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// Expected conditions (rate limited, queue exhausted, no candidates,
/// already processed) are outcome variants, not errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Profile store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Profile store timed out after {0}ms")]
    StoreTimeout(u64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl EngineError {
    /// Whether the caller may retry the same operation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::StoreTimeout(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
