use async_trait::async_trait;
use thiserror::Error;

use crate::error::EngineError;
use crate::models::{Profile, UserId};

/// Failures reported by a profile backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::StoreUnavailable(err.to_string())
    }
}

/// Source of player profiles
///
/// `fetch_eligible_candidates` must already drop inactive profiles and the
/// excluded user. Order is the backend's natural order; the ranker's sort is
/// stable, so ties keep it.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_candidate(&self, user: &UserId) -> Result<Option<Profile>, StoreError>;

    async fn fetch_eligible_candidates(&self, exclude: &UserId) -> Result<Vec<Profile>, StoreError>;

    async fn set_active(&self, user: &UserId, active: bool) -> Result<(), StoreError>;

    /// Create the profile, or replace the stored one with the same user id
    async fn save_profile(&self, profile: &Profile) -> Result<(), StoreError>;
}
