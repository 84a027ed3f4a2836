use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Match, PendingLike, UserId};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Outbound channel for like and match events.
///
/// The engine logs delivery failures and carries on; a failed notification
/// never undoes the like or match behind it.
#[async_trait]
pub trait MatchNotifier: Send + Sync {
    /// A one-sided like landed in `pending.recipient`'s inbox
    async fn notify_like(&self, pending: &PendingLike) -> Result<(), NotifyError>;

    /// Called once per match; the implementation tells both sides
    async fn notify_match(&self, matched: &Match) -> Result<(), NotifyError>;

    /// A user crossed the report threshold
    async fn notify_moderators(&self, _reported: &UserId, _count: usize) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Writes every event to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl MatchNotifier for TracingNotifier {
    async fn notify_like(&self, pending: &PendingLike) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %pending.recipient,
            liker = %pending.liker,
            liker_name = %pending.liker_name,
            "Someone liked your profile"
        );
        Ok(())
    }

    async fn notify_match(&self, matched: &Match) -> Result<(), NotifyError> {
        tracing::info!(user_id = %matched.liker, partner = %matched.liked, "Match notification");
        tracing::info!(user_id = %matched.liked, partner = %matched.liker, "Match notification");
        Ok(())
    }

    async fn notify_moderators(&self, reported: &UserId, count: usize) -> Result<(), NotifyError> {
        tracing::warn!(user_id = %reported, count, "User needs moderator review");
        Ok(())
    }
}
