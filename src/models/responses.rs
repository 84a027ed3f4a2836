use serde::{Deserialize, Serialize};

use crate::models::domain::UserId;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "liveSessions")]
    pub live_sessions: u64,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
    /// Whether the same request may succeed if retried unchanged
    #[serde(default)]
    pub retryable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCountEntry {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCountsResponse {
    pub reports: Vec<ReportCountEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanResponse {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "bannedUntil")]
    pub banned_until: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchesResponse {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub partners: Vec<UserId>,
}
