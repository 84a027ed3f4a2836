use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to build a fresh candidate queue
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindPartnerRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
}

/// Like or pass on a queued candidate
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SwipeRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "target_user_id", rename = "targetUserId")]
    pub target_user_id: String,
}

/// Answer to a pending like in the inbox
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RespondRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "liker_id", rename = "likerId")]
    pub liker_id: String,
    pub accept: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReportRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "reporter_id", rename = "reporterId")]
    pub reporter_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "reported_id", rename = "reportedId")]
    pub reported_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BanRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "moderator_id", rename = "moderatorId")]
    pub moderator_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[validate(range(min = 1, max = 3650))]
    #[serde(alias = "duration_days", rename = "durationDays")]
    pub duration_days: u32,
}

/// Moderator action on a single user (unban, clear reports)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ModeratorRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "moderator_id", rename = "moderatorId")]
    pub moderator_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
}

/// Profile registration or update
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaveProfileRequest {
    #[validate(length(min = 1, max = 128))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(max = 64))]
    #[serde(default)]
    pub username: Option<String>,
    #[validate(range(max = 100000))]
    pub hours: u32,
    #[validate(range(min = 13, max = 120))]
    pub age: u8,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub bio: String,
}

/// Request to count an interaction event
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordEventRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[serde(alias = "event_type", rename = "eventType")]
    pub event_type: String,
}

/// `?userId=` query string
#[derive(Debug, Clone, Deserialize)]
pub struct UserQuery {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
}

/// `?moderatorId=` query string
#[derive(Debug, Clone, Deserialize)]
pub struct ModeratorQuery {
    #[serde(alias = "moderator_id", rename = "moderatorId")]
    pub moderator_id: String,
}
