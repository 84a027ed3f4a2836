use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque user identity as issued by the delivery layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Player profile with the attributes used for similarity ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    /// Hours played, the main experience signal
    pub hours: u32,
    pub age: u8,
    #[serde(default)]
    pub bio: String,
    #[serde(rename = "isVerified", default)]
    pub is_verified: Option<bool>,
    #[serde(rename = "isActive", default = "default_true")]
    pub is_active: bool,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Helper to get is_verified as a bool, defaulting to false
    pub fn verified(&self) -> bool {
        self.is_verified.unwrap_or(false)
    }
}

fn default_true() -> bool { true }

/// A like that the recipient has not answered yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingLike {
    #[serde(rename = "likerId")]
    pub liker: UserId,
    #[serde(rename = "recipientId")]
    pub recipient: UserId,
    /// Denormalized so the inbox renders without a profile lookup
    #[serde(rename = "likerName")]
    pub liker_name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Mutual like between two users.
///
/// `liker` is the side whose like completed the pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    #[serde(rename = "likerId")]
    pub liker: UserId,
    #[serde(rename = "likedId")]
    pub liked: UserId,
    #[serde(rename = "matchedAt")]
    pub matched_at: DateTime<Utc>,
}

/// Interaction events the delivery layer counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchEventType {
    Viewed,
    Liked,
    Passed,
    Matched,
}

/// Per-user interaction counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub viewed: u64,
    #[serde(rename = "likesGiven")]
    pub likes_given: u64,
    pub passed: u64,
    pub matches: u64,
}

/// Candidate together with its similarity score (lower is closer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub profile: Profile,
    pub score: f64,
}

/// Ranking weights and bonuses
#[derive(Debug, Clone, PartialEq)]
pub struct RankingWeights {
    pub hours: f64,
    pub age: f64,
    /// Added to the score of verified candidates (negative pulls them forward)
    pub verified_bonus: f64,
    /// Added when the bio mentions an affinity keyword
    pub keyword_bonus: f64,
    /// Lowercased affinity keywords
    pub keywords: Vec<String>,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            hours: 0.5,
            age: 0.5,
            verified_bonus: -20.0,
            keyword_bonus: -10.0,
            keywords: ["pvp", "clan", "raid", "build", "farm"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}
