//! Duo Match - partner matching and moderation engine
//!
//! Ranks players by similarity, walks each user through a session-scoped
//! candidate queue, turns mutual likes into matches and keeps abusive users
//! out of the pool with reports, temporary bans and rate limits.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{EngineContext, EngineSettings, FindOutcome, MatchEngine, Next, Ranker, SwipeOutcome};
pub use error::{EngineError, Result};
pub use models::{Match, PendingLike, Profile, RankingWeights, UserId, UserStats};
pub use services::{InMemoryProfileStore, MatchNotifier, ProfileStore, TracingNotifier};
