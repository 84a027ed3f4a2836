// Core algorithm exports
pub mod engine;
pub mod guard;
pub mod likes;
pub mod limiter;
pub mod moderation;
pub mod queue;
pub mod ranker;
pub mod scoring;
pub mod session;
pub mod stats;

pub use engine::{
    Card, EngineContext, EngineSettings, FindOutcome, HousekeepingReport, MatchEngine, Next,
    SwipeOutcome,
};
pub use guard::{Denial, Guard, GuardChain, GuardContext, GuardDecision};
pub use likes::{LikeMatchEngine, LikeOutcome, RespondOutcome};
pub use limiter::{Action, RateDecision, RateLimiter, MAX_PERIOD_SECS};
pub use moderation::{ModerationEngine, ReportOutcome, MAX_BAN_DAYS};
pub use queue::SessionQueue;
pub use ranker::Ranker;
pub use scoring::calculate_similarity_score;
pub use session::{Session, SessionStore};
pub use stats::StatsBook;
