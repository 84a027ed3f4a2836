// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Match, MatchEventType, PendingLike, Profile, RankingWeights, ScoredCandidate, UserId, UserStats,
};
pub use requests::{
    BanRequest, FindPartnerRequest, ModeratorQuery, ModeratorRequest, RecordEventRequest,
    ReportRequest, RespondRequest, SaveProfileRequest, SwipeRequest, UserQuery,
};
pub use responses::{
    BanResponse, ErrorResponse, HealthResponse, MatchesResponse, ReportCountEntry,
    ReportCountsResponse,
};
