//! The matching engine facade.
//!
//! `MatchEngine` owns the like graph, the moderation state and the stats
//! book, and runs every user action through its guard chain before touching
//! the profile store or the session queues. Store calls are bounded by
//! `store_timeout`; a failed or slow call returns a retryable error before
//! anything is mutated.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::guard::{
    AdminOnly, Denial, GuardChain, GuardContext, GuardDecision, NotBanned, RateLimitGuard,
};
use crate::core::likes::{LikeMatchEngine, LikeOutcome, RespondOutcome};
use crate::core::limiter::{Action, RateLimiter};
use crate::core::moderation::{validate_ban_days, ModerationEngine, ReportOutcome};
use crate::core::ranker::Ranker;
use crate::core::session::{Session, SessionStore};
use crate::core::stats::StatsBook;
use crate::error::{EngineError, Result};
use crate::models::{Match, MatchEventType, PendingLike, Profile, RankingWeights, UserId, UserStats};
use crate::services::{MatchNotifier, ProfileStore, StoreError};

/// Tunables for a `MatchEngine`
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Queue builds allowed per user within `find_period_secs`
    pub find_limit: u32,
    pub find_period_secs: u64,
    /// Likes allowed per user within `like_period_secs`
    pub like_limit: u32,
    pub like_period_secs: u64,
    pub store_timeout: Duration,
    pub report_threshold: usize,
    pub moderators: Vec<UserId>,
    pub weights: RankingWeights,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            find_limit: 5,
            find_period_secs: 60,
            like_limit: 10,
            like_period_secs: 86_400,
            store_timeout: Duration::from_secs(3),
            report_threshold: 3,
            moderators: Vec::new(),
            weights: RankingWeights::default(),
        }
    }
}

/// Per-user state shared by every entry point: rate windows and live
/// sessions. Both are keyed by user id.
#[derive(Clone)]
pub struct EngineContext {
    pub limiter: Arc<RateLimiter>,
    pub sessions: SessionStore,
}

impl EngineContext {
    pub fn new(limiter: Arc<RateLimiter>, sessions: SessionStore) -> Self {
        Self { limiter, sessions }
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(Arc::new(RateLimiter::new()), SessionStore::default())
    }
}

/// A candidate as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub profile: Profile,
    /// 1-based position in the queue
    pub position: usize,
    /// Candidates left, this one included
    pub remaining: usize,
}

/// What the user sees after an action on their queue
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Next {
    Candidate(Card),
    /// Every queued candidate has been shown; `restart` rewinds
    Exhausted,
    /// No live session, the user has to search again
    NoSession,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FindOutcome {
    Candidate(Card),
    /// Queue built but every candidate was banned before it could be shown
    Exhausted,
    NoCandidates,
    /// The requesting user has no profile yet
    NoProfile,
    Denied(Denial),
}

/// Result of a like or dislike from the queue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwipeOutcome {
    pub like: Option<LikeOutcome>,
    /// Set when a guard refused the like; the card stays put
    pub denied: Option<Denial>,
    pub next: Next,
}

impl SwipeOutcome {
    fn no_session() -> Self {
        Self {
            like: None,
            denied: None,
            next: Next::NoSession,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HousekeepingReport {
    pub purged_windows: usize,
    pub lifted_bans: usize,
    /// Expired bans whose profile could not be reactivated yet
    pub deferred_bans: usize,
}

pub struct MatchEngine {
    store: Arc<dyn ProfileStore>,
    notifier: Arc<dyn MatchNotifier>,
    ranker: Ranker,
    context: EngineContext,
    likes: LikeMatchEngine,
    moderation: Arc<ModerationEngine>,
    stats: StatsBook,
    find_guards: GuardChain,
    like_guards: GuardChain,
    moderator_guards: GuardChain,
    store_timeout: Duration,
}

impl MatchEngine {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        notifier: Arc<dyn MatchNotifier>,
        context: EngineContext,
        settings: EngineSettings,
    ) -> Self {
        let moderation = Arc::new(ModerationEngine::new(settings.report_threshold));

        // Budget-consuming guards go last
        let find_guards = GuardChain::new()
            .with(NotBanned::new(moderation.clone()))
            .with(RateLimitGuard::new(
                context.limiter.clone(),
                Action::FindPartner,
                settings.find_limit,
                settings.find_period_secs,
            ));

        let like_guards = GuardChain::new()
            .with(NotBanned::new(moderation.clone()))
            .with(RateLimitGuard::new(
                context.limiter.clone(),
                Action::Like,
                settings.like_limit,
                settings.like_period_secs,
            ));

        let moderator_guards = GuardChain::new().with(AdminOnly::new(settings.moderators));

        Self {
            store,
            notifier,
            ranker: Ranker::new(settings.weights),
            context,
            likes: LikeMatchEngine::new(),
            moderation,
            stats: StatsBook::new(),
            find_guards,
            like_guards,
            moderator_guards,
            store_timeout: settings.store_timeout,
        }
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    pub fn moderation(&self) -> &ModerationEngine {
        &self.moderation
    }

    /// Build a fresh queue for `user` and show its first candidate
    pub async fn find_partner(&self, user: &UserId) -> Result<FindOutcome> {
        let now = Utc::now();
        if let GuardDecision::Deny(denial) = self.find_guards.check(&GuardContext { user, now }) {
            return Ok(FindOutcome::Denied(denial));
        }

        let (me, candidates) = match self.load_candidates(user).await {
            Ok(Some(loaded)) => loaded,
            Ok(None) => return Ok(FindOutcome::NoProfile),
            Err(e) => {
                // Nothing was built, so the attempt does not count
                self.context.limiter.refund(user, Action::FindPartner, now);
                return Err(e);
            }
        };
        let fetched = candidates.len();

        let eligible: Vec<Profile> = candidates
            .into_iter()
            .filter(|p| {
                p.is_active
                    && !self.moderation.is_banned_at(&p.user_id, now)
                    && !self.likes.is_matched(user, &p.user_id)
            })
            .collect();

        let ranked = self.ranker.rank(&me, eligible);

        if ranked.is_empty() {
            self.context.sessions.end(user).await;
            tracing::debug!(user_id = %user, fetched, "No candidates to queue");
            return Ok(FindOutcome::NoCandidates);
        }

        tracing::debug!(user_id = %user, fetched, queued = ranked.len(), "Session queue built");

        let handle = self
            .context
            .sessions
            .replace(user, Session::from_ranked(&me, ranked))
            .await;
        let mut session = handle.lock().await;

        Ok(match self.present(&mut session) {
            Next::Candidate(card) => FindOutcome::Candidate(card),
            _ => FindOutcome::Exhausted,
        })
    }

    /// Register or update `profile`.
    ///
    /// Verification and creation time carry over from the stored profile,
    /// and a user with a stored ban stays inactive.
    pub async fn save_profile(&self, mut profile: Profile) -> Result<Profile> {
        if profile.user_id.as_str().is_empty() {
            return Err(EngineError::InvalidInput("userId must not be empty".into()));
        }

        let existing = self
            .call_store("fetch_candidate", self.store.fetch_candidate(&profile.user_id))
            .await?;
        match existing {
            Some(stored) => {
                profile.is_verified = stored.is_verified;
                profile.created_at = stored.created_at.or(profile.created_at);
            }
            None => profile.created_at = profile.created_at.or_else(|| Some(Utc::now())),
        }
        profile.is_active = !self.moderation.has_ban_row(&profile.user_id);

        self.call_store("save_profile", self.store.save_profile(&profile))
            .await?;

        tracing::info!(user_id = %profile.user_id, active = profile.is_active, "Profile saved");
        Ok(profile)
    }

    /// Clear the user's like window so today's budget starts over
    pub fn reset_like_budget(&self, user: &UserId) -> bool {
        let reset = self.context.limiter.reset(user, Action::Like);
        tracing::info!(user_id = %user, reset, "Like budget reset");
        reset
    }

    /// The card currently shown to `user`
    pub async fn current(&self, user: &UserId) -> Next {
        match self.context.sessions.get(user).await {
            Some(handle) => {
                let mut session = handle.lock().await;
                self.present(&mut session)
            }
            None => Next::NoSession,
        }
    }

    /// Like `target` from the queue.
    ///
    /// The like is recorded even if `target` is no longer the current card;
    /// the queue only moves when it is.
    pub async fn like(&self, user: &UserId, target: &UserId) -> Result<SwipeOutcome> {
        if user == target {
            return Err(EngineError::InvalidInput("a user cannot like themselves".into()));
        }

        let handle = match self.context.sessions.get(user).await {
            Some(handle) => handle,
            None => return Ok(SwipeOutcome::no_session()),
        };
        let mut session = handle.lock().await;

        let now = Utc::now();
        if let GuardDecision::Deny(denial) = self.like_guards.check(&GuardContext { user, now }) {
            return Ok(SwipeOutcome {
                like: None,
                denied: Some(denial),
                next: self.present(&mut session),
            });
        }

        let outcome = self.likes.like_at(user, &session.owner_name, target, now)?;

        if session.queue.current() == Some(target) {
            session.queue.advance();
        }
        let next = self.present(&mut session);
        drop(session);

        self.announce(&outcome).await;

        Ok(SwipeOutcome {
            like: Some(outcome),
            denied: None,
            next,
        })
    }

    /// Pass on `target`. No edge is stored, so they may show up again in a
    /// later queue.
    pub async fn dislike(&self, user: &UserId, target: &UserId) -> SwipeOutcome {
        let handle = match self.context.sessions.get(user).await {
            Some(handle) => handle,
            None => return SwipeOutcome::no_session(),
        };
        let mut session = handle.lock().await;

        if session.queue.current() == Some(target) {
            session.queue.advance();
            self.stats.record(user, MatchEventType::Passed);
        }

        SwipeOutcome {
            like: None,
            denied: None,
            next: self.present(&mut session),
        }
    }

    /// Rewind the queue to its first candidate without re-ranking
    pub async fn restart(&self, user: &UserId) -> Next {
        match self.context.sessions.get(user).await {
            Some(handle) => {
                let mut session = handle.lock().await;
                session.queue.restart();
                self.present(&mut session)
            }
            None => Next::NoSession,
        }
    }

    pub async fn end_session(&self, user: &UserId) -> bool {
        self.context.sessions.end(user).await
    }

    /// Answer a pending like from the inbox
    pub async fn respond(
        &self,
        responder: &UserId,
        original_liker: &UserId,
        accept: bool,
    ) -> Result<RespondOutcome> {
        let outcome = self.likes.respond(responder, original_liker, accept)?;

        if let RespondOutcome::Matched(m) = &outcome {
            self.stats.record(responder, MatchEventType::Liked);
            self.announce_match(m).await;
        }

        Ok(outcome)
    }

    pub fn inbox(&self, user: &UserId) -> Vec<PendingLike> {
        self.likes.inbox(user)
    }

    pub fn matches(&self, user: &UserId) -> Vec<UserId> {
        self.likes.matches_of(user)
    }

    pub async fn report(&self, reporter: &UserId, reported: &UserId) -> ReportOutcome {
        let outcome = self.moderation.report(reporter, reported);

        if let ReportOutcome::Filed { count, escalate: true } = outcome {
            if let Err(e) = self.notifier.notify_moderators(reported, count).await {
                tracing::warn!(user_id = %reported, error = %e, "Moderator notification failed");
            }
        }

        outcome
    }

    pub fn report_counts(&self, moderator: &UserId) -> Result<Vec<(UserId, usize)>> {
        self.authorize(moderator)?;
        Ok(self.moderation.report_counts())
    }

    /// Ban `user` for `duration_days`.
    ///
    /// The profile is deactivated in the store first; the ban is recorded
    /// only once that succeeded, and the user's session is dropped.
    pub async fn ban(
        &self,
        moderator: &UserId,
        user: &UserId,
        duration_days: u32,
    ) -> Result<DateTime<Utc>> {
        self.authorize(moderator)?;
        validate_ban_days(duration_days)?;

        self.call_store("set_active", self.store.set_active(user, false))
            .await?;

        let expires_at = self.moderation.ban(user, duration_days)?;
        self.context.sessions.end(user).await;

        tracing::info!(moderator = %moderator, user_id = %user, expires_at = %expires_at, "Ban applied");
        Ok(expires_at)
    }

    /// Lift a ban and reactivate the profile. Reports are kept.
    ///
    /// A user without a ban row is left untouched.
    pub async fn unban(&self, moderator: &UserId, user: &UserId) -> Result<bool> {
        self.authorize(moderator)?;

        if !self.moderation.has_ban_row(user) {
            return Ok(false);
        }

        // Reactivate first: while the row exists ranking still hides the user
        self.call_store("set_active", self.store.set_active(user, true))
            .await?;

        Ok(self.moderation.unban(user))
    }

    pub fn clear_reports(&self, moderator: &UserId, user: &UserId) -> Result<usize> {
        self.authorize(moderator)?;
        Ok(self.moderation.clear_reports(user))
    }

    pub fn is_banned(&self, user: &UserId) -> bool {
        self.moderation.is_banned(user)
    }

    pub fn stats(&self, user: &UserId) -> UserStats {
        self.stats.stats(user)
    }

    /// Count an event observed by the delivery layer
    pub fn record_event(&self, user: &UserId, event: MatchEventType) {
        self.stats.record(user, event);
    }

    /// Purge decayed rate windows and lift expired bans.
    ///
    /// An expired ban row is removed only after its profile was reactivated,
    /// so a store failure leaves it for the next pass.
    pub async fn housekeeping(&self, now: DateTime<Utc>) -> HousekeepingReport {
        let mut report = HousekeepingReport {
            purged_windows: self.context.limiter.purge_expired(now),
            ..Default::default()
        };

        for user in self.moderation.expired_bans(now) {
            match self
                .call_store("set_active", self.store.set_active(&user, true))
                .await
            {
                Ok(()) => {
                    if self.moderation.remove_if_expired(&user, now) {
                        report.lifted_bans += 1;
                    }
                }
                Err(_) => report.deferred_bans += 1,
            }
        }

        if report != HousekeepingReport::default() {
            tracing::info!(
                purged_windows = report.purged_windows,
                lifted_bans = report.lifted_bans,
                deferred_bans = report.deferred_bans,
                "Housekeeping pass"
            );
        }

        report
    }

    /// Run `housekeeping` every `every` until the task is aborted
    pub fn spawn_housekeeping(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.housekeeping(Utc::now()).await;
            }
        })
    }

    /// The caller's profile and the store's eligible candidates
    async fn load_candidates(&self, user: &UserId) -> Result<Option<(Profile, Vec<Profile>)>> {
        let me = match self
            .call_store("fetch_candidate", self.store.fetch_candidate(user))
            .await?
        {
            Some(profile) => profile,
            None => return Ok(None),
        };

        let candidates = self
            .call_store("fetch_eligible_candidates", self.store.fetch_eligible_candidates(user))
            .await?;

        Ok(Some((me, candidates)))
    }

    fn authorize(&self, moderator: &UserId) -> Result<()> {
        match self.moderator_guards.check(&GuardContext::new(moderator)) {
            GuardDecision::Allow => Ok(()),
            GuardDecision::Deny(_) => Err(EngineError::Forbidden(format!(
                "{} is not a moderator",
                moderator
            ))),
        }
    }

    /// Skip candidates banned since the queue was built and describe the
    /// card under the cursor
    fn present(&self, session: &mut Session) -> Next {
        let now = Utc::now();
        let moderation = &self.moderation;

        let current = session
            .queue
            .skip_while(|id| moderation.is_banned_at(id, now))
            .cloned();

        match current.and_then(|id| session.profile(&id).cloned()) {
            Some(profile) => Next::Candidate(Card {
                profile,
                position: session.queue.position() + 1,
                remaining: session.queue.remaining(),
            }),
            None => Next::Exhausted,
        }
    }

    async fn announce(&self, outcome: &LikeOutcome) {
        match outcome {
            LikeOutcome::PendingCreated(pending) => {
                self.stats.record(&pending.liker, MatchEventType::Liked);
                if let Err(e) = self.notifier.notify_like(pending).await {
                    tracing::warn!(recipient = %pending.recipient, error = %e, "Like notification failed");
                }
            }
            LikeOutcome::Matched(m) => {
                self.stats.record(&m.liker, MatchEventType::Liked);
                self.announce_match(m).await;
            }
            LikeOutcome::AlreadyPending | LikeOutcome::AlreadyMatched(_) => {}
        }
    }

    async fn announce_match(&self, m: &Match) {
        self.stats.record(&m.liker, MatchEventType::Matched);
        self.stats.record(&m.liked, MatchEventType::Matched);

        if let Err(e) = self.notifier.notify_match(m).await {
            tracing::warn!(liker = %m.liker, liked = %m.liked, error = %e, "Match notification failed");
        }
    }

    async fn call_store<T, F>(&self, op: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(op, error = %e, "Profile store call failed");
                Err(e.into())
            }
            Err(_) => {
                let timeout_ms = self.store_timeout.as_millis() as u64;
                tracing::warn!(op, timeout_ms, "Profile store call timed out");
                Err(EngineError::StoreTimeout(timeout_ms))
            }
        }
    }
}
