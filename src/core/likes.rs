//! Directional likes, mutual-match detection and the pending-likes inbox.
//!
//! Both directions of a pair live under one map entry keyed by the
//! unordered pair. Inserting an edge and checking for its reverse happen
//! under that entry's lock, so when two users like each other at the same
//! moment exactly one of the calls observes the completed pair and reports
//! the match.
//!
//! Lock order is always edge entry, then inbox, then match index.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::models::{Match, PendingLike, UserId};

/// Result of a like
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LikeOutcome {
    /// This like completed the pair; the caller notifies both sides
    Matched(Match),
    /// One-sided like, now waiting in the recipient's inbox
    PendingCreated(PendingLike),
    /// The same like is already waiting in the recipient's inbox
    AlreadyPending,
    /// The pair matched earlier; nothing changed
    AlreadyMatched(Match),
}

/// Result of answering an inbox entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RespondOutcome {
    Matched(Match),
    Dismissed,
    /// The entry was already consumed (or never existed)
    AlreadyProcessed,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PairKey {
    low: UserId,
    high: UserId,
}

impl PairKey {
    /// Normalize the pair and report whether `from` is the low side
    fn directed(from: &UserId, to: &UserId) -> (Self, bool) {
        if from <= to {
            (Self { low: from.clone(), high: to.clone() }, true)
        } else {
            (Self { low: to.clone(), high: from.clone() }, false)
        }
    }
}

#[derive(Debug, Default)]
struct PairState {
    low_likes_high: bool,
    high_likes_low: bool,
    matched: Option<Match>,
}

impl PairState {
    fn set(&mut self, from_low: bool) {
        if from_low {
            self.low_likes_high = true;
        } else {
            self.high_likes_low = true;
        }
    }

    fn both(&self) -> bool {
        self.low_likes_high && self.high_likes_low
    }
}

enum EdgeInsert {
    Completed(Match),
    AlreadyMatched(Match),
    Open { pending_created: bool },
}

/// Like graph with inbox and match index
#[derive(Default)]
pub struct LikeMatchEngine {
    edges: DashMap<PairKey, PairState>,
    /// Pending likes keyed by recipient, oldest first
    inbox: DashMap<UserId, Vec<PendingLike>>,
    /// Matched partners per user
    matches: DashMap<UserId, Vec<UserId>>,
}

impl LikeMatchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `liker -> liked` and report whether it completed a match
    pub fn like(&self, liker: &UserId, liker_name: &str, liked: &UserId) -> Result<LikeOutcome> {
        self.like_at(liker, liker_name, liked, Utc::now())
    }

    pub fn like_at(
        &self,
        liker: &UserId,
        liker_name: &str,
        liked: &UserId,
        now: DateTime<Utc>,
    ) -> Result<LikeOutcome> {
        if liker == liked {
            return Err(EngineError::InvalidInput("a user cannot like themselves".into()));
        }

        let pending = PendingLike {
            liker: liker.clone(),
            recipient: liked.clone(),
            liker_name: liker_name.to_string(),
            created_at: now,
        };

        let outcome = match self.insert_and_check(liker, liked, Some(pending.clone()), now) {
            EdgeInsert::Completed(m) => {
                tracing::info!(liker = %liker, liked = %liked, "Mutual match");
                LikeOutcome::Matched(m)
            }
            EdgeInsert::AlreadyMatched(m) => LikeOutcome::AlreadyMatched(m),
            EdgeInsert::Open { pending_created: true } => {
                tracing::debug!(liker = %liker, liked = %liked, "Pending like created");
                LikeOutcome::PendingCreated(pending)
            }
            EdgeInsert::Open { pending_created: false } => LikeOutcome::AlreadyPending,
        };

        Ok(outcome)
    }

    /// Answer the pending like `original_liker -> responder`
    ///
    /// The entry is consumed before anything else, so a second answer to
    /// the same entry is a no-op.
    pub fn respond(
        &self,
        responder: &UserId,
        original_liker: &UserId,
        accept: bool,
    ) -> Result<RespondOutcome> {
        if self.take_pending(responder, original_liker).is_none() {
            tracing::debug!(
                responder = %responder,
                liker = %original_liker,
                "Response to a pending like that is already processed"
            );
            return Ok(RespondOutcome::AlreadyProcessed);
        }

        if !accept {
            tracing::debug!(responder = %responder, liker = %original_liker, "Pending like dismissed");
            return Ok(RespondOutcome::Dismissed);
        }

        // The reverse edge exists whenever a pending entry did, so this completes the pair
        match self.insert_and_check(responder, original_liker, None, Utc::now()) {
            EdgeInsert::Completed(m) => {
                tracing::info!(liker = %responder, liked = %original_liker, "Mutual match from inbox");
                Ok(RespondOutcome::Matched(m))
            }
            // A swipe completed the pair after this entry was taken; it
            // already reported the match
            EdgeInsert::AlreadyMatched(_) => Ok(RespondOutcome::AlreadyProcessed),
            EdgeInsert::Open { .. } => {
                tracing::warn!(
                    responder = %responder,
                    liker = %original_liker,
                    "Pending like had no matching edge"
                );
                Ok(RespondOutcome::Dismissed)
            }
        }
    }

    /// Pending likes addressed to `user`, oldest first
    pub fn inbox(&self, user: &UserId) -> Vec<PendingLike> {
        self.inbox
            .get(user)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Partners `user` has matched with, in match order
    pub fn matches_of(&self, user: &UserId) -> Vec<UserId> {
        self.matches
            .get(user)
            .map(|partners| partners.clone())
            .unwrap_or_default()
    }

    pub fn is_matched(&self, a: &UserId, b: &UserId) -> bool {
        let (key, _) = PairKey::directed(a, b);
        self.edges
            .get(&key)
            .map(|state| state.matched.is_some())
            .unwrap_or(false)
    }

    fn insert_and_check(
        &self,
        liker: &UserId,
        liked: &UserId,
        pending: Option<PendingLike>,
        now: DateTime<Utc>,
    ) -> EdgeInsert {
        let (key, from_low) = PairKey::directed(liker, liked);
        let mut state = self.edges.entry(key).or_default();

        if let Some(existing) = &state.matched {
            return EdgeInsert::AlreadyMatched(existing.clone());
        }

        state.set(from_low);

        if state.both() {
            let matched = Match {
                id: Uuid::new_v4(),
                liker: liker.clone(),
                liked: liked.clone(),
                matched_at: now,
            };
            state.matched = Some(matched.clone());

            // The liker has now answered any like waiting in their own inbox
            self.take_pending(liker, liked);
            self.index_match(liker, liked);

            return EdgeInsert::Completed(matched);
        }

        let pending_created = pending.map(|p| self.insert_pending(p)).unwrap_or(false);
        EdgeInsert::Open { pending_created }
    }

    /// Add an inbox entry unless one from the same liker is waiting
    fn insert_pending(&self, pending: PendingLike) -> bool {
        let mut entries = self.inbox.entry(pending.recipient.clone()).or_default();
        if entries.iter().any(|p| p.liker == pending.liker) {
            return false;
        }
        entries.push(pending);
        true
    }

    fn take_pending(&self, recipient: &UserId, liker: &UserId) -> Option<PendingLike> {
        let mut entries = self.inbox.get_mut(recipient)?;
        let index = entries.iter().position(|p| &p.liker == liker)?;
        Some(entries.remove(index))
    }

    fn index_match(&self, a: &UserId, b: &UserId) {
        self.matches.entry(a.clone()).or_default().push(b.clone());
        self.matches.entry(b.clone()).or_default().push(a.clone());
    }
}
