//! Pre-operation checks.
//!
//! A `GuardChain` runs its guards in order and stops at the first denial.
//! Guards that consume budget (the rate-limit guard records the call when it
//! admits it) belong at the end of the chain.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::limiter::{Action, RateDecision, RateLimiter};
use crate::core::moderation::ModerationEngine;
use crate::models::UserId;

/// What a guard looks at
#[derive(Debug, Clone, Copy)]
pub struct GuardContext<'a> {
    pub user: &'a UserId,
    pub now: DateTime<Utc>,
}

impl<'a> GuardContext<'a> {
    pub fn new(user: &'a UserId) -> Self {
        Self { user, now: Utc::now() }
    }
}

/// Why an operation was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Denial {
    Banned { until: DateTime<Utc> },
    RateLimited { retry_after_secs: u64 },
    NotAdmin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Deny(Denial),
}

pub trait Guard: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &GuardContext<'_>) -> GuardDecision;
}

/// Refuses users under an active ban
pub struct NotBanned {
    moderation: Arc<ModerationEngine>,
}

impl NotBanned {
    pub fn new(moderation: Arc<ModerationEngine>) -> Self {
        Self { moderation }
    }
}

impl Guard for NotBanned {
    fn name(&self) -> &'static str {
        "not_banned"
    }

    fn check(&self, ctx: &GuardContext<'_>) -> GuardDecision {
        match self.moderation.banned_until(ctx.user, ctx.now) {
            Some(until) => GuardDecision::Deny(Denial::Banned { until }),
            None => GuardDecision::Allow,
        }
    }
}

/// Sliding-window budget for one action
pub struct RateLimitGuard {
    limiter: Arc<RateLimiter>,
    action: Action,
    limit: u32,
    period_secs: u64,
}

impl RateLimitGuard {
    pub fn new(limiter: Arc<RateLimiter>, action: Action, limit: u32, period_secs: u64) -> Self {
        Self {
            limiter,
            action,
            limit,
            period_secs,
        }
    }
}

impl Guard for RateLimitGuard {
    fn name(&self) -> &'static str {
        match self.action {
            Action::FindPartner => "find_partner_rate",
            Action::Like => "daily_likes",
        }
    }

    fn check(&self, ctx: &GuardContext<'_>) -> GuardDecision {
        match self
            .limiter
            .check_at(ctx.user, self.action, self.limit, self.period_secs, ctx.now)
        {
            RateDecision::Allowed => GuardDecision::Allow,
            RateDecision::Limited { retry_after_secs } => {
                GuardDecision::Deny(Denial::RateLimited { retry_after_secs })
            }
        }
    }
}

/// Admits only configured moderators
pub struct AdminOnly {
    admins: HashSet<UserId>,
}

impl AdminOnly {
    pub fn new<I>(admins: I) -> Self
    where
        I: IntoIterator<Item = UserId>,
    {
        Self {
            admins: admins.into_iter().collect(),
        }
    }
}

impl Guard for AdminOnly {
    fn name(&self) -> &'static str {
        "admin_only"
    }

    fn check(&self, ctx: &GuardContext<'_>) -> GuardDecision {
        if self.admins.contains(ctx.user) {
            GuardDecision::Allow
        } else {
            GuardDecision::Deny(Denial::NotAdmin)
        }
    }
}

/// Ordered guard list, first denial wins
#[derive(Default)]
pub struct GuardChain {
    guards: Vec<Box<dyn Guard>>,
}

impl GuardChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<G: Guard + 'static>(mut self, guard: G) -> Self {
        self.guards.push(Box::new(guard));
        self
    }

    pub fn check(&self, ctx: &GuardContext<'_>) -> GuardDecision {
        for guard in &self.guards {
            if let GuardDecision::Deny(denial) = guard.check(ctx) {
                tracing::debug!(user_id = %ctx.user, guard = guard.name(), ?denial, "Guard denied");
                return GuardDecision::Deny(denial);
            }
        }
        GuardDecision::Allow
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}
