//! Sliding-window rate limiter.
//!
//! Each (user, action) key keeps the timestamps of its admitted calls inside
//! the trailing period. Windows live in a sharded map so an `allow` on one
//! key never waits on an unrelated key, and decayed windows are swept at
//! most once per purge interval.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::models::UserId;

/// Longest window a key can be given; longer periods are clamped to it
pub const MAX_PERIOD_SECS: u64 = 366 * 86_400;

/// Actions guarded by the limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Building a fresh candidate queue
    FindPartner,
    /// Sending a like from the swipe queue
    Like,
}

/// Outcome of a limiter check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey {
    user: UserId,
    action: Action,
}

#[derive(Debug)]
struct Window {
    period: Duration,
    hits: VecDeque<DateTime<Utc>>,
}

impl Window {
    fn new(period: Duration) -> Self {
        Self {
            period,
            hits: VecDeque::new(),
        }
    }

    /// Drop hits at or before `now - keep_for`. A cutoff before the
    /// representable range keeps every hit.
    fn prune(&mut self, now: DateTime<Utc>, keep_for: Duration) {
        let Some(cutoff) = now.checked_sub_signed(keep_for) else {
            return;
        };
        while self.hits.front().is_some_and(|hit| *hit <= cutoff) {
            self.hits.pop_front();
        }
    }
}

fn period_of(period_secs: u64) -> Duration {
    Duration::try_seconds(period_secs.min(MAX_PERIOD_SECS) as i64).unwrap_or(Duration::zero())
}

/// Per (user, action) sliding-window limiter
pub struct RateLimiter {
    windows: DashMap<WindowKey, Window>,
    /// Unix millis of the last sweep
    last_purge: AtomicI64,
    purge_interval: Duration,
    /// Minimum age before a hit counts as decayed
    retention: Duration,
}

impl RateLimiter {
    /// Create a limiter with a 5 minute sweep interval and 1 hour retention
    pub fn new() -> Self {
        Self::with_purge_interval(Duration::minutes(5))
    }

    pub fn with_purge_interval(purge_interval: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            last_purge: AtomicI64::new(Utc::now().timestamp_millis()),
            purge_interval,
            retention: Duration::hours(1),
        }
    }

    /// Admit the call if fewer than `limit` calls happened in the last `period_secs`
    pub fn allow(&self, user: &UserId, action: Action, limit: u32, period_secs: u64) -> bool {
        self.check_at(user, action, limit, period_secs, Utc::now())
            .is_allowed()
    }

    /// `allow` evaluated at an explicit instant
    pub fn allow_at(
        &self,
        user: &UserId,
        action: Action,
        limit: u32,
        period_secs: u64,
        now: DateTime<Utc>,
    ) -> bool {
        self.check_at(user, action, limit, period_secs, now)
            .is_allowed()
    }

    /// Check and, when admitted, record the call at `now`
    ///
    /// A denied call is not recorded.
    pub fn check_at(
        &self,
        user: &UserId,
        action: Action,
        limit: u32,
        period_secs: u64,
        now: DateTime<Utc>,
    ) -> RateDecision {
        let period = period_of(period_secs);
        let key = WindowKey {
            user: user.clone(),
            action,
        };

        let decision = {
            let mut window = self
                .windows
                .entry(key)
                .or_insert_with(|| Window::new(period));
            window.period = period;
            window.prune(now, period);

            if window.hits.len() >= limit as usize {
                let retry_after_secs = window
                    .hits
                    .front()
                    .and_then(|oldest| oldest.checked_add_signed(period))
                    .map(|free_at| (free_at - now).num_seconds().max(1) as u64)
                    .unwrap_or(period.num_seconds().max(1) as u64);
                RateDecision::Limited { retry_after_secs }
            } else {
                window.hits.push_back(now);
                RateDecision::Allowed
            }
        };

        // Entry guard is released above; the sweep takes shard locks itself
        self.maybe_purge(now);

        if let RateDecision::Limited { retry_after_secs } = decision {
            tracing::debug!(
                user_id = %user,
                action = ?action,
                retry_after_secs,
                "Rate limit reached"
            );
        }

        decision
    }

    /// Take back the hit recorded at `at`, for a call that was admitted but
    /// then failed before doing anything. Returns whether a hit was removed.
    pub fn refund(&self, user: &UserId, action: Action, at: DateTime<Utc>) -> bool {
        let key = WindowKey {
            user: user.clone(),
            action,
        };
        let Some(mut window) = self.windows.get_mut(&key) else {
            return false;
        };
        match window.hits.iter().rposition(|hit| *hit == at) {
            Some(index) => window.hits.remove(index).is_some(),
            None => false,
        }
    }

    /// Forget the window for one key. Returns whether one existed.
    pub fn reset(&self, user: &UserId, action: Action) -> bool {
        let key = WindowKey {
            user: user.clone(),
            action,
        };
        self.windows.remove(&key).is_some()
    }

    /// Sweep decayed hits from every window and drop the empty ones.
    ///
    /// Returns the number of windows removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        let retention = self.retention;

        self.windows.retain(|_, window| {
            let keep_for = if window.period > retention { window.period } else { retention };
            window.prune(now, keep_for);
            !window.hits.is_empty()
        });

        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            tracing::debug!("Purged {} decayed rate limit windows", removed);
        }
        removed
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    fn maybe_purge(&self, now: DateTime<Utc>) {
        let now_ms = now.timestamp_millis();
        let last = self.last_purge.load(Ordering::Acquire);

        if now_ms - last < self.purge_interval.num_milliseconds() {
            return;
        }

        // Only the caller that wins the swap runs the sweep
        if self
            .last_purge
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.purge_expired(now);
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    #[test]
    fn allows_exactly_limit_within_window() {
        let limiter = RateLimiter::new();
        let start = Utc::now();
        let u = user("u1");

        for i in 0..5 {
            assert!(limiter.allow_at(&u, Action::FindPartner, 5, 60, start + Duration::seconds(i)));
        }
        assert!(!limiter.allow_at(&u, Action::FindPartner, 5, 60, start + Duration::seconds(10)));

        // Once the whole window has elapsed the call is admitted again
        assert!(limiter.allow_at(&u, Action::FindPartner, 5, 60, start + Duration::seconds(65)));
    }

    #[test]
    fn window_slides_one_hit_at_a_time() {
        let limiter = RateLimiter::new();
        let start = Utc::now();
        let u = user("u1");

        assert!(limiter.allow_at(&u, Action::FindPartner, 2, 60, start));
        assert!(limiter.allow_at(&u, Action::FindPartner, 2, 60, start + Duration::seconds(30)));
        assert!(!limiter.allow_at(&u, Action::FindPartner, 2, 60, start + Duration::seconds(59)));

        // First hit leaves the window, second is still inside
        assert!(limiter.allow_at(&u, Action::FindPartner, 2, 60, start + Duration::seconds(61)));
        assert!(!limiter.allow_at(&u, Action::FindPartner, 2, 60, start + Duration::seconds(62)));
    }

    #[test]
    fn denied_calls_are_not_recorded() {
        let limiter = RateLimiter::new();
        let start = Utc::now();
        let u = user("u1");

        assert!(limiter.allow_at(&u, Action::Like, 1, 60, start));
        for i in 1..20 {
            assert!(!limiter.allow_at(&u, Action::Like, 1, 60, start + Duration::seconds(i)));
        }
        // Had the denials been recorded this would still be limited
        assert!(limiter.allow_at(&u, Action::Like, 1, 60, start + Duration::seconds(61)));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new();
        let now = Utc::now();

        assert!(limiter.allow_at(&user("a"), Action::FindPartner, 1, 60, now));
        assert!(!limiter.allow_at(&user("a"), Action::FindPartner, 1, 60, now));
        assert!(limiter.allow_at(&user("a"), Action::Like, 1, 60, now));
        assert!(limiter.allow_at(&user("b"), Action::FindPartner, 1, 60, now));
    }

    #[test]
    fn retry_after_points_at_oldest_hit() {
        let limiter = RateLimiter::new();
        let start = Utc::now();
        let u = user("u1");

        limiter.check_at(&u, Action::FindPartner, 1, 60, start);
        let decision = limiter.check_at(&u, Action::FindPartner, 1, 60, start + Duration::seconds(20));

        assert_eq!(decision, RateDecision::Limited { retry_after_secs: 40 });
    }

    #[test]
    fn reset_clears_window() {
        let limiter = RateLimiter::new();
        let now = Utc::now();
        let u = user("u1");

        assert!(limiter.allow_at(&u, Action::Like, 1, 86_400, now));
        assert!(!limiter.allow_at(&u, Action::Like, 1, 86_400, now));
        assert!(limiter.reset(&u, Action::Like));
        assert!(limiter.allow_at(&u, Action::Like, 1, 86_400, now));
    }

    #[test]
    fn huge_periods_are_clamped() {
        let limiter = RateLimiter::new();
        let now = Utc::now();
        let u = user("u1");

        assert!(limiter.allow_at(&u, Action::Like, 1, u64::MAX, now));
        assert!(limiter.allow_at(&u, Action::FindPartner, 1, 10_000_000_000_000, now));

        assert_eq!(
            limiter.check_at(&u, Action::Like, 1, u64::MAX, now + Duration::seconds(1)),
            RateDecision::Limited { retry_after_secs: MAX_PERIOD_SECS - 1 }
        );
        assert!(!limiter.allow_at(&u, Action::FindPartner, 1, 10_000_000_000_000, now));
        assert_eq!(limiter.purge_expired(now + Duration::days(30)), 0);
    }

    #[test]
    fn window_near_the_start_of_time_keeps_hits() {
        let limiter = RateLimiter::new();
        let u = user("u1");
        let early = DateTime::<Utc>::MIN_UTC + Duration::seconds(10);

        assert!(limiter.allow_at(&u, Action::Like, 1, 86_400, early));
        assert!(!limiter.allow_at(&u, Action::Like, 1, 86_400, early + Duration::seconds(1)));
    }

    #[test]
    fn refund_returns_the_slot() {
        let limiter = RateLimiter::new();
        let now = Utc::now();
        let u = user("u1");

        assert!(limiter.allow_at(&u, Action::FindPartner, 1, 60, now));
        assert!(limiter.refund(&u, Action::FindPartner, now));
        assert!(!limiter.refund(&u, Action::FindPartner, now));
        assert!(limiter.allow_at(&u, Action::FindPartner, 1, 60, now + Duration::seconds(1)));
    }

    #[test]
    fn purge_drops_decayed_windows_only() {
        // Keep the opportunistic sweep out of the way
        let limiter = RateLimiter::with_purge_interval(Duration::days(365));
        let start = Utc::now();

        limiter.allow_at(&user("old"), Action::FindPartner, 5, 60, start);
        limiter.allow_at(&user("daily"), Action::Like, 10, 86_400, start);
        limiter.allow_at(&user("fresh"), Action::FindPartner, 5, 60, start + Duration::minutes(90));

        let removed = limiter.purge_expired(start + Duration::minutes(90));

        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_keys(), 2);
        // The daily window keeps its hit until its own period passes
        assert!(!limiter.allow_at(&user("daily"), Action::Like, 1, 86_400, start + Duration::minutes(90)));
    }

    #[test]
    fn sweep_runs_opportunistically_after_interval() {
        let limiter = RateLimiter::with_purge_interval(Duration::minutes(5));
        let start = Utc::now();

        limiter.allow_at(&user("stale"), Action::FindPartner, 5, 60, start);
        assert_eq!(limiter.tracked_keys(), 1);

        // Two hours later an unrelated call triggers the sweep
        limiter.allow_at(&user("other"), Action::FindPartner, 5, 60, start + Duration::hours(2));
        assert_eq!(limiter.tracked_keys(), 1);
    }
}
