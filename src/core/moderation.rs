use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::models::UserId;

/// Longest ban a moderator may hand out
pub const MAX_BAN_DAYS: u32 = 3650;

/// Result of filing a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    /// New distinct reporter. `escalate` is set on the report that
    /// reaches the moderator threshold.
    Filed { count: usize, escalate: bool },
    /// This reporter already reported the target
    Duplicate { count: usize },
    /// Self-reports are ignored
    Ignored,
}

/// Reject ban durations outside `1..=MAX_BAN_DAYS`
pub fn validate_ban_days(duration_days: u32) -> Result<()> {
    if duration_days == 0 || duration_days > MAX_BAN_DAYS {
        return Err(EngineError::InvalidInput(format!(
            "ban duration must be between 1 and {} days, got {}",
            MAX_BAN_DAYS, duration_days
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct ReportEntry {
    reporters: Vec<UserId>,
}

/// Report aggregation and temporary bans
///
/// Bans are stored as expiry instants and evaluated against the clock on
/// every read; expired rows linger until housekeeping removes them. Reports
/// are an audit trail independent of bans: unbanning keeps them.
pub struct ModerationEngine {
    /// Reports keyed by reported user
    reports: DashMap<UserId, ReportEntry>,
    /// Ban expiry per user
    bans: DashMap<UserId, DateTime<Utc>>,
    report_threshold: usize,
}

impl ModerationEngine {
    pub fn new(report_threshold: usize) -> Self {
        Self {
            reports: DashMap::new(),
            bans: DashMap::new(),
            report_threshold: report_threshold.max(1),
        }
    }

    pub fn report(&self, reporter: &UserId, reported: &UserId) -> ReportOutcome {
        if reporter == reported {
            return ReportOutcome::Ignored;
        }

        let mut entry = self.reports.entry(reported.clone()).or_default();

        if entry.reporters.contains(reporter) {
            return ReportOutcome::Duplicate {
                count: entry.reporters.len(),
            };
        }

        entry.reporters.push(reporter.clone());

        let count = entry.reporters.len();
        let escalate = count == self.report_threshold;

        if escalate {
            tracing::warn!(user_id = %reported, count, "Report threshold reached");
        } else {
            tracing::debug!(user_id = %reported, reporter = %reporter, count, "Report filed");
        }

        ReportOutcome::Filed { count, escalate }
    }

    /// Distinct-reporter counts, highest first (ties by user id)
    pub fn report_counts(&self) -> Vec<(UserId, usize)> {
        let mut counts: Vec<(UserId, usize)> = self
            .reports
            .iter()
            .map(|entry| (entry.key().clone(), entry.reporters.len()))
            .filter(|(_, count)| *count > 0)
            .collect();

        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    pub fn report_count(&self, user: &UserId) -> usize {
        self.reports.get(user).map(|e| e.reporters.len()).unwrap_or(0)
    }

    /// Remove all reports against `user`. Returns how many were dropped.
    pub fn clear_reports(&self, user: &UserId) -> usize {
        let cleared = self
            .reports
            .remove(user)
            .map(|(_, entry)| entry.reporters.len())
            .unwrap_or(0);

        if cleared > 0 {
            tracing::info!(user_id = %user, cleared, "Reports cleared");
        }
        cleared
    }

    /// Ban `user` for `duration_days`, replacing any existing ban.
    ///
    /// Returns the expiry. Deactivating the profile in the store is the
    /// caller's half of the operation.
    pub fn ban(&self, user: &UserId, duration_days: u32) -> Result<DateTime<Utc>> {
        self.ban_at(user, duration_days, Utc::now())
    }

    pub fn ban_at(&self, user: &UserId, duration_days: u32, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        validate_ban_days(duration_days)?;

        let expires_at = now + Duration::days(duration_days as i64);
        self.bans.insert(user.clone(), expires_at);

        tracing::warn!(user_id = %user, duration_days, expires_at = %expires_at, "User banned");
        Ok(expires_at)
    }

    /// Lift a ban. Reports are kept. Returns whether a ban row existed.
    pub fn unban(&self, user: &UserId) -> bool {
        let existed = self.bans.remove(user).is_some();
        if existed {
            tracing::info!(user_id = %user, "User unbanned");
        }
        existed
    }

    pub fn is_banned(&self, user: &UserId) -> bool {
        self.is_banned_at(user, Utc::now())
    }

    pub fn is_banned_at(&self, user: &UserId, now: DateTime<Utc>) -> bool {
        self.banned_until(user, now).is_some()
    }

    /// Expiry of the ban in force at `now`, if any
    pub fn banned_until(&self, user: &UserId, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.bans
            .get(user)
            .map(|expiry| *expiry)
            .filter(|expiry| now < *expiry)
    }

    /// Users whose ban row has expired by `now` but is still stored
    pub fn expired_bans(&self, now: DateTime<Utc>) -> Vec<UserId> {
        self.bans
            .iter()
            .filter(|entry| now >= *entry.value())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Delete the ban row of `user` if it has expired by `now`.
    ///
    /// A ban reissued in the meantime is left alone.
    pub fn remove_if_expired(&self, user: &UserId, now: DateTime<Utc>) -> bool {
        self.bans.remove_if(user, |_, expiry| now >= *expiry).is_some()
    }

    /// Whether a ban row is stored for `user`, expired or not
    pub fn has_ban_row(&self, user: &UserId) -> bool {
        self.bans.contains_key(user)
    }
}

impl Default for ModerationEngine {
    fn default() -> Self {
        Self::new(3)
    }
}
