use dashmap::DashMap;

use crate::models::{MatchEventType, UserId, UserStats};

/// Per-user interaction counters
#[derive(Default)]
pub struct StatsBook {
    counters: DashMap<UserId, UserStats>,
}

impl StatsBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, user: &UserId, event: MatchEventType) {
        let mut stats = self.counters.entry(user.clone()).or_default();
        match event {
            MatchEventType::Viewed => stats.viewed += 1,
            MatchEventType::Liked => stats.likes_given += 1,
            MatchEventType::Passed => stats.passed += 1,
            MatchEventType::Matched => stats.matches += 1,
        }
    }

    pub fn stats(&self, user: &UserId) -> UserStats {
        self.counters.get(user).map(|s| *s).unwrap_or_default()
    }
}
