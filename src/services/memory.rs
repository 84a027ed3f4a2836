use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{Profile, UserId};
use crate::services::store::{ProfileStore, StoreError};

/// Process-local profile table, kept in insertion order
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<Vec<Profile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: Vec<Profile>) -> Self {
        Self {
            profiles: RwLock::new(profiles),
        }
    }

}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn fetch_candidate(&self, user: &UserId) -> Result<Option<Profile>, StoreError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.iter().find(|p| &p.user_id == user).cloned())
    }

    async fn fetch_eligible_candidates(&self, exclude: &UserId) -> Result<Vec<Profile>, StoreError> {
        let profiles = self.profiles.read().await;
        Ok(profiles
            .iter()
            .filter(|p| p.is_active && &p.user_id != exclude)
            .cloned()
            .collect())
    }

    async fn set_active(&self, user: &UserId, active: bool) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().await;
        if let Some(profile) = profiles.iter_mut().find(|p| &p.user_id == user) {
            profile.is_active = active;
        } else {
            tracing::debug!(user_id = %user, active, "set_active on unknown profile");
        }
        Ok(())
    }

    /// A replaced profile keeps its position
    async fn save_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().await;
        match profiles.iter_mut().find(|p| p.user_id == profile.user_id) {
            Some(existing) => *existing = profile.clone(),
            None => profiles.push(profile.clone()),
        }
        Ok(())
    }
}
