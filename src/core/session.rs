use crate::core::queue::SessionQueue;
use crate::models::{Profile, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// A user's live browsing session
#[derive(Debug, Clone)]
pub struct Session {
    /// Display name of the session owner, attached to the likes they send
    pub owner_name: String,
    pub queue: SessionQueue,
    /// Profiles as they were when the queue was built
    pub profiles: HashMap<UserId, Profile>,
}

impl Session {
    /// Build a session for `owner` from ranked profiles, closest first
    pub fn from_ranked(owner: &Profile, ranked: Vec<Profile>) -> Self {
        let ids = ranked.iter().map(|p| p.user_id.clone()).collect();
        let profiles = ranked
            .into_iter()
            .map(|p| (p.user_id.clone(), p))
            .collect();

        Self {
            owner_name: owner.name.clone(),
            queue: SessionQueue::build(ids),
            profiles,
        }
    }

    pub fn profile(&self, id: &UserId) -> Option<&Profile> {
        self.profiles.get(id)
    }
}

/// Per-user session map
///
/// Sessions expire after sitting idle and are never persisted. Each
/// session sits behind its own lock, so users never contend with each
/// other.
#[derive(Clone)]
pub struct SessionStore {
    sessions: moka::future::Cache<UserId, Arc<Mutex<Session>>>,
}

impl SessionStore {
    pub fn new(capacity: u64, idle: Duration) -> Self {
        let sessions = moka::future::CacheBuilder::new(capacity)
            .time_to_idle(idle)
            .build();

        Self { sessions }
    }

    /// Install a session, replacing any previous one wholesale
    pub async fn replace(&self, user: &UserId, session: Session) -> Arc<Mutex<Session>> {
        let handle = Arc::new(Mutex::new(session));
        self.sessions.insert(user.clone(), handle.clone()).await;
        handle
    }

    pub async fn get(&self, user: &UserId) -> Option<Arc<Mutex<Session>>> {
        self.sessions.get(user).await
    }

    /// Discard the user's session. Returns whether one was live.
    pub async fn end(&self, user: &UserId) -> bool {
        self.sessions.remove(user).await.is_some()
    }

    /// Approximate number of live sessions
    pub fn len(&self) -> u64 {
        self.sessions.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(30 * 60))
    }
}
