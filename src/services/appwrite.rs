use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::models::{Profile, UserId};
use crate::services::store::{ProfileStore, StoreError};

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid API key or project")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<AppwriteError> for StoreError {
    fn from(err: AppwriteError) -> Self {
        match err {
            AppwriteError::InvalidResponse(msg) => StoreError::InvalidResponse(msg),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Profile store backed by an Appwrite documents collection
///
/// Each document carries the profile attributes (`userId`, `name`, `hours`,
/// `age`, `bio`, `isVerified`, `isActive`) at the top level or under `data`.
pub struct AppwriteProfileStore {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    collection: String,
    page_size: usize,
    client: Client,
}

impl AppwriteProfileStore {
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collection: String,
        timeout: Duration,
    ) -> Result<Self, AppwriteError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            collection,
            page_size: 100,
            client,
        })
    }

    /// Documents fetched per request when listing candidates
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            self.collection
        )
    }

    /// List documents matching `queries`
    async fn list_documents(&self, queries: &[String]) -> Result<Vec<Value>, AppwriteError> {
        let query_string = queries
            .iter()
            .map(|q| format!("queries[]={}", urlencoding::encode(q)))
            .collect::<Vec<_>>()
            .join("&");

        let url = format!("{}?{}", self.documents_url(), query_string);

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppwriteError::Unauthorized);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!(%status, body = %body, "Appwrite document listing failed");
            return Err(AppwriteError::ApiError(format!("Failed to list documents: {}", status)));
        }

        let mut json: Value = response.json().await?;

        match json.get_mut("documents").map(Value::take) {
            Some(Value::Array(documents)) => Ok(documents),
            _ => Err(AppwriteError::InvalidResponse("Missing documents array".into())),
        }
    }

    async fn find_document(&self, user: &UserId) -> Result<Option<Value>, AppwriteError> {
        let queries = vec![
            format!("equal(\"userId\", [{}])", quoted(user.as_str())),
            "limit(1)".to_string(),
        ];

        let documents = self.list_documents(&queries).await?;
        Ok(documents.into_iter().next())
    }

    fn parse_profile(doc: &Value) -> Result<Profile, AppwriteError> {
        let data = doc.get("data").unwrap_or(doc);
        serde_json::from_value(data.clone())
            .map_err(|e| AppwriteError::InvalidResponse(format!("Failed to parse profile: {}", e)))
    }

    async fn get_profile(&self, user: &UserId) -> Result<Option<Profile>, AppwriteError> {
        tracing::debug!(user_id = %user, "Fetching profile");

        match self.find_document(user).await? {
            Some(doc) => Self::parse_profile(&doc).map(Some),
            None => Ok(None),
        }
    }

    async fn list_active_profiles(&self, exclude: &UserId) -> Result<Vec<Profile>, AppwriteError> {
        let mut profiles = Vec::new();
        let mut offset = 0usize;

        loop {
            let queries = vec![
                "equal(\"isActive\", [true])".to_string(),
                format!("notEqual(\"userId\", [{}])", quoted(exclude.as_str())),
                format!("limit({})", self.page_size),
                format!("offset({})", offset),
            ];

            let documents = self.list_documents(&queries).await?;
            let fetched = documents.len();

            // Skip malformed documents rather than failing the whole listing
            profiles.extend(documents.iter().filter_map(|doc| match Self::parse_profile(doc) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable profile document");
                    None
                }
            }));

            if fetched < self.page_size {
                break;
            }
            offset += fetched;
        }

        profiles.retain(|p| p.is_active && &p.user_id != exclude);

        tracing::debug!(exclude = %exclude, count = profiles.len(), "Listed eligible profiles");
        Ok(profiles)
    }

    fn document_id(doc: &Value) -> Result<&str, AppwriteError> {
        doc.get("$id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppwriteError::InvalidResponse("Document without $id".into()))
    }

    async fn patch_document(&self, document_id: &str, data: Value) -> Result<(), AppwriteError> {
        let url = format!("{}/{}", self.documents_url(), document_id);

        let response = self
            .client
            .patch(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .json(&serde_json::json!({ "data": data }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppwriteError::ApiError(format!(
                "Failed to update profile: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn create_document(&self, data: Value) -> Result<(), AppwriteError> {
        let response = self
            .client
            .post(self.documents_url())
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .json(&serde_json::json!({ "documentId": "unique()", "data": data }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppwriteError::ApiError(format!(
                "Failed to create profile: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn patch_active(&self, user: &UserId, active: bool) -> Result<(), AppwriteError> {
        let doc = match self.find_document(user).await? {
            Some(doc) => doc,
            None => {
                tracing::debug!(user_id = %user, active, "set_active on unknown profile");
                return Ok(());
            }
        };

        self.patch_document(Self::document_id(&doc)?, serde_json::json!({ "isActive": active }))
            .await?;

        tracing::info!(user_id = %user, active, "Profile active flag updated");
        Ok(())
    }

    /// Update the user's document in place, or create one
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), AppwriteError> {
        let data = serde_json::to_value(profile)
            .map_err(|e| AppwriteError::InvalidResponse(format!("Failed to encode profile: {}", e)))?;

        match self.find_document(&profile.user_id).await? {
            Some(doc) => self.patch_document(Self::document_id(&doc)?, data).await?,
            None => self.create_document(data).await?,
        }

        tracing::info!(user_id = %profile.user_id, "Profile saved");
        Ok(())
    }
}

/// Quote a value for use inside an Appwrite query
fn quoted(raw: &str) -> String {
    Value::String(raw.to_string()).to_string()
}

#[async_trait]
impl ProfileStore for AppwriteProfileStore {
    async fn fetch_candidate(&self, user: &UserId) -> Result<Option<Profile>, StoreError> {
        Ok(self.get_profile(user).await?)
    }

    async fn fetch_eligible_candidates(&self, exclude: &UserId) -> Result<Vec<Profile>, StoreError> {
        Ok(self.list_active_profiles(exclude).await?)
    }

    async fn set_active(&self, user: &UserId, active: bool) -> Result<(), StoreError> {
        Ok(self.patch_active(user, active).await?)
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        Ok(self.upsert_profile(profile).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    const DOCUMENTS: &str = r"^/databases/test_db/collections/profiles/documents";

    fn store(base_url: String) -> AppwriteProfileStore {
        AppwriteProfileStore::new(
            base_url,
            "test_key".to_string(),
            "test_project".to_string(),
            "test_db".to_string(),
            "profiles".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn document(id: &str, user: &str, hours: u32) -> Value {
        json!({
            "$id": id,
            "$collectionId": "profiles",
            "userId": user,
            "name": user.to_uppercase(),
            "hours": hours,
            "age": 22,
            "bio": "raid leader",
            "isActive": true
        })
    }

    #[test]
    fn test_store_creation() {
        let store = store("https://appwrite.test/v1/".to_string()).with_page_size(0);

        assert_eq!(
            store.documents_url(),
            "https://appwrite.test/v1/databases/test_db/collections/profiles/documents"
        );
        assert_eq!(store.page_size, 1);
    }

    #[tokio::test]
    async fn test_fetch_candidate_parses_document() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(DOCUMENTS.to_string()))
            .match_header("X-Appwrite-Key", "test_key")
            .match_header("X-Appwrite-Project", "test_project")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "total": 1, "documents": [document("doc1", "u1", 300)] }).to_string())
            .create_async()
            .await;

        let profile = store(server.url())
            .fetch_candidate(&"u1".into())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(profile.user_id, UserId::from("u1"));
        assert_eq!(profile.hours, 300);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_candidate_missing_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(DOCUMENTS.to_string()))
            .with_status(200)
            .with_body(json!({ "total": 0, "documents": [] }).to_string())
            .create_async()
            .await;

        let profile = store(server.url()).fetch_candidate(&"ghost".into()).await.unwrap();
        assert!(profile.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(DOCUMENTS.to_string()))
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = store(server.url())
            .fetch_eligible_candidates(&"u1".into())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(DOCUMENTS.to_string()))
            .with_status(401)
            .create_async()
            .await;

        let err = store(server.url()).get_profile(&"u1".into()).await.unwrap_err();
        assert!(matches!(err, AppwriteError::Unauthorized));
    }

    #[tokio::test]
    async fn test_eligible_candidates_drop_self_and_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(DOCUMENTS.to_string()))
            .with_status(200)
            .with_body(
                json!({
                    "total": 3,
                    "documents": [
                        document("d1", "u1", 10),
                        document("d2", "u2", 20),
                        { "$id": "d3", "userId": "broken" }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let profiles = store(server.url())
            .fetch_eligible_candidates(&"u1".into())
            .await
            .unwrap();

        let ids: Vec<&str> = profiles.iter().map(|p| p.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u2"]);
    }

    #[tokio::test]
    async fn test_set_active_patches_document() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(DOCUMENTS.to_string()))
            .with_status(200)
            .with_body(json!({ "total": 1, "documents": [document("doc7", "u7", 50)] }).to_string())
            .create_async()
            .await;
        let patch = server
            .mock("PATCH", "/databases/test_db/collections/profiles/documents/doc7")
            .match_body(Matcher::PartialJson(json!({ "data": { "isActive": false } })))
            .with_status(200)
            .with_body(document("doc7", "u7", 50).to_string())
            .create_async()
            .await;

        store(server.url()).set_active(&"u7".into(), false).await.unwrap();

        patch.assert_async().await;
    }

    #[tokio::test]
    async fn test_user_id_is_escaped_in_queries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(DOCUMENTS.to_string()))
            .match_query(Matcher::UrlEncoded(
                "queries[]".into(),
                r#"equal("userId", ["a\"] or x"])"#.into(),
            ))
            .with_status(200)
            .with_body(json!({ "total": 0, "documents": [] }).to_string())
            .create_async()
            .await;

        let profile = store(server.url())
            .fetch_candidate(&UserId::from(r#"a"] or x"#))
            .await
            .unwrap();

        assert!(profile.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_save_profile_creates_missing_document() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(DOCUMENTS.to_string()))
            .with_status(200)
            .with_body(json!({ "total": 0, "documents": [] }).to_string())
            .create_async()
            .await;
        let create = server
            .mock("POST", "/databases/test_db/collections/profiles/documents")
            .match_body(Matcher::PartialJson(json!({
                "documentId": "unique()",
                "data": { "userId": "u9", "hours": 120 }
            })))
            .with_status(201)
            .with_body(document("new", "u9", 120).to_string())
            .create_async()
            .await;

        let profile = AppwriteProfileStore::parse_profile(&document("new", "u9", 120)).unwrap();
        store(server.url()).save_profile(&profile).await.unwrap();

        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_save_profile_updates_existing_document() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(DOCUMENTS.to_string()))
            .with_status(200)
            .with_body(json!({ "total": 1, "documents": [document("doc3", "u3", 50)] }).to_string())
            .create_async()
            .await;
        let patch = server
            .mock("PATCH", "/databases/test_db/collections/profiles/documents/doc3")
            .match_body(Matcher::PartialJson(json!({ "data": { "userId": "u3", "hours": 75 } })))
            .with_status(200)
            .with_body(document("doc3", "u3", 75).to_string())
            .create_async()
            .await;

        let profile = AppwriteProfileStore::parse_profile(&document("doc3", "u3", 75)).unwrap();
        store(server.url()).save_profile(&profile).await.unwrap();

        patch.assert_async().await;
    }
}
