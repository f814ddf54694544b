//! RestRemoteStore - PostgREST-style implementation of the remote store.
//!
//! Tables:
//! - `profiles` (`id`, `settings`, `updated_at`)
//! - `sessions` (`session_id`, `user_id`, `content`, `updated_at`, `created_at`)
//! - `shared_sessions` (`id`, `content`), read-only

use crate::dto::{
    ProfileRowDto, ProfileSettingsDto, SessionContentDto, SessionRowDto, SharedSessionDto,
};
use async_trait::async_trait;
use duet_core::config::RemoteSettings;
use duet_core::error::{DuetError, Result};
use duet_core::session::Session;
use duet_core::shared::{SharedTranscript, SharedTranscriptSource};
use duet_core::sync::{RemoteStore, SessionRow, SettingsRecord, SettingsSnapshot};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

const PROFILES_TABLE: &str = "profiles";
const SESSIONS_TABLE: &str = "sessions";
const SHARED_SESSIONS_TABLE: &str = "shared_sessions";
const UPSERT_PREFERENCE: &str = "resolution=merge-duplicates";

/// Remote store speaking the PostgREST row API.
#[derive(Clone)]
pub struct RestRemoteStore {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
}

impl RestRemoteStore {
    /// Creates a store for `base_url` (the project URL, without `/rest/v1`).
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DuetError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            access_token: access_token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Creates a store from the `[remote]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`DuetError::Config`] if the URL or anon key is missing.
    pub fn from_settings(settings: &RemoteSettings, timeout: Duration) -> Result<Self> {
        match (&settings.url, &settings.anon_key) {
            (Some(url), Some(key)) if settings.is_configured() => {
                Self::new(url.clone(), key.clone(), settings.access_token.clone(), timeout)
            }
            _ => Err(DuetError::config(
                "Remote store is not configured (remote.url and remote.anon_key are required)",
            )),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {bearer}"))
    }

    fn select(&self, table: &str, filter_column: &str, value: &str, columns: &str) -> RequestBuilder {
        self.request(Method::GET, table).query(&[
            (filter_column, format!("eq.{value}")),
            ("select", columns.to_string()),
        ])
    }

    fn upsert(&self, table: &str, on_conflict: &str) -> RequestBuilder {
        self.request(Method::POST, table)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", UPSERT_PREFERENCE)
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| DuetError::sync(format!("{what} request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(DuetError::sync(format!(
                "{what} failed (HTTP {}): {}",
                status.as_u16(),
                error_message(&body)
            )));
        }

        Ok(response)
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<Vec<T>> {
        self.send(builder, what)
            .await?
            .json::<Vec<T>>()
            .await
            .map_err(|e| DuetError::sync(format!("{what} returned an unexpected body: {e}")))
    }
}

/// Extracts PostgREST's `message` field when the body is an error object.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl RemoteStore for RestRemoteStore {
    async fn fetch_settings(&self, user_id: &str) -> Result<Option<SettingsSnapshot>> {
        let request = self.select(PROFILES_TABLE, "id", user_id, "settings");
        let rows: Vec<ProfileSettingsDto> = self.fetch_rows(request, "Settings fetch").await?;
        Ok(rows.into_iter().next().and_then(|row| row.settings))
    }

    async fn upsert_settings(&self, record: &SettingsRecord) -> Result<()> {
        let row = ProfileRowDto::from(record);
        let request = self.upsert(PROFILES_TABLE, "id").json(&[row]);
        self.send(request, "Settings upsert").await?;
        tracing::debug!("[RestRemoteStore] Upserted settings for {}", record.user_id);
        Ok(())
    }

    async fn fetch_sessions(&self, user_id: &str) -> Result<Vec<Session>> {
        let request = self.select(SESSIONS_TABLE, "user_id", user_id, "content");
        let rows: Vec<SessionContentDto> = self.fetch_rows(request, "Sessions fetch").await?;
        Ok(rows.into_iter().map(|row| row.content).collect())
    }

    async fn upsert_sessions(&self, rows: &[SessionRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let body: Vec<SessionRowDto> = rows.iter().map(SessionRowDto::from).collect();
        let request = self.upsert(SESSIONS_TABLE, "session_id").json(&body);
        self.send(request, "Sessions upsert").await?;
        tracing::debug!("[RestRemoteStore] Upserted {} session row(s)", rows.len());
        Ok(())
    }
}

#[async_trait]
impl SharedTranscriptSource for RestRemoteStore {
    async fn fetch_shared(&self, share_id: &str) -> Result<SharedTranscript> {
        let request = self.select(SHARED_SESSIONS_TABLE, "id", share_id, "content");
        let rows: Vec<SharedSessionDto> = self.fetch_rows(request, "Shared session fetch").await?;
        rows.into_iter()
            .next()
            .map(|row| row.content)
            .ok_or_else(|| DuetError::not_found("SharedTranscript", share_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(access_token: Option<&str>) -> RestRemoteStore {
        RestRemoteStore::new(
            "https://db.example.com/",
            "anon-key",
            access_token.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_select_request_shape() {
        let request = store(None)
            .select(SESSIONS_TABLE, "user_id", "u-1", "content")
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(
            request.url().as_str(),
            "https://db.example.com/rest/v1/sessions?user_id=eq.u-1&select=content"
        );
        assert_eq!(request.headers()["apikey"], "anon-key");
        assert_eq!(request.headers()["authorization"], "Bearer anon-key");
    }

    #[test]
    fn test_upsert_uses_merge_duplicates_and_access_token() {
        let request = store(Some("user-jwt"))
            .upsert(PROFILES_TABLE, "id")
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://db.example.com/rest/v1/profiles?on_conflict=id"
        );
        assert_eq!(request.headers()["prefer"], UPSERT_PREFERENCE);
        assert_eq!(request.headers()["authorization"], "Bearer user-jwt");
    }

    #[test]
    fn test_from_settings_requires_url_and_key() {
        let settings = RemoteSettings::default();
        assert!(RestRemoteStore::from_settings(&settings, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"code":"42501","message":"permission denied"}"#),
            "permission denied"
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_upsert_nothing_makes_no_request() {
        // Unroutable base URL: any request would fail.
        let store = RestRemoteStore::new("http://127.0.0.1:9", "k", None, Duration::from_millis(50)).unwrap();
        store.upsert_sessions(&[]).await.unwrap();
    }
}
