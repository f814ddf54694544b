//! Remote persistence contract.

use crate::connection::ConnectionProfile;
use crate::error::Result;
use crate::participant::{GenerationConfig, Slot};
use crate::persona::Persona;
use crate::session::Session;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The user-editable settings, synced wholesale.
///
/// Older documents used `endpoints`/`characters` for the first two fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    #[serde(default, alias = "endpoints")]
    pub connection_profiles: Vec<ConnectionProfile>,
    #[serde(default, alias = "characters")]
    pub personas: Vec<Persona>,
    #[serde(alias = "modelA", default = "default_config_a")]
    pub config_a: GenerationConfig,
    #[serde(alias = "modelB", default = "default_config_b")]
    pub config_b: GenerationConfig,
}

fn default_config_a() -> GenerationConfig {
    GenerationConfig::default_for(Slot::A)
}

fn default_config_b() -> GenerationConfig {
    GenerationConfig::default_for(Slot::B)
}

/// One settings row, keyed by user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRecord {
    pub user_id: String,
    pub settings: SettingsSnapshot,
    /// RFC 3339
    pub updated_at: String,
}

/// One session row, keyed by session id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    pub session_id: String,
    pub user_id: String,
    pub content: Session,
    /// RFC 3339
    pub updated_at: String,
    /// RFC 3339
    pub created_at: String,
}

impl SessionRow {
    pub fn from_session(user_id: &str, session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            user_id: user_id.to_string(),
            content: session.clone(),
            updated_at: millis_to_rfc3339(session.updated_at),
            created_at: millis_to_rfc3339(session.created_at),
        }
    }
}

/// Formats a millisecond timestamp as RFC 3339; out-of-range values map to
/// the epoch.
pub fn millis_to_rfc3339(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .to_rfc3339()
}

/// Remote store holding per-user settings and sessions.
///
/// Deletions are never mirrored: a session deleted locally stays in the
/// remote store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Reads the settings row for `user_id`. A missing row is `Ok(None)`.
    async fn fetch_settings(&self, user_id: &str) -> Result<Option<SettingsSnapshot>>;

    /// Upserts the settings row.
    async fn upsert_settings(&self, record: &SettingsRecord) -> Result<()>;

    /// Reads every session stored for `user_id`.
    async fn fetch_sessions(&self, user_id: &str) -> Result<Vec<Session>>;

    /// Upserts one row per session.
    async fn upsert_sessions(&self, rows: &[SessionRow]) -> Result<()>;
}
