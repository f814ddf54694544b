//! Application configuration model.
//!
//! Loaded from `config.toml` by the infrastructure layer. Every field has a
//! default so that a missing or partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub generation: GenerationSettings,
    pub sync: SyncSettings,
    pub remote: RemoteSettings,
    pub storage: StorageSettings,
}

/// Completion request behavior.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GenerationSettings {
    pub request_timeout_secs: u64,
    /// Fixed part of the artificial mock-mode delay
    pub mock_base_delay_ms: u64,
    /// Upper bound of the random part of the mock-mode delay
    pub mock_jitter_ms: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 120,
            mock_base_delay_ms: 1000,
            mock_jitter_ms: 2000,
        }
    }
}

impl GenerationSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Debounce windows and cache policy for remote sync.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SyncSettings {
    pub settings_debounce_ms: u64,
    pub sessions_debounce_ms: u64,
    /// Sessions updated within this window are pushed with the active one
    pub recency_window_secs: u64,
    /// How long `saved`/`error` stays visible before reverting to `idle`
    pub status_display_ms: u64,
    pub shared_cache_max_entries: Option<usize>,
    pub shared_cache_ttl_secs: Option<u64>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            settings_debounce_ms: 2000,
            sessions_debounce_ms: 5000,
            recency_window_secs: 300,
            status_display_ms: 2000,
            shared_cache_max_entries: Some(64),
            shared_cache_ttl_secs: None,
        }
    }
}

impl SyncSettings {
    pub fn settings_debounce(&self) -> Duration {
        Duration::from_millis(self.settings_debounce_ms)
    }

    pub fn sessions_debounce(&self) -> Duration {
        Duration::from_millis(self.sessions_debounce_ms)
    }

    pub fn recency_window(&self) -> Duration {
        Duration::from_secs(self.recency_window_secs)
    }

    pub fn status_display(&self) -> Duration {
        Duration::from_millis(self.status_display_ms)
    }

    pub fn shared_cache_ttl(&self) -> Option<Duration> {
        self.shared_cache_ttl_secs.map(Duration::from_secs)
    }
}

/// Remote REST store connection.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteSettings {
    /// Base URL of the REST endpoint; sync is disabled when unset
    pub url: Option<String>,
    pub anon_key: Option<String>,
    /// Bearer token of the signed-in user; the anon key is used when unset
    pub access_token: Option<String>,
    pub user_id: Option<String>,
    /// Base URL used when building share links
    pub share_base_url: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            access_token: None,
            user_id: None,
            share_base_url: "http://localhost:5173".to_string(),
        }
    }
}

impl RemoteSettings {
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
            && self.anon_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StorageSettings {
    /// Overrides `<config dir>/duet/state.json`
    pub state_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.sync.shared_cache_max_entries, Some(64));
        assert_eq!(config.generation.request_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: AppConfig = toml::from_str(
            r#"
            [sync]
            sessions_debounce_ms = 100

            [remote]
            url = "https://db.example.com"
            anon_key = "anon"
            "#,
        )
        .unwrap();

        assert_eq!(config.sync.sessions_debounce(), Duration::from_millis(100));
        assert_eq!(config.sync.settings_debounce(), Duration::from_millis(2000));
        assert!(config.remote.is_configured());
    }
}
