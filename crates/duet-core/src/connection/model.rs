use serde::{Deserialize, Serialize};

/// Reusable endpoint credentials.
#[derive(Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    /// Unique identifier (UUID format)
    pub id: String,
    /// Display name
    pub name: String,
    /// Chat-completions endpoint URL
    pub url: String,
    /// Bearer token (empty selects mock mode)
    #[serde(default)]
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Creation time in milliseconds since the Unix epoch
    #[serde(default)]
    pub created_at: i64,
}

// API keys must not end up in logs.
impl std::fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("url", &self.url)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("model", &self.model)
            .field("created_at", &self.created_at)
            .finish()
    }
}
