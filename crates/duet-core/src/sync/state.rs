use serde::{Deserialize, Serialize};

/// Progress of the most recent remote operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Saved,
    Error,
}

/// Authentication and sync status shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// Signed-in user, if any; sync triggers are ignored while `None`
    pub authenticated_user_id: Option<String>,
    pub sync_status: SyncStatus,
    /// Time of the last successful push, in milliseconds
    pub last_synced_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl SyncState {
    pub fn is_authenticated(&self) -> bool {
        self.authenticated_user_id.is_some()
    }
}
