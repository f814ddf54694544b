//! Row DTOs for the `profiles`, `sessions` and `shared_sessions` tables.

use duet_core::session::Session;
use duet_core::shared::SharedTranscript;
use duet_core::sync::{SessionRow, SettingsRecord, SettingsSnapshot};
use serde::{Deserialize, Serialize};

/// Full `profiles` row, written on settings upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRowDto {
    /// User id
    pub id: String,
    pub settings: SettingsSnapshot,
    pub updated_at: String,
}

impl From<&SettingsRecord> for ProfileRowDto {
    fn from(record: &SettingsRecord) -> Self {
        Self {
            id: record.user_id.clone(),
            settings: record.settings.clone(),
            updated_at: record.updated_at.clone(),
        }
    }
}

/// `profiles?select=settings` projection. The column may be null.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileSettingsDto {
    #[serde(default)]
    pub settings: Option<SettingsSnapshot>,
}

/// Full `sessions` row, written on session upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRowDto {
    pub session_id: String,
    pub user_id: String,
    pub content: Session,
    pub updated_at: String,
    pub created_at: String,
}

impl From<&SessionRow> for SessionRowDto {
    fn from(row: &SessionRow) -> Self {
        Self {
            session_id: row.session_id.clone(),
            user_id: row.user_id.clone(),
            content: row.content.clone(),
            updated_at: row.updated_at.clone(),
            created_at: row.created_at.clone(),
        }
    }
}

/// `sessions?select=content` projection.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionContentDto {
    pub content: Session,
}

/// `shared_sessions?select=content` projection.
#[derive(Debug, Clone, Deserialize)]
pub struct SharedSessionDto {
    pub content: SharedTranscript,
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_core::participant::{GenerationConfig, Slot};

    #[test]
    fn test_session_row_columns_are_snake_case() {
        let session = Session::new(
            "Cats vs Dogs",
            GenerationConfig::default_for(Slot::A),
            GenerationConfig::default_for(Slot::B),
        );
        let row = SessionRow::from_session("user-1", &session);
        let json = serde_json::to_value(SessionRowDto::from(&row)).unwrap();

        assert_eq!(json["session_id"], session.id.as_str());
        assert_eq!(json["user_id"], "user-1");
        assert_eq!(json["content"]["createdAt"], session.created_at);
        assert!(json["updated_at"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_null_settings_column() {
        let rows: Vec<ProfileSettingsDto> = serde_json::from_str(r#"[{"settings": null}]"#).unwrap();
        assert!(rows[0].settings.is_none());
    }
}
