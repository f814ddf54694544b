//! Error types for the Duet application.

use serde::Serialize;
use thiserror::Error;

/// A shared error type for the entire Duet application.
///
/// Variants map onto the failure classes the services surface:
/// resolution failures (`UnknownPersona`, `DanglingProfile`), generation
/// failures (`Generation`), remote sync failures (`Sync`) and rejected
/// import documents (`ImportValidation`). The remaining variants cover
/// local storage and configuration.
///
/// The type is `Clone` so that a single failed request can be handed to
/// every caller awaiting the same pending future.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum DuetError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// The requested persona id does not exist.
    #[error("Unknown persona '{persona_id}'")]
    UnknownPersona { persona_id: String },

    /// The persona references a connection profile that no longer exists.
    #[error("Persona '{persona_id}' references missing connection profile '{profile_id}'")]
    DanglingProfile {
        persona_id: String,
        profile_id: String,
    },

    /// The completion endpoint failed or returned an unusable body.
    #[error("Generation failed{}: {message}", status_suffix(.status))]
    Generation {
        status: Option<u16>,
        message: String,
    },

    /// Remote read or write failed.
    #[error("Sync error: {0}")]
    Sync(String),

    /// An import document was structurally invalid.
    #[error("Invalid import document: {0}")]
    ImportValidation(String),

    /// A create request or patch failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl DuetError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Generation error
    pub fn generation(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Generation {
            status,
            message: message.into(),
        }
    }

    /// Creates a Sync error
    pub fn sync(message: impl Into<String>) -> Self {
        Self::Sync(message.into())
    }

    /// Creates an ImportValidation error
    pub fn import_validation(message: impl Into<String>) -> Self {
        Self::ImportValidation(message.into())
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error came from persona/profile resolution
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Self::UnknownPersona { .. } | Self::DanglingProfile { .. }
        )
    }

    /// Check if this is a generation error
    pub fn is_generation(&self) -> bool {
        matches!(self, Self::Generation { .. })
    }

    /// Check if this is a sync error
    pub fn is_sync(&self) -> bool {
        matches!(self, Self::Sync(_))
    }

    /// Check if this is an import validation error
    pub fn is_import_validation(&self) -> bool {
        matches!(self, Self::ImportValidation(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for DuetError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for DuetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for DuetError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for DuetError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (for infrastructure code using `Context`)
impl From<anyhow::Error> for DuetError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, DuetError>`.
pub type Result<T> = std::result::Result<T, DuetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_display_includes_status() {
        let err = DuetError::generation(Some(401), "invalid key");
        assert_eq!(err.to_string(), "Generation failed (HTTP 401): invalid key");

        let err = DuetError::generation(None, "connection refused");
        assert_eq!(err.to_string(), "Generation failed: connection refused");
    }

    #[test]
    fn test_resolution_classification() {
        let unknown = DuetError::UnknownPersona {
            persona_id: "p1".to_string(),
        };
        let dangling = DuetError::DanglingProfile {
            persona_id: "p1".to_string(),
            profile_id: "c1".to_string(),
        };
        assert!(unknown.is_resolution());
        assert!(dangling.is_resolution());
        assert!(!DuetError::sync("boom").is_resolution());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: DuetError = io.into();
        assert!(matches!(err, DuetError::Io { .. }));
    }
}
