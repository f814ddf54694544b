//! Persona domain model.

use serde::{Deserialize, Serialize};

/// A reusable speaking profile that can be selected into either slot.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    /// Unique identifier (UUID format)
    pub id: String,
    /// Display name, used as the sender name of generated messages
    pub name: String,
    /// System prompt sent with every request made by this persona
    pub system_prompt: String,
    /// Connection profile this persona generates through (weak reference;
    /// older documents call this `endpointId`)
    #[serde(alias = "endpointId")]
    pub connection_profile_id: String,
    /// Creation time in milliseconds since the Unix epoch
    #[serde(default)]
    pub created_at: i64,
}
