//! Transcript message type.

use crate::participant::Slot;
use serde::{Deserialize, Serialize};

/// A single generated turn in a transcript.
///
/// Messages are immutable once created. The only way to remove one is to
/// truncate the session at or before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier (UUID format)
    pub id: String,
    /// Slot that produced the message (older documents call this `senderId`)
    #[serde(alias = "senderId")]
    pub sender_slot: Slot,
    /// Display name of the speaker at generation time
    pub sender_name: String,
    /// Generated text
    pub content: String,
    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: i64,
}
