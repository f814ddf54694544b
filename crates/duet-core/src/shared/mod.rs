//! Read-only shared transcripts.
//!
//! A shared transcript is a published copy of a session's topic and
//! messages, addressed by a share id. Viewers step through it one message
//! at a time; each position has its own link.

use crate::error::Result;
use crate::session::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Published topic and messages of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedTranscript {
    pub topic: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl SharedTranscript {
    /// Messages visible when the viewer is positioned at `message_id`.
    ///
    /// Without an id the viewer starts at the first message. An id that does
    /// not belong to the transcript shows everything.
    pub fn visible_until(&self, message_id: Option<&str>) -> &[Message] {
        let index = match message_id {
            Some(id) => self.messages.iter().position(|m| m.id == id),
            None if self.messages.is_empty() => None,
            None => Some(0),
        };

        match index {
            Some(i) => &self.messages[..=i],
            None => &self.messages,
        }
    }

    /// The message following `message_id`, if any.
    pub fn next_message_after(&self, message_id: &str) -> Option<&Message> {
        let index = self.messages.iter().position(|m| m.id == message_id)?;
        self.messages.get(index + 1)
    }
}

/// Read access to published transcripts.
#[async_trait]
pub trait SharedTranscriptSource: Send + Sync {
    /// Loads the transcript published under `share_id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DuetError::NotFound`] if nothing is published
    /// under that id, or a sync error if the read fails.
    async fn fetch_shared(&self, share_id: &str) -> Result<SharedTranscript>;
}

/// Builds the viewer link `<base>/#/share/<share_id>[/<message_id>]`.
///
/// A trailing slash on `base` is dropped.
pub fn share_link(base: &str, share_id: &str, message_id: Option<&str>) -> String {
    let base = base.trim_end_matches('/');
    match message_id {
        Some(message_id) => format!("{base}/#/share/{share_id}/{message_id}"),
        None => format!("{base}/#/share/{share_id}"),
    }
}

/// Extracts `(share_id, message_id)` from a viewer link or a bare
/// `#/share/...` fragment.
pub fn parse_share_link(link: &str) -> Option<(String, Option<String>)> {
    let fragment = link.split_once('#').map_or(link, |(_, f)| f);
    let mut parts = fragment.trim_start_matches('/').split('/');

    if parts.next()? != "share" {
        return None;
    }
    let share_id = parts.next().filter(|s| !s.is_empty())?.to_string();
    let message_id = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
    Some((share_id, message_id))
}
