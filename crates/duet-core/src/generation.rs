//! Completion endpoint contract.
//!
//! The turn engine depends on this trait only; the HTTP implementation
//! lives in `duet-interaction`.

use crate::dialogue::ChatMessage;
use crate::error::Result;
use crate::participant::GenerationConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of a connection test against a profile's endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u64>,
}

/// A client able to produce one chat completion.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generates the next message for `config` given the chat `messages`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DuetError::Generation`] on transport failure,
    /// non-success status, or an unusable response body.
    async fn generate(&self, config: &GenerationConfig, messages: &[ChatMessage]) -> Result<String>;

    /// Sends a minimal request to check that the endpoint is reachable and
    /// the credentials are accepted. Never fails; failures are reported in
    /// the result.
    async fn test_connection(&self, config: &GenerationConfig) -> ConnectionTestResult;
}
