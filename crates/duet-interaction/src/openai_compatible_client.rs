//! OpenAiCompatibleClient - chat-completions client for any compatible endpoint.
//!
//! The endpoint URL, key and model come from the slot's [`GenerationConfig`],
//! so one client serves both slots. An empty API key selects mock mode.

use async_trait::async_trait;
use duet_core::config::GenerationSettings;
use duet_core::dialogue::{ChatMessage, ChatRole};
use duet_core::error::{DuetError, Result};
use duet_core::generation::{ConnectionTestResult, GenerationClient};
use duet_core::participant::GenerationConfig;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const PING_MESSAGE: &str = "ping";

/// Generation client speaking the OpenAI chat-completions wire format.
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    client: Client,
    mock_base_delay: Duration,
    mock_jitter: Duration,
}

impl OpenAiCompatibleClient {
    /// Creates a client with the request timeout and mock delays from
    /// `settings`.
    pub fn new(settings: &GenerationSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| DuetError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            mock_base_delay: Duration::from_millis(settings.mock_base_delay_ms),
            mock_jitter: Duration::from_millis(settings.mock_jitter_ms),
        })
    }

    async fn mock_response(&self, config: &GenerationConfig, messages: &[ChatMessage]) -> String {
        let jitter_ms = self.mock_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        tokio::time::sleep(self.mock_base_delay + Duration::from_millis(jitter)).await;

        tracing::debug!("[OpenAiCompatibleClient] Mock response for {}", config.name);
        mock_text(&config.name, messages)
    }

    /// Posts `body` and returns the successful response together with its
    /// status and raw text, which error reports carry along.
    async fn send_request(&self, config: &GenerationConfig, body: &ChatCompletionRequest<'_>) -> Result<CompletionReply> {
        let response = self
            .client
            .post(&config.endpoint)
            .header("Authorization", format!("Bearer {}", config.api_key))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| {
                let kind = if err.is_timeout() { "timed out" } else { "failed" };
                DuetError::generation(None, format!("Request to {} {kind}: {err}", config.endpoint))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            DuetError::generation(Some(status.as_u16()), format!("Failed to read response body: {err}"))
        })?;
        parse_response(status, &body)
    }
}

#[async_trait]
impl GenerationClient for OpenAiCompatibleClient {
    async fn generate(&self, config: &GenerationConfig, messages: &[ChatMessage]) -> Result<String> {
        if config.is_mock() {
            return Ok(self.mock_response(config, messages).await);
        }

        let request = ChatCompletionRequest {
            model: &config.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            max_tokens: None,
        };

        tracing::debug!(
            "[OpenAiCompatibleClient] {} -> {} ({} messages)",
            config.name,
            config.model,
            messages.len()
        );
        let reply = self.send_request(config, &request).await?;
        extract_text_response(reply)
    }

    async fn test_connection(&self, config: &GenerationConfig) -> ConnectionTestResult {
        if config.is_mock() {
            return ConnectionTestResult {
                success: true,
                message: "Mock mode: no API key configured".to_string(),
                latency_ms: 0,
                context_window: None,
            };
        }

        let ping = [ChatMessage::user(PING_MESSAGE)];
        let request = ChatCompletionRequest {
            model: &config.model,
            messages: ping.iter().map(WireMessage::from).collect(),
            max_tokens: Some(1),
        };

        let started = Instant::now();
        let outcome = self.send_request(config, &request).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(reply) => ConnectionTestResult {
                success: true,
                message: format!("Connected to {}", config.model),
                latency_ms,
                context_window: reply.parsed.context_length.or(reply.parsed.context_window),
            },
            Err(err) => ConnectionTestResult {
                success: false,
                message: err.to_string(),
                latency_ms,
                context_window: None,
            },
        }
    }
}

/// Placeholder text returned in mock mode.
fn mock_text(name: &str, messages: &[ChatMessage]) -> String {
    let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
    format!(
        "[Mock response from {name}] I have received your message. The last message was: \"{last}\". Let's continue **the discussion** on the topic."
    )
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: ChatRole,
    content: &'a str,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        Self {
            role: message.role,
            content: &message.content,
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    context_length: Option<u64>,
    #[serde(default)]
    context_window: Option<u64>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// A 2xx reply: the status, the raw body and its parsed form.
struct CompletionReply {
    status: StatusCode,
    body: String,
    parsed: ChatCompletionResponse,
}

fn parse_response(status: StatusCode, body: &str) -> Result<CompletionReply> {
    let parsed = serde_json::from_str(body).map_err(|err| {
        DuetError::generation(
            Some(status.as_u16()),
            format!("Failed to parse response ({err}): {body}"),
        )
    })?;
    Ok(CompletionReply {
        status,
        body: body.to_string(),
        parsed,
    })
}

fn extract_text_response(reply: CompletionReply) -> Result<String> {
    let CompletionReply { status, body, parsed } = reply;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            DuetError::generation(
                Some(status.as_u16()),
                format!("Endpoint returned no content: {body}"),
            )
        })
}

fn map_http_error(status: StatusCode, body: String) -> DuetError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    DuetError::generation(Some(status.as_u16()), message)
}
