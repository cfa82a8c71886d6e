// src/services/upstream.rs
//! Forwards a conversation to the upstream chat-completion API.
//!
//! Every inbound request gets `max_retries + 1` sequential attempts, each
//! bounded by the configured timeout. Attempts are classified into a
//! [`CallOutcome`]; only the most recent failure survives exhaustion.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{config::Config, message::Message};

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("upstream failed after {attempts} attempt(s): {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Non-200 status.
    Status,
    /// 200 without reply text.
    EmptyReply,
    Timeout,
    Transport,
    /// 200 with a body that could not be read or parsed.
    Decode,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Status => "status",
            FailureKind::EmptyReply => "empty_reply",
            FailureKind::Timeout => "timeout",
            FailureKind::Transport => "transport",
            FailureKind::Decode => "decode",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Success(String),
    Failure { kind: FailureKind, detail: String },
}

impl CallOutcome {
    fn failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        CallOutcome::Failure {
            kind,
            detail: detail.into(),
        }
    }
}

/// Body sent to the upstream API.
#[derive(Debug, Serialize)]
pub struct UpstreamPayload<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub stream: bool,
}

impl<'a> UpstreamPayload<'a> {
    pub fn new(model: &'a str, messages: &'a [Message]) -> Self {
        Self {
            model,
            messages,
            stream: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull `choices[0].message.content` out of a completion body.
fn extract_reply(response: CompletionResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()?
        .message?
        .content
        .filter(|text| !text.is_empty())
}

#[derive(Clone)]
pub struct UpstreamClient {
    http: Client,
    config: Arc<Config>,
}

impl UpstreamClient {
    pub fn new(config: Arc<Config>) -> Result<Self, UpstreamError> {
        let http = Client::builder().build()?;
        Ok(Self { http, config })
    }

    /// Send `messages` upstream, retrying until a reply arrives or the
    /// attempt budget runs out.
    pub async fn call_upstream(&self, messages: &[Message]) -> Result<String, UpstreamError> {
        let payload = UpstreamPayload::new(&self.config.model, messages);
        let max_attempts = self.config.max_attempts();
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.attempt(&payload).await {
                CallOutcome::Success(reply) => {
                    info!(attempt, max_attempts, "upstream replied");
                    return Ok(reply);
                }
                CallOutcome::Failure { kind, detail } => {
                    warn!(
                        attempt,
                        max_attempts,
                        kind = kind.as_str(),
                        "upstream attempt failed: {detail}"
                    );
                    last_error = Some(detail);
                }
            }
        }

        let last_error = last_error.unwrap_or_else(|| "upstream call failed for an unknown reason".to_string());
        error!(attempts = max_attempts, "upstream retries exhausted: {last_error}");
        Err(UpstreamError::Exhausted {
            attempts: max_attempts,
            last_error,
        })
    }

    /// One classified round trip.
    pub async fn attempt(&self, payload: &UpstreamPayload<'_>) -> CallOutcome {
        let sent = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.timeout)
            .json(payload)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => return self.classify_transport_error(e),
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) if e.is_timeout() => return self.classify_transport_error(e),
                Err(e) => format!("<unreadable body: {e}>"),
            };
            return CallOutcome::failure(
                FailureKind::Status,
                format!("status {}, body: {}", status.as_u16(), body),
            );
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) if e.is_timeout() => return self.classify_transport_error(e),
            Err(e) => {
                return CallOutcome::failure(
                    FailureKind::Decode,
                    format!("failed to read upstream response body: {e}"),
                );
            }
        };

        match serde_json::from_slice::<CompletionResponse>(&bytes) {
            Ok(parsed) => match extract_reply(parsed) {
                Some(reply) => CallOutcome::Success(reply),
                None => CallOutcome::failure(
                    FailureKind::EmptyReply,
                    "upstream response has no choices[0].message.content",
                ),
            },
            Err(e) => CallOutcome::failure(
                FailureKind::Decode,
                format!("failed to parse upstream response: {e}"),
            ),
        }
    }

    fn classify_transport_error(&self, e: reqwest::Error) -> CallOutcome {
        if e.is_timeout() {
            CallOutcome::failure(
                FailureKind::Timeout,
                format!(
                    "upstream request timed out after {} seconds: {e}",
                    self.config.timeout.as_secs_f64()
                ),
            )
        } else {
            CallOutcome::failure(
                FailureKind::Transport,
                format!("upstream network error: {e}"),
            )
        }
    }
}
