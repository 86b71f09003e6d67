//! Slack channel over the Web API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::render;
use crate::alerts::Alert;
use crate::config::SlackConfig;
use crate::error::ChannelError;
use crate::traits::Channel;

const CHANNEL: &str = "slack";

/// `chat.postMessage` request body.
#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    blocks: [Block<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Block<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: BlockText<'a>,
}

#[derive(Debug, Serialize)]
struct BlockText<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

/// Envelope shared by every Web API response.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts alerts to a Slack channel.
pub struct SlackChannel {
    client: Client,
    config: SlackConfig,
    timeout: Duration,
}

impl SlackChannel {
    /// Create a Slack channel.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Misconfigured`] if the HTTP client cannot be built.
    pub fn new(config: SlackConfig, timeout: Duration) -> Result<Self, ChannelError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| misconfigured(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            timeout,
        })
    }

    /// Web API base URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }

    async fn call<T: Serialize + Sync + ?Sized>(
        &self,
        method: &str,
        body: &T,
    ) -> Result<(), ChannelError> {
        let url = format!("{}/{method}", self.api_url());
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.token.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChannelError::Timeout {
                        channel: CHANNEL.to_string(),
                        timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    }
                } else {
                    transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(transport(format!("Status {status}: {body}")));
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| transport(format!("Invalid response from {method}: {e}")))?;
        if parsed.ok {
            Ok(())
        } else {
            Err(transport(format!(
                "{method} failed: {}",
                parsed.error.as_deref().unwrap_or("unknown_error")
            )))
        }
    }
}

fn misconfigured(message: impl Into<String>) -> ChannelError {
    ChannelError::Misconfigured {
        channel: CHANNEL.to_string(),
        message: message.into(),
    }
}

fn transport(message: impl Into<String>) -> ChannelError {
    ChannelError::Transport {
        channel: CHANNEL.to_string(),
        message: message.into(),
    }
}

impl std::fmt::Debug for SlackChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackChannel")
            .field("config", &self.config)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Channel for SlackChannel {
    fn name(&self) -> &'static str {
        CHANNEL
    }

    async fn init(&self) -> Result<(), ChannelError> {
        if self.config.token.is_empty() {
            return Err(misconfigured("SLACK_TOKEN is empty"));
        }
        if self.config.channel.trim().is_empty() {
            return Err(misconfigured("SLACK_CHANNEL is empty"));
        }

        self.call("auth.test", &serde_json::json!({}))
            .await
            .map_err(|e| match e {
                ChannelError::Transport { channel, message } => {
                    ChannelError::VerificationFailed { channel, message }
                }
                other => other,
            })?;

        tracing::info!(channel = %self.config.channel, "Slack channel ready");
        Ok(())
    }

    async fn send(&self, alert: &Alert) -> Result<(), ChannelError> {
        let text = render::chat_text(alert);
        let body = PostMessage {
            channel: &self.config.channel,
            text: &text,
            blocks: [Block {
                kind: "section",
                text: BlockText {
                    kind: "mrkdwn",
                    text: &text,
                },
            }],
        };
        self.call("chat.postMessage", &body).await?;
        tracing::info!(alert_id = %alert.id, "Slack notification sent");
        Ok(())
    }
}
