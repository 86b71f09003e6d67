//! Notification channel configuration.
//!
//! Missing credentials never fail loading: an enabled channel without the
//! settings it needs fails its own initialization and is disabled.

use super::{parse_env_bool, parse_env_u16, parse_env_u64, SecretString};
use crate::error::ConfigError;

/// Default SMTP submission port.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Default Slack Web API base URL.
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

/// Default per-channel send timeout in milliseconds.
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 10_000;

/// SMTP server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Implicit TLS when `true`, STARTTLS otherwise.
    pub secure: bool,
    /// Login user.
    pub user: String,
    /// Login password.
    pub password: SecretString,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_SMTP_PORT,
            secure: false,
            user: String::new(),
            password: SecretString::new(""),
        }
    }
}

/// Email channel settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmailConfig {
    /// Whether the channel is enabled.
    pub enabled: bool,
    /// SMTP server settings.
    pub smtp: SmtpConfig,
    /// Sender address. Falls back to the SMTP user.
    pub from: Option<String>,
    /// Recipient addresses.
    pub recipients: Vec<String>,
}

impl EmailConfig {
    /// Sender address to use.
    #[must_use]
    pub fn sender(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.smtp.user)
    }
}

/// Slack channel settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackConfig {
    /// Whether the channel is enabled.
    pub enabled: bool,
    /// Bot token.
    pub token: SecretString,
    /// Target channel id or name.
    pub channel: String,
    /// Web API base URL.
    pub api_url: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: SecretString::new(""),
            channel: String::new(),
            api_url: DEFAULT_SLACK_API_URL.to_string(),
        }
    }
}

/// All notification channel settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    /// Email channel.
    pub email: EmailConfig,
    /// Slack channel.
    pub slack: SlackConfig,
    /// Per-channel send timeout in milliseconds.
    pub send_timeout_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            email: EmailConfig::default(),
            slack: SlackConfig::default(),
            send_timeout_ms: DEFAULT_SEND_TIMEOUT_MS,
        }
    }
}

impl NotificationConfig {
    /// Load notification settings from environment variables.
    ///
    /// - `NOTIFY_EMAIL_ENABLED`: Enable email (default: `false`)
    /// - `SMTP_HOST`, `SMTP_PORT` (default: `587`), `SMTP_SECURE` (default: `false`)
    /// - `SMTP_USER`, `SMTP_PASS`: SMTP credentials
    /// - `NOTIFY_EMAIL_FROM`: Sender address (default: `SMTP_USER`)
    /// - `NOTIFY_EMAIL_RECIPIENTS`: Comma-separated recipient list
    /// - `NOTIFY_SLACK_ENABLED`: Enable Slack (default: `false`)
    /// - `SLACK_TOKEN`, `SLACK_CHANNEL`: Slack credentials and target
    /// - `SLACK_API_URL`: Web API base URL (default: `https://slack.com/api`)
    /// - `NOTIFY_SEND_TIMEOUT_MS`: Per-channel send timeout (default: `10000`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a flag or number cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let var = |name: &str| std::env::var(name).unwrap_or_default();

        let email = EmailConfig {
            enabled: parse_env_bool("NOTIFY_EMAIL_ENABLED", false)?,
            smtp: SmtpConfig {
                host: var("SMTP_HOST"),
                port: parse_env_u16("SMTP_PORT", DEFAULT_SMTP_PORT)?,
                secure: parse_env_bool("SMTP_SECURE", false)?,
                user: var("SMTP_USER"),
                password: SecretString::new(var("SMTP_PASS")),
            },
            from: std::env::var("NOTIFY_EMAIL_FROM")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            recipients: split_list(&var("NOTIFY_EMAIL_RECIPIENTS")),
        };

        let api_url = std::env::var("SLACK_API_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SLACK_API_URL.to_string());
        let slack = SlackConfig {
            enabled: parse_env_bool("NOTIFY_SLACK_ENABLED", false)?,
            token: SecretString::new(var("SLACK_TOKEN")),
            channel: var("SLACK_CHANNEL"),
            api_url,
        };

        Ok(Self {
            email,
            slack,
            send_timeout_ms: parse_env_u64("NOTIFY_SEND_TIMEOUT_MS", DEFAULT_SEND_TIMEOUT_MS)?,
        })
    }

    /// Whether any channel is enabled.
    #[must_use]
    pub const fn any_enabled(&self) -> bool {
        self.email.enabled || self.slack.enabled
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
