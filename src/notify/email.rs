//! Email channel over SMTP.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::render;
use crate::alerts::Alert;
use crate::config::EmailConfig;
use crate::error::ChannelError;
use crate::traits::Channel;

const CHANNEL: &str = "email";

/// Sends alerts as HTML email.
///
/// `init` validates addresses, builds the SMTP transport and verifies the
/// server accepts a connection. The transport is built once and reused.
pub struct EmailChannel {
    config: EmailConfig,
    timeout: Duration,
    transport: OnceLock<AsyncSmtpTransport<Tokio1Executor>>,
}

impl EmailChannel {
    /// Create an email channel. Nothing is validated until [`Channel::init`].
    #[must_use]
    pub const fn new(config: EmailConfig, timeout: Duration) -> Self {
        Self {
            config,
            timeout,
            transport: OnceLock::new(),
        }
    }

    fn misconfigured(message: impl Into<String>) -> ChannelError {
        ChannelError::Misconfigured {
            channel: CHANNEL.to_string(),
            message: message.into(),
        }
    }

    fn sender(&self) -> Result<Mailbox, ChannelError> {
        let sender = self.config.sender();
        if sender.is_empty() {
            return Err(Self::misconfigured("no sender address (set SMTP_USER or NOTIFY_EMAIL_FROM)"));
        }
        sender
            .parse()
            .map_err(|e| Self::misconfigured(format!("invalid sender '{sender}': {e}")))
    }

    fn recipients(&self) -> Result<Vec<Mailbox>, ChannelError> {
        if self.config.recipients.is_empty() {
            return Err(Self::misconfigured("no recipients"));
        }
        self.config
            .recipients
            .iter()
            .map(|r| {
                r.parse()
                    .map_err(|e| Self::misconfigured(format!("invalid recipient '{r}': {e}")))
            })
            .collect()
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, ChannelError> {
        let smtp = &self.config.smtp;
        if smtp.host.trim().is_empty() {
            return Err(Self::misconfigured("SMTP host is empty"));
        }

        let builder = if smtp.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
        }
        .map_err(|e| Self::misconfigured(format!("invalid SMTP relay: {e}")))?;

        let mut builder = builder.port(smtp.port).timeout(Some(self.timeout));
        if !smtp.user.is_empty() {
            builder = builder.credentials(Credentials::new(
                smtp.user.clone(),
                smtp.password.expose().to_string(),
            ));
        }
        Ok(builder.build())
    }

    /// Build the message for `alert`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Misconfigured`] if an address is invalid.
    pub fn build_message(&self, alert: &Alert) -> Result<Message, ChannelError> {
        let mut builder = Message::builder()
            .from(self.sender()?)
            .subject(render::email_subject(alert))
            .header(ContentType::TEXT_HTML);
        for recipient in self.recipients()? {
            builder = builder.to(recipient);
        }
        builder
            .body(render::email_html(alert))
            .map_err(|e| Self::misconfigured(format!("cannot build message: {e}")))
    }
}

impl std::fmt::Debug for EmailChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailChannel")
            .field("config", &self.config)
            .field("timeout", &self.timeout)
            .field("initialized", &self.transport.get().is_some())
            .finish()
    }
}

#[async_trait]
impl Channel for EmailChannel {
    fn name(&self) -> &'static str {
        CHANNEL
    }

    async fn init(&self) -> Result<(), ChannelError> {
        self.sender()?;
        self.recipients()?;
        let transport = self.build_transport()?;

        match transport.test_connection().await {
            Ok(true) => {}
            Ok(false) => {
                return Err(ChannelError::VerificationFailed {
                    channel: CHANNEL.to_string(),
                    message: format!("{} rejected the connection", self.config.smtp.host),
                });
            }
            Err(e) => {
                return Err(ChannelError::VerificationFailed {
                    channel: CHANNEL.to_string(),
                    message: e.to_string(),
                });
            }
        }

        let _ = self.transport.set(transport);
        tracing::info!(
            host = %self.config.smtp.host,
            port = self.config.smtp.port,
            recipients = self.config.recipients.len(),
            "Email channel ready"
        );
        Ok(())
    }

    async fn send(&self, alert: &Alert) -> Result<(), ChannelError> {
        let transport = self
            .transport
            .get()
            .ok_or_else(|| Self::misconfigured("channel used before initialization"))?;
        let message = self.build_message(alert)?;

        transport
            .send(message)
            .await
            .map_err(|e| ChannelError::Transport {
                channel: CHANNEL.to_string(),
                message: e.to_string(),
            })?;

        tracing::info!(alert_id = %alert.id, "Email notification sent");
        Ok(())
    }
}
