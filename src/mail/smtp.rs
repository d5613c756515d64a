//! SMTP transport via lettre's async tokio executor.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

use super::{Envelope, MailTransport};
use crate::config::{SmtpConfig, TlsMode};
use crate::error::TransportError;

/// Delivers envelopes through an SMTP relay.
///
/// The underlying lettre transport is built once and shared read-only
/// across requests.
#[derive(Clone)]
pub struct SmtpTransport {
    inner: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    host: String,
}

impl SmtpTransport {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, TransportError> {
        let mut builder = match config.tls {
            TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
            TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| TransportError::Setup(e.to_string()))?,
            TlsMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| TransportError::Setup(e.to_string()))?,
        };

        builder = builder.port(config.port).timeout(Some(config.timeout));

        if let Some(creds) = &config.credentials {
            builder = builder.credentials(Credentials::new(
                creds.username.clone(),
                creds.password.expose_secret().to_string(),
            ));
        }

        tracing::info!(
            host = %config.host,
            port = config.port,
            tls = ?config.tls,
            authenticated = config.credentials.is_some(),
            "SMTP transport configured"
        );

        Ok(Self {
            inner: Arc::new(builder.build()),
            host: config.host.clone(),
        })
    }

    /// Check that the relay accepts a connection (and login, if configured).
    pub async fn test_connection(&self) -> Result<bool, TransportError> {
        self.inner
            .test_connection()
            .await
            .map_err(|e| TransportError::Smtp(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    fn name(&self) -> &str {
        &self.host
    }

    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let message = build_message(envelope)?;
        self.inner
            .send(message)
            .await
            .map_err(|e| TransportError::Smtp(e.to_string()))?;
        Ok(())
    }
}

/// Turn an envelope into a lettre message.
///
/// Without attachments the message is a single plain-text part; otherwise it
/// is `multipart/mixed` with the text first and each attachment after it.
pub fn build_message(envelope: &Envelope) -> Result<Message, TransportError> {
    let builder = Message::builder()
        .from(envelope.from.clone())
        .to(envelope.to.clone())
        .subject(envelope.subject.clone());

    if envelope.attachments.is_empty() {
        return builder
            .body(envelope.body.clone())
            .map_err(|e| TransportError::Build(e.to_string()));
    }

    let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(envelope.body.clone()));
    for attachment in &envelope.attachments {
        let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
            TransportError::Build(format!(
                "invalid content type {:?}: {e}",
                attachment.content_type
            ))
        })?;
        parts = parts.singlepart(
            MimeAttachment::new(attachment.filename.clone())
                .body(attachment.content.clone(), content_type),
        );
    }

    builder
        .multipart(parts)
        .map_err(|e| TransportError::Build(e.to_string()))
}
