//! Mail relay handler: validate a send request, assemble the envelope, deliver it once.

use std::sync::Arc;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use lettre::message::Mailbox;
use tracing::{debug, error, info};

use super::model::{Ack, DEFAULT_ATTACHMENT_NAME, SendRequest};
use crate::error::SendError;
use crate::mail::{Attachment, Envelope, MailTransport};

/// Standard alphabet, padding optional.
const ATTACHMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Relays validated send requests to a [`MailTransport`].
///
/// Holds no per-request state; one instance serves all requests.
#[derive(Clone)]
pub struct MailRelay {
    transport: Arc<dyn MailTransport>,
    sender: Mailbox,
}

impl MailRelay {
    pub fn new(transport: Arc<dyn MailTransport>, sender: Mailbox) -> Self {
        Self { transport, sender }
    }

    /// Validate, build and send one email.
    ///
    /// Client errors are returned before the transport is touched. The
    /// transport is invoked at most once and its failure is logged here.
    pub async fn handle(&self, request: SendRequest) -> Result<Ack, SendError> {
        let envelope = self.build_envelope(request)?;

        // Addresses and subjects stay out of the default `info` output.
        debug!(
            transport = self.transport.name(),
            to = %envelope.to,
            subject = %envelope.subject,
            "Relaying email"
        );

        match self.transport.send(&envelope).await {
            Ok(()) => {
                info!(
                    transport = self.transport.name(),
                    attachments = envelope.attachments.len(),
                    "Email sent"
                );
                Ok(Ack::sent())
            }
            Err(e) => {
                error!(transport = self.transport.name(), error = %e, "Failed to send email");
                Err(SendError::Transport(e))
            }
        }
    }

    /// Turn a request into an envelope without sending it.
    pub fn build_envelope(&self, request: SendRequest) -> Result<Envelope, SendError> {
        let recipient = required(request.recipient, "recipient")?;
        let subject = required(request.subject, "subject")?;
        let body = required(request.body, "body")?;

        let to: Mailbox = recipient
            .trim()
            .parse()
            .map_err(|_| SendError::InvalidRecipient(recipient.clone()))?;

        let attachments = match request.attachment.filter(|a| !a.is_empty()) {
            Some(encoded) => {
                let filename = request
                    .attachment_name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_ATTACHMENT_NAME.to_string());
                let content_type =
                    resolve_content_type(&filename, request.attachment_content_type.as_deref())?;
                vec![Attachment {
                    content: decode_attachment(&encoded)?,
                    filename,
                    content_type,
                }]
            }
            None => Vec::new(),
        };

        Ok(Envelope {
            from: self.sender.clone(),
            to,
            subject,
            body,
            attachments,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, SendError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(SendError::MissingField(field))
}

/// Decode base64 attachment text. Whitespace (e.g. MIME line wrapping) is ignored.
pub fn decode_attachment(encoded: &str) -> Result<Vec<u8>, SendError> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    ATTACHMENT_ENGINE
        .decode(compact.as_bytes())
        .map_err(|e| SendError::InvalidAttachment(format!("not valid base64: {e}")))
}

/// Use the explicit content type when given, otherwise guess from the filename.
pub fn resolve_content_type(filename: &str, explicit: Option<&str>) -> Result<String, SendError> {
    match explicit.map(str::trim).filter(|ct| !ct.is_empty()) {
        Some(ct) => ct
            .parse::<mime_guess::Mime>()
            .map(|mime| mime.to_string())
            .map_err(|_| SendError::InvalidAttachment(format!("invalid content type {ct:?}"))),
        None => Ok(mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string()),
    }
}
