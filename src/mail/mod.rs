//! Outgoing message envelope and the transport abstraction.

pub mod smtp;

pub use smtp::SmtpTransport;

use async_trait::async_trait;
use lettre::message::Mailbox;

use crate::error::TransportError;

/// A named binary payload attached to an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    /// MIME type, e.g. `text/csv`.
    pub content_type: String,
    pub content: Vec<u8>,
}

/// The fully assembled message handed to a [`MailTransport`].
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from: Mailbox,
    pub to: Mailbox,
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    pub attachments: Vec<Attachment>,
}

/// Something that can deliver an [`Envelope`].
///
/// One call is one delivery attempt; implementations must not retry.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Deliver the envelope, resolving once the remote side accepts or rejects it.
    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError>;
}
