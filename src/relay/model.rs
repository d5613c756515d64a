//! Wire types for the send endpoint.

use serde::{Deserialize, Serialize};

/// Filename used when an attachment arrives without one.
pub const DEFAULT_ATTACHMENT_NAME: &str = "attachment.csv";

/// A request to relay one email.
///
/// Every field is optional at the serde level so that absent fields are
/// reported by validation with their name, not by the JSON extractor.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub recipient: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    /// Base64-encoded attachment content.
    pub attachment: Option<String>,
    pub attachment_name: Option<String>,
    /// Explicit MIME type; inferred from the filename when absent.
    pub attachment_content_type: Option<String>,
}

impl SendRequest {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: Some(recipient.into()),
            subject: Some(subject.into()),
            body: Some(body.into()),
            ..Default::default()
        }
    }

    /// Attach base64-encoded content under the given filename.
    pub fn with_attachment(mut self, base64: impl Into<String>, name: impl Into<String>) -> Self {
        self.attachment = Some(base64.into());
        self.attachment_name = Some(name.into());
        self
    }
}

/// Successful relay acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn sent() -> Self {
        Self {
            success: true,
            message: "Email sent successfully".to_string(),
        }
    }
}
