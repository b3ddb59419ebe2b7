//! HTTP mail relay transport.
//!
//! Posts each message as JSON to a relay endpoint that owns the sending
//! account. The report travels base64-encoded in the same request.

use async_trait::async_trait;
use base64::Engine as _;
use crate::error::{CliError, CliResult};
use restocker::{MailConfig, MailTransport, OutgoingMessage, Sent, TransportError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Upper bound on one relay request
pub const RELAY_TIMEOUT: Duration = Duration::from_secs(60);

/// Attachment as the relay expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayAttachment {
    /// File name shown to recipients
    pub filename: String,
    /// Base64 file content
    pub content_base64: String,
}

/// Request body posted to the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayPayload {
    /// Sending account
    pub from: String,
    /// Primary recipients
    pub to: Vec<String>,
    /// Copy recipients
    pub cc: Vec<String>,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub text: String,
    /// Zero or one attachment
    pub attachments: Vec<RelayAttachment>,
}

#[derive(Debug, Default, Deserialize)]
struct RelayResponse {
    #[serde(default)]
    id: Option<String>,
}

/// [`MailTransport`] backed by an HTTP relay
#[derive(Debug, Clone)]
pub struct HttpMailTransport {
    endpoint: Option<String>,
    sender: String,
    token: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpMailTransport {
    /// Transport for the relay named in the mail config
    pub fn new(mail: &MailConfig, token: Option<String>) -> CliResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(RELAY_TIMEOUT)
            .build()
            .map_err(|e| CliError::config(format!("cannot build mail relay client: {e}")))?;
        Ok(Self {
            endpoint: mail
                .relay_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            sender: mail.sender.clone(),
            token: token.filter(|t| !t.trim().is_empty()),
            timeout: RELAY_TIMEOUT,
            client,
        })
    }

    /// Per-request timeout the client was built with
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Relay endpoint, if configured
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Build the request body, reading the attachment from disk
    pub fn payload(&self, message: &OutgoingMessage) -> Result<RelayPayload, TransportError> {
        let attachments = match &message.attachment {
            None => Vec::new(),
            Some(path) => {
                let bytes = std::fs::read(path).map_err(|e| TransportError::Attachment {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
                let filename = path
                    .file_name()
                    .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
                vec![RelayAttachment {
                    filename,
                    content_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
                }]
            }
        };
        Ok(RelayPayload {
            from: self.sender.clone(),
            to: message.to.clone(),
            cc: message.cc.clone(),
            subject: message.subject.clone(),
            text: message.body.clone(),
            attachments,
        })
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<Sent, TransportError> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Err(TransportError::NotConfigured {
                message: "mail.relay_url is not set".to_string(),
            });
        };
        if self.sender.trim().is_empty() {
            return Err(TransportError::NotConfigured {
                message: "mail.sender is not set".to_string(),
            });
        }

        let payload = self.payload(message)?;
        let mut request = self.client.post(endpoint).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        debug!(endpoint, to = ?payload.to, "posting message to mail relay");

        let resp = request.send().await.map_err(|e| TransportError::Network {
            message: e.to_string(),
        })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: RelayResponse = resp.json().await.unwrap_or_default();
        Ok(Sent { id: body.id })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mail(relay: Option<&str>) -> MailConfig {
        MailConfig {
            sender: "ops@store.test".to_string(),
            team_to: vec!["team@store.test".to_string()],
            alert_to: vec!["me@store.test".to_string()],
            relay_url: relay.map(str::to_string),
            ..MailConfig::default()
        }
    }

    fn message(attachment: Option<std::path::PathBuf>) -> OutgoingMessage {
        OutgoingMessage {
            to: vec!["team@store.test".to_string()],
            cc: vec!["boss@store.test".to_string()],
            subject: "Restocking Report - 06/03/2024".to_string(),
            body: "Hello".to_string(),
            attachment,
        }
    }

    #[test]
    fn test_payload_encodes_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Restocking_2024-06-03.xlsx");
        std::fs::write(&path, b"xlsx").unwrap();

        let transport = HttpMailTransport::new(&mail(Some("http://relay.test/send")), None).unwrap();
        let payload = transport.payload(&message(Some(path))).unwrap();
        assert_eq!(payload.from, "ops@store.test");
        assert_eq!(payload.cc, vec!["boss@store.test".to_string()]);
        assert_eq!(payload.attachments.len(), 1);
        assert_eq!(payload.attachments[0].filename, "Restocking_2024-06-03.xlsx");
        assert_eq!(payload.attachments[0].content_base64, "eGxzeA==");
    }

    #[test]
    fn test_payload_without_attachment() {
        let transport = HttpMailTransport::new(&mail(Some("http://relay.test/send")), None).unwrap();
        let payload = transport.payload(&message(None)).unwrap();
        assert!(payload.attachments.is_empty());
    }

    #[test]
    fn test_missing_attachment_is_error() {
        let transport = HttpMailTransport::new(&mail(Some("http://relay.test/send")), None).unwrap();
        let err = transport
            .payload(&message(Some("/nonexistent/report.xlsx".into())))
            .unwrap_err();
        assert!(matches!(err, TransportError::Attachment { .. }));
    }

    #[test]
    fn test_client_keeps_relay_timeout() {
        let transport = HttpMailTransport::new(&mail(Some("http://relay.test/send")), None).unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_blank_relay_url_is_unconfigured() {
        let transport = HttpMailTransport::new(&mail(Some("  ")), Some(String::new())).unwrap();
        assert!(transport.endpoint().is_none());
    }

    #[tokio::test]
    async fn test_send_without_relay_is_not_configured() {
        let transport = HttpMailTransport::new(&mail(None), None).unwrap();
        let err = transport.send(&message(None)).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn test_send_without_sender_is_not_configured() {
        let mut config = mail(Some("http://relay.test/send"));
        config.sender = String::new();
        let transport = HttpMailTransport::new(&config, None).unwrap();
        let err = transport.send(&message(None)).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConfigured { .. }));
    }
}
