//! Webhook delivery transport.
//!
//! Posts the rendered report to a configured HTTP endpoint as JSON and
//! expects an `ok` acknowledgement. Useful for handing delivery to an
//! external relay without speaking SMTP from this process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::TransportError;
use crate::core::stage::{OutboundMessage, Transport};

/// Configuration for the webhook transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Endpoint receiving the outbound message
    pub url: String,
}

/// Acknowledgement returned by the relay
#[derive(Debug, Deserialize)]
struct WebhookAck {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP transport posting messages to a delivery relay
pub struct WebhookTransport {
    url: String,
    client: reqwest::Client,
}

impl WebhookTransport {
    /// Create a transport targeting the given endpoint
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from config
    pub fn from_config(config: WebhookConfig) -> Self {
        Self::new(config.url)
    }
}

#[async_trait]
impl Transport for WebhookTransport {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({
                "subject": message.subject,
                "body": message.body,
                "recipient": message.recipient,
            }))
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::Rejected(format!(
                "relay returned HTTP {}",
                response.status()
            )));
        }

        let ack: WebhookAck = response
            .json()
            .await
            .map_err(|e| TransportError::Request(format!("malformed relay ack: {}", e)))?;

        if !ack.ok {
            return Err(TransportError::Rejected(
                ack.error.unwrap_or_else(|| "relay refused message".to_string()),
            ));
        }

        Ok(())
    }
}
