//! Provider Implementations

use crate::provider::{DeliveryError, NotificationProvider, ProviderReceipt};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// A message the test provider accepted
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: String,
    pub body: String,
}

/// Test-mode provider: deterministic success, zero external side effects.
///
/// Accepted messages are recorded in memory so tests can assert on them.
#[derive(Default)]
pub struct TestProvider {
    deliveries: Mutex<Vec<SentMessage>>,
}

impl TestProvider {
    pub fn new() -> Self {
        info!("Notification provider: test mode, no messages leave the process");
        Self::default()
    }

    /// Messages accepted so far
    pub fn deliveries(&self) -> Vec<SentMessage> {
        self.deliveries
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationProvider for TestProvider {
    async fn deliver(&self, to: &str, body: &str) -> Result<ProviderReceipt, DeliveryError> {
        let receipt = ProviderReceipt {
            message_id: format!("test-{}", Uuid::new_v4()),
        };
        if let Ok(mut deliveries) = self.deliveries.lock() {
            deliveries.push(SentMessage {
                to: to.to_string(),
                body: body.to_string(),
            });
        }
        debug!("Test provider accepted message ({})", receipt.message_id);
        Ok(receipt)
    }

    fn name(&self) -> &'static str {
        "test"
    }

    fn requires_recipient(&self) -> bool {
        false
    }
}

/// Twilio credentials and endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    /// Override for testing against a stub server
    #[serde(default = "default_twilio_base")]
    pub base_url: String,
}

fn default_twilio_base() -> String {
    "https://api.twilio.com".to_string()
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: String,
}

/// Live SMS provider calling the Twilio Messages API
pub struct TwilioProvider {
    config: TwilioConfig,
    client: reqwest::Client,
}

impl TwilioProvider {
    pub fn new(config: TwilioConfig) -> Self {
        info!("Notification provider: twilio, from {}", config.from_number);
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotificationProvider for TwilioProvider {
    async fn deliver(&self, to: &str, body: &str) -> Result<ProviderReceipt, DeliveryError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.base_url, self.config.account_sid
        );
        let form = [
            ("From", self.config.from_number.as_str()),
            ("To", to),
            ("Body", body),
        ];

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DeliveryError::Auth(format!("twilio returned {}", status)));
        }
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_else(|_| status.to_string());
            return Err(DeliveryError::Rejected(detail));
        }

        let message: TwilioMessageResponse = resp
            .json()
            .await
            .map_err(|e| DeliveryError::Rejected(format!("unparseable response: {}", e)))?;

        Ok(ProviderReceipt {
            message_id: message.sid,
        })
    }

    fn name(&self) -> &'static str {
        "twilio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_provider_returns_synthetic_receipt() {
        let provider = TestProvider::new();
        let receipt = provider.deliver("+15550100", "hello").await.unwrap();

        assert!(receipt.message_id.starts_with("test-"));
        assert!(receipt.message_id.len() > "test-".len());

        let deliveries = provider.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].body, "hello");
    }

    #[tokio::test]
    async fn test_provider_accepts_missing_recipient() {
        let provider = TestProvider::new();
        assert!(!provider.requires_recipient());
        assert!(provider.deliver("", "no phone on record").await.is_ok());
    }
}
