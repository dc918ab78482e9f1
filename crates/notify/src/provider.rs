//! Notification Provider Capability

use async_trait::async_trait;
use thiserror::Error;

/// Delivery errors surfaced by a provider
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// Provider reached but it refused the message (bad number, quota)
    #[error("Provider rejected the message: {0}")]
    Rejected(String),

    /// Provider could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// Credentials were refused
    #[error("Provider authentication failed: {0}")]
    Auth(String),
}

/// Provider's handle for a delivered message
#[derive(Debug, Clone)]
pub struct ProviderReceipt {
    pub message_id: String,
}

/// Outbound messaging provider.
///
/// Chosen once at process start from configuration; the dispatcher never
/// branches on which variant it holds.
#[async_trait]
pub trait NotificationProvider: Send + Sync {
    /// Attempt delivery of `body` to the contact channel `to`
    async fn deliver(&self, to: &str, body: &str) -> Result<ProviderReceipt, DeliveryError>;

    /// Provider name, used in logs and the health endpoint
    fn name(&self) -> &'static str;

    /// Whether delivery needs a resolved contact channel.
    ///
    /// The test-mode provider reports `false`: it simulates delivery even
    /// when no phone number is on record.
    fn requires_recipient(&self) -> bool {
        true
    }
}
