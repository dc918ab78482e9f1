//! Notification Dispatcher

use crate::provider::NotificationProvider;
use chrono::Utc;
use identity::ContactDirectory;
use serde::Deserialize;
use std::sync::Arc;
use storage::{AlertRecord, AlertStatus, Repository, StorageError};
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Bounded CAS retries when settling a status under concurrent writers
const SETTLE_ATTEMPTS: u32 = 4;

/// Retry policy for delivery attempts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delivery attempts before settling into failed
    pub max_attempts: u32,
    /// Backoff base; attempt n waits base * 2^(n-1)
    pub backoff_base_ms: u64,
    /// Hard timeout per attempt so a stalled provider cannot starve the budget
    pub attempt_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 250,
            attempt_timeout_ms: 5000,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt following failure number `failed`
    pub fn backoff(&self, failed: u32) -> Duration {
        let exponent = failed.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(1u64 << exponent))
    }
}

/// Delivers alert messages through the configured provider and settles
/// the alert's terminal status.
///
/// Runs off the critical path of alert creation: `raise`/`send` return
/// with a pending record while delivery proceeds in a spawned task.
pub struct Dispatcher {
    provider: Arc<dyn NotificationProvider>,
    directory: Arc<dyn ContactDirectory>,
    repository: Arc<Repository>,
    retry: RetryPolicy,
}

impl Dispatcher {
    pub fn new(
        provider: Arc<dyn NotificationProvider>,
        directory: Arc<dyn ContactDirectory>,
        repository: Arc<Repository>,
        retry: RetryPolicy,
    ) -> Self {
        info!(
            "Creating dispatcher: provider={}, retry={:?}",
            provider.name(),
            retry
        );
        Self {
            provider,
            directory,
            repository,
            retry,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Fire-and-continue entry point used by the alert manager
    pub fn spawn(self: &Arc<Self>, alert: AlertRecord) {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = dispatcher.dispatch(alert).await {
                error!("Dispatch settling failed: {}", e);
            }
        });
    }

    /// Deliver the alert's message and settle its status.
    ///
    /// Delivery failure never erases the alert: it stays queryable with
    /// `status=failed` and the provider's diagnostic.
    pub async fn dispatch(&self, alert: AlertRecord) -> Result<AlertRecord, StorageError> {
        let mut contact_note = None;
        let recipient = match self.directory.contact_for(alert.patient_id).await {
            Ok(contact) => Some(contact.phone),
            Err(e) => {
                warn!("Contact lookup failed for patient {}: {}", alert.patient_id, e);
                contact_note = Some(format!("contact-lookup-failed: {}", e));
                None
            }
        };

        if recipient.is_none() && self.provider.requires_recipient() {
            let diagnostic = match contact_note {
                Some(note) => format!("{}; missing recipient contact", note),
                None => "missing recipient contact".to_string(),
            };
            return self.settle_failed(alert.id, diagnostic);
        }

        let to = recipient.clone().unwrap_or_default();
        let attempt_timeout = Duration::from_millis(self.retry.attempt_timeout_ms);
        let mut last_error = String::new();

        for attempt in 1..=self.retry.max_attempts {
            match timeout(attempt_timeout, self.provider.deliver(&to, &alert.message)).await {
                Ok(Ok(receipt)) => {
                    debug!(
                        "Alert {} delivered via {} on attempt {} ({})",
                        alert.id,
                        self.provider.name(),
                        attempt,
                        receipt.message_id
                    );
                    return self.settle_sent(alert.id, receipt.message_id, recipient);
                }
                Ok(Err(e)) => {
                    warn!(
                        "Alert {} delivery attempt {}/{} failed: {}",
                        alert.id, attempt, self.retry.max_attempts, e
                    );
                    last_error = e.to_string();
                }
                Err(_) => {
                    // The in-flight attempt is abandoned, not cancelled
                    warn!(
                        "Alert {} delivery attempt {}/{} timed out after {}ms",
                        alert.id, attempt, self.retry.max_attempts, self.retry.attempt_timeout_ms
                    );
                    last_error = format!(
                        "attempt timed out after {}ms",
                        self.retry.attempt_timeout_ms
                    );
                }
            }

            if attempt < self.retry.max_attempts {
                sleep(self.retry.backoff(attempt)).await;
            }
        }

        self.settle_failed(alert.id, last_error)
    }

    fn settle_sent(
        &self,
        alert_id: Uuid,
        provider_message_id: String,
        recipient: Option<String>,
    ) -> Result<AlertRecord, StorageError> {
        self.transition(alert_id, AlertStatus::Sent, |record| {
            record.status = AlertStatus::Sent;
            record.provider_message_id = Some(provider_message_id.clone());
            record.recipient_phone = recipient.clone();
            record.sent_at = Some(Utc::now());
            record.error_message = None;
        })
    }

    fn settle_failed(
        &self,
        alert_id: Uuid,
        diagnostic: String,
    ) -> Result<AlertRecord, StorageError> {
        warn!("Alert {} settled as failed: {}", alert_id, diagnostic);
        self.transition(alert_id, AlertStatus::Failed, |record| {
            record.status = AlertStatus::Failed;
            record.error_message = Some(diagnostic.clone());
        })
    }

    /// Apply a status transition through the version check, retrying
    /// against the fresh record when a concurrent writer wins.
    fn transition<F>(
        &self,
        alert_id: Uuid,
        next: AlertStatus,
        apply: F,
    ) -> Result<AlertRecord, StorageError>
    where
        F: Fn(&mut AlertRecord),
    {
        for _ in 0..SETTLE_ATTEMPTS {
            let current = self.repository.get_alert(alert_id)?;
            if !current.status.accepts(next) {
                warn!(
                    "Alert {} not moved to {:?}: state {:?} does not allow it",
                    alert_id, next, current.status
                );
                return Ok(current);
            }
            match self.repository.update_alert(alert_id, current.version, &apply) {
                Ok(updated) => return Ok(updated),
                Err(StorageError::VersionConflict { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(StorageError::StoreError(format!(
            "gave up settling alert {} after {} version conflicts",
            alert_id, SETTLE_ATTEMPTS
        )))
    }
}
