//! Event Bus Implementation

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};
use vitals::VitalsEvent;

/// Bus errors
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Event bus is closed")]
    Closed,
}

/// Bus configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Channel capacity before publishers block
    pub capacity: usize,
    /// Deliveries per event before it is dead-lettered
    pub max_deliveries: u32,
    /// Redelivery backoff base; delivery n waits base * 2^(n-1)
    pub redelivery_backoff_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            max_deliveries: 5,
            redelivery_backoff_ms: 200,
        }
    }
}

/// An event plus its delivery count
#[derive(Debug, Clone)]
struct Envelope {
    event: VitalsEvent,
    delivery: u32,
}

/// Consumer-side processing capability.
///
/// Returning an error triggers redelivery; the bus treats the handler's
/// failure reason as opaque.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &VitalsEvent) -> anyhow::Result<()>;
}

/// Publisher handle, cheap to clone
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<Envelope>,
    inflight: Arc<AtomicUsize>,
}

impl EventBus {
    /// Publish an event; returns once it is enqueued.
    ///
    /// The caller is released before evaluation runs — the consumption
    /// path owns everything downstream.
    pub async fn publish(&self, event: VitalsEvent) -> Result<(), BusError> {
        self.inflight.fetch_add(1, Ordering::Relaxed);
        let envelope = Envelope { event, delivery: 1 };
        self.tx.send(envelope).await.map_err(|_| {
            self.inflight.fetch_sub(1, Ordering::Relaxed);
            BusError::Closed
        })?;
        debug!("Event published, {} in flight", self.depth());
        Ok(())
    }

    /// Events published but not yet acknowledged or dead-lettered
    pub fn depth(&self) -> usize {
        self.inflight.load(Ordering::Relaxed)
    }
}

/// Consumer worker pulling events off the queue
pub struct EventConsumer {
    rx: mpsc::Receiver<Envelope>,
    /// Weak so the consumer itself never keeps the channel open; a
    /// pending redelivery upgrades to a strong sender for its lifetime
    redelivery_tx: mpsc::WeakSender<Envelope>,
    inflight: Arc<AtomicUsize>,
    config: BusConfig,
}

/// Create a connected publisher/consumer pair
pub fn channel(config: BusConfig) -> (EventBus, EventConsumer) {
    let (tx, rx) = mpsc::channel(config.capacity);
    let inflight = Arc::new(AtomicUsize::new(0));
    info!("Creating event bus: {:?}", config);
    (
        EventBus {
            tx: tx.clone(),
            inflight: Arc::clone(&inflight),
        },
        EventConsumer {
            rx,
            redelivery_tx: tx.downgrade(),
            inflight,
            config,
        },
    )
}

impl EventConsumer {
    /// Run the consumption loop until all publishers are dropped.
    ///
    /// An event is acknowledged only after the handler returns Ok. On
    /// failure it is requeued with exponential backoff until the
    /// delivery cap, then dead-lettered loudly.
    pub async fn run(mut self, handler: Arc<dyn EventHandler>) {
        info!("Starting event consumer");

        while let Some(envelope) = self.rx.recv().await {
            match handler.handle(&envelope.event).await {
                Ok(()) => {
                    self.inflight.fetch_sub(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!(
                        "Evaluation failed on delivery {}/{} for patient {}: {}",
                        envelope.delivery,
                        self.config.max_deliveries,
                        envelope.event.patient_id,
                        e
                    );
                    self.redeliver(envelope);
                }
            }
        }

        info!("Event consumer stopped");
    }

    fn redeliver(&self, mut envelope: Envelope) {
        if envelope.delivery >= self.config.max_deliveries {
            // Giving up loses the evaluation; make it impossible to miss.
            error!(
                "Dead-lettering event for patient {} at {} after {} deliveries",
                envelope.event.patient_id, envelope.event.timestamp, envelope.delivery
            );
            self.inflight.fetch_sub(1, Ordering::Relaxed);
            return;
        }

        let Some(tx) = self.redelivery_tx.upgrade() else {
            self.inflight.fetch_sub(1, Ordering::Relaxed);
            error!("Redelivery dropped: event bus closed");
            return;
        };

        let backoff = Duration::from_millis(
            self.config
                .redelivery_backoff_ms
                .saturating_mul(1u64 << (envelope.delivery - 1).min(16)),
        );
        envelope.delivery += 1;

        let inflight = Arc::clone(&self.inflight);
        tokio::spawn(async move {
            sleep(backoff).await;
            if tx.send(envelope).await.is_err() {
                inflight.fetch_sub(1, Ordering::Relaxed);
                error!("Redelivery dropped: event bus closed");
            }
        });
    }
}
