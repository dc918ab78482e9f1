//! Event Bus
//!
//! Carries "vitals ingested" events from the ingestion boundary to the
//! evaluator with at-least-once delivery. Publishing completes once the
//! event is enqueued; evaluation happens on the consumer worker, which
//! acknowledges an event only after its handler succeeds and redelivers
//! it with backoff otherwise.

mod bus;

pub use bus::{channel, BusConfig, BusError, EventBus, EventConsumer, EventHandler};
