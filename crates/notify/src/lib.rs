//! Notification Dispatch
//!
//! Abstracts the outbound messaging provider behind a capability trait,
//! with a test-mode provider for reproducible runs and a Twilio-style
//! live provider. The dispatcher owns delivery retries and settles the
//! alert's terminal status off the critical path of alert creation.

mod dispatcher;
mod provider;
mod providers;

pub use dispatcher::{Dispatcher, RetryPolicy};
pub use provider::{DeliveryError, NotificationProvider, ProviderReceipt};
pub use providers::{SentMessage, TestProvider, TwilioConfig, TwilioProvider};
