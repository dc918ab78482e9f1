//! Evaluator Implementation

use alerting::{AlertError, AlertManager, SeverityPolicy};
use async_trait::async_trait;
use event_bus::EventHandler;
use std::sync::Arc;
use storage::{AnomalyRecord, Repository, StorageError};
use thiserror::Error;
use thresholds::{ThresholdStore, Violation};
use tracing::{debug, info};
use vitals::{Metric, VitalsEvent};

/// Evaluation errors.
///
/// Any of these makes the handler fail loudly so the bus redelivers the
/// event; losing a violating event is worse than re-evaluating it.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("Anomaly log unavailable: {0}")]
    Storage(#[from] StorageError),

    #[error("Alert creation failed: {0}")]
    Alert(#[from] AlertError),
}

/// Compares vitals readings against per-patient thresholds
pub struct Evaluator {
    thresholds: Arc<ThresholdStore>,
    repository: Arc<Repository>,
    alerts: Arc<AlertManager>,
    policy: SeverityPolicy,
}

impl Evaluator {
    pub fn new(
        thresholds: Arc<ThresholdStore>,
        repository: Arc<Repository>,
        alerts: Arc<AlertManager>,
        policy: SeverityPolicy,
    ) -> Self {
        info!("Creating evaluator with severity policy {:?}", policy);
        Self {
            thresholds,
            repository,
            alerts,
            policy,
        }
    }

    /// Evaluate one event, returning the anomalies it produced.
    ///
    /// Metrics without a configured threshold are skipped: no anomaly
    /// without a bound. Each violating metric yields its own anomaly and
    /// alert — no batching across metrics. A redelivered observation is
    /// collapsed by the log's dedup key and raises no second alert.
    pub fn evaluate(&self, event: &VitalsEvent) -> Result<Vec<AnomalyRecord>, EvaluatorError> {
        let mut anomalies = Vec::new();

        for metric in Metric::ALL {
            let Some(&value) = event.readings.get(&metric) else {
                continue;
            };
            let Some(threshold) = self.thresholds.get(event.patient_id, metric) else {
                continue;
            };
            let Some(violation) = threshold.check(value) else {
                continue;
            };

            let description = match violation {
                Violation::AboveMax { max, .. } => {
                    format!("{} {} exceeds max {}", metric, value, max)
                }
                Violation::BelowMin { min, .. } => {
                    format!("{} {} falls below min {}", metric, value, min)
                }
            };

            let record = AnomalyRecord {
                id: 0,
                patient_id: event.patient_id,
                metric,
                observed_value: value,
                threshold_id: threshold.id,
                severity: self.policy.classify(&threshold, &violation),
                description,
                detected_at: event.timestamp,
                observation_key: event.observation_key(metric),
            };

            let write = self.repository.insert_anomaly(record)?;
            if write.is_new() {
                let anomaly = write.record().clone();
                self.alerts.raise(&anomaly)?;
                anomalies.push(anomaly);
            } else {
                debug!(
                    "Redelivered observation {} already recorded, no new alert",
                    write.record().observation_key
                );
            }
        }

        Ok(anomalies)
    }
}

#[async_trait]
impl EventHandler for Evaluator {
    async fn handle(&self, event: &VitalsEvent) -> anyhow::Result<()> {
        let anomalies = self.evaluate(event)?;
        if !anomalies.is_empty() {
            info!(
                "Detected {} anomalies for patient {}",
                anomalies.len(),
                event.patient_id
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use identity::{ContactDirectory, StaticDirectory};
    use notify::{Dispatcher, RetryPolicy, TestProvider};
    use storage::{AlertStatus, Severity};
    use tokio::time::{sleep, Duration};
    use uuid::Uuid;

    struct Fixture {
        thresholds: Arc<ThresholdStore>,
        repository: Arc<Repository>,
        evaluator: Evaluator,
    }

    fn fixture() -> Fixture {
        let thresholds = Arc::new(ThresholdStore::new());
        let repository = Arc::new(Repository::new());
        let directory = Arc::new(StaticDirectory::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(TestProvider::new()),
            Arc::clone(&directory) as Arc<dyn ContactDirectory>,
            Arc::clone(&repository),
            RetryPolicy {
                max_attempts: 2,
                backoff_base_ms: 1,
                attempt_timeout_ms: 1000,
            },
        ));
        let alerts = Arc::new(AlertManager::new(
            Arc::clone(&repository),
            dispatcher,
            directory as Arc<dyn ContactDirectory>,
        ));
        let evaluator = Evaluator::new(
            Arc::clone(&thresholds),
            Arc::clone(&repository),
            alerts,
            SeverityPolicy::default(),
        );
        Fixture {
            thresholds,
            repository,
            evaluator,
        }
    }

    fn event(patient: Uuid, metric: Metric, value: f64) -> VitalsEvent {
        VitalsEvent::new(patient, Utc::now()).with_reading(metric, value)
    }

    async fn wait_for_settle(repository: &Repository, patient: Uuid) {
        for _ in 0..200 {
            let alerts = repository.alerts_for(patient).unwrap();
            if !alerts.is_empty() && alerts.iter().all(|a| a.status != AlertStatus::Pending) {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
        panic!("alerts for {} never settled", patient);
    }

    #[tokio::test]
    async fn test_violation_produces_one_anomaly_and_one_alert() {
        let fx = fixture();
        let patient = Uuid::new_v4();
        fx.thresholds
            .set(patient, Metric::HeartRate, None, Some(120.0))
            .unwrap();

        let anomalies = fx
            .evaluator
            .evaluate(&event(patient, Metric::HeartRate, 160.0))
            .unwrap();

        assert_eq!(anomalies.len(), 1);
        assert!(anomalies[0].description.contains("160"));
        assert!(anomalies[0].description.contains("120"));

        wait_for_settle(&fx.repository, patient).await;
        let alerts = fx.repository.alerts_for(patient).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].status, AlertStatus::Sent);
        assert!(alerts[0].message.contains("exceeds max"));
    }

    #[tokio::test]
    async fn test_in_range_values_produce_nothing() {
        let fx = fixture();
        let patient = Uuid::new_v4();
        fx.thresholds
            .set(patient, Metric::HeartRate, Some(40.0), Some(120.0))
            .unwrap();

        for value in [40.0, 80.0, 120.0] {
            let anomalies = fx
                .evaluator
                .evaluate(&event(patient, Metric::HeartRate, value))
                .unwrap();
            assert!(anomalies.is_empty(), "value {} flagged", value);
        }
        assert_eq!(fx.repository.anomaly_count(), 0);
        assert_eq!(fx.repository.alert_count(), 0);
    }

    #[tokio::test]
    async fn test_no_threshold_means_no_anomaly() {
        let fx = fixture();
        let patient = Uuid::new_v4();

        let anomalies = fx
            .evaluator
            .evaluate(&event(patient, Metric::HeartRate, 80.0))
            .unwrap();

        assert!(anomalies.is_empty());
        assert_eq!(fx.repository.anomaly_count(), 0);
        assert_eq!(fx.repository.alert_count(), 0);
    }

    #[tokio::test]
    async fn test_below_min_description() {
        let fx = fixture();
        let patient = Uuid::new_v4();
        fx.thresholds
            .set(patient, Metric::Spo2, Some(90.0), None)
            .unwrap();

        let anomalies = fx
            .evaluator
            .evaluate(&event(patient, Metric::Spo2, 85.0))
            .unwrap();

        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].description, "spo2 85 falls below min 90");
        assert_eq!(anomalies[0].severity, Severity::Warning);
    }

    #[tokio::test]
    async fn test_multiple_violating_metrics_are_independent() {
        let fx = fixture();
        let patient = Uuid::new_v4();
        fx.thresholds
            .set(patient, Metric::HeartRate, None, Some(120.0))
            .unwrap();
        fx.thresholds
            .set(patient, Metric::Spo2, Some(90.0), None)
            .unwrap();

        let event = VitalsEvent::new(patient, Utc::now())
            .with_reading(Metric::HeartRate, 150.0)
            .with_reading(Metric::Spo2, 85.0)
            .with_reading(Metric::Temperature, 37.0);

        let anomalies = fx.evaluator.evaluate(&event).unwrap();
        assert_eq!(anomalies.len(), 2);

        wait_for_settle(&fx.repository, patient).await;
        assert_eq!(fx.repository.alerts_for(patient).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_redelivered_event_does_not_duplicate() {
        let fx = fixture();
        let patient = Uuid::new_v4();
        fx.thresholds
            .set(patient, Metric::HeartRate, None, Some(120.0))
            .unwrap();

        let event = event(patient, Metric::HeartRate, 160.0);
        let first = fx.evaluator.evaluate(&event).unwrap();
        let second = fx.evaluator.evaluate(&event).unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty(), "redelivery must not produce new anomalies");
        assert_eq!(fx.repository.anomaly_count(), 1);
        assert_eq!(fx.repository.alert_count(), 1);
    }

    #[tokio::test]
    async fn test_extreme_violation_classified_critical() {
        let fx = fixture();
        let patient = Uuid::new_v4();
        fx.thresholds
            .set(patient, Metric::HeartRate, Some(40.0), Some(120.0))
            .unwrap();

        let anomalies = fx
            .evaluator
            .evaluate(&event(patient, Metric::HeartRate, 210.0))
            .unwrap();

        assert_eq!(anomalies[0].severity, Severity::Critical);
    }
}
