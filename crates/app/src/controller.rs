//! Controller — composition root of the ingestion and evaluation loops.
//!
//! [`Controller::run`] spawns both loops against a fresh [`DeviceTable`] and
//! reports exactly one terminal value on the completion channel: whichever
//! loop stops first decides the cause, and the other loop is aborted.
//! Nothing is retried; reconnecting is the process supervisor's job.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};

use greenhouse_domain::error::TransportError;
use greenhouse_domain::id::TenantId;

use crate::device_table::DeviceTable;
use crate::evaluation::Evaluator;
use crate::ingestion::Ingestor;
use crate::policy::Policy;
use crate::ports::{CommandSink, EventSource};

/// Immutable controller settings.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Tenant all commands are addressed under.
    pub tenant_id: TenantId,
    /// Pause between evaluation cycles.
    pub wait_period: Duration,
}

/// Why the controller terminated.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The event source failed.
    #[error("event ingestion stopped")]
    Ingestion(#[source] TransportError),

    /// The command sink failed.
    #[error("policy evaluation stopped")]
    Evaluation(#[source] TransportError),

    /// A loop task panicked or was cancelled.
    #[error("controller task failed")]
    Task(#[source] JoinError),
}

/// Single-use channel receiving the controller's terminal value.
pub type Completion = oneshot::Sender<Result<(), ControllerError>>;

/// Owns both loops and their lifecycle; holds no policy logic of its own.
pub struct Controller<S, C, P> {
    source: S,
    sink: C,
    policy: P,
    config: ControllerConfig,
}

impl<S, C, P> Controller<S, C, P>
where
    S: EventSource + 'static,
    C: CommandSink + 'static,
    P: Policy,
{
    pub fn new(source: S, sink: C, policy: P, config: ControllerConfig) -> Self {
        Self {
            source,
            sink,
            policy,
            config,
        }
    }

    /// Start both loops and return immediately.
    ///
    /// Consumes the controller, so it can only run once. The terminal value
    /// is sent on `done` exactly once; the returned handle completes right
    /// after.
    pub fn run(self, done: Completion) -> JoinHandle<()> {
        let Self {
            source,
            sink,
            policy,
            config,
        } = self;

        let policy = Arc::new(policy);
        let table = DeviceTable::new();
        let ingestor = Ingestor::new(Arc::clone(&policy), table.clone());
        let evaluator = Evaluator::new(policy, table, sink, config.tenant_id, config.wait_period);

        tokio::spawn(async move {
            let mut ingestion = tokio::spawn(async move { ingestor.run(source).await });
            let mut evaluation = tokio::spawn(async move { evaluator.run().await });

            let outcome: Result<(), ControllerError> = tokio::select! {
                joined = &mut ingestion => {
                    evaluation.abort();
                    Err(joined.map_or_else(ControllerError::Task, ControllerError::Ingestion))
                }
                joined = &mut evaluation => {
                    ingestion.abort();
                    Err(joined.map_or_else(ControllerError::Task, ControllerError::Evaluation))
                }
            };

            if let Err(err) = &outcome {
                tracing::error!(%err, "controller terminated");
            }

            if done.send(outcome).is_err() {
                tracing::warn!("completion receiver dropped before termination was reported");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{Outcome, RecordingSink, ScriptedSource};
    use crate::policy::ThresholdPolicy;
    use greenhouse_domain::event::Event;
    use serde_json::json;

    const WAIT: Duration = Duration::from_secs(1800);

    fn config() -> ControllerConfig {
        ControllerConfig {
            tenant_id: TenantId::new("acme"),
            wait_period: WAIT,
        }
    }

    fn soil(device: &str, samples: serde_json::Value) -> Event {
        Event::new(device, 0).with("soil", samples)
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_end_of_stream_once() {
        let source = ScriptedSource::new(Vec::new());
        let log = source.log();
        let sink = RecordingSink::default();
        let controller = Controller::new(source, sink, ThresholdPolicy::new(900.0), config());
        let (tx, rx) = oneshot::channel();

        let handle = controller.run(tx);
        let outcome = rx.await.unwrap();
        handle.await.unwrap();

        assert!(matches!(
            outcome,
            Err(ControllerError::Ingestion(TransportError::EndOfStream))
        ));
        let log = log.lock().unwrap();
        assert_eq!(log.receives, 1);
        assert!(log.closed);
    }

    #[tokio::test(start_paused = true)]
    async fn should_water_dry_device_only() {
        let source = ScriptedSource::open(vec![
            soil("d1", json!([1200, 800, 950])),
            soil("d2", json!([1200, 1500])),
        ]);
        let sink = RecordingSink::default();
        let controller =
            Controller::new(source, sink.clone(), ThresholdPolicy::new(900.0), config());
        let (tx, _rx) = oneshot::channel();

        let handle = controller.run(tx);
        tokio::time::sleep(WAIT + Duration::from_secs(1)).await;

        assert!(sink.sent_to("d1") >= 1);
        assert_eq!(sink.sent_to("d2"), 0);
        assert!(
            sink.sent()
                .iter()
                .all(|(dest, cmd)| dest.address() == "command/acme/d1" && cmd.name == "water")
        );
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_fatal_send_error() {
        let source = ScriptedSource::open(vec![soil("d1", json!([100]))]);
        let sink = RecordingSink::default();
        sink.script("d1", &[Outcome::Fatal]);
        let controller =
            Controller::new(source, sink.clone(), ThresholdPolicy::new(900.0), config());
        let (tx, rx) = oneshot::channel();

        let _handle = controller.run(tx);
        let outcome = rx.await.unwrap();

        assert!(matches!(
            outcome,
            Err(ControllerError::Evaluation(TransportError::ConnectionClosed))
        ));
        assert!(sink.closed());
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_running_after_rejected_send() {
        let source = ScriptedSource::open(vec![soil("d1", json!([100]))]);
        let sink = RecordingSink::default();
        sink.script("d1", &[Outcome::Reject]);
        let controller =
            Controller::new(source, sink.clone(), ThresholdPolicy::new(900.0), config());
        let (tx, mut rx) = oneshot::channel();

        let handle = controller.run(tx);
        tokio::time::sleep(WAIT * 2 + Duration::from_secs(1)).await;

        assert!(rx.try_recv().is_err());
        assert!(sink.sent_to("d1") >= 1);
        handle.abort();
    }

    #[test]
    fn should_describe_termination_cause() {
        let err = ControllerError::Ingestion(TransportError::EndOfStream);
        assert_eq!(err.to_string(), "event ingestion stopped");
        let err = ControllerError::Evaluation(TransportError::ConnectionClosed);
        assert_eq!(err.to_string(), "policy evaluation stopped");
    }
}
