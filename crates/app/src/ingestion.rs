//! Ingestion loop — turns the event stream into device state.
//!
//! Events are processed strictly in delivery order: each one is settled
//! (acknowledged or rejected) before the next receive. A transport failure
//! ends the loop; a malformed payload only costs that one event.

use std::sync::Arc;

use greenhouse_domain::error::{ProcessingError, SourceError, TransportError};
use greenhouse_domain::event::Event;

use crate::device_table::DeviceTable;
use crate::policy::Policy;
use crate::ports::{Delivery, EventSource};

/// What ingesting one event did to the device table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    /// The device's state was replaced.
    Updated,
    /// The event did not qualify; state left as it was.
    Unchanged,
}

/// Feeds events through a [`Policy`] into the [`DeviceTable`].
pub struct Ingestor<P: Policy> {
    policy: Arc<P>,
    table: DeviceTable<P::State>,
}

impl<P: Policy> Ingestor<P> {
    /// Create an ingestor writing into `table`.
    pub fn new(policy: Arc<P>, table: DeviceTable<P::State>) -> Self {
        Self { policy, table }
    }

    /// Apply one event to the device table.
    ///
    /// # Errors
    ///
    /// Returns the policy's [`ProcessingError`] for a malformed payload; the
    /// table is left untouched.
    pub async fn ingest(&self, event: &Event) -> Result<Ingested, ProcessingError> {
        let policy = &self.policy;
        let stored = self
            .table
            .update_with(&event.device_id, |current| policy.observe(event, current))
            .await?;

        match stored {
            Some(state) => {
                tracing::info!(
                    device_id = %event.device_id,
                    policy = policy.name(),
                    ?state,
                    "device state updated"
                );
                Ok(Ingested::Updated)
            }
            None => {
                tracing::debug!(
                    device_id = %event.device_id,
                    policy = policy.name(),
                    "event did not change device state"
                );
                Ok(Ingested::Unchanged)
            }
        }
    }

    /// Receive and ingest events until the source fails.
    ///
    /// Only returns on a fatal error, after closing the source.
    pub async fn run<S: EventSource>(&self, mut source: S) -> TransportError {
        tracing::info!(policy = self.policy.name(), "starting event ingestion loop");
        loop {
            let Delivery { event, token } = match source.receive().await {
                Ok(delivery) => delivery,
                Err(SourceError::Transport(err)) => {
                    tracing::error!(%err, "receive failed, stopping ingestion");
                    source.close().await;
                    return err;
                }
                Err(SourceError::Decode(err)) => {
                    tracing::warn!(%err, "discarding undecodable event");
                    continue;
                }
            };

            tracing::info!(
                device_id = %event.device_id,
                created_at = ?event.created_at(),
                "event received"
            );

            let settled = match self.ingest(&event).await {
                Ok(_) => source.ack(token).await,
                Err(err) => {
                    tracing::warn!(device_id = %event.device_id, %err, "rejecting event");
                    source.reject(token, &err.to_string()).await
                }
            };

            if let Err(err) = settled {
                tracing::error!(%err, "settling event failed, stopping ingestion");
                source.close().await;
                return err;
            }
        }
    }
}
