//! Evaluation loop — periodically turns device state into commands.
//!
//! The loop runs on its own fixed period, independent of event arrival.
//! Each cycle walks a snapshot of the device table, asks the policy what to
//! do per device and sends the resulting commands one after another.
//!
//! Cycle times are read from the wall clock once, when the loop starts, and
//! advanced by the runtime's timer from then on. Periods measured between
//! cycles therefore agree with the sleeps that separate them.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tokio::time::Instant;

use greenhouse_domain::command::Destination;
use greenhouse_domain::error::{SendError, TransportError};
use greenhouse_domain::id::{DeviceId, TenantId};
use greenhouse_domain::time::{self, Timestamp};

use crate::device_table::DeviceTable;
use crate::policy::{Actuation, Policy};
use crate::ports::CommandSink;

/// Outcome of one evaluation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Devices whose every pulse was delivered.
    pub actuated: Vec<DeviceId>,
    /// Devices whose actuation was abandoned after a rejected send.
    pub failed: Vec<DeviceId>,
}

/// Wall-clock time that advances with the tokio timer.
#[derive(Debug, Clone, Copy)]
struct CycleClock {
    origin: Timestamp,
    started: Instant,
}

impl CycleClock {
    fn start() -> Self {
        Self {
            origin: time::now(),
            started: Instant::now(),
        }
    }

    fn now(&self) -> Timestamp {
        TimeDelta::from_std(self.started.elapsed())
            .ok()
            .and_then(|elapsed| self.origin.checked_add_signed(elapsed))
            .unwrap_or(self.origin)
    }
}

/// Applies a [`Policy`] to the [`DeviceTable`] and drives a [`CommandSink`].
pub struct Evaluator<P: Policy, C> {
    policy: Arc<P>,
    table: DeviceTable<P::State>,
    sink: C,
    tenant_id: TenantId,
    wait_period: Duration,
}

impl<P: Policy, C: CommandSink> Evaluator<P, C> {
    /// Create an evaluator reading from `table` and sending through `sink`.
    pub fn new(
        policy: Arc<P>,
        table: DeviceTable<P::State>,
        sink: C,
        tenant_id: TenantId,
        wait_period: Duration,
    ) -> Self {
        Self {
            policy,
            table,
            sink,
            tenant_id,
            wait_period,
        }
    }

    /// Run one evaluation pass at `now`.
    ///
    /// A rejected send abandons the remaining pulses for that device only;
    /// the policy's post-actuation state is stored either way.
    ///
    /// # Errors
    ///
    /// Returns the [`TransportError`] of the first fatal send failure. The
    /// rest of the cycle is skipped.
    pub async fn evaluate(&self, now: Timestamp) -> Result<CycleReport, TransportError> {
        let mut report = CycleReport::default();

        for (device_id, state) in self.table.snapshot().await {
            let Some(actuation) = self.policy.plan(&state, now) else {
                tracing::info!(
                    %device_id,
                    policy = self.policy.name(),
                    ?state,
                    "no watering needed"
                );
                continue;
            };

            tracing::info!(
                %device_id,
                policy = self.policy.name(),
                ?state,
                command = %actuation.command,
                pulses = actuation.pulses,
                "watering device"
            );

            let destination = Destination::new(self.tenant_id.clone(), device_id.clone());
            let delivered = self.actuate(&destination, &actuation).await?;

            if let Some(next) = self.policy.actuated(&state, now) {
                self.table.insert(device_id.clone(), next).await;
            }

            if delivered {
                report.actuated.push(device_id);
            } else {
                report.failed.push(device_id);
            }
        }

        Ok(report)
    }

    /// Send every pulse of `actuation`. Returns whether all were delivered.
    async fn actuate(
        &self,
        destination: &Destination,
        actuation: &Actuation,
    ) -> Result<bool, TransportError> {
        for pulse in 1..=actuation.pulses {
            if pulse > 1 {
                tokio::time::sleep(actuation.pulse_interval).await;
            }

            match self.sink.send(destination, &actuation.command).await {
                Ok(()) => {
                    tracing::debug!(%destination, pulse, "command sent");
                }
                Err(SendError::Transport(err)) => {
                    tracing::error!(%destination, pulse, %err, "send failed, stopping evaluation");
                    return Err(err);
                }
                Err(SendError::Rejected(err)) => {
                    tracing::warn!(%destination, pulse, %err, "command rejected, skipping device");
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Evaluate forever, sleeping `wait_period` after each pass.
    ///
    /// Only returns on a fatal error, after closing the sink.
    pub async fn run(&self) -> TransportError {
        tracing::info!(
            policy = self.policy.name(),
            wait_period_secs = self.wait_period.as_secs(),
            "starting evaluation loop"
        );
        let clock = CycleClock::start();
        loop {
            match self.evaluate(clock.now()).await {
                Ok(report) => {
                    tracing::info!(
                        actuated = report.actuated.len(),
                        failed = report.failed.len(),
                        "evaluation cycle complete"
                    );
                }
                Err(err) => {
                    self.sink.close().await;
                    return err;
                }
            }
            tokio::time::sleep(self.wait_period).await;
        }
    }
}
