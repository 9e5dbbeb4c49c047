//! Policies — how telemetry becomes device state, and state becomes commands.
//!
//! A [`Policy`] is consulted by both loops:
//!
//! 1. the ingestion loop calls [`observe`](Policy::observe) for every event
//!    and stores the returned state in the device table;
//! 2. the evaluation loop calls [`plan`](Policy::plan) for every device on
//!    each cycle, sends the resulting [`Actuation`], then stores whatever
//!    [`actuated`](Policy::actuated) returns.

use std::fmt;
use std::time::Duration;

use greenhouse_domain::command::Command;
use greenhouse_domain::error::ProcessingError;
use greenhouse_domain::event::Event;
use greenhouse_domain::time::Timestamp;

pub mod hysteresis;
pub mod schedule;
pub mod threshold;

pub use hysteresis::HysteresisPolicy;
pub use schedule::SchedulePolicy;
pub use threshold::ThresholdPolicy;

/// How long the pump runs per `water` command, unless configured otherwise.
pub const DEFAULT_WATER_DURATION: Duration = Duration::from_secs(4);

/// Irrigation policy over per-device derived state.
pub trait Policy: Send + Sync + 'static {
    /// State kept per device in the table.
    type State: Clone + fmt::Debug + Send + Sync + 'static;

    /// Short name used in logs (e.g. `"threshold"`).
    fn name(&self) -> &'static str;

    /// Derive a replacement state from an event.
    ///
    /// Returns `Ok(None)` when the event does not qualify and the stored
    /// state must stay as it is.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessingError`] when the payload is malformed; the event
    /// is then rejected.
    fn observe(
        &self,
        event: &Event,
        current: Option<&Self::State>,
    ) -> Result<Option<Self::State>, ProcessingError>;

    /// Decide whether the device needs watering at `now`.
    fn plan(&self, state: &Self::State, now: Timestamp) -> Option<Actuation>;

    /// State to store after an actuation attempt at `now`, if it changes.
    ///
    /// Called whether or not every pulse was delivered.
    fn actuated(&self, _state: &Self::State, _now: Timestamp) -> Option<Self::State> {
        None
    }
}

/// A command to send, possibly repeated with a delay between pulses.
#[derive(Debug, Clone, PartialEq)]
pub struct Actuation {
    pub command: Command,
    /// Number of sends; at least one.
    pub pulses: u32,
    /// Delay between consecutive pulses.
    pub pulse_interval: Duration,
}

impl Actuation {
    /// A single send.
    #[must_use]
    pub fn once(command: Command) -> Self {
        Self {
            command,
            pulses: 1,
            pulse_interval: Duration::ZERO,
        }
    }

    /// `pulses` sends separated by `pulse_interval`.
    #[must_use]
    pub fn pulsed(command: Command, pulses: u32, pulse_interval: Duration) -> Self {
        Self {
            command,
            pulses: pulses.max(1),
            pulse_interval,
        }
    }
}
