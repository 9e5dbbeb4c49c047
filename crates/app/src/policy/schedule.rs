//! Schedule policy — calendar-based double-pulse watering.
//!
//! Any device that reports a `soil` key is watered once per wait period,
//! regardless of the values it reports. The first sighting records the
//! epoch as its last watering so the device is due immediately.

use std::time::Duration;

use chrono::TimeDelta;

use greenhouse_domain::command::Command;
use greenhouse_domain::error::ProcessingError;
use greenhouse_domain::event::Event;
use greenhouse_domain::time::{self, Timestamp};

use super::{Actuation, Policy};

/// Delay between the two pulses of one watering.
pub const DEFAULT_PULSE_INTERVAL: Duration = Duration::from_secs(10);

const PULSES: u32 = 2;

/// Waters every known device twice per wait period.
#[derive(Debug, Clone)]
pub struct SchedulePolicy {
    wait_period: TimeDelta,
    water_duration: Duration,
    pulse_interval: Duration,
}

impl SchedulePolicy {
    #[must_use]
    pub fn new(wait_period: Duration, water_duration: Duration) -> Self {
        Self {
            wait_period: TimeDelta::from_std(wait_period).unwrap_or(TimeDelta::MAX),
            water_duration,
            pulse_interval: DEFAULT_PULSE_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_pulse_interval(mut self, pulse_interval: Duration) -> Self {
        self.pulse_interval = pulse_interval;
        self
    }
}

impl Policy for SchedulePolicy {
    /// Last watered.
    type State = Timestamp;

    fn name(&self) -> &'static str {
        "schedule"
    }

    fn observe(
        &self,
        event: &Event,
        current: Option<&Timestamp>,
    ) -> Result<Option<Timestamp>, ProcessingError> {
        if current.is_some() || !event.has_soil() {
            return Ok(None);
        }
        tracing::info!(device_id = %event.device_id, "discovered device with soil sensor");
        Ok(Some(time::epoch()))
    }

    fn plan(&self, last_watered: &Timestamp, now: Timestamp) -> Option<Actuation> {
        (now - *last_watered >= self.wait_period).then(|| {
            Actuation::pulsed(
                Command::water().with_period(self.water_duration),
                PULSES,
                self.pulse_interval,
            )
        })
    }

    fn actuated(&self, _last_watered: &Timestamp, now: Timestamp) -> Option<Timestamp> {
        Some(now)
    }
}
