//! Hysteresis policy — sampled humidity with a reliability cut-off.
//!
//! Devices report `soil` as `{ numSamples, humidity }`. A record built from
//! too few raw samples is statistically unreliable and leaves the stored
//! value alone.

use std::time::Duration;

use greenhouse_domain::command::Command;
use greenhouse_domain::error::ProcessingError;
use greenhouse_domain::event::Event;
use greenhouse_domain::soil::{self, SoilReading};
use greenhouse_domain::time::Timestamp;

use super::{Actuation, Policy};

/// Fewest raw samples a record must be built from to be trusted.
pub const DEFAULT_MIN_SAMPLES: u32 = 100;

/// Humidity below which a device is watered.
pub const DEFAULT_LOW_HUMIDITY_THRESHOLD: f64 = 30.0;

/// Keeps the maximum humidity of the latest trusted record per device and
/// runs the pump for a fixed duration while it stays below the threshold.
#[derive(Debug, Clone)]
pub struct HysteresisPolicy {
    low_humidity_threshold: f64,
    water_duration: Duration,
    min_samples: u32,
}

impl HysteresisPolicy {
    #[must_use]
    pub fn new(low_humidity_threshold: f64, water_duration: Duration) -> Self {
        Self {
            low_humidity_threshold,
            water_duration,
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }

    #[must_use]
    pub fn with_min_samples(mut self, min_samples: u32) -> Self {
        self.min_samples = min_samples;
        self
    }
}

impl Policy for HysteresisPolicy {
    /// Last humidity.
    type State = f64;

    fn name(&self) -> &'static str {
        "hysteresis"
    }

    fn observe(
        &self,
        event: &Event,
        _current: Option<&f64>,
    ) -> Result<Option<f64>, ProcessingError> {
        match event.soil().transpose()? {
            Some(SoilReading::Sampled {
                num_samples,
                humidity,
            }) => {
                if num_samples < self.min_samples {
                    tracing::debug!(
                        device_id = %event.device_id,
                        num_samples,
                        min_samples = self.min_samples,
                        "discarding unreliable humidity record"
                    );
                    return Ok(None);
                }
                Ok(soil::max_sample(&humidity))
            }
            Some(SoilReading::Samples(_)) | None => Ok(None),
        }
    }

    fn plan(&self, last_humidity: &f64, _now: Timestamp) -> Option<Actuation> {
        (*last_humidity < self.low_humidity_threshold)
            .then(|| Actuation::once(Command::water().with_period(self.water_duration)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenhouse_domain::time;
    use serde_json::json;

    fn policy() -> HysteresisPolicy {
        HysteresisPolicy::new(30.0, Duration::from_millis(4000))
    }

    fn sampled(num_samples: u32, humidity: &[f64]) -> Event {
        Event::new("d1", 0).with(
            "soil",
            json!({"numSamples": num_samples, "humidity": humidity}),
        )
    }

    #[test]
    fn should_store_maximum_of_trusted_record() {
        let event = sampled(100, &[22.0, 35.5, 28.0]);
        assert_eq!(policy().observe(&event, None).unwrap(), Some(35.5));
    }

    #[test]
    fn should_discard_record_with_too_few_samples() {
        let event = sampled(99, &[5.0]);
        assert_eq!(policy().observe(&event, Some(&40.0)).unwrap(), None);
    }

    #[test]
    fn should_not_update_on_empty_humidity() {
        let event = sampled(150, &[]);
        assert_eq!(policy().observe(&event, Some(&40.0)).unwrap(), None);
    }

    #[test]
    fn should_ignore_flat_samples() {
        let event = Event::new("d1", 0).with("soil", json!([10.0, 12.0]));
        assert_eq!(policy().observe(&event, None).unwrap(), None);
    }

    #[test]
    fn should_honour_custom_min_samples() {
        let event = sampled(10, &[12.0]);
        let policy = policy().with_min_samples(10);
        assert_eq!(policy.observe(&event, None).unwrap(), Some(12.0));
    }

    #[test]
    fn should_fail_on_unrecognized_soil() {
        let event = Event::new("d1", 0).with("soil", json!({"numSamples": 120}));
        assert!(policy().observe(&event, None).is_err());
    }

    #[test]
    fn should_water_with_pump_duration_below_threshold() {
        let actuation = policy().plan(&25.0, time::now()).unwrap();
        assert_eq!(actuation.pulses, 1);
        assert_eq!(actuation.command.name, "water");
        assert_eq!(
            actuation.command.period(),
            Some(Duration::from_millis(4000))
        );
    }

    #[test]
    fn should_not_water_at_or_above_threshold() {
        assert!(policy().plan(&30.0, time::now()).is_none());
        assert!(policy().plan(&55.0, time::now()).is_none());
    }
}
