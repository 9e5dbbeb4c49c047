//! Threshold policy — water whenever the lowest soil sample is too low.

use greenhouse_domain::command::Command;
use greenhouse_domain::error::ProcessingError;
use greenhouse_domain::event::Event;
use greenhouse_domain::soil::{self, SoilReading};
use greenhouse_domain::time::Timestamp;

use super::{Actuation, Policy};

/// Default lowest acceptable soil value.
pub const DEFAULT_LOWEST_SOIL_THRESHOLD: f64 = 900.0;

/// Keeps the minimum sample of the latest flat `soil` sequence per device
/// and waters while it stays below the threshold.
#[derive(Debug, Clone)]
pub struct ThresholdPolicy {
    lowest_soil_threshold: f64,
}

impl ThresholdPolicy {
    #[must_use]
    pub fn new(lowest_soil_threshold: f64) -> Self {
        Self {
            lowest_soil_threshold,
        }
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_LOWEST_SOIL_THRESHOLD)
    }
}

impl Policy for ThresholdPolicy {
    /// Last soil value.
    type State = f64;

    fn name(&self) -> &'static str {
        "threshold"
    }

    fn observe(
        &self,
        event: &Event,
        _current: Option<&f64>,
    ) -> Result<Option<f64>, ProcessingError> {
        match event.soil().transpose()? {
            Some(SoilReading::Samples(samples)) => Ok(soil::min_sample(&samples)),
            Some(SoilReading::Sampled { .. }) | None => Ok(None),
        }
    }

    fn plan(&self, last_soil_value: &f64, _now: Timestamp) -> Option<Actuation> {
        (*last_soil_value < self.lowest_soil_threshold).then(|| Actuation::once(Command::water()))
    }
}
