//! Soil reading — the typed shapes of an event's `soil` payload.
//!
//! Two producer generations publish the same key with different shapes:
//!
//! ```json
//! { "soil": [1200, 800, 950] }
//! { "soil": { "numSamples": 120, "humidity": [41.0, 43.5] } }
//! ```
//!
//! Anything else under `soil` is rejected as
//! [`ProcessingError::UnrecognizedSoil`].

use serde::{Deserialize, Serialize};

use crate::error::ProcessingError;

/// A decoded `soil` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SoilReading {
    /// Flat sequence of raw soil samples.
    Samples(Vec<f64>),
    /// Sampled humidity with the number of raw samples it was derived from.
    Sampled {
        #[serde(rename = "numSamples")]
        num_samples: u32,
        humidity: Vec<f64>,
    },
}

impl SoilReading {
    /// Decode the value found under the `soil` key.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::UnrecognizedSoil`] when the value matches
    /// neither shape (including non-numeric samples).
    pub fn decode(value: &serde_json::Value) -> Result<Self, ProcessingError> {
        Self::deserialize(value).map_err(|_| ProcessingError::UnrecognizedSoil)
    }
}

/// Smallest sample, or `None` for an empty sequence.
#[must_use]
pub fn min_sample(samples: &[f64]) -> Option<f64> {
    samples.iter().copied().reduce(f64::min)
}

/// Largest sample, or `None` for an empty sequence.
#[must_use]
pub fn max_sample(samples: &[f64]) -> Option<f64> {
    samples.iter().copied().reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_decode_flat_samples() {
        let reading = SoilReading::decode(&json!([1200, 800, 950])).unwrap();
        assert_eq!(reading, SoilReading::Samples(vec![1200.0, 800.0, 950.0]));
    }

    #[test]
    fn should_decode_sampled_record() {
        let reading =
            SoilReading::decode(&json!({"numSamples": 120, "humidity": [41.0, 43.5]})).unwrap();
        assert_eq!(
            reading,
            SoilReading::Sampled {
                num_samples: 120,
                humidity: vec![41.0, 43.5],
            }
        );
    }

    #[test]
    fn should_decode_empty_sequence() {
        let reading = SoilReading::decode(&json!([])).unwrap();
        assert_eq!(reading, SoilReading::Samples(Vec::new()));
    }

    #[test]
    fn should_reject_string_payload() {
        let result = SoilReading::decode(&json!("wet"));
        assert!(matches!(result, Err(ProcessingError::UnrecognizedSoil)));
    }

    #[test]
    fn should_reject_non_numeric_samples() {
        let result = SoilReading::decode(&json!([1200, "dry"]));
        assert!(matches!(result, Err(ProcessingError::UnrecognizedSoil)));
    }

    #[test]
    fn should_reject_record_without_sample_count() {
        let result = SoilReading::decode(&json!({"humidity": [40.0]}));
        assert!(matches!(result, Err(ProcessingError::UnrecognizedSoil)));
    }

    #[test]
    fn should_reject_negative_sample_count() {
        let result = SoilReading::decode(&json!({"numSamples": -1, "humidity": [40.0]}));
        assert!(matches!(result, Err(ProcessingError::UnrecognizedSoil)));
    }

    #[test]
    fn should_find_min_and_max() {
        let samples = [1200.0, 800.0, 950.0];
        assert_eq!(min_sample(&samples), Some(800.0));
        assert_eq!(max_sample(&samples), Some(1200.0));
    }

    #[test]
    fn should_find_nothing_in_empty_samples() {
        assert_eq!(min_sample(&[]), None);
        assert_eq!(max_sample(&[]), None);
    }
}
