//! Event — an immutable telemetry record published by a field device.
//!
//! Wire form (JSON):
//!
//! ```json
//! { "deviceId": "d1", "creationTime": 1577836800, "data": { "soil": [1200, 800] } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProcessingError;
use crate::id::DeviceId;
use crate::soil::SoilReading;
use crate::time::{self, Timestamp};

/// Key under which devices publish soil telemetry.
pub const SOIL_KEY: &str = "soil";

/// A device telemetry event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Device that produced the event.
    pub device_id: DeviceId,
    /// Unix seconds on the producer's clock.
    #[serde(default)]
    pub creation_time: i64,
    /// Free-form payload; only `soil` is interpreted.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Event {
    /// Create an event with an empty payload.
    pub fn new(device_id: impl Into<DeviceId>, creation_time: i64) -> Self {
        Self {
            device_id: device_id.into(),
            creation_time,
            data: Map::new(),
        }
    }

    /// Add a payload entry.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Decode an event from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::Payload`] when the bytes are not a valid
    /// event envelope.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProcessingError> {
        serde_json::from_slice(bytes).map_err(ProcessingError::Payload)
    }

    /// Whether the payload carries a `soil` key, whatever its shape.
    #[must_use]
    pub fn has_soil(&self) -> bool {
        self.data.contains_key(SOIL_KEY)
    }

    /// Decode the `soil` payload, if present.
    #[must_use]
    pub fn soil(&self) -> Option<Result<SoilReading, ProcessingError>> {
        self.data.get(SOIL_KEY).map(SoilReading::decode)
    }

    /// Producer creation time, when representable.
    #[must_use]
    pub fn created_at(&self) -> Option<Timestamp> {
        time::from_unix_secs(self.creation_time)
    }
}
