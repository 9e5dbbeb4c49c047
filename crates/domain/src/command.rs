//! Command — a named actuation request delivered to one device.
//!
//! Commands are fire-and-forget: nothing waits for the device to report
//! completion.

use std::fmt;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::id::{DeviceId, TenantId};

/// Name of the irrigation command.
pub const WATER: &str = "water";

/// Parameter carrying the pump-on duration, in milliseconds.
pub const PERIOD: &str = "period";

/// A command with optional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Command name, e.g. `"water"`.
    pub name: String,
    /// Command parameters.
    pub parameters: Map<String, Value>,
}

impl Command {
    /// Create a command without parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Map::new(),
        }
    }

    /// The `water` command.
    #[must_use]
    pub fn water() -> Self {
        Self::new(WATER)
    }

    /// Add a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Set the actuation duration, always expressed in whole milliseconds.
    #[must_use]
    pub fn with_period(self, period: Duration) -> Self {
        let millis = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
        self.with_parameter(PERIOD, millis)
    }

    /// The actuation duration, if set.
    #[must_use]
    pub fn period(&self) -> Option<Duration> {
        self.parameters
            .get(PERIOD)
            .and_then(Value::as_u64)
            .map(Duration::from_millis)
    }

    /// JSON body: a `command` key holding the name, then the parameters.
    ///
    /// A parameter named `command` replaces the name in the body.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let mut body = Map::new();
        body.insert("command".to_string(), Value::String(self.name.clone()));
        body.extend(self.parameters.clone());
        Value::Object(body)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The device a command is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub tenant_id: TenantId,
    pub device_id: DeviceId,
}

impl Destination {
    #[must_use]
    pub fn new(tenant_id: TenantId, device_id: DeviceId) -> Self {
        Self {
            tenant_id,
            device_id,
        }
    }

    /// Command-and-control address, `command/<tenant>/<device>`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("command/{}/{}", self.tenant_id, self.device_id)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.device_id)
    }
}
