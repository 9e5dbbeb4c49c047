//! Configuration loading — TOML file, then environment, then command line.
//!
//! Looks for `greenhouse.toml` in the working directory unless `--config`
//! names another file. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values, and
//! command-line flags over both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use greenhouse_adapter_mqtt::MqttConfig;
use greenhouse_app::controller::ControllerConfig;
use greenhouse_app::policy::DEFAULT_WATER_DURATION;
use greenhouse_app::policy::hysteresis::{DEFAULT_LOW_HUMIDITY_THRESHOLD, DEFAULT_MIN_SAMPLES};
use greenhouse_app::policy::schedule::DEFAULT_PULSE_INTERVAL;
use greenhouse_app::policy::threshold::DEFAULT_LOWEST_SOIL_THRESHOLD;
use greenhouse_domain::id::TenantId;

use crate::cli::{Cli, PolicyKind};

const DEFAULT_PATH: &str = "greenhouse.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Telemetry subscription.
    pub event_source: EventSourceConfig,
    /// Command endpoint.
    pub command_sink: MqttConfig,
    /// Controller settings.
    pub controller: ControllerSection,
    /// Irrigation policy.
    pub policy: PolicyConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Broker connection plus the topic events arrive on.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EventSourceConfig {
    /// Topic to subscribe to.
    pub topic: String,
    /// Broker connection.
    #[serde(flatten)]
    pub connection: MqttConfig,
}

/// `[controller]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControllerSection {
    /// Tenant all devices belong to.
    pub tenant_id: String,
    /// Seconds between evaluation cycles.
    pub wait_period_secs: u64,
}

/// `[policy]` section, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyConfig {
    Threshold {
        #[serde(default = "default_lowest_soil_threshold")]
        lowest_soil_threshold: f64,
    },
    Hysteresis {
        #[serde(default = "default_low_humidity_threshold")]
        low_humidity_threshold: f64,
        #[serde(default = "default_min_samples")]
        min_samples: u32,
        #[serde(default = "default_water_duration_ms")]
        water_duration_ms: u64,
    },
    Schedule {
        #[serde(default = "default_water_duration_ms")]
        water_duration_ms: u64,
        #[serde(default = "default_pulse_interval_secs")]
        pulse_interval_secs: u64,
    },
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

fn default_lowest_soil_threshold() -> f64 {
    DEFAULT_LOWEST_SOIL_THRESHOLD
}

fn default_low_humidity_threshold() -> f64 {
    DEFAULT_LOW_HUMIDITY_THRESHOLD
}

fn default_min_samples() -> u32 {
    DEFAULT_MIN_SAMPLES
}

fn default_water_duration_ms() -> u64 {
    u64::try_from(DEFAULT_WATER_DURATION.as_millis()).unwrap_or(u64::MAX)
}

fn default_pulse_interval_secs() -> u64 {
    DEFAULT_PULSE_INTERVAL.as_secs()
}

impl Config {
    /// Load configuration from file (if present), then apply environment and
    /// command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed, an explicitly requested
    /// file is missing, an override cannot be parsed, or validation fails.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::from_optional_file(Path::new(DEFAULT_PATH))?,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.apply_cli(cli)?;
        config.validate()?;
        config.fill_defaults();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(ConfigError::Parse)
    }

    fn from_optional_file(path: &Path) -> Result<Self, ConfigError> {
        match Self::from_file(path) {
            Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    fn apply_env_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = var("GREENHOUSE_EVENT_ADDR") {
            set_endpoint(&mut self.event_source.connection, &val)?;
        }
        if let Some(val) = var("GREENHOUSE_EVENT_TOPIC") {
            self.event_source.topic = val;
        }
        if let Some(val) = var("GREENHOUSE_COMMAND_ADDR") {
            set_endpoint(&mut self.command_sink, &val)?;
        }
        if let Some(val) = var("GREENHOUSE_TENANT") {
            self.controller.tenant_id = val;
        }
        if let Some(val) = var("GREENHOUSE_PASSWORD") {
            self.command_sink.password = Some(val);
        }
        if let Some(val) = var("GREENHOUSE_TLS") {
            self.command_sink.tls = matches!(val.as_str(), "1" | "true" | "yes");
        }
        if let Some(val) = var("GREENHOUSE_CA_FILE") {
            self.command_sink.ca_file = Some(PathBuf::from(val));
        }
        if let Some(val) = var("GREENHOUSE_WAIT_PERIOD") {
            self.controller.wait_period_secs = val.parse().map_err(|_| {
                ConfigError::Validation(format!("GREENHOUSE_WAIT_PERIOD is not a number: {val}"))
            })?;
        }
        if let Some(val) = var("GREENHOUSE_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn apply_cli(&mut self, cli: &Cli) -> Result<(), ConfigError> {
        if let Some(kind) = cli.policy {
            if self.policy.kind() != kind {
                self.policy = PolicyConfig::defaults_for(kind);
            }
        }
        if let Some(addr) = &cli.event_address {
            set_endpoint(&mut self.event_source.connection, addr)?;
        }
        if let Some(addr) = &cli.command_address {
            set_endpoint(&mut self.command_sink, addr)?;
        }
        if let Some(tenant) = &cli.tenant_id {
            self.controller.tenant_id.clone_from(tenant);
        }
        if let Some(password) = &cli.password {
            self.command_sink.password = Some(password.clone());
        }
        if cli.tls {
            self.command_sink.tls = true;
        }
        if let Some(ca_file) = &cli.ca_file {
            self.command_sink.ca_file = Some(ca_file.clone());
        }
        if let Some(secs) = cli.wait_period_secs {
            self.controller.wait_period_secs = secs;
        }
        if let Some(value) = cli.lowest_soil_threshold {
            let PolicyConfig::Threshold {
                lowest_soil_threshold,
            } = &mut self.policy
            else {
                return Err(inapplicable("--lowest-soil-threshold", "the threshold policy"));
            };
            *lowest_soil_threshold = value;
        }
        if let Some(value) = cli.low_humidity_threshold {
            let PolicyConfig::Hysteresis {
                low_humidity_threshold,
                ..
            } = &mut self.policy
            else {
                return Err(inapplicable("--low-humidity-threshold", "the hysteresis policy"));
            };
            *low_humidity_threshold = value;
        }
        if let Some(value) = cli.water_duration_ms {
            match &mut self.policy {
                PolicyConfig::Hysteresis {
                    water_duration_ms, ..
                }
                | PolicyConfig::Schedule {
                    water_duration_ms, ..
                } => *water_duration_ms = value,
                PolicyConfig::Threshold { .. } => {
                    return Err(inapplicable(
                        "--water-duration-ms",
                        "the hysteresis and schedule policies",
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.controller.tenant_id.trim().is_empty() {
            return Err(ConfigError::Validation("tenant id must be set".to_string()));
        }
        if self.controller.wait_period_secs == 0 {
            return Err(ConfigError::Validation(
                "wait period must be non-zero".to_string(),
            ));
        }
        if self.event_source.connection.broker_port == 0 || self.command_sink.broker_port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.event_source.topic.is_empty() {
            return Err(ConfigError::Validation("event topic must be set".to_string()));
        }
        if let (Some(source), Some(sink)) = (
            &self.event_source.connection.client_id,
            &self.command_sink.client_id,
        ) {
            if source == sink {
                return Err(ConfigError::Validation(
                    "event source and command sink need distinct client ids".to_string(),
                ));
            }
        }
        self.policy.validate()
    }

    /// The command endpoint authenticates as `messaging@<tenant>` unless a
    /// username is configured.
    fn fill_defaults(&mut self) {
        if self.command_sink.username.is_none() {
            self.command_sink.username = Some(format!("messaging@{}", self.controller.tenant_id));
        }
    }

    /// Settings handed to the controller.
    #[must_use]
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            tenant_id: TenantId::new(self.controller.tenant_id.as_str()),
            wait_period: self.wait_period(),
        }
    }

    /// Pause between evaluation cycles.
    #[must_use]
    pub fn wait_period(&self) -> Duration {
        Duration::from_secs(self.controller.wait_period_secs)
    }
}

fn inapplicable(flag: &str, applies_to: &str) -> ConfigError {
    ConfigError::Validation(format!("{flag} only applies to {applies_to}"))
}

/// Parse `host:port`, with an optional `scheme://` prefix, into `config`.
fn set_endpoint(config: &mut MqttConfig, addr: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::Validation(format!("invalid broker address: {addr}"));
    let without_scheme = addr.split_once("://").map_or(addr, |(_, rest)| rest);
    let (host, port) = without_scheme.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() {
        return Err(invalid());
    }
    config.broker_host = host.to_string();
    config.broker_port = port.parse().map_err(|_| invalid())?;
    Ok(())
}

impl PolicyConfig {
    /// The variant's kind.
    #[must_use]
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Threshold { .. } => PolicyKind::Threshold,
            Self::Hysteresis { .. } => PolicyKind::Hysteresis,
            Self::Schedule { .. } => PolicyKind::Schedule,
        }
    }

    /// `kind` with every parameter at its default.
    #[must_use]
    pub fn defaults_for(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::Threshold => Self::Threshold {
                lowest_soil_threshold: default_lowest_soil_threshold(),
            },
            PolicyKind::Hysteresis => Self::Hysteresis {
                low_humidity_threshold: default_low_humidity_threshold(),
                min_samples: default_min_samples(),
                water_duration_ms: default_water_duration_ms(),
            },
            PolicyKind::Schedule => Self::Schedule {
                water_duration_ms: default_water_duration_ms(),
                pulse_interval_secs: default_pulse_interval_secs(),
            },
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let threshold = match self {
            Self::Threshold {
                lowest_soil_threshold,
            } => Some(*lowest_soil_threshold),
            Self::Hysteresis {
                low_humidity_threshold,
                ..
            } => Some(*low_humidity_threshold),
            Self::Schedule { .. } => None,
        };
        if threshold.is_some_and(|value| !value.is_finite()) {
            return Err(ConfigError::Validation(
                "policy threshold must be a finite number".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::defaults_for(PolicyKind::Threshold)
    }
}

impl Default for EventSourceConfig {
    fn default() -> Self {
        Self {
            topic: "events".to_string(),
            connection: MqttConfig::default(),
        }
    }
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            wait_period_secs: 1800,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "greenhoused=info,greenhouse=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
