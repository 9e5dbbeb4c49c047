//! Command-line flags. Every flag overrides the matching configuration value.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Greenhouse irrigation controller.
#[derive(Parser, Debug, Default)]
#[command(name = "greenhoused", version, about)]
pub struct Cli {
    /// Configuration file (defaults to ./greenhouse.toml when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Irrigation policy to run
    #[arg(long, value_enum)]
    pub policy: Option<PolicyKind>,

    /// Address of the event source broker (host:port)
    #[arg(short = 'a', long = "event-address", value_name = "ADDR")]
    pub event_address: Option<String>,

    /// Address of the command endpoint broker (host:port)
    #[arg(short = 'e', long = "command-address", value_name = "ADDR")]
    pub command_address: Option<String>,

    /// Tenant the controlled devices belong to
    #[arg(short = 't', long = "tenant")]
    pub tenant_id: Option<String>,

    /// Password for the command endpoint
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// Connect to the command endpoint over TLS
    #[arg(short = 's', long)]
    pub tls: bool,

    /// CA certificate file for the command endpoint
    #[arg(short = 'c', long = "ca-file", value_name = "PATH")]
    pub ca_file: Option<PathBuf>,

    /// Seconds between evaluation cycles
    #[arg(short = 'w', long = "wait-period", value_name = "SECS")]
    pub wait_period_secs: Option<u64>,

    /// Lowest soil value before watering (threshold policy)
    #[arg(short = 'l', long = "lowest-soil-threshold", value_name = "VALUE")]
    pub lowest_soil_threshold: Option<f64>,

    /// Pump-on duration per water command (hysteresis and schedule policies)
    #[arg(long = "water-duration-ms", value_name = "MILLIS")]
    pub water_duration_ms: Option<u64>,

    /// Lowest reliable humidity before watering (hysteresis policy)
    #[arg(long = "low-humidity-threshold", value_name = "PERCENT")]
    pub low_humidity_threshold: Option<f64>,
}

/// Selectable policy variants.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Water when the lowest raw soil sample drops below a threshold
    Threshold,
    /// Water for a fixed duration when reliable humidity drops below a threshold
    Hysteresis,
    /// Water every known device twice per wait period
    Schedule,
}
