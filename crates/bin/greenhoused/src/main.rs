//! # greenhoused — greenhouse irrigation daemon
//!
//! Composition root that wires the MQTT adapters into the controller.
//!
//! ## Responsibilities
//! - Parse configuration (CLI args, env vars, config file)
//! - Initialise logging
//! - Connect the command sink and the event source
//! - Build the configured policy and start the controller
//! - Exit non-zero when the controller reports a failure, zero on Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no irrigation logic belongs here.

mod cli;
mod config;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

use greenhouse_adapter_mqtt::{MqttCommandSink, MqttEventSource};
use greenhouse_app::controller::{Controller, ControllerConfig};
use greenhouse_app::policy::{HysteresisPolicy, Policy, SchedulePolicy, ThresholdPolicy};
use greenhouse_app::ports::{CommandSink, EventSource};

use crate::cli::Cli;
use crate::config::{Config, PolicyConfig};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::load(&cli).context("loading configuration")?;
    init_tracing(&config.logging.filter);

    let sink = MqttCommandSink::connect(&config.command_sink)
        .await
        .with_context(|| format!("connecting to command endpoint {}", config.command_sink.endpoint()))?;
    let source = MqttEventSource::connect(&config.event_source.connection, &config.event_source.topic)
        .await
        .with_context(|| {
            format!(
                "connecting to event source {}",
                config.event_source.connection.endpoint()
            )
        })?;

    let settings = config.controller_config();
    tracing::info!(
        tenant_id = %settings.tenant_id,
        wait_period_secs = settings.wait_period.as_secs(),
        policy = ?config.policy.kind(),
        "starting controller"
    );

    let code = match config.policy {
        PolicyConfig::Threshold {
            lowest_soil_threshold,
        } => supervise(source, sink, ThresholdPolicy::new(lowest_soil_threshold), settings).await,
        PolicyConfig::Hysteresis {
            low_humidity_threshold,
            min_samples,
            water_duration_ms,
        } => {
            let policy = HysteresisPolicy::new(
                low_humidity_threshold,
                Duration::from_millis(water_duration_ms),
            )
            .with_min_samples(min_samples);
            supervise(source, sink, policy, settings).await
        }
        PolicyConfig::Schedule {
            water_duration_ms,
            pulse_interval_secs,
        } => {
            let policy =
                SchedulePolicy::new(settings.wait_period, Duration::from_millis(water_duration_ms))
                    .with_pulse_interval(Duration::from_secs(pulse_interval_secs));
            supervise(source, sink, policy, settings).await
        }
    };

    Ok(code)
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("greenhoused: invalid log filter {filter:?} ({err}), falling back to info");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Run the controller until it reports termination or the process is
/// interrupted.
async fn supervise<S, C, P>(source: S, sink: C, policy: P, settings: ControllerConfig) -> ExitCode
where
    S: EventSource + 'static,
    C: CommandSink + 'static,
    P: Policy,
{
    let (done, finished) = oneshot::channel();
    let handle = Controller::new(source, sink, policy, settings).run(done);

    tokio::select! {
        outcome = finished => match outcome {
            Ok(Ok(())) => ExitCode::SUCCESS,
            Ok(Err(err)) => {
                let err = anyhow::Error::new(err);
                tracing::error!("controller stopped: {err:#}");
                ExitCode::FAILURE
            }
            Err(_) => {
                tracing::error!("controller exited without reporting");
                ExitCode::FAILURE
            }
        },
        signal = tokio::signal::ctrl_c() => {
            handle.abort();
            match signal {
                Ok(()) => {
                    tracing::info!("interrupted, shutting down");
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    tracing::error!(%err, "failed to listen for interrupt");
                    ExitCode::FAILURE
                }
            }
        }
    }
}
