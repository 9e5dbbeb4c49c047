//! # greenhouse-adapter-mqtt
//!
//! MQTT adapter — connects the controller's ports to a broker.
//!
//! ## Responsibilities
//! - [`MqttEventSource`]: subscribe to the telemetry topic with manual
//!   acknowledgement and decode each publish into a domain
//!   [`Event`](greenhouse_domain::event::Event)
//! - [`MqttCommandSink`]: publish commands as JSON to
//!   `command/<tenant>/<device>`
//! - Map client failures onto the domain's fatal/local error classes
//!
//! ## Dependency rule
//! Depends on `greenhouse-app` (for the port traits) and `greenhouse-domain`.
//! Nothing outside the binary depends on this crate.

pub mod config;
mod connection;
pub mod error;
pub mod sink;
pub mod source;

pub use config::MqttConfig;
pub use error::MqttError;
pub use sink::MqttCommandSink;
pub use source::MqttEventSource;
