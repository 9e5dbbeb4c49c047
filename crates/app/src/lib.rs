//! # greenhouse-app
//!
//! Application layer — the irrigation controller and its **port definitions**.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `EventSource` — receive telemetry, acknowledge or reject each delivery
//!   - `CommandSink` — deliver a command to one addressed device
//! - Hold the in-memory **device table** shared by both loops
//! - Define the **policies** (threshold, hysteresis, schedule) that turn
//!   derived device state into actuation decisions
//! - Run the **ingestion loop** and the **evaluation loop**, and compose them
//!   in a `Controller` that reports exactly one terminal value
//!
//! ## Dependency rule
//! Depends on `greenhouse-domain` only (plus `tokio` for tasks, locks and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod controller;
pub mod device_table;
pub mod evaluation;
pub mod ingestion;
pub mod policy;
pub mod ports;

#[cfg(test)]
pub(crate) mod fakes;
