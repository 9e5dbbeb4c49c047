//! # greenhouse-domain
//!
//! Pure domain model for the greenhouse irrigation controller.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error taxonomy, timestamps
//! - Define **Events** (telemetry published by field devices)
//! - Define **Soil readings** (the typed shapes of the `soil` payload)
//! - Define **Commands** (actuation requests addressed to one device)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod command;
pub mod event;
pub mod soil;
