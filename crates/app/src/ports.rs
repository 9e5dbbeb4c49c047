//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the controller and the messaging
//! infrastructure. They are defined here (in `app`) so that both the loops
//! and the adapter layer can depend on them without creating circular
//! dependencies.

pub mod command_sink;
pub mod event_source;

pub use command_sink::CommandSink;
pub use event_source::{Delivery, EventSource};
