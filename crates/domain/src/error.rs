//! Error taxonomy shared across the workspace.
//!
//! Every failure the controller can observe falls into one of two classes:
//!
//! - **fatal** ([`TransportError`]): the connection, session or link behind
//!   a port is gone, or the stream ended. The controller stops and the process
//!   exits non-zero; reconnection is left to the process supervisor.
//! - **local** (a [`ProcessingError`] on ingestion, or a rejected send): the
//!   offending event is rejected, or the actuation abandoned, and the loop
//!   carries on.
//!
//! Port errors ([`SourceError`], [`SendError`]) carry that classification so
//! the loops never inspect adapter-specific error types.

use std::error::Error as StdError;

/// Boxed error coming from an adapter's underlying client library.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Fatal failure of the underlying transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection, session or link was closed by the remote side.
    #[error("connection closed")]
    ConnectionClosed,

    /// The event stream ended.
    #[error("end of stream")]
    EndOfStream,

    /// The client library reported an unrecoverable connection failure.
    #[error("transport failure")]
    Connection(#[source] BoxError),
}

/// Local failure while interpreting an event payload.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    /// The event envelope could not be decoded.
    #[error("failed to decode event payload")]
    Payload(#[source] serde_json::Error),

    /// The `soil` key holds a value of neither recognised shape.
    #[error("unrecognized soil payload shape")]
    UnrecognizedSoil,
}

/// Error returned by an event source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Fatal: the source can no longer deliver events.
    #[error("event source transport error")]
    Transport(#[from] TransportError),

    /// Local: one delivery could not be decoded. The source has already
    /// settled it.
    #[error("event could not be decoded")]
    Decode(#[from] ProcessingError),
}

impl SourceError {
    /// Whether this error must terminate the controller.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Error returned by a command sink.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// Fatal: the sink can no longer deliver commands.
    #[error("command sink transport error")]
    Transport(#[from] TransportError),

    /// Local: this one command was not accepted.
    #[error("command rejected")]
    Rejected(#[source] BoxError),
}

impl SendError {
    /// Whether this error must terminate the controller.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
