//! MQTT adapter error types.

use std::io;
use std::path::PathBuf;

use greenhouse_domain::error::{ProcessingError, SendError, SourceError, TransportError};

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The `rumqttc` client could not queue a request; its event loop is gone.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),

    /// The connection to the broker failed.
    #[error("MQTT connection error")]
    Connection(#[source] Box<rumqttc::ConnectionError>),

    /// The broker sent a disconnect.
    #[error("MQTT broker disconnected")]
    Disconnected,

    /// A payload could not be converted to or from JSON.
    #[error("failed to parse MQTT payload")]
    PayloadParse(#[source] serde_json::Error),

    /// The configured CA file could not be read.
    #[error("failed to read CA file {}", path.display())]
    Tls {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<rumqttc::ConnectionError> for MqttError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        Self::Connection(Box::new(err))
    }
}

/// Whether the broker session ended, as opposed to failing to work.
fn is_closed(err: &rumqttc::ConnectionError) -> bool {
    let rumqttc::ConnectionError::Io(io) = err else {
        return false;
    };
    matches!(
        io.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

impl From<MqttError> for TransportError {
    fn from(err: MqttError) -> Self {
        match err {
            MqttError::Disconnected => Self::ConnectionClosed,
            MqttError::Connection(ref conn) if is_closed(conn) => Self::ConnectionClosed,
            other => Self::Connection(Box::new(other)),
        }
    }
}

impl From<MqttError> for SourceError {
    fn from(err: MqttError) -> Self {
        match err {
            MqttError::PayloadParse(err) => Self::Decode(ProcessingError::Payload(err)),
            other => Self::Transport(other.into()),
        }
    }
}

impl From<MqttError> for SendError {
    fn from(err: MqttError) -> Self {
        match err {
            MqttError::PayloadParse(_) => Self::Rejected(Box::new(err)),
            other => Self::Transport(other.into()),
        }
    }
}
