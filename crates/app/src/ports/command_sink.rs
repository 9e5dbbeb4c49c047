//! Command sink port — point-to-point delivery of commands to devices.

use std::future::Future;

use greenhouse_domain::command::{Command, Destination};
use greenhouse_domain::error::SendError;

/// Delivers named commands to addressed devices.
///
/// Sends are fire-and-forget: success means the transport accepted the
/// command, not that the device executed it.
pub trait CommandSink: Send + Sync {
    /// Send `command` to `destination`.
    fn send(
        &self,
        destination: &Destination,
        command: &Command,
    ) -> impl Future<Output = Result<(), SendError>> + Send;

    /// Release the connection.
    fn close(&self) -> impl Future<Output = ()> + Send;
}
