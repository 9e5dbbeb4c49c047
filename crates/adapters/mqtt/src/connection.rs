//! Session helpers shared by the source and the sink.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, Packet};

use crate::config::MqttConfig;
use crate::error::MqttError;

/// Upper bound on flushing a disconnect during close.
pub(crate) const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Create a client and drive its event loop until the broker accepts the
/// session.
pub(crate) async fn open(
    config: &MqttConfig,
    default_client_id: &str,
    manual_acks: bool,
) -> Result<(AsyncClient, EventLoop), MqttError> {
    let mut options = config.options(default_client_id)?;
    options.set_manual_acks(manual_acks);
    let (client, mut eventloop) = AsyncClient::new(options, config.request_capacity);

    loop {
        match eventloop.poll().await.map_err(MqttError::from)? {
            Event::Incoming(Packet::ConnAck(ack)) => {
                tracing::info!(
                    endpoint = %config.endpoint(),
                    client_id = config.client_id_or(default_client_id),
                    session_present = ack.session_present,
                    "connected to broker"
                );
                return Ok((client, eventloop));
            }
            Event::Incoming(Packet::Disconnect) => return Err(MqttError::Disconnected),
            _ => {}
        }
    }
}

/// Queue a disconnect and poll until it has been written, bounded by
/// [`CLOSE_TIMEOUT`].
pub(crate) async fn disconnect(client: &AsyncClient, eventloop: &mut EventLoop) {
    if let Err(err) = client.disconnect().await {
        tracing::debug!(%err, "disconnect request not queued");
        return;
    }

    let flushed = tokio::time::timeout(CLOSE_TIMEOUT, async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    })
    .await;

    if flushed.is_err() {
        tracing::warn!("timed out flushing disconnect");
    }
}
