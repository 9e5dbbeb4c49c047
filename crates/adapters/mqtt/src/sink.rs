//! Command sink publishing to per-device command topics.

use std::sync::Mutex;

use rumqttc::{AsyncClient, Event as MqttEvent, EventLoop, Outgoing, Packet, QoS};
use tokio::task::JoinHandle;

use greenhouse_app::ports::CommandSink;
use greenhouse_domain::command::{Command, Destination};
use greenhouse_domain::error::SendError;

use crate::config::MqttConfig;
use crate::connection;
use crate::error::MqttError;

/// Client id used when none is configured.
pub const DEFAULT_CLIENT_ID: &str = "greenhouse-commands";

/// Publishes commands as JSON, `QoS` 1, not retained.
///
/// A background task drives the client's event loop. It stops on the first
/// connection error; every later send then fails with a fatal transport
/// error.
pub struct MqttCommandSink {
    client: AsyncClient,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl MqttCommandSink {
    /// Connect to the broker and start driving the session.
    ///
    /// # Errors
    ///
    /// Returns an [`MqttError`] if the session cannot be established.
    pub async fn connect(config: &MqttConfig) -> Result<Self, MqttError> {
        let (client, eventloop) = connection::open(config, DEFAULT_CLIENT_ID, false).await?;
        let driver = tokio::spawn(drive(eventloop));
        Ok(Self {
            client,
            driver: Mutex::new(Some(driver)),
        })
    }

    fn take_driver(&self) -> Option<JoinHandle<()>> {
        self.driver
            .lock()
            .map_or_else(|poisoned| poisoned.into_inner().take(), |mut guard| guard.take())
    }
}

async fn drive(mut eventloop: EventLoop) {
    loop {
        match eventloop.poll().await {
            Ok(MqttEvent::Incoming(Packet::Disconnect)) => {
                tracing::error!("broker disconnected command session");
                break;
            }
            Ok(MqttEvent::Outgoing(Outgoing::Disconnect)) => {
                tracing::debug!("command session disconnected");
                break;
            }
            Ok(MqttEvent::Incoming(Packet::PubAck(ack))) => {
                tracing::trace!(pkid = ack.pkid, "command acknowledged by broker");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::error!(%err, "command session failed");
                break;
            }
        }
    }
}

impl CommandSink for MqttCommandSink {
    async fn send(&self, destination: &Destination, command: &Command) -> Result<(), SendError> {
        let payload = serde_json::to_vec(&command.to_payload()).map_err(MqttError::PayloadParse)?;
        self.client
            .publish(destination.address(), QoS::AtLeastOnce, false, payload)
            .await
            .map_err(MqttError::Client)?;
        tracing::debug!(%destination, command = %command, "command published");
        Ok(())
    }

    async fn close(&self) {
        tracing::info!("closing command sink");
        let Some(driver) = self.take_driver() else {
            return;
        };
        if let Err(err) = self.client.disconnect().await {
            tracing::debug!(%err, "disconnect request not queued");
        }
        let abort = driver.abort_handle();
        if tokio::time::timeout(connection::CLOSE_TIMEOUT, driver).await.is_err() {
            tracing::warn!("timed out flushing disconnect");
            abort.abort();
        }
    }
}
