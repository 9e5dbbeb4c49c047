//! Event source backed by an MQTT subscription.
//!
//! The subscription uses `QoS` 1 with manual acknowledgement, so a publish
//! stays unacknowledged until the ingestion loop has processed it. MQTT has
//! no negative acknowledgement: a rejected event is acknowledged as well,
//! after the rejection has been logged, so that the broker does not
//! redeliver it forever.

use rumqttc::{AsyncClient, Event as MqttEvent, EventLoop, Packet, Publish, QoS};

use greenhouse_app::ports::{Delivery, EventSource};
use greenhouse_domain::error::{SourceError, TransportError};
use greenhouse_domain::event::Event;

use crate::config::MqttConfig;
use crate::connection;
use crate::error::MqttError;

/// Client id used when none is configured.
pub const DEFAULT_CLIENT_ID: &str = "greenhouse-events";

/// Telemetry subscription on one topic.
pub struct MqttEventSource {
    client: AsyncClient,
    eventloop: EventLoop,
    topic: String,
}

impl MqttEventSource {
    /// Connect to the broker and subscribe to `topic`.
    ///
    /// # Errors
    ///
    /// Returns an [`MqttError`] if the session cannot be established or the
    /// subscription cannot be queued.
    pub async fn connect(config: &MqttConfig, topic: impl Into<String>) -> Result<Self, MqttError> {
        let topic = topic.into();
        let (client, eventloop) = connection::open(config, DEFAULT_CLIENT_ID, true).await?;
        client
            .subscribe(topic.as_str(), QoS::AtLeastOnce)
            .await
            .map_err(MqttError::Client)?;
        tracing::info!(%topic, "subscribed to event topic");
        Ok(Self {
            client,
            eventloop,
            topic,
        })
    }
}

/// Acknowledge `publish` to the broker.
async fn settle(client: &AsyncClient, publish: &Publish) -> Result<(), TransportError> {
    client
        .ack(publish)
        .await
        .map_err(|err| MqttError::Client(err).into())
}

/// Decode an incoming publish. An undecodable one is settled straight away
/// and reported as a decode error.
async fn accept(client: &AsyncClient, publish: Publish) -> Result<Delivery<Publish>, SourceError> {
    match Event::decode(&publish.payload) {
        Ok(event) => Ok(Delivery {
            event,
            token: publish,
        }),
        Err(err) => {
            tracing::debug!(
                topic = %publish.topic,
                pkid = publish.pkid,
                "acknowledging undecodable publish"
            );
            settle(client, &publish).await?;
            Err(err.into())
        }
    }
}

impl EventSource for MqttEventSource {
    type Token = Publish;

    async fn receive(&mut self) -> Result<Delivery<Publish>, SourceError> {
        loop {
            let notification = self.eventloop.poll().await.map_err(MqttError::from)?;
            match notification {
                MqttEvent::Incoming(Packet::Publish(publish)) => {
                    return accept(&self.client, publish).await;
                }
                MqttEvent::Incoming(Packet::SubAck(ack)) => {
                    tracing::debug!(
                        topic = %self.topic,
                        codes = ?ack.return_codes,
                        "subscription acknowledged"
                    );
                }
                MqttEvent::Incoming(Packet::Disconnect) => {
                    return Err(MqttError::Disconnected.into());
                }
                _ => {}
            }
        }
    }

    async fn ack(&mut self, token: Publish) -> Result<(), TransportError> {
        settle(&self.client, &token).await
    }

    async fn reject(&mut self, token: Publish, reason: &str) -> Result<(), TransportError> {
        tracing::debug!(
            topic = %token.topic,
            pkid = token.pkid,
            reason,
            "settling rejected publish"
        );
        settle(&self.client, &token).await
    }

    async fn close(&mut self) {
        tracing::info!(topic = %self.topic, "closing event source");
        connection::disconnect(&self.client, &mut self.eventloop).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenhouse_domain::error::ProcessingError;
    use rumqttc::MqttOptions;

    fn client() -> (AsyncClient, EventLoop) {
        let mut options = MqttOptions::new("greenhouse-test", "localhost", 1883);
        options.set_manual_acks(true);
        AsyncClient::new(options, 8)
    }

    fn publish(payload: &[u8]) -> Publish {
        Publish::new("events", QoS::AtLeastOnce, payload.to_vec())
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn should_return_send_futures_from_port() {
        let (client, eventloop) = client();
        let mut source = MqttEventSource {
            client,
            eventloop,
            topic: "events".to_string(),
        };

        let receive = source.receive();
        assert_send(&receive);
        drop(receive);
        let ack = source.ack(publish(b"{}"));
        assert_send(&ack);
        drop(ack);
        let reject = source.reject(publish(b"{}"), "unrecognized soil payload shape");
        assert_send(&reject);
    }

    #[tokio::test]
    async fn should_deliver_decodable_publish() {
        let (client, _eventloop) = client();

        let delivery = accept(&client, publish(br#"{"deviceId":"d1","data":{"soil":[800]}}"#))
            .await
            .unwrap();

        assert_eq!(delivery.event.device_id.as_str(), "d1");
        assert_eq!(delivery.token.topic, "events");
    }

    #[tokio::test]
    async fn should_settle_and_report_undecodable_publish() {
        let (client, _eventloop) = client();

        let result = accept(&client, publish(b"not json")).await;

        assert!(matches!(
            result,
            Err(SourceError::Decode(ProcessingError::Payload(_)))
        ));
    }

    #[tokio::test]
    async fn should_fail_fatally_when_undecodable_publish_cannot_be_settled() {
        let (client, eventloop) = client();
        drop(eventloop);

        let result = accept(&client, publish(b"not json")).await;

        let err = result.unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, SourceError::Transport(TransportError::Connection(_))));
    }

    #[tokio::test]
    async fn should_not_touch_session_for_decodable_publish() {
        let (client, eventloop) = client();
        drop(eventloop);

        let result = accept(&client, publish(br#"{"deviceId":"d1"}"#)).await;

        assert!(result.is_ok());
    }
}
