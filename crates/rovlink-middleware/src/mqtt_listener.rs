//! Topic-subscribe listener over an MQTT broker.
//!
//! [`MqttListener`] connects to `host:port` (1883 by default), subscribes to
//! the three telemetry topics at QoS 1 and decodes every publish body as the
//! JSON document for that topic's channel:
//!
//! ```text
//! PUBLISH /pipe            {"distance":100.0,"angle":30.0}
//! PUBLISH /pipefollowspeed {"speed":4.0}
//! ```
//!
//! Subscriptions are (re)issued on every CONNACK.  On cancellation the
//! listener unsubscribes from every topic and sends DISCONNECT before
//! returning.  A lost link ends the task; reconnecting is left to the
//! operator.

use std::time::Duration;

use rovlink_types::{RawMessage, RovError};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, Publish, QoS};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec;
use crate::inbox::InboxSender;
use crate::ingestor::NetworkIngestor;
use crate::topic_listener::TopicMap;

/// Standard unencrypted MQTT port.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

const SOURCE: &str = "rovlink-middleware::mqtt";
const KEEP_ALIVE: Duration = Duration::from_secs(5);
const REQUEST_CAPACITY: usize = 16;
const DISCONNECT_GRACE: Duration = Duration::from_millis(500);

/// Subscribes to the telemetry topics on an MQTT broker.
#[derive(Debug, Clone)]
pub struct MqttListener {
    host: String,
    port: u16,
    client_id: String,
    topics: TopicMap,
}

impl MqttListener {
    /// Listener for the broker at `host:port` with the default topic names.
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            client_id: format!("rovlink-{}", std::process::id()),
            topics: TopicMap::default(),
        }
    }

    /// Override the topic names.
    pub fn with_topics(mut self, topics: TopicMap) -> Self {
        self.topics = topics;
        self
    }

    /// Override the MQTT client identifier.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// `host:port` of the broker.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);
        options
    }

    /// Decode one publish and push it.  Returns `false` once the inbox closed.
    fn handle_publish(&self, publish: &Publish, inbox: &InboxSender) -> bool {
        let Some(channel) = self.topics.channel_for(&publish.topic) else {
            debug!(topic = %publish.topic, "publish on unsubscribed topic ignored");
            return true;
        };
        let decoded = std::str::from_utf8(&publish.payload)
            .map_err(|e| RovError::decode(channel, format!("body is not UTF-8: {e}")))
            .and_then(|body| codec::decode_topic_payload(channel, body));
        match decoded {
            Ok(payload) => {
                debug!(channel = %channel, "telemetry publish received");
                inbox.push(RawMessage::new(payload, format!("{SOURCE}/{}", channel.label())))
            }
            Err(e) => {
                warn!(topic = %publish.topic, error = %e, "dropping malformed telemetry publish");
                true
            }
        }
    }

    fn subscribe_all(&self, client: &AsyncClient) -> Result<(), RovError> {
        for topic in self.topics.topics() {
            client
                .try_subscribe(topic, QoS::AtLeastOnce)
                .map_err(|e| RovError::connection(self.endpoint(), e))?;
        }
        info!(endpoint = %self.endpoint(), topics = ?self.topics.topics(), "subscribed to telemetry topics");
        Ok(())
    }

    /// Queue UNSUBSCRIBE for every topic plus DISCONNECT, then drive the
    /// event loop until DISCONNECT is on the wire or the grace period ends.
    async fn unsubscribe_and_disconnect(&self, client: &AsyncClient, events: &mut EventLoop) {
        for topic in self.topics.topics() {
            if let Err(e) = client.try_unsubscribe(topic) {
                debug!(topic, error = %e, "unsubscribe not queued");
            }
        }
        if let Err(e) = client.try_disconnect() {
            debug!(error = %e, "disconnect not queued");
            return;
        }
        let flushed = tokio::time::timeout(DISCONNECT_GRACE, async {
            loop {
                match events.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => return,
                    Ok(_) => {}
                    Err(e) => {
                        debug!(error = %e, "link closed during disconnect");
                        return;
                    }
                }
            }
        })
        .await;
        if flushed.is_err() {
            debug!(endpoint = %self.endpoint(), "disconnect not flushed in time");
        }
    }
}

#[async_trait::async_trait]
impl NetworkIngestor for MqttListener {
    fn name(&self) -> &str {
        "mqtt-listener"
    }

    async fn run(
        self: Box<Self>,
        inbox: InboxSender,
        cancel: CancellationToken,
    ) -> Result<(), RovError> {
        let (client, mut events) = AsyncClient::new(self.options(), REQUEST_CAPACITY);

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => {
                    self.unsubscribe_and_disconnect(&client, &mut events).await;
                    info!(endpoint = %self.endpoint(), "mqtt listener stopped");
                    return Ok(());
                }
                event = events.poll() => event,
            };
            match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!(endpoint = %self.endpoint(), "connected to mqtt broker");
                    self.subscribe_all(&client)?;
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if !self.handle_publish(&publish, &inbox) {
                        return Ok(());
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    warn!(endpoint = %self.endpoint(), "broker closed the connection");
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => return Err(RovError::connection(self.endpoint(), e)),
            }
        }
    }
}
