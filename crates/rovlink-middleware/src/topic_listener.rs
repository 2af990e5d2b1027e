//! Topic-subscribe listener over a rosbridge-compatible WebSocket broker.
//!
//! [`TopicListener`] dials `ws://host:port`, subscribes to the three
//! telemetry topics and turns every publish frame into a [`RawMessage`]:
//!
//! ```text
//! → {"op":"subscribe","topic":"/pipe"}
//! ← {"op":"publish","topic":"/pipe","msg":{"distance":100.0,"angle":30.0}}
//! ```
//!
//! A `msg` of the form `{"data": "<json>"}` (a `std_msgs/String` carrying a
//! JSON document) is unwrapped before decoding.
//!
//! On cancellation the listener unsubscribes from every topic and sends a
//! Close frame before returning.  A lost link ends the task; reconnecting is
//! left to the operator.

use futures_util::{SinkExt, StreamExt};
use rovlink_types::{Channel, RawMessage, RovError};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec;
use crate::inbox::InboxSender;
use crate::ingestor::NetworkIngestor;

const SOURCE: &str = "rovlink-middleware::topic";

/// Topic names for each telemetry channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMap {
    pub pipe: String,
    pub odometry: String,
    pub follow_speed: String,
}

impl Default for TopicMap {
    fn default() -> Self {
        Self {
            pipe: "/pipe".to_string(),
            odometry: "/odom".to_string(),
            follow_speed: "/pipefollowspeed".to_string(),
        }
    }
}

impl TopicMap {
    /// Channel carried on `topic`, if it is one of ours.
    pub fn channel_for(&self, topic: &str) -> Option<Channel> {
        if topic == self.pipe {
            Some(Channel::Pipe)
        } else if topic == self.odometry {
            Some(Channel::Odometry)
        } else if topic == self.follow_speed {
            Some(Channel::FollowSpeed)
        } else {
            None
        }
    }

    /// All subscribed topic names.
    pub fn topics(&self) -> [&str; 3] {
        [&self.pipe, &self.odometry, &self.follow_speed]
    }
}

/// rosbridge envelope; only the fields we route on.
#[derive(Debug, Deserialize)]
struct Frame {
    op: String,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    msg: Option<Value>,
}

/// Result of interpreting one text frame.
#[derive(Debug)]
enum FrameOutcome {
    Message(RawMessage),
    Ignored(&'static str),
    Malformed(RovError),
}

/// Subscribes to the telemetry topics on a rosbridge-compatible broker.
#[derive(Debug, Clone)]
pub struct TopicListener {
    url: String,
    topics: TopicMap,
}

impl TopicListener {
    /// Listener for the broker at `host:port` with the default topic names.
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            url: format!("ws://{host}:{port}"),
            topics: TopicMap::default(),
        }
    }

    /// Override the topic names.
    pub fn with_topics(mut self, topics: TopicMap) -> Self {
        self.topics = topics;
        self
    }

    /// The broker URL this listener dials.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn subscribe_op(topic: &str) -> String {
        json!({ "op": "subscribe", "topic": topic }).to_string()
    }

    fn unsubscribe_op(topic: &str) -> String {
        json!({ "op": "unsubscribe", "topic": topic }).to_string()
    }

    fn interpret(&self, text: &str) -> FrameOutcome {
        let frame: Frame = match serde_json::from_str(text) {
            Ok(f) => f,
            Err(_) => return FrameOutcome::Ignored("not a rosbridge frame"),
        };
        if frame.op != "publish" {
            return FrameOutcome::Ignored("not a publish op");
        }
        let Some(channel) = frame.topic.as_deref().and_then(|t| self.topics.channel_for(t)) else {
            return FrameOutcome::Ignored("unsubscribed topic");
        };
        let Some(msg) = frame.msg else {
            return FrameOutcome::Malformed(RovError::decode(channel, "publish frame without msg"));
        };
        let decoded = match msg {
            Value::Object(ref map) if map.len() == 1 && map.get("data").is_some_and(Value::is_string) => {
                let body = map.get("data").and_then(Value::as_str).unwrap_or_default();
                codec::decode_topic_payload(channel, body)
            }
            other => codec::decode_topic_value(channel, other),
        };
        match decoded {
            Ok(payload) => {
                FrameOutcome::Message(RawMessage::new(payload, format!("{SOURCE}/{}", channel.label())))
            }
            Err(e) => FrameOutcome::Malformed(e),
        }
    }

    /// Interpret one text frame and push it if it decodes.
    ///
    /// Returns `false` once the inbox has closed.
    fn handle_text(&self, text: &str, inbox: &InboxSender) -> bool {
        match self.interpret(text) {
            FrameOutcome::Message(message) => {
                debug!(channel = %message.channel(), "telemetry frame received");
                inbox.push(message)
            }
            FrameOutcome::Ignored(reason) => {
                debug!(reason, "frame ignored");
                true
            }
            FrameOutcome::Malformed(e) => {
                warn!(url = %self.url, error = %e, "dropping malformed telemetry frame");
                true
            }
        }
    }
}

#[async_trait::async_trait]
impl NetworkIngestor for TopicListener {
    fn name(&self) -> &str {
        "topic-listener"
    }

    async fn run(
        self: Box<Self>,
        inbox: InboxSender,
        cancel: CancellationToken,
    ) -> Result<(), RovError> {
        let (ws_stream, _) = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            connected = connect_async(self.url.as_str()) => {
                connected.map_err(|e| RovError::connection(&self.url, e))?
            }
        };
        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        for topic in self.topics.topics() {
            ws_tx
                .send(Message::Text(Self::subscribe_op(topic).into()))
                .await
                .map_err(|e| RovError::connection(&self.url, e))?;
        }
        info!(url = %self.url, topics = ?self.topics.topics(), "subscribed to telemetry topics");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    for topic in self.topics.topics() {
                        if let Err(e) = ws_tx.send(Message::Text(Self::unsubscribe_op(topic).into())).await {
                            debug!(topic, error = %e, "unsubscribe not delivered");
                        }
                    }
                    if let Err(e) = ws_tx.close().await {
                        debug!(error = %e, "close frame not delivered");
                    }
                    info!(url = %self.url, "topic listener stopped");
                    return Ok(());
                }
                frame = ws_rx.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if !self.handle_text(text.as_str(), &inbox) {
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                            Ok(text) => {
                                if !self.handle_text(text, &inbox) {
                                    return Ok(());
                                }
                            }
                            Err(e) => warn!(url = %self.url, error = %e, "dropping non-UTF-8 frame"),
                        },
                        Some(Ok(Message::Close(_))) | None => {
                            warn!(url = %self.url, "broker closed the connection");
                            return Ok(());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(RovError::connection(&self.url, e)),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbox::{InboxReceiver, MessageInbox};
    use crate::ingestor::IngestorSet;
    use rovlink_types::Payload;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::accept_async;

    /// Accepts one client, waits for its three subscriptions, publishes
    /// `frames`, then records everything the client sends until it closes.
    async fn fake_broker(frames: Vec<String>) -> (SocketAddr, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let mut received = Vec::new();
            while received.len() < 3 {
                match ws.next().await {
                    Some(Ok(Message::Text(t))) => received.push(t.to_string()),
                    _ => return received,
                }
            }
            for f in frames {
                ws.send(Message::Text(f.into())).await.unwrap();
            }
            while let Some(Ok(msg)) = ws.next().await {
                match msg {
                    Message::Text(t) => received.push(t.to_string()),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            received
        });
        (addr, handle)
    }

    async fn wait_for(rx: &mut InboxReceiver, n: usize) -> Vec<RawMessage> {
        let mut got = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while got.len() < n && tokio::time::Instant::now() < deadline {
            got.extend(rx.drain());
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        got
    }

    #[test]
    fn topic_map_routes_default_topics() {
        let map = TopicMap::default();
        assert_eq!(map.channel_for("/pipe"), Some(Channel::Pipe));
        assert_eq!(map.channel_for("/odom"), Some(Channel::Odometry));
        assert_eq!(map.channel_for("/pipefollowspeed"), Some(Channel::FollowSpeed));
        assert_eq!(map.channel_for("/cmd_vel"), None);
    }

    #[test]
    fn interpret_publish_frame() {
        let listener = TopicListener::new("localhost", 9090);
        let outcome = listener
            .interpret(r#"{"op":"publish","topic":"/pipe","msg":{"distance":100.0,"angle":30.0}}"#);
        let FrameOutcome::Message(msg) = outcome else {
            panic!("expected a decoded message, got {outcome:?}");
        };
        assert_eq!(msg.channel(), Channel::Pipe);
        assert_eq!(msg.source(), "rovlink-middleware::topic/pipe");
    }

    #[test]
    fn interpret_unwraps_string_data_messages() {
        let listener = TopicListener::new("localhost", 9090);
        let outcome = listener.interpret(
            r#"{"op":"publish","topic":"/pipefollowspeed","msg":{"data":"{\"speed\": 12.5}"}}"#,
        );
        let FrameOutcome::Message(msg) = outcome else {
            panic!("expected a decoded message, got {outcome:?}");
        };
        assert!(matches!(msg.payload(), Payload::FollowSpeed(s) if (s.speed - 12.5).abs() < 1e-6));
    }

    #[test]
    fn interpret_flags_malformed_and_ignores_foreign_frames() {
        let listener = TopicListener::new("localhost", 9090);
        assert!(matches!(
            listener.interpret(r#"{"op":"publish","topic":"/odom","msg":{"position":{}}}"#),
            FrameOutcome::Malformed(RovError::Decode { channel: Channel::Odometry, .. })
        ));
        assert!(matches!(
            listener.interpret(r#"{"op":"publish","topic":"/pipe"}"#),
            FrameOutcome::Malformed(_)
        ));
        assert!(matches!(
            listener.interpret(r#"{"op":"status","level":"info"}"#),
            FrameOutcome::Ignored(_)
        ));
        assert!(matches!(
            listener.interpret(r#"{"op":"publish","topic":"/scan","msg":{}}"#),
            FrameOutcome::Ignored(_)
        ));
        assert!(matches!(listener.interpret("garbage"), FrameOutcome::Ignored(_)));
    }

    #[tokio::test]
    async fn listener_ingests_published_frames_and_unsubscribes_on_shutdown() {
        let frames = vec![
            r#"{"op":"publish","topic":"/pipe","msg":{"distance":100.0,"angle":30.0}}"#.to_string(),
            r#"{"op":"publish","topic":"/pipe","msg":{"distance":"oops"}}"#.to_string(),
            r#"{"op":"publish","topic":"/pipefollowspeed","msg":{"speed":4.0}}"#.to_string(),
            r#"{"op":"publish","topic":"/odom","msg":{"position":{"x":0,"y":0,"z":12.0},"orientation":{"roll":0.0,"pitch":0.0}}}"#.to_string(),
        ];
        let (addr, broker) = fake_broker(frames).await;

        let (tx, mut rx) = MessageInbox::channel();
        let mut set = IngestorSet::new(tx);
        set.spawn(Box::new(TopicListener::new("127.0.0.1", addr.port())));

        let got = wait_for(&mut rx, 3).await;
        let channels: Vec<Channel> = got.iter().map(RawMessage::channel).collect();
        assert_eq!(
            channels,
            vec![Channel::Pipe, Channel::FollowSpeed, Channel::Odometry],
            "malformed frame must be dropped without disturbing the stream"
        );

        let report = set.shutdown(Duration::from_secs(2)).await;
        assert!(report.is_complete());
        assert_eq!(report.joined, vec!["topic-listener".to_string()]);

        let received = broker.await.unwrap();
        let subscribes = received.iter().filter(|t| t.contains("\"subscribe\"")).count();
        let unsubscribes = received.iter().filter(|t| t.contains("\"unsubscribe\"")).count();
        assert_eq!(subscribes, 3);
        assert_eq!(unsubscribes, 3);
    }

    #[tokio::test]
    async fn unreachable_broker_is_a_connection_error() {
        // Bind then drop to obtain a port nobody listens on.
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };
        let (tx, _rx) = MessageInbox::channel();
        let mut set = IngestorSet::new(tx);
        set.spawn(Box::new(TopicListener::new("127.0.0.1", port)));
        for _ in 0..200 {
            if set.finished() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let report = set.shutdown(Duration::from_secs(1)).await;
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0].1, RovError::Connection { .. }));
    }
}
