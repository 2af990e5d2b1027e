//! `rovlink-middleware` – The Nervous System
//!
//! Moves bytes off the wire and into the tick consumer without caring what
//! the values will be used for.
//!
//! # Modules
//!
//! - [`codec`] – decodes JSON topic bodies and ASCII `"a;b"` frames into
//!   typed [`Payload`][rovlink_types::Payload] values.
//! - [`inbox`] – [`MessageInbox`]: the multi-producer/single-consumer queue
//!   bridging ingestor tasks and the tick consumer.
//! - [`ingestor`] – the [`NetworkIngestor`] trait and [`IngestorSet`], which
//!   owns the ingestor tasks and tears them down cooperatively.
//! - [`mqtt_listener`] – [`MqttListener`]: subscribes to the telemetry
//!   topics on an MQTT broker.
//! - [`topic_listener`] – [`TopicListener`]: the same topics over a
//!   rosbridge-compatible WebSocket broker.
//! - [`socket_listener`] – [`SocketListener`]: newline-delimited ASCII pairs
//!   over a raw TCP socket, either accepting or dialling.

pub mod codec;
pub mod inbox;
pub mod ingestor;
pub mod mqtt_listener;
pub mod socket_listener;
pub mod topic_listener;

pub use inbox::{InboxReceiver, InboxSender, MessageInbox};
pub use ingestor::{IngestorSet, NetworkIngestor, ShutdownReport};
pub use mqtt_listener::MqttListener;
pub use socket_listener::{SocketListener, SocketMode};
pub use topic_listener::{TopicListener, TopicMap};
