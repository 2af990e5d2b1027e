//! Raw socket listener for newline-delimited ASCII pairs.
//!
//! Two variants share one frame format, `"<float>;<float>\n"`:
//!
//! | Mode | Role | Default layout |
//! |---|---|---|
//! | [`SocketMode::Listen`] | binds and accepts one client at a time; returns to accepting when the client hangs up | `distance;angle` |
//! | [`SocketMode::Connect`] | dials a remote server once and reads until it hangs up | `y_offset;phi_deg` |
//!
//! Lines longer than [`MAX_FRAME_BYTES`] and lines that are not UTF-8 are
//! logged and skipped; the session keeps reading.  Cancellation drops
//! the listener and shuts the stream down, so a pending accept or read
//! returns immediately.

use futures_util::StreamExt;
use rovlink_types::{PairLayout, RawMessage, RovError};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::bytes::BytesMut;
use tokio_util::codec::{Decoder, FramedRead, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::inbox::InboxSender;
use crate::ingestor::NetworkIngestor;

/// Longest accepted frame, newline excluded.
pub const MAX_FRAME_BYTES: usize = 1024;

const SOURCE: &str = "rovlink-middleware::socket";

/// Whether the listener accepts or dials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketMode {
    #[default]
    Listen,
    Connect,
}

/// One newline-terminated line, or a line that had to be skipped.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Text(String),
    Dropped(&'static str),
}

/// [`LinesCodec`] that reports oversized and non-UTF-8 lines as
/// [`Line::Dropped`].
///
/// A decoder error puts `FramedRead` into its terminal state, so these two
/// cases must come back as items for the session to survive them.
#[derive(Debug)]
struct PairLineCodec(LinesCodec);

impl PairLineCodec {
    fn new() -> Self {
        Self(LinesCodec::new_with_max_length(MAX_FRAME_BYTES))
    }

    fn recover(decoded: Result<Option<String>, LinesCodecError>) -> Result<Option<Line>, LinesCodecError> {
        match decoded {
            Ok(line) => Ok(line.map(Line::Text)),
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Line::Dropped("oversized frame"))),
            Err(LinesCodecError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                Ok(Some(Line::Dropped("non-UTF-8 frame")))
            }
            Err(e) => Err(e),
        }
    }
}

impl Decoder for PairLineCodec {
    type Item = Line;
    type Error = LinesCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Line>, LinesCodecError> {
        Self::recover(self.0.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Line>, LinesCodecError> {
        Self::recover(self.0.decode_eof(src))
    }
}

/// How a client session ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    PeerClosed,
    Cancelled,
    InboxClosed,
}

/// Reads ASCII pairs from a TCP socket.
#[derive(Debug, Clone)]
pub struct SocketListener {
    mode: SocketMode,
    addr: String,
    layout: PairLayout,
}

impl SocketListener {
    /// Server variant: bind `addr` (e.g. `"0.0.0.0:8888"`) and accept.
    pub fn listen(addr: impl Into<String>) -> Self {
        Self {
            mode: SocketMode::Listen,
            addr: addr.into(),
            layout: PairLayout::DistanceAngle,
        }
    }

    /// Client variant: dial `addr` (e.g. `"192.168.2.1:8888"`).
    pub fn connect(addr: impl Into<String>) -> Self {
        Self {
            mode: SocketMode::Connect,
            addr: addr.into(),
            layout: PairLayout::OffsetHeading,
        }
    }

    /// Override how the two floats are labelled.
    pub fn with_layout(mut self, layout: PairLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn mode(&self) -> SocketMode {
        self.mode
    }

    pub fn layout(&self) -> PairLayout {
        self.layout
    }

    async fn run_listen(
        &self,
        inbox: &InboxSender,
        cancel: &CancellationToken,
    ) -> Result<(), RovError> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|e| RovError::connection(&self.addr, e))?;
        info!(addr = %self.addr, "socket listener waiting for a client");

        loop {
            let accepted = tokio::select! {
                _ = cancel.cancelled() => {
                    drop(listener);
                    info!(addr = %self.addr, "socket listener stopped");
                    return Ok(());
                }
                accepted = listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, peer)) => {
                    info!(peer = %peer, "socket client connected");
                    match self.read_session(stream, &peer.to_string(), inbox, cancel).await {
                        Ok(SessionEnd::PeerClosed) => {
                            info!(peer = %peer, "socket client disconnected");
                        }
                        Ok(SessionEnd::Cancelled) | Ok(SessionEnd::InboxClosed) => return Ok(()),
                        Err(e) => error!(peer = %peer, error = %e, "socket client dropped"),
                    }
                }
                Err(e) => error!(addr = %self.addr, error = %e, "socket accept error"),
            }
        }
    }

    async fn run_connect(
        &self,
        inbox: &InboxSender,
        cancel: &CancellationToken,
    ) -> Result<(), RovError> {
        let stream = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            connected = TcpStream::connect(&self.addr) => {
                connected.map_err(|e| RovError::connection(&self.addr, e))?
            }
        };
        info!(addr = %self.addr, "connected to socket server");

        match self.read_session(stream, &self.addr, inbox, cancel).await {
            Ok(SessionEnd::PeerClosed) => {
                warn!(addr = %self.addr, "socket server closed the connection");
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => Err(RovError::connection(&self.addr, e)),
        }
    }

    /// Read frames from one connected peer until it hangs up, the inbox
    /// closes, or `cancel` fires.
    async fn read_session(
        &self,
        stream: TcpStream,
        peer: &str,
        inbox: &InboxSender,
        cancel: &CancellationToken,
    ) -> std::io::Result<SessionEnd> {
        let (read_half, mut write_half) = stream.into_split();
        let mut frames = FramedRead::new(read_half, PairLineCodec::new());

        let end = loop {
            tokio::select! {
                _ = cancel.cancelled() => break SessionEnd::Cancelled,
                frame = frames.next() => match frame {
                    Some(Ok(Line::Text(line))) => {
                        if !self.handle_line(&line, peer, inbox) {
                            break SessionEnd::InboxClosed;
                        }
                    }
                    Some(Ok(Line::Dropped(reason))) => {
                        warn!(peer, reason, max = MAX_FRAME_BYTES, "dropping unreadable socket frame");
                    }
                    Some(Err(LinesCodecError::Io(e))) => return Err(e),
                    Some(Err(e)) => return Err(std::io::Error::other(e)),
                    None => break SessionEnd::PeerClosed,
                },
            }
        };

        if let Err(e) = write_half.shutdown().await {
            debug!(peer, error = %e, "socket shutdown after session end");
        }
        Ok(end)
    }

    /// Decode one line and push it.  Returns `false` once the inbox closed.
    fn handle_line(&self, line: &str, peer: &str, inbox: &InboxSender) -> bool {
        if line.trim().is_empty() {
            return true;
        }
        match codec::decode_pair(self.layout, line) {
            Ok(payload) => {
                debug!(peer, frame = line, "socket frame received");
                inbox.push(RawMessage::new(payload, format!("{SOURCE}/{peer}")))
            }
            Err(e) => {
                warn!(peer, error = %e, "dropping malformed socket frame");
                true
            }
        }
    }
}

#[async_trait::async_trait]
impl NetworkIngestor for SocketListener {
    fn name(&self) -> &str {
        match self.mode {
            SocketMode::Listen => "socket-listener",
            SocketMode::Connect => "socket-client",
        }
    }

    async fn run(
        self: Box<Self>,
        inbox: InboxSender,
        cancel: CancellationToken,
    ) -> Result<(), RovError> {
        match self.mode {
            SocketMode::Listen => self.run_listen(&inbox, &cancel).await,
            SocketMode::Connect => self.run_connect(&inbox, &cancel).await,
        }
    }
}
