//! Multi-producer / single-consumer message inbox.
//!
//! The inbox is the only structure mutated from more than one thread.  Every
//! ingestor task holds a cloned [`InboxSender`]; the tick consumer owns the
//! single [`InboxReceiver`].
//!
//! Built on [`tokio::sync::mpsc::unbounded_channel`] so that a push from a
//! network task never waits on the consumer.  Ordering is preserved within
//! one sender's stream; there is no ordering guarantee across senders.

use rovlink_types::RawMessage;
use tokio::sync::mpsc;
use tracing::debug;

/// Constructor namespace for the inbox pair.
pub struct MessageInbox;

impl MessageInbox {
    /// Create a connected sender/receiver pair.
    pub fn channel() -> (InboxSender, InboxReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (InboxSender { tx }, InboxReceiver { rx })
    }
}

/// Producer side. Clone it cheaply – one per ingestor.
#[derive(Clone, Debug)]
pub struct InboxSender {
    tx: mpsc::UnboundedSender<RawMessage>,
}

impl InboxSender {
    /// Enqueue `message` without blocking.
    ///
    /// Returns `false` when the consumer has gone away; the message is
    /// dropped.  This is a normal condition during teardown, not an error.
    pub fn push(&self, message: RawMessage) -> bool {
        match self.tx.send(message) {
            Ok(()) => true,
            Err(mpsc::error::SendError(dropped)) => {
                debug!(
                    channel = %dropped.channel(),
                    source = dropped.source(),
                    "inbox closed; message dropped"
                );
                false
            }
        }
    }

    /// `true` once the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side, owned by the tick thread.
#[derive(Debug)]
pub struct InboxReceiver {
    rx: mpsc::UnboundedReceiver<RawMessage>,
}

impl InboxReceiver {
    /// Take every message that was queued when the call started.
    ///
    /// Never blocks.  Messages pushed while draining are left for the next
    /// call, so the loop is bounded by the depth observed up front.
    pub fn drain(&mut self) -> Vec<RawMessage> {
        let depth = self.rx.len();
        let mut out = Vec::with_capacity(depth);
        for _ in 0..depth {
            match self.rx.try_recv() {
                Ok(message) => out.push(message),
                Err(_) => break,
            }
        }
        out
    }

    /// Number of messages currently queued.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
