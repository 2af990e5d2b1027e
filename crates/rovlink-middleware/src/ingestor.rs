//! The Network Ingestor Pattern.
//!
//! An ingestor owns one transport (a WebSocket subscription, a TCP socket),
//! decodes what arrives on it and pushes typed [`RawMessage`]s into the
//! [`InboxSender`].  Decode and connection failures are logged inside the
//! ingestor and never reach the tick consumer.
//!
//! [`IngestorSet`] runs each ingestor on its own Tokio task and performs the
//! cooperative teardown:
//!
//! 1. cancel the shared [`CancellationToken`];
//! 2. each ingestor observes the cancellation in its `select!`, closes its
//!    transport (which unblocks any pending accept/read) and returns;
//! 3. every task is joined with a bounded deadline.
//!
//! Tasks are never aborted.  One that misses the deadline is reported in the
//! [`ShutdownReport`] so the caller can decide what to do.
//!
//! [`RawMessage`]: rovlink_types::RawMessage

use std::time::Duration;

use async_trait::async_trait;
use rovlink_types::RovError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::inbox::InboxSender;

/// Every transport listener must implement this trait.
///
/// # Contract
///
/// * `run` – loops until the transport ends or `cancel` fires.  On
///   cancellation it must close its transport before returning.  Malformed
///   payloads are logged and dropped; they never end the loop.
#[async_trait]
pub trait NetworkIngestor: Send {
    /// Stable name used in logs, e.g. `"topic-listener"`.
    fn name(&self) -> &str;

    /// Drive the transport, pushing decoded messages into `inbox`.
    ///
    /// # Errors
    ///
    /// Returns [`RovError::Connection`] when the transport cannot be
    /// established or drops with an I/O error.
    async fn run(self: Box<Self>, inbox: InboxSender, cancel: CancellationToken)
    -> Result<(), RovError>;
}

/// Outcome of [`IngestorSet::shutdown`].
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Ingestors that returned cleanly.
    pub joined: Vec<String>,
    /// Ingestors that returned an error (already logged).
    pub failed: Vec<(String, RovError)>,
    /// Ingestors still running when the deadline passed.
    pub timed_out: Vec<String>,
}

impl ShutdownReport {
    /// `true` when every ingestor was joined before the deadline.
    pub fn is_complete(&self) -> bool {
        self.timed_out.is_empty()
    }
}

struct Running {
    name: String,
    handle: JoinHandle<Result<(), RovError>>,
}

/// Owns the running ingestor tasks and their shared cancellation token.
pub struct IngestorSet {
    inbox: InboxSender,
    cancel: CancellationToken,
    running: Vec<Running>,
}

impl IngestorSet {
    /// Create an empty set whose ingestors will push into `inbox`.
    pub fn new(inbox: InboxSender) -> Self {
        Self {
            inbox,
            cancel: CancellationToken::new(),
            running: Vec::new(),
        }
    }

    /// Spawn `ingestor` on its own task.  Must be called from within a Tokio
    /// runtime.
    pub fn spawn(&mut self, ingestor: Box<dyn NetworkIngestor>) {
        let name = ingestor.name().to_string();
        let inbox = self.inbox.clone();
        let cancel = self.cancel.child_token();
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            let result = ingestor.run(inbox, cancel).await;
            if let Err(e) = &result {
                error!(ingestor = %task_name, error = %e, "ingestor stopped with error");
            }
            result
        });
        info!(ingestor = %name, "ingestor started");
        self.running.push(Running { name, handle });
    }

    /// Number of ingestors spawned and not yet shut down.
    pub fn len(&self) -> usize {
        self.running.len()
    }

    /// `true` when no ingestor is running.
    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Number of ingestors whose task has already returned, e.g. after a
    /// refused connection or a peer hang-up.
    pub fn finished(&self) -> usize {
        self.running.iter().filter(|r| r.handle.is_finished()).count()
    }

    /// A token that fires when [`shutdown`][Self::shutdown] starts.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signal every ingestor to stop and join them within `timeout`.
    pub async fn shutdown(self, timeout: Duration) -> ShutdownReport {
        info!(count = self.running.len(), "shutting down ingestors");
        self.cancel.cancel();

        let deadline = tokio::time::Instant::now() + timeout;
        let mut report = ShutdownReport::default();
        for Running { name, handle } in self.running {
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(Ok(()))) => report.joined.push(name),
                Ok(Ok(Err(e))) => report.failed.push((name, e)),
                Ok(Err(join_err)) => {
                    error!(ingestor = %name, error = %join_err, "ingestor task panicked");
                    report.failed.push((
                        name.clone(),
                        RovError::Shutdown {
                            component: name,
                            details: join_err.to_string(),
                        },
                    ));
                }
                Err(_) => {
                    warn!(ingestor = %name, "ingestor did not stop before the deadline");
                    report.timed_out.push(name);
                }
            }
        }
        info!(
            joined = report.joined.len(),
            failed = report.failed.len(),
            timed_out = report.timed_out.len(),
            "ingestor shutdown finished"
        );
        report
    }
}
