//! Live log stream subscription feeding a `LogBuffer`.
//!
//! The subscription runs as a background tokio task that only forwards
//! messages; the buffer is mutated exclusively by the owner in
//! [`StreamIngestor::pump`], in arrival order. Messages are tagged with the
//! subscription id, so anything still queued from a stopped subscription is
//! dropped instead of applied.

use std::sync::Arc;

use logtail_core::LogBuffer;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::transport::{EventStream, LogTransport, StreamEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connected,
}

impl ConnectionStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connected => "Connected",
        }
    }
}

#[derive(Debug)]
pub(crate) enum StreamMessage {
    Opened,
    Line(String),
    Failed(TransportError),
}

#[derive(Debug)]
pub(crate) struct Envelope {
    subscription: u64,
    message: StreamMessage,
}

struct Subscription {
    id: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct StreamIngestor {
    transport: Arc<dyn LogTransport>,
    url: String,
    status: ConnectionStatus,
    active: Option<Subscription>,
    next_id: u64,
    opened_total: u64,
    tx: mpsc::UnboundedSender<Envelope>,
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl std::fmt::Debug for StreamIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamIngestor")
            .field("url", &self.url)
            .field("status", &self.status)
            .field("subscribed", &self.active.is_some())
            .field("opened_total", &self.opened_total)
            .finish()
    }
}

impl StreamIngestor {
    pub fn new(transport: Arc<dyn LogTransport>, url: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            transport,
            url: url.into(),
            status: ConnectionStatus::Disconnected,
            active: None,
            next_id: 1,
            opened_total: 0,
            tx,
            rx,
        }
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.active.is_some()
    }

    /// Subscriptions created over the ingestor's lifetime.
    #[must_use]
    pub fn opened_total(&self) -> u64 {
        self.opened_total
    }

    /// Line appended when the subscription fails or drops.
    #[must_use]
    pub fn failure_line(&self) -> String {
        format!("Error: Connection to {} failed.", self.url)
    }

    /// Open the subscription. No-op while one is active.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> bool {
        if self.active.is_some() {
            return false;
        }

        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.opened_total = self.opened_total.saturating_add(1);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_subscription(
            Arc::clone(&self.transport),
            self.url.clone(),
            id,
            self.tx.clone(),
            cancel.clone(),
        ));
        info!(url = %self.url, subscription = id, "log stream subscription started");
        self.active = Some(Subscription { id, cancel, task });
        true
    }

    /// Close the subscription. No-op when none is active. Messages already
    /// queued for it are discarded.
    pub fn stop(&mut self) -> bool {
        if self.active.is_none() {
            return false;
        }
        self.release();
        self.status = ConnectionStatus::Disconnected;
        info!(url = %self.url, "log stream subscription stopped");
        true
    }

    /// Apply every queued message to `buffer`. Returns the number of buffer
    /// mutations performed.
    pub fn pump(&mut self, buffer: &mut LogBuffer) -> usize {
        let mut mutations = 0;
        while let Ok(envelope) = self.rx.try_recv() {
            mutations += self.apply(envelope, buffer);
        }
        mutations
    }

    /// Wait for at least one message, then apply everything queued.
    pub async fn wait(&mut self, buffer: &mut LogBuffer) -> usize {
        let envelope = self.recv().await;
        self.apply(envelope, buffer) + self.pump(buffer)
    }

    pub(crate) async fn recv(&mut self) -> Envelope {
        match self.rx.recv().await {
            Some(envelope) => envelope,
            // The ingestor holds a sender, so the channel never closes.
            None => std::future::pending().await,
        }
    }

    pub(crate) fn apply(&mut self, envelope: Envelope, buffer: &mut LogBuffer) -> usize {
        let current = self.active.as_ref().map(|sub| sub.id);
        if current != Some(envelope.subscription) {
            debug!(
                subscription = envelope.subscription,
                "dropping message from closed subscription"
            );
            return 0;
        }

        match envelope.message {
            StreamMessage::Opened => {
                self.status = ConnectionStatus::Connected;
                info!(url = %self.url, "log stream connected");
                0
            }
            StreamMessage::Line(line) => {
                buffer.append(&line);
                1
            }
            StreamMessage::Failed(err) => {
                warn!(url = %self.url, error = %err, "log stream failed");
                buffer.append_synthetic(&self.failure_line());
                self.status = ConnectionStatus::Disconnected;
                self.release();
                1
            }
        }
    }

    fn release(&mut self) {
        if let Some(subscription) = self.active.take() {
            subscription.cancel.cancel();
            subscription.task.abort();
        }
    }
}

impl Drop for StreamIngestor {
    fn drop(&mut self) {
        self.release();
    }
}

fn deliver(tx: &mpsc::UnboundedSender<Envelope>, subscription: u64, message: StreamMessage) -> bool {
    tx.send(Envelope {
        subscription,
        message,
    })
    .is_ok()
}

async fn run_subscription(
    transport: Arc<dyn LogTransport>,
    url: String,
    id: u64,
    tx: mpsc::UnboundedSender<Envelope>,
    cancel: CancellationToken,
) {
    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        opened = transport.open(&url) => opened,
    };
    let mut stream: Box<dyn EventStream> = match opened {
        Ok(stream) => stream,
        Err(err) => {
            let _ = deliver(&tx, id, StreamMessage::Failed(err));
            return;
        }
    };
    if !deliver(&tx, id, StreamMessage::Opened) {
        return;
    }

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            next = stream.next_event() => next,
        };
        let message = match next {
            Some(Ok(StreamEvent::Log(line))) => StreamMessage::Line(line),
            Some(Ok(StreamEvent::ServerError(message))) => {
                StreamMessage::Failed(TransportError::Server { message })
            }
            Some(Err(err)) => StreamMessage::Failed(err),
            None => StreamMessage::Failed(TransportError::Closed),
        };
        let terminal = matches!(message, StreamMessage::Failed(_));
        if !deliver(&tx, id, message) || terminal {
            return;
        }
    }
}
