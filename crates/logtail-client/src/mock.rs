//! In-memory transport and command mocks for unit testing.
//!
//! `MockTransport` hands out scripted streams in the order they were pushed;
//! each stream is driven from the test through a `MockStreamHandle`.
//! `MockCommandClient` returns scripted results and records every call.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::command::LogCommands;
use crate::error::{CommandError, TransportError};
use crate::transport::{EventStream, LogTransport, StreamEvent};

type Scripted = Result<StreamEvent, TransportError>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

enum OpenScript {
    Refuse(TransportError),
    Stream(mpsc::UnboundedReceiver<Scripted>),
}

/// Mock implementation of `LogTransport` for testing.
#[derive(Default)]
pub struct MockTransport {
    scripts: Mutex<VecDeque<OpenScript>>,
    opened: Mutex<Vec<String>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("scripted", &lock(&self.scripts).len())
            .field("opened", &*lock(&self.opened))
            .finish()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next `open` to succeed with a stream driven by the
    /// returned handle.
    pub fn push_stream(&self) -> MockStreamHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.scripts).push_back(OpenScript::Stream(rx));
        MockStreamHandle { tx: Some(tx) }
    }

    /// Script the next `open` to fail with `err`.
    pub fn push_refusal(&self, err: TransportError) {
        lock(&self.scripts).push_back(OpenScript::Refuse(err));
    }

    /// Every url passed to `open`, in call order.
    pub fn opened_urls(&self) -> Vec<String> {
        lock(&self.opened).clone()
    }

    pub fn open_count(&self) -> usize {
        lock(&self.opened).len()
    }
}

#[async_trait]
impl LogTransport for MockTransport {
    async fn open(&self, url: &str) -> Result<Box<dyn EventStream>, TransportError> {
        lock(&self.opened).push(url.to_owned());
        let script = lock(&self.scripts).pop_front();
        match script {
            Some(OpenScript::Refuse(err)) => Err(err),
            Some(OpenScript::Stream(rx)) => Ok(Box::new(MockEventStream { rx: Some(rx) })),
            // Unscripted opens succeed and stay silent.
            None => Ok(Box::new(MockEventStream { rx: None })),
        }
    }
}

struct MockEventStream {
    rx: Option<mpsc::UnboundedReceiver<Scripted>>,
}

#[async_trait]
impl EventStream for MockEventStream {
    async fn next_event(&mut self) -> Option<Result<StreamEvent, TransportError>> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }
}

/// Test-side driver for one scripted stream. Dropping it ends the stream.
#[derive(Debug)]
pub struct MockStreamHandle {
    tx: Option<mpsc::UnboundedSender<Scripted>>,
}

impl MockStreamHandle {
    /// Deliver a `log` event. Events sent before the stream is opened are
    /// queued.
    pub fn send_line(&self, line: &str) {
        self.send(Ok(StreamEvent::Log(line.to_owned())));
    }

    /// Deliver a server `error` event.
    pub fn server_error(&self, message: &str) {
        self.send(Ok(StreamEvent::ServerError(message.to_owned())));
    }

    /// Make the next read fail.
    pub fn fail(&self, err: TransportError) {
        self.send(Err(err));
    }

    /// End the stream as if the server closed it.
    pub fn close(mut self) {
        self.tx = None;
    }

    fn send(&self, item: Scripted) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(item);
        }
    }
}

/// Mock implementation of `LogCommands` for testing.
///
/// Scripted results are consumed in order; once exhausted every call
/// succeeds.
#[derive(Debug, Default)]
pub struct MockCommandClient {
    results: Mutex<VecDeque<Result<(), CommandError>>>,
    calls: Mutex<usize>,
    gate: Mutex<Option<tokio::sync::oneshot::Receiver<()>>>,
}

impl MockCommandClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next unanswered `truncate` call.
    pub fn with_result(self, result: Result<(), CommandError>) -> Self {
        lock(&self.results).push_back(result);
        self
    }

    /// Hold the next `truncate` call until the returned sender fires or is
    /// dropped.
    pub fn hold_next(&self) -> tokio::sync::oneshot::Sender<()> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        *lock(&self.gate) = Some(rx);
        tx
    }

    pub fn truncate_calls(&self) -> usize {
        *lock(&self.calls)
    }
}

#[async_trait]
impl LogCommands for MockCommandClient {
    async fn truncate(&self) -> Result<(), CommandError> {
        *lock(&self.calls) += 1;
        let gate = lock(&self.gate).take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        lock(&self.results).pop_front().unwrap_or(Ok(()))
    }
}
