//! Stream transport seam and its reqwest-backed implementation.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};

use crate::error::TransportError;
use crate::sse::{SseDecoder, SseEvent};

/// SSE event name carrying one log line.
pub const LOG_EVENT: &str = "log";
/// SSE event name the server uses to report a failed stream.
pub const ERROR_EVENT: &str = "error";

/// Payload-level event delivered by an open stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Log(String),
    ServerError(String),
}

impl StreamEvent {
    /// Map a decoded SSE event; unknown event names are not forwarded.
    #[must_use]
    pub fn from_sse(event: SseEvent) -> Option<Self> {
        match event.event.as_str() {
            LOG_EVENT => Some(Self::Log(event.data)),
            ERROR_EVENT => Some(Self::ServerError(event.data)),
            _ => None,
        }
    }
}

/// An open subscription. `None` means the server ended the stream.
#[async_trait]
pub trait EventStream: Send {
    async fn next_event(&mut self) -> Option<Result<StreamEvent, TransportError>>;
}

/// Opens log streams.
#[async_trait]
pub trait LogTransport: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn EventStream>, TransportError>;
}

/// `LogTransport` over HTTP server-sent events.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// The stream itself has no overall timeout; only connecting is bounded.
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|err| TransportError::Connect {
                url: String::new(),
                message: format!("build http client: {err}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LogTransport for HttpTransport {
    async fn open(&self, url: &str) -> Result<Box<dyn EventStream>, TransportError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|err| TransportError::Connect {
                url: url.to_owned(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        Ok(Box::new(HttpEventStream {
            body: response.bytes_stream().boxed(),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        }))
    }
}

struct HttpEventStream {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<StreamEvent>,
}

#[async_trait]
impl EventStream for HttpEventStream {
    async fn next_event(&mut self) -> Option<Result<StreamEvent, TransportError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            match self.body.next().await {
                Some(Ok(chunk)) => {
                    self.pending.extend(
                        self.decoder
                            .feed(&chunk)
                            .into_iter()
                            .filter_map(StreamEvent::from_sse),
                    );
                }
                Some(Err(err)) => {
                    return Some(Err(TransportError::Read {
                        message: err.to_string(),
                    }))
                }
                None => return None,
            }
        }
    }
}
