//! The single owned state container behind one log view.
//!
//! A `Session` is created when the view is entered and dropped when it is
//! left. It owns the buffer, the stream ingestor, the search state, and the
//! command client; every mutation happens through `&mut self`, so the buffer
//! has exactly one writer at a time.

use std::sync::Arc;

use logtail_core::{match_count, view, BufferObserver, LogBuffer, SearchState, ViewEntry};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::command::LogCommands;
use crate::endpoints::Endpoints;
use crate::error::CommandError;
use crate::ingestor::{ConnectionStatus, Envelope, StreamIngestor};
use crate::transport::LogTransport;

/// What one `pump`/`wait` round applied.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Activity {
    /// Buffer mutations performed (appends and clears).
    pub mutations: usize,
    /// Outcomes of background truncate requests that finished this round.
    pub truncated: Vec<Result<(), CommandError>>,
}

impl Activity {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations == 0 && self.truncated.is_empty()
    }
}

/// Read-only projection handed to the rendering surface.
#[derive(Debug)]
pub struct RenderModel<'a> {
    pub entries: Vec<ViewEntry<'a>>,
    pub connection: ConnectionStatus,
    pub match_count: usize,
    pub active_term: &'a str,
}

enum Woken {
    Stream(Envelope),
    Truncated(Result<(), CommandError>),
}

pub struct Session {
    buffer: LogBuffer,
    ingestor: StreamIngestor,
    commands: Arc<dyn LogCommands>,
    search: SearchState,
    endpoints: Endpoints,
    truncate_in_flight: bool,
    truncate_tx: mpsc::UnboundedSender<Result<(), CommandError>>,
    truncate_rx: mpsc::UnboundedReceiver<Result<(), CommandError>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("buffer", &self.buffer)
            .field("ingestor", &self.ingestor)
            .field("search", &self.search)
            .field("truncate_in_flight", &self.truncate_in_flight)
            .finish()
    }
}

impl Session {
    pub fn new(
        endpoints: Endpoints,
        capacity: usize,
        transport: Arc<dyn LogTransport>,
        commands: Arc<dyn LogCommands>,
    ) -> Self {
        let ingestor = StreamIngestor::new(transport, endpoints.tail_url());
        let (truncate_tx, truncate_rx) = mpsc::unbounded_channel();
        Self {
            buffer: LogBuffer::new(capacity),
            ingestor,
            commands,
            search: SearchState::default(),
            endpoints,
            truncate_in_flight: false,
            truncate_tx,
            truncate_rx,
        }
    }

    /// View became visible: open the subscription.
    pub fn on_enter(&mut self) -> bool {
        self.ingestor.start()
    }

    /// View went away: close the subscription.
    pub fn on_exit(&mut self) -> bool {
        self.ingestor.stop()
    }

    pub fn subscribe(&mut self, observer: Arc<dyn BufferObserver>) {
        self.buffer.subscribe(observer);
    }

    #[must_use]
    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        self.ingestor.status()
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.ingestor.is_subscribed()
    }

    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Address of the full remote log file.
    #[must_use]
    pub fn download_url(&self) -> String {
        self.endpoints.download_url()
    }

    /// Empty the local view only. The remote log is untouched.
    pub fn clear_view(&mut self) {
        self.buffer.clear();
    }

    /// Wipe the remote log, then the local view. On failure the local
    /// buffer is left exactly as it was.
    ///
    /// Stream messages arriving meanwhile stay queued and are applied by the
    /// next `pump`, after the clear.
    pub async fn truncate(&mut self) -> Result<(), CommandError> {
        let commands = Arc::clone(&self.commands);
        let result = commands.truncate().await;
        self.finish_truncate(&result);
        result
    }

    /// Start a truncate in the background. Its outcome is reported by a later
    /// `pump` or `wait`. Fails with `Busy` while one is already running.
    pub fn request_truncate(&mut self) -> Result<(), CommandError> {
        if self.truncate_in_flight {
            return Err(CommandError::Busy);
        }
        self.truncate_in_flight = true;

        let commands = Arc::clone(&self.commands);
        let tx = self.truncate_tx.clone();
        tokio::spawn(async move {
            let result = commands.truncate().await;
            let _ = tx.send(result);
        });
        Ok(())
    }

    #[must_use]
    pub fn truncate_in_flight(&self) -> bool {
        self.truncate_in_flight
    }

    /// Apply everything that has arrived without waiting.
    pub fn pump(&mut self) -> Activity {
        let mut activity = Activity::default();
        while let Ok(result) = self.truncate_rx.try_recv() {
            self.apply_truncate(result, &mut activity);
        }
        activity.mutations += self.ingestor.pump(&mut self.buffer);
        activity
    }

    /// Wait until something arrives, then apply everything queued.
    pub async fn wait(&mut self) -> Activity {
        let woken = tokio::select! {
            biased;
            Some(result) = self.truncate_rx.recv() => Woken::Truncated(result),
            envelope = self.ingestor.recv() => Woken::Stream(envelope),
        };

        let mut activity = Activity::default();
        match woken {
            Woken::Stream(envelope) => {
                // A finished truncate clears before the line lands, never after.
                while let Ok(result) = self.truncate_rx.try_recv() {
                    self.apply_truncate(result, &mut activity);
                }
                activity.mutations += self.ingestor.apply(envelope, &mut self.buffer);
            }
            Woken::Truncated(result) => self.apply_truncate(result, &mut activity),
        }
        let rest = self.pump();
        activity.mutations += rest.mutations;
        activity.truncated.extend(rest.truncated);
        activity
    }

    pub fn search(&mut self, term: impl Into<String>) {
        self.search.commit(term);
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
    }

    #[must_use]
    pub fn search_state(&self) -> &SearchState {
        &self.search
    }

    /// Live search input editing; filtering only follows committed terms.
    pub fn search_state_mut(&mut self) -> &mut SearchState {
        &mut self.search
    }

    #[must_use]
    pub fn render_model(&self) -> RenderModel<'_> {
        let active_term = self.search.active_term();
        let entries = view(self.buffer.entries(), active_term);
        let matches = match_count(&entries);
        RenderModel {
            entries,
            connection: self.ingestor.status(),
            match_count: matches,
            active_term,
        }
    }

    fn apply_truncate(&mut self, result: Result<(), CommandError>, activity: &mut Activity) {
        self.truncate_in_flight = false;
        if self.finish_truncate(&result) {
            activity.mutations += 1;
        }
        activity.truncated.push(result);
    }

    fn finish_truncate(&mut self, result: &Result<(), CommandError>) -> bool {
        match result {
            Ok(()) => {
                let removed = self.buffer.len();
                self.buffer.clear();
                info!(removed, "local view cleared after remote truncate");
                true
            }
            Err(err) => {
                warn!(error = %err, "truncate failed; local view kept");
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::mock::{MockCommandClient, MockTransport};

    fn endpoints() -> Endpoints {
        Endpoints::new("http://ctl.test", "/api/logs/tail", "/api/logs/truncate", "/api/logs/download")
    }

    fn session(transport: Arc<MockTransport>, commands: Arc<MockCommandClient>) -> Session {
        Session::new(endpoints(), 100, transport, commands)
    }

    async fn fill(session: &mut Session, len: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while session.buffer().len() < len {
                session.wait().await;
            }
        })
        .await
        .expect("lines arrived");
    }

    #[tokio::test]
    async fn enter_subscribes_to_tail_url_once() {
        let transport = Arc::new(MockTransport::new());
        let stream = transport.push_stream();
        let mut session = session(transport.clone(), Arc::new(MockCommandClient::new()));

        assert!(session.on_enter());
        assert!(!session.on_enter());
        stream.send_line("x");
        fill(&mut session, 1).await;

        assert_eq!(
            transport.opened_urls(),
            vec!["http://ctl.test/api/logs/tail".to_owned()]
        );
        assert_eq!(session.connection_status(), ConnectionStatus::Connected);
        assert!(session.on_exit());
        assert_eq!(session.connection_status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn failed_truncate_keeps_buffer() {
        let transport = Arc::new(MockTransport::new());
        let stream = transport.push_stream();
        let commands = Arc::new(MockCommandClient::new().with_result(Err(
            CommandError::Rejected {
                url: "http://ctl.test/api/logs/truncate".into(),
                status: 500,
                detail: "error wiping log file".into(),
            },
        )));
        let mut session = session(transport, commands.clone());
        session.on_enter();
        for line in ["a", "b", "c"] {
            stream.send_line(line);
        }
        fill(&mut session, 3).await;

        let result = session.truncate().await;
        assert!(matches!(result, Err(CommandError::Rejected { status: 500, .. })));
        assert_eq!(session.buffer().len(), 3);
        assert_eq!(commands.truncate_calls(), 1);
    }

    #[tokio::test]
    async fn successful_truncate_empties_buffer() {
        let transport = Arc::new(MockTransport::new());
        let stream = transport.push_stream();
        let mut session = session(transport, Arc::new(MockCommandClient::new()));
        session.on_enter();
        stream.send_line("a");
        stream.send_line("b");
        fill(&mut session, 2).await;

        session.truncate().await.unwrap();
        assert_eq!(session.buffer().len(), 0);
        assert!(session.is_subscribed());
    }

    #[tokio::test]
    async fn background_truncate_reports_outcome_and_stream_continues() {
        let transport = Arc::new(MockTransport::new());
        let stream = transport.push_stream();
        let commands = Arc::new(MockCommandClient::new());
        let mut session = session(transport, commands.clone());
        session.on_enter();
        stream.send_line("old");
        fill(&mut session, 1).await;

        let release = commands.hold_next();
        session.request_truncate().unwrap();
        assert_eq!(session.request_truncate(), Err(CommandError::Busy));

        stream.send_line("new");
        let mut outcomes = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), async {
            while session.buffer().len() < 2 {
                outcomes.extend(session.wait().await.truncated);
            }
            release.send(()).unwrap();
            while outcomes.is_empty() {
                outcomes.extend(session.wait().await.truncated);
            }
        })
        .await
        .expect("truncate finished");

        assert_eq!(outcomes, vec![Ok(())]);
        assert!(session.buffer().is_empty());
        assert!(!session.truncate_in_flight());

        stream.send_line("after");
        fill(&mut session, 1).await;
        let raws: Vec<_> = session.buffer().entries().map(|e| e.raw.clone()).collect();
        assert_eq!(raws, vec!["after"]);
    }

    #[tokio::test]
    async fn line_queued_with_truncate_result_survives_the_clear() {
        for _ in 0..50 {
            let transport = Arc::new(MockTransport::new());
            let stream = transport.push_stream();
            let mut session = session(transport, Arc::new(MockCommandClient::new()));
            session.on_enter();
            stream.send_line("old");
            fill(&mut session, 1).await;

            session.request_truncate().unwrap();
            // Let the truncate task finish so its result is queued.
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            stream.send_line("post");
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }

            let activity = tokio::time::timeout(Duration::from_secs(5), session.wait())
                .await
                .expect("activity");
            let mut outcomes = activity.truncated;
            tokio::time::timeout(Duration::from_secs(5), async {
                while outcomes.is_empty() || session.buffer().is_empty() {
                    let more = session.wait().await;
                    outcomes.extend(more.truncated);
                }
            })
            .await
            .expect("truncate and line applied");

            assert_eq!(outcomes, vec![Ok(())]);
            let raws: Vec<_> = session.buffer().entries().map(|e| e.raw.clone()).collect();
            assert_eq!(raws, vec!["post"]);
        }
    }

    #[tokio::test]
    async fn clear_view_never_calls_remote() {
        let transport = Arc::new(MockTransport::new());
        let stream = transport.push_stream();
        let commands = Arc::new(MockCommandClient::new());
        let mut session = session(transport, commands.clone());
        session.on_enter();
        stream.send_line("a");
        fill(&mut session, 1).await;

        session.clear_view();
        assert!(session.buffer().is_empty());
        assert_eq!(commands.truncate_calls(), 0);
    }

    #[tokio::test]
    async fn render_model_marks_matches_without_hiding() {
        let transport = Arc::new(MockTransport::new());
        let stream = transport.push_stream();
        let mut session = session(transport, Arc::new(MockCommandClient::new()));
        session.on_enter();
        stream.send_line("2025-11-25T09:58:59Z ERR disk full");
        stream.send_line("2025-11-25T09:59:00Z INF ok");
        stream.send_line("plain line");
        fill(&mut session, 3).await;

        session.search("err");
        let model = session.render_model();
        assert_eq!(model.entries.len(), 3);
        assert_eq!(model.match_count, 1);
        assert!(model.entries[0].is_match);
        assert_eq!(model.active_term, "err");

        session.clear_search();
        let model = session.render_model();
        assert_eq!(model.match_count, 0);
        assert!(model.entries.iter().all(|e| !e.is_match));
        assert_eq!(model.entries.len(), 3);
    }

    #[test]
    fn download_url_comes_from_endpoints() {
        let session = session(
            Arc::new(MockTransport::new()),
            Arc::new(MockCommandClient::new()),
        );
        assert_eq!(session.download_url(), "http://ctl.test/api/logs/download");
    }
}
