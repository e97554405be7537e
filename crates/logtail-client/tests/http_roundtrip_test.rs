#![allow(clippy::expect_used, clippy::unwrap_used)]

//! End-to-end checks against a minimal HTTP/1.1 control server on loopback.

use std::sync::Arc;
use std::time::Duration;

use logtail_client::{
    CommandError, ConnectionStatus, Endpoints, HttpCommandClient, HttpTransport, LogCommands,
    Session,
};
use logtail_core::config::ServerConfig;
use logtail_core::LogLevel;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

#[derive(Clone)]
enum Reply {
    /// Stream these SSE frames, then hold the connection open.
    EventStream(Vec<String>),
    Json(u16, String),
    Body(u16, Vec<u8>),
}

/// Serve `replies` to consecutive connections; reports each request line.
async fn serve(replies: Vec<Reply>) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for reply in replies {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request_line = read_request(&mut socket).await;
            let _ = seen_tx.send(request_line);
            tokio::spawn(async move { respond(socket, reply).await });
        }
    });
    (base, seen_rx)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut chunk = [0_u8; 1024];
    while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..n]);
    }
    let text = String::from_utf8_lossy(&raw).into_owned();
    text.lines().next().unwrap_or_default().to_owned()
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

async fn respond(mut socket: TcpStream, reply: Reply) {
    match reply {
        Reply::EventStream(frames) => {
            let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncache-control: no-cache\r\nconnection: close\r\n\r\n";
            socket.write_all(head.as_bytes()).await.unwrap();
            for frame in frames {
                socket.write_all(frame.as_bytes()).await.unwrap();
                socket.flush().await.unwrap();
            }
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Reply::Json(status, body) => {
            write_body(&mut socket, status, "application/json", body.as_bytes()).await;
        }
        Reply::Body(status, body) => {
            write_body(&mut socket, status, "text/plain", &body).await;
        }
    }
}

async fn write_body(socket: &mut TcpStream, status: u16, content_type: &str, body: &[u8]) {
    let head = format!(
        "HTTP/1.1 {status} {}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        status_text(status),
        body.len()
    );
    socket.write_all(head.as_bytes()).await.unwrap();
    socket.write_all(body).await.unwrap();
    socket.flush().await.unwrap();
}

/// One log line framed the way the control server writes it: the payload
/// keeps its trailing newline, so it spans two `data:` lines.
fn log_frame(line: &str) -> String {
    format!("event:log\ndata:{line}\ndata:\n\n")
}

fn server_config(base: &str) -> ServerConfig {
    ServerConfig {
        base_url: base.to_owned(),
        ..ServerConfig::default()
    }
}

#[tokio::test]
async fn tail_stream_feeds_session_over_http() {
    let (base, mut seen) = serve(vec![Reply::EventStream(vec![
        log_frame("2025-11-25T09:58:59Z DBG hello world"),
        ": keep-alive\n\n".to_owned(),
        log_frame("plain line"),
    ])])
    .await;
    let server = server_config(&base);
    let endpoints = Endpoints::from_config(&server);
    let transport = Arc::new(HttpTransport::new(server.connect_timeout()).unwrap());
    let commands = Arc::new(HttpCommandClient::new(endpoints.clone(), &server).unwrap());
    let mut session = Session::new(endpoints, 50, transport, commands);

    session.on_enter();
    tokio::time::timeout(Duration::from_secs(10), async {
        while session.buffer().len() < 2 {
            session.wait().await;
        }
    })
    .await
    .expect("both lines arrived");

    assert_eq!(seen.recv().await.unwrap(), "GET /api/logs/tail HTTP/1.1");
    assert_eq!(session.connection_status(), ConnectionStatus::Connected);

    let entries = session.buffer().snapshot();
    assert_eq!(entries[0].timestamp.as_deref(), Some("2025-11-25T09:58:59Z"));
    assert_eq!(entries[0].level, Some(LogLevel::Debug));
    assert_eq!(entries[0].message, "hello world");
    assert_eq!(entries[1].raw, "plain line");
    assert_eq!(entries[1].level, None);
}

#[tokio::test]
async fn server_error_event_disconnects_with_synthetic_line() {
    let (base, _seen) = serve(vec![Reply::EventStream(vec![
        log_frame("first"),
        "event:error\ndata:error opening log file\n\n".to_owned(),
    ])])
    .await;
    let server = server_config(&base);
    let endpoints = Endpoints::from_config(&server);
    let tail_url = endpoints.tail_url();
    let transport = Arc::new(HttpTransport::new(server.connect_timeout()).unwrap());
    let commands = Arc::new(HttpCommandClient::new(endpoints.clone(), &server).unwrap());
    let mut session = Session::new(endpoints, 50, transport, commands);

    session.on_enter();
    tokio::time::timeout(Duration::from_secs(10), async {
        while session.is_subscribed() {
            session.wait().await;
        }
    })
    .await
    .expect("stream failed");

    let raws: Vec<_> = session.buffer().entries().map(|e| e.raw.clone()).collect();
    assert_eq!(
        raws,
        vec![
            "first".to_owned(),
            format!("Error: Connection to {tail_url} failed.")
        ]
    );
    assert_eq!(session.connection_status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn missing_tail_endpoint_is_a_failed_open() {
    let (base, _seen) = serve(vec![Reply::Body(404, b"404 page not found".to_vec())]).await;
    let server = server_config(&base);
    let endpoints = Endpoints::from_config(&server);
    let transport = Arc::new(HttpTransport::new(server.connect_timeout()).unwrap());
    let commands = Arc::new(HttpCommandClient::new(endpoints.clone(), &server).unwrap());
    let mut session = Session::new(endpoints, 50, transport, commands);

    session.on_enter();
    let activity = tokio::time::timeout(Duration::from_secs(10), session.wait())
        .await
        .expect("open failed");
    assert_eq!(activity.mutations, 1);
    assert_eq!(session.connection_status(), ConnectionStatus::Disconnected);
    assert!(!session.is_subscribed());
}

#[tokio::test]
async fn truncate_posts_and_reports_server_error() {
    let (base, mut seen) = serve(vec![
        Reply::Json(
            500,
            r#"{"error":"error wiping log file: permission denied"}"#.to_owned(),
        ),
        Reply::Json(200, r#"{"message":"log file wiped"}"#.to_owned()),
    ])
    .await;
    let server = server_config(&base);
    let client = HttpCommandClient::new(Endpoints::from_config(&server), &server).unwrap();

    let err = client.truncate().await.unwrap_err();
    assert_eq!(
        err,
        CommandError::Rejected {
            url: format!("{base}/api/logs/truncate"),
            status: 500,
            detail: "error wiping log file: permission denied".to_owned(),
        }
    );
    assert_eq!(seen.recv().await.unwrap(), "POST /api/logs/truncate HTTP/1.1");

    client.truncate().await.unwrap();
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let server = server_config(&base);
    let client = HttpCommandClient::new(Endpoints::from_config(&server), &server).unwrap();
    let err = client.truncate().await.unwrap_err();
    assert!(matches!(err, CommandError::Transport { .. }), "{err:?}");
}

#[tokio::test]
async fn download_writes_remote_file() {
    let body = b"line one\nline two\n".to_vec();
    let (base, mut seen) = serve(vec![Reply::Body(200, body.clone())]).await;
    let server = server_config(&base);
    let client = HttpCommandClient::new(Endpoints::from_config(&server), &server).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("remote.log");
    let written = client.download_to(&path).await.unwrap();

    assert_eq!(written, body.len() as u64);
    assert_eq!(std::fs::read(&path).unwrap(), body);
    assert_eq!(seen.recv().await.unwrap(), "GET /api/logs/download HTTP/1.1");
}

#[tokio::test]
async fn failed_download_leaves_no_file() {
    let (base, _seen) = serve(vec![Reply::Json(
        500,
        r#"{"error":"error opening log file"}"#.to_owned(),
    )])
    .await;
    let server = server_config(&base);
    let client = HttpCommandClient::new(Endpoints::from_config(&server), &server).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("remote.log");
    let err = client.download_to(&path).await.unwrap_err();
    assert!(matches!(err, CommandError::Rejected { status: 500, .. }));
    assert!(!path.exists());
}
