//! logtail-client: live log stream subscription and remote log commands.
//!
//! Provides:
//! - `StreamIngestor`: one server-sent event subscription feeding a `LogBuffer`
//! - `LogCommands`: remote truncate (and download) against the control server
//! - `Session`: the single owned state container tying both to one view
//!
//! Transports sit behind the `LogTransport` and `LogCommands` traits with
//! reqwest-backed implementations and in-memory mocks for tests.

pub mod command;
pub mod endpoints;
pub mod error;
pub mod ingestor;
pub mod mock;
pub mod session;
pub mod sse;
pub mod transport;

pub use command::{HttpCommandClient, LogCommands};
pub use endpoints::Endpoints;
pub use error::{CommandError, TransportError};
pub use ingestor::{ConnectionStatus, StreamIngestor};
pub use session::{Activity, RenderModel, Session};
pub use transport::{EventStream, HttpTransport, LogTransport, StreamEvent};

/// Stable crate label used for bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "logtail-client"
}
