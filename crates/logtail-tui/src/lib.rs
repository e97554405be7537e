//! logtail-tui: terminal front end for the log tailing client.
//!
//! `app::LogsView` is the rendering surface around a `logtail_client::Session`;
//! `runtime` drives it on a crossterm terminal, and `stream` is the plain
//! output used when stdout is not a terminal.

pub mod app;
pub mod input;
pub mod logging;
pub mod notify;
pub mod render;
pub mod runtime;
pub mod stream;
pub mod viewport;

/// Stable crate label used for bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "logtail-tui"
}
