//! Error types for the stream subscription and remote commands.
//!
//! Both enums carry rendered messages instead of wrapping reqwest errors so
//! they stay `Clone` and comparable in tests.

/// The log stream could not be opened, or it dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connect {url}: {message}")]
    Connect { url: String, message: String },

    /// Server answered the subscription with a non-success status.
    #[error("{url} answered status {status}")]
    Status { url: String, status: u16 },

    /// Reading from an open stream failed.
    #[error("stream read: {message}")]
    Read { message: String },

    /// Server sent an `error` event before giving up on the stream.
    #[error("server reported: {message}")]
    Server { message: String },

    /// Server ended the stream.
    #[error("stream closed by server")]
    Closed,
}

/// A remote command failed. Nothing may be assumed to have happened remotely.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Request could not be sent or no response arrived.
    #[error("request {url}: {message}")]
    Transport { url: String, message: String },

    /// Server answered with a non-success status.
    #[error("{url} rejected with status {status}: {detail}")]
    Rejected {
        url: String,
        status: u16,
        detail: String,
    },

    /// Local file handling failed (downloads).
    #[error("write {path}: {message}")]
    Io { path: String, message: String },

    /// A truncate was requested while another one is still running.
    #[error("a truncate request is already in flight")]
    Busy,
}

impl CommandError {
    /// Short text for transient user notifications.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Transport { message, .. } => message.clone(),
            Self::Rejected { status, detail, .. } if detail.is_empty() => {
                format!("status {status}")
            }
            Self::Rejected { status, detail, .. } => format!("status {status}: {detail}"),
            Self::Io { message, .. } => message.clone(),
            Self::Busy => "already in progress".to_owned(),
        }
    }
}
