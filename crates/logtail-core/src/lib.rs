//! logtail-core: synchronous state for the log tailing client.
//!
//! Everything in this crate is deterministic and free of I/O apart from
//! config file loading: line parsing, the bounded history buffer, search
//! decoration, and the scroll-follow state machine. Time is always passed in
//! by the caller so the async and terminal layers stay in control of clocks.

pub mod buffer;
pub mod config;
pub mod entry;
pub mod scroll;
pub mod search;

pub use buffer::{BufferChange, BufferObserver, ChangeCounter, LogBuffer, DEFAULT_CAPACITY};
pub use entry::{parse_line, LogEntry, LogLevel, ParsedLine};
pub use scroll::{
    ScrollBehavior, ScrollCommand, ScrollConfig, ScrollFollowController, ScrollGeometry,
    ScrollMode, WheelDirection,
};
pub use search::{match_count, view, SearchState, ViewEntry};

/// Stable crate label used for bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "logtail-core"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_label_is_stable() {
        assert_eq!(crate_label(), "logtail-core");
    }

    #[test]
    fn modules_are_accessible() {
        let _ = LogLevel::Info;
        let _ = ScrollMode::Follow;
        let _ = config::Config::default();
        let _ = SearchState::default();
        let _ = LogBuffer::new(DEFAULT_CAPACITY);
    }
}
