//! Log line model and best-effort structured parsing.
//!
//! Lines produced by the control server follow the zerolog console layout
//! `TIME LEVEL message`. Anything else is kept verbatim as an unstructured
//! entry; a line is never dropped because it failed to parse.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

const LINE_PATTERN: &str = r"^(.+?)\s+(TRC|DBG|INF|WRN|ERR|FTL|PNC)\s+(.*)";

/// Seven zerolog console level codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

impl LogLevel {
    pub const ALL: [LogLevel; 7] = [
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Fatal,
        Self::Panic,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRC",
            Self::Debug => "DBG",
            Self::Info => "INF",
            Self::Warn => "WRN",
            Self::Error => "ERR",
            Self::Fatal => "FTL",
            Self::Panic => "PNC",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| format!("unknown log level code {s:?}"))
    }
}

/// Structured fields extracted from one raw line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub timestamp: Option<String>,
    pub level: Option<LogLevel>,
    pub message: String,
}

impl ParsedLine {
    fn unstructured(raw: &str) -> Self {
        Self {
            timestamp: None,
            level: None,
            message: raw.to_owned(),
        }
    }
}

fn line_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(LINE_PATTERN).ok()).as_ref()
}

/// Split `raw` into timestamp, level and message.
///
/// The leading token is the shortest prefix followed by whitespace and a
/// level code. Lines without that shape come back with `message == raw`.
#[must_use]
pub fn parse_line(raw: &str) -> ParsedLine {
    let Some(pattern) = line_pattern() else {
        return ParsedLine::unstructured(raw);
    };
    let Some(caps) = pattern.captures(raw) else {
        return ParsedLine::unstructured(raw);
    };

    let level = caps.get(2).and_then(|m| m.as_str().parse::<LogLevel>().ok());
    match (caps.get(1), level) {
        (Some(timestamp), Some(level)) => ParsedLine {
            timestamp: Some(timestamp.as_str().to_owned()),
            level: Some(level),
            message: caps
                .get(3)
                .map_or_else(String::new, |m| m.as_str().to_owned()),
        },
        _ => ParsedLine::unstructured(raw),
    }
}

/// Strip transport line terminators (`\n`, `\r\n`) from the end of a payload.
#[must_use]
pub fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// One line of history as held by the buffer.
///
/// `sequence` is assigned at ingestion and only used for ordering and stable
/// render keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub sequence: u64,
    pub raw: String,
    pub timestamp: Option<String>,
    pub level: Option<LogLevel>,
    pub message: String,
}

impl LogEntry {
    /// Build an entry from a transport payload, parsing it once.
    #[must_use]
    pub fn parsed(sequence: u64, line: &str) -> Self {
        let raw = strip_line_ending(line);
        let ParsedLine {
            timestamp,
            level,
            message,
        } = parse_line(raw);
        Self {
            sequence,
            raw: raw.to_owned(),
            timestamp,
            level,
            message,
        }
    }

    /// Build an entry that skips parsing entirely (client-generated lines).
    #[must_use]
    pub fn synthetic(sequence: u64, line: &str) -> Self {
        Self {
            sequence,
            raw: line.to_owned(),
            timestamp: None,
            level: None,
            message: line.to_owned(),
        }
    }

    #[must_use]
    pub fn is_structured(&self) -> bool {
        self.level.is_some()
    }
}
