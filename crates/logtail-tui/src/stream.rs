//! Plain line output when stdout is not a terminal.

use std::io::Write;

use anyhow::{bail, Context};
use logtail_client::Session;
use logtail_core::LogBuffer;

/// Writes entries the reader has not seen yet, oldest first.
#[derive(Debug, Default)]
pub struct LinePrinter {
    next_sequence: u64,
}

impl LinePrinter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Print every entry appended since the previous call. Returns the number
    /// of lines written.
    pub fn print_new<W: Write>(&mut self, buffer: &LogBuffer, out: &mut W) -> std::io::Result<usize> {
        let mut written = 0;
        for entry in buffer.entries() {
            if entry.sequence < self.next_sequence {
                continue;
            }
            writeln!(out, "{}", entry.raw)?;
            self.next_sequence = entry.sequence.saturating_add(1);
            written += 1;
        }
        if written > 0 {
            out.flush()?;
        }
        Ok(written)
    }
}

/// Stream raw lines to `out` until the subscription ends.
///
/// A dropped stream is an error after its failure line has been printed.
pub async fn stream_lines<W: Write>(session: &mut Session, out: &mut W) -> anyhow::Result<()> {
    let mut printer = LinePrinter::new();
    session.on_enter();
    loop {
        let _ = session.wait().await;
        printer
            .print_new(session.buffer(), out)
            .context("write log lines")?;
        if !session.is_subscribed() {
            bail!("log stream from {} ended", session.endpoints().tail_url());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_each_entry_once() {
        let mut buffer = LogBuffer::new(10);
        let mut printer = LinePrinter::new();
        let mut out = Vec::new();

        buffer.append("a\n");
        buffer.append("b");
        assert_eq!(printer.print_new(&buffer, &mut out).ok(), Some(2));
        buffer.append("c");
        assert_eq!(printer.print_new(&buffer, &mut out).ok(), Some(1));
        assert_eq!(printer.print_new(&buffer, &mut out).ok(), Some(0));

        assert_eq!(String::from_utf8_lossy(&out), "a\nb\nc\n");
    }

    #[test]
    fn lines_evicted_before_printing_are_skipped() {
        let mut buffer = LogBuffer::new(2);
        let mut printer = LinePrinter::new();
        let mut out = Vec::new();
        for line in ["1", "2", "3"] {
            buffer.append(line);
        }
        assert_eq!(printer.print_new(&buffer, &mut out).ok(), Some(2));
        assert_eq!(String::from_utf8_lossy(&out), "2\n3\n");
    }

    #[test]
    fn clear_does_not_reprint() {
        let mut buffer = LogBuffer::new(4);
        let mut printer = LinePrinter::new();
        let mut out = Vec::new();
        buffer.append("x");
        let _ = printer.print_new(&buffer, &mut out);
        buffer.clear();
        buffer.append("y");
        let _ = printer.print_new(&buffer, &mut out);
        assert_eq!(String::from_utf8_lossy(&out), "x\ny\n");
    }
}
