//! Terminal event loop for the interactive view.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture, EventStream};
use crossterm::style::{
    Attribute, Color, Print, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use futures::StreamExt;
use tracing::info;

use crate::app::LogsView;
use crate::input::{map_terminal_event, InputEvent};
use crate::render::{CellStyle, RenderFrame, TermColor};

/// Upper bound on how long the loop sleeps without a pending timer.
const IDLE_WAKE: Duration = Duration::from_secs(1);

/// Run `view` on the terminal until the user quits.
pub async fn run(view: &mut LogsView) -> anyhow::Result<()> {
    let mut terminal = TerminalSession::enter().context("enter terminal mode")?;
    let (width, height) = terminal::size().context("read terminal size")?;
    let _ = view.update(
        InputEvent::Resize {
            width: usize::from(width),
            height: usize::from(height),
        },
        Instant::now(),
    );
    view.enter();
    info!("interactive view started");

    let result = event_loop(view, &mut terminal.stdout).await;
    view.exit();
    info!("interactive view stopped");
    result
}

async fn event_loop<W: Write>(view: &mut LogsView, out: &mut W) -> anyhow::Result<()> {
    let mut events = EventStream::new();
    let mut dirty = true;

    loop {
        if dirty {
            render_frame(out, &view.render()).context("render frame")?;
            dirty = false;
        }
        if view.quitting() {
            return Ok(());
        }

        let wake_at = view
            .next_deadline()
            .unwrap_or_else(|| Instant::now() + IDLE_WAKE);
        let sleep = tokio::time::sleep_until(tokio::time::Instant::from_std(wake_at));

        tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(event)) => {
                    if let Some(input) = map_terminal_event(event) {
                        let now = Instant::now();
                        let command = view.update(input, now);
                        view.dispatch(command, now);
                        dirty = true;
                    }
                }
                Some(Err(err)) => return Err(err).context("read terminal event"),
                None => return Ok(()),
            },
            activity = view.session_mut().wait() => {
                dirty |= view.apply_activity(activity, Instant::now());
            }
            () = sleep => {
                dirty |= view.tick(Instant::now());
            }
        }
    }
}

pub fn render_frame<W: Write>(out: &mut W, frame: &RenderFrame) -> io::Result<()> {
    queue!(out, MoveTo(0, 0))?;
    let size = frame.size();

    for y in 0..size.height {
        queue!(out, MoveTo(0, to_u16(y)))?;
        let mut style = None;
        for x in 0..size.width {
            if let Some(cell) = frame.cell(x, y) {
                if style != Some(cell.style) {
                    queue_style(out, cell.style)?;
                    style = Some(cell.style);
                }
                queue!(out, Print(cell.glyph))?;
            }
        }
    }

    queue!(out, SetAttribute(Attribute::Reset))?;
    out.flush()
}

fn term_color_to_crossterm(color: TermColor) -> Color {
    match color {
        TermColor::Default => Color::Reset,
        TermColor::Ansi256(idx) => Color::AnsiValue(idx),
        TermColor::Rgb(r, g, b) => Color::Rgb { r, g, b },
    }
}

fn queue_style<W: Write>(out: &mut W, style: CellStyle) -> io::Result<()> {
    queue!(
        out,
        SetAttribute(Attribute::Reset),
        SetForegroundColor(term_color_to_crossterm(style.fg)),
        SetBackgroundColor(term_color_to_crossterm(style.bg)),
    )?;
    if style.bold {
        queue!(out, SetAttribute(Attribute::Bold))?;
    } else if style.dim {
        queue!(out, SetAttribute(Attribute::Dim))?;
    }
    if style.reverse {
        queue!(out, SetAttribute(Attribute::Reverse))?;
    }
    Ok(())
}

fn to_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

struct TerminalSession {
    stdout: io::Stdout,
}

impl TerminalSession {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableMouseCapture,
            Hide,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        Ok(Self { stdout })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = execute!(
            self.stdout,
            SetAttribute(Attribute::Reset),
            DisableMouseCapture,
            LeaveAlternateScreen,
            Show,
            MoveTo(0, 0)
        );
        let _ = terminal::disable_raw_mode();
    }
}
