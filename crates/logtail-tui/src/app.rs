//! The interactive log view: session state, follow logic, and drawing.
//!
//! `LogsView` owns the `Session` and is the only place that mutates it. The
//! runtime feeds it three kinds of input: terminal events (`update`), session
//! activity (`apply_activity`), and timer wake-ups (`tick`). After any of
//! them the view is redrawn from `render`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use logtail_client::{Activity, CommandError, ConnectionStatus, Session};
use logtail_core::config::UiConfig;
use logtail_core::{
    ChangeCounter, ScrollConfig, ScrollFollowController, ScrollMode, WheelDirection,
};
use tracing::debug;

use crate::input::{translate_input, InputEvent, InputMode, MouseWheelDirection, UiAction};
use crate::notify::{Notifier, StatusKind};
use crate::render::{level_role, FrameSize, RenderFrame, TextRole};
use crate::viewport::Viewport;

/// Second `T` press must land inside this window to wipe the remote log.
pub const TRUNCATE_CONFIRM_WINDOW: Duration = Duration::from_secs(3);

pub const EMPTY_STATE_TEXT: &str = "No logs yet. Waiting for log events...";
pub const TRUNCATE_OK_TEXT: &str = "Logs wiped successfully.";
pub const TRUNCATE_FAILED_TEXT: &str = "Failed to truncate logs";

const HELP_TEXT: &str = "q quit  / search  g/G top/bottom  c clear view  T truncate  d download";

/// Side effect requested by `update`, carried out by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    None,
    Quit,
    Truncate,
}

pub struct LogsView {
    session: Session,
    controller: ScrollFollowController,
    changes: Arc<ChangeCounter>,
    viewport: Viewport,
    notifier: Notifier,
    mode: InputMode,
    wheel_step: usize,
    size: FrameSize,
    confirm_truncate_until: Option<Instant>,
    quitting: bool,
}

impl std::fmt::Debug for LogsView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogsView")
            .field("session", &self.session)
            .field("mode", &self.controller.mode())
            .field("viewport", &self.viewport)
            .field("input_mode", &self.mode)
            .finish()
    }
}

impl LogsView {
    pub fn new(mut session: Session, scroll: ScrollConfig, ui: &UiConfig) -> Self {
        let changes = Arc::new(ChangeCounter::new());
        session.subscribe(changes.clone());
        Self {
            session,
            controller: ScrollFollowController::new(scroll),
            changes,
            viewport: Viewport::new(0),
            notifier: Notifier::new(Duration::from_millis(ui.notification_ms)),
            mode: InputMode::Normal,
            wheel_step: ui.wheel_step.max(1),
            size: FrameSize::default(),
            confirm_truncate_until: None,
            quitting: false,
        }
    }

    /// View mounted: start streaming.
    pub fn enter(&mut self) {
        self.session.on_enter();
    }

    /// View unmounted: stop streaming and cancel every pending timer.
    pub fn exit(&mut self) {
        self.session.on_exit();
        self.controller.teardown();
        self.viewport.stop_animation();
        self.confirm_truncate_until = None;
        self.notifier.clear();
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    #[must_use]
    pub fn scroll_mode(&self) -> ScrollMode {
        self.controller.mode()
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    #[must_use]
    pub fn input_mode(&self) -> InputMode {
        self.mode
    }

    #[must_use]
    pub fn quitting(&self) -> bool {
        self.quitting
    }

    /// Earliest instant at which `tick` has work to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.controller.next_deadline(),
            self.viewport.next_deadline(),
            self.notifier.next_deadline(),
            self.confirm_truncate_until,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Fold in what the session applied. Returns true when a redraw is due.
    pub fn apply_activity(&mut self, activity: Activity, now: Instant) -> bool {
        let dirty = !activity.is_empty();
        for outcome in activity.truncated {
            self.report_truncate(outcome, now);
        }
        self.sync_content(now);
        dirty
    }

    /// Fire due timers. Returns true when a redraw is due.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut dirty = self.viewport.animate(now);
        self.forward_scroll_signals(now);

        let before = self.controller.mode();
        self.controller.poll(now, self.viewport.geometry());
        dirty |= before != self.controller.mode();

        dirty |= self.notifier.expire(now);
        if self.confirm_truncate_until.is_some_and(|until| until <= now) {
            self.confirm_truncate_until = None;
            dirty = true;
        }
        dirty
    }

    pub fn update(&mut self, event: InputEvent, now: Instant) -> Command {
        match translate_input(&event, self.mode) {
            UiAction::Noop => {}
            UiAction::Quit => {
                self.quitting = true;
                return Command::Quit;
            }
            UiAction::BeginSearch => {
                let active = self.session.search_state().active_term().to_owned();
                self.session.search_state_mut().set_term(active);
                self.mode = InputMode::Search;
            }
            UiAction::SearchInput(ch) => self.session.search_state_mut().push_char(ch),
            UiAction::SearchBackspace => self.session.search_state_mut().pop_char(),
            UiAction::CommitSearch => {
                self.session.search_state_mut().commit_current();
                self.mode = InputMode::Normal;
            }
            UiAction::ClearSearch => {
                self.session.clear_search();
                self.mode = InputMode::Normal;
            }
            UiAction::ScrollToTop => {
                let command = self.controller.scroll_to_top(now);
                self.viewport.execute(command, now);
                self.forward_scroll_signals(now);
            }
            UiAction::ScrollToBottom => {
                let command = self.controller.scroll_to_bottom(now);
                self.viewport.execute(command, now);
                self.forward_scroll_signals(now);
            }
            UiAction::LineUp => self.key_scroll(-1, now),
            UiAction::LineDown => self.key_scroll(1, now),
            UiAction::PageUp => self.key_scroll(-self.page_rows(), now),
            UiAction::PageDown => self.key_scroll(self.page_rows(), now),
            UiAction::Wheel(direction) => self.wheel(direction, now),
            UiAction::ClearView => {
                self.session.clear_view();
                self.sync_content(now);
            }
            UiAction::Truncate => {
                if self.confirm_truncate_until.is_some_and(|until| now < until) {
                    self.confirm_truncate_until = None;
                    return Command::Truncate;
                }
                self.confirm_truncate_until = Some(now + TRUNCATE_CONFIRM_WINDOW);
                self.notifier.show(
                    StatusKind::Info,
                    "Press T again to wipe the remote log file.",
                    now,
                );
            }
            UiAction::ShowDownload => {
                let url = self.session.download_url();
                self.notifier
                    .show(StatusKind::Info, format!("Download: {url}"), now);
            }
            UiAction::Resize { width, height } => self.resize(width, height, now),
        }
        Command::None
    }

    /// Carry out a command returned by `update`.
    pub fn dispatch(&mut self, command: Command, now: Instant) {
        match command {
            Command::None | Command::Quit => {}
            Command::Truncate => match self.session.request_truncate() {
                Ok(()) => {
                    self.notifier
                        .show(StatusKind::Info, "Wiping remote log file...", now);
                }
                Err(err) => self.report_truncate(Err(err), now),
            },
        }
    }

    #[must_use]
    pub fn render(&self) -> RenderFrame {
        let mut frame = RenderFrame::new(self.size);
        if self.size.height == 0 {
            return frame;
        }
        let model = self.session.render_model();

        self.render_header(&mut frame, model.connection, model.match_count);

        let body_top = 1;
        let body_height = self.viewport.viewport_height();
        if model.entries.is_empty() {
            if body_height > 0 {
                let row = body_top + body_height / 2;
                let text_width = EMPTY_STATE_TEXT.chars().count();
                let x = self.size.width.saturating_sub(text_width) / 2;
                frame.draw_text(x, row, EMPTY_STATE_TEXT, TextRole::Muted);
            }
        } else {
            let visible = model
                .entries
                .get(self.viewport.visible_range())
                .unwrap_or_default();
            for (row, item) in visible.iter().enumerate() {
                let y = body_top + row;
                let entry = item.entry;
                let marked = item.is_match;
                match (&entry.timestamp, entry.level) {
                    (Some(timestamp), Some(level)) => {
                        let x = frame.draw_marked(0, y, timestamp, TextRole::Muted, marked);
                        let x = frame.draw_marked(x, y, " ", TextRole::Primary, marked);
                        let x = frame.draw_marked(x, y, level.as_str(), level_role(level), marked);
                        let x = frame.draw_marked(x, y, " ", TextRole::Primary, marked);
                        frame.draw_marked(x, y, &entry.message, TextRole::Primary, marked);
                    }
                    _ => {
                        frame.draw_marked(0, y, &entry.raw, TextRole::Primary, marked);
                    }
                }
            }
        }

        if self.size.height > 1 {
            self.render_footer(&mut frame, self.size.height - 1);
        }
        frame
    }

    fn render_header(&self, frame: &mut RenderFrame, connection: ConnectionStatus, matches: usize) {
        let mut x = frame.draw_text(0, 0, " Logs ", TextRole::Accent);
        let (dot, role) = match connection {
            ConnectionStatus::Connected => ('●', TextRole::Success),
            ConnectionStatus::Disconnected => ('○', TextRole::Danger),
        };
        x = frame.draw_text(x, 0, &format!(" {dot} {}", connection.label()), role);
        x = if self.controller.is_following() {
            frame.draw_text(x, 0, "  Auto-scroll: ON", TextRole::Success)
        } else {
            frame.draw_text(x, 0, "  Auto-scroll: OFF", TextRole::Warning)
        };

        let buffer = self.session.buffer();
        x = frame.draw_text(
            x,
            0,
            &format!("  {}/{} lines", buffer.len(), buffer.capacity()),
            TextRole::Muted,
        );
        if buffer.evicted_total() > 0 {
            x = frame.draw_text(
                x,
                0,
                &format!(", {} dropped", buffer.evicted_total()),
                TextRole::Muted,
            );
        }

        let search = self.session.search_state();
        if search.is_active() {
            let label = if matches == 1 { "match" } else { "matches" };
            x = frame.draw_text(
                x,
                0,
                &format!("  {matches} {label} for \"{}\"", search.active_term()),
                TextRole::Info,
            );
        }
        if self.mode == InputMode::Search {
            frame.draw_text(x, 0, &format!("  /{}_", search.term()), TextRole::Accent);
        }
    }

    fn render_footer(&self, frame: &mut RenderFrame, y: usize) {
        if let Some(note) = self.notifier.current() {
            let role = match note.kind {
                StatusKind::Info => TextRole::Info,
                StatusKind::Ok => TextRole::Success,
                StatusKind::Err => TextRole::Danger,
            };
            frame.draw_text(1, y, &note.text, role);
            return;
        }
        frame.draw_text(1, y, HELP_TEXT, TextRole::Muted);
    }

    fn resize(&mut self, width: usize, height: usize, now: Instant) {
        self.size = FrameSize { width, height };
        self.viewport.set_viewport_height(height.saturating_sub(2));
        // A layout change moves the bottom the same way new content does.
        if let Some(command) = self.controller.on_buffer_changed(now) {
            self.viewport.execute(command, now);
        }
        self.forward_scroll_signals(now);
    }

    fn page_rows(&self) -> isize {
        isize::try_from(self.viewport.viewport_height().saturating_sub(1).max(1))
            .unwrap_or(isize::MAX)
    }

    /// Keyboard scrolling. Moving up is unambiguous user intent.
    fn key_scroll(&mut self, rows: isize, now: Instant) {
        if rows < 0 {
            self.controller.pause();
            self.viewport.scroll_by(rows);
        } else {
            self.viewport.scroll_by(rows);
            self.controller
                .on_wheel(WheelDirection::Down, self.viewport.geometry(), now);
        }
        self.forward_scroll_signals(now);
    }

    fn wheel(&mut self, direction: MouseWheelDirection, now: Instant) {
        let step = isize::try_from(self.wheel_step).unwrap_or(isize::MAX);
        let (rows, direction) = match direction {
            MouseWheelDirection::Up => (-step, WheelDirection::Up),
            MouseWheelDirection::Down => (step, WheelDirection::Down),
        };
        self.viewport.scroll_by(rows);
        self.controller
            .on_wheel(direction, self.viewport.geometry(), now);
        self.forward_scroll_signals(now);
    }

    /// Bring the viewport in line with the buffer after mutations and let
    /// the controller react.
    fn sync_content(&mut self, now: Instant) {
        if self.changes.take() == 0 {
            return;
        }
        self.viewport
            .set_content_height(self.session.buffer().len());
        if let Some(command) = self.controller.on_buffer_changed(now) {
            self.viewport.execute(command, now);
        }
        self.forward_scroll_signals(now);
    }

    fn forward_scroll_signals(&mut self, now: Instant) {
        let signals = self.viewport.take_signals();
        if signals > 0 {
            debug!(signals, offset = self.viewport.offset(), "scroll signal");
            self.controller.on_scroll(now);
        }
    }

    fn report_truncate(&mut self, outcome: Result<(), CommandError>, now: Instant) {
        match outcome {
            Ok(()) => self
                .notifier
                .show(StatusKind::Ok, TRUNCATE_OK_TEXT, now),
            Err(CommandError::Busy) => self.notifier.show(
                StatusKind::Info,
                "A truncate request is already running.",
                now,
            ),
            Err(err) => self.notifier.show(
                StatusKind::Err,
                format!("{TRUNCATE_FAILED_TEXT}: {}", err.summary()),
                now,
            ),
        }
    }
}
