//! Row-based scroll surface for the log body.
//!
//! Every change of the offset, whether the user or the follow logic caused
//! it, is recorded as a scroll signal. The view forwards those signals to the
//! scroll-follow controller, which has to tell the two apart on its own.

use std::ops::Range;
use std::time::{Duration, Instant};

use logtail_core::{ScrollBehavior, ScrollCommand, ScrollGeometry};

/// Interval between smooth-scroll steps.
pub const SMOOTH_FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Default)]
pub struct Viewport {
    offset: usize,
    content_height: usize,
    viewport_height: usize,
    signals: usize,
    smooth_step_at: Option<Instant>,
}

impl Viewport {
    #[must_use]
    pub fn new(viewport_height: usize) -> Self {
        Self {
            viewport_height,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn geometry(&self) -> ScrollGeometry {
        ScrollGeometry {
            offset: self.offset,
            content_height: self.content_height,
            viewport_height: self.viewport_height,
        }
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn viewport_height(&self) -> usize {
        self.viewport_height
    }

    #[must_use]
    pub fn max_offset(&self) -> usize {
        self.content_height.saturating_sub(self.viewport_height)
    }

    #[must_use]
    pub fn is_at_bottom(&self) -> bool {
        self.offset >= self.max_offset()
    }

    /// Content rows currently on screen.
    #[must_use]
    pub fn visible_range(&self) -> Range<usize> {
        let end = self
            .offset
            .saturating_add(self.viewport_height)
            .min(self.content_height);
        self.offset.min(end)..end
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = height;
        self.clamp();
    }

    /// Content grew or shrank. A shrinking content clamps the offset.
    pub fn set_content_height(&mut self, height: usize) {
        self.content_height = height;
        self.clamp();
    }

    /// User scroll by `delta` rows; negative is towards the top.
    pub fn scroll_by(&mut self, delta: isize) -> bool {
        self.smooth_step_at = None;
        let target = if delta < 0 {
            self.offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.offset.saturating_add(delta.unsigned_abs())
        };
        self.set_offset(target)
    }

    /// Carry out a command from the scroll-follow controller.
    pub fn execute(&mut self, command: ScrollCommand, now: Instant) {
        match command {
            ScrollCommand::ToTop => {
                self.smooth_step_at = None;
                self.set_offset(0);
            }
            ScrollCommand::ToBottom {
                behavior: ScrollBehavior::Instant,
            } => {
                self.smooth_step_at = None;
                self.set_offset(self.max_offset());
            }
            ScrollCommand::ToBottom {
                behavior: ScrollBehavior::Smooth,
            } => {
                if !self.is_at_bottom() {
                    self.smooth_step_at = Some(now);
                }
            }
        }
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.smooth_step_at.is_some()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.smooth_step_at
    }

    /// Advance a running smooth scroll. Each step covers a quarter of the
    /// remaining distance, at least one row.
    pub fn animate(&mut self, now: Instant) -> bool {
        let Some(at) = self.smooth_step_at else {
            return false;
        };
        if now < at {
            return false;
        }
        let remaining = self.max_offset().saturating_sub(self.offset);
        let step = remaining.div_ceil(4).max(1);
        let moved = self.set_offset(self.offset.saturating_add(step));
        self.smooth_step_at = if self.is_at_bottom() {
            None
        } else {
            Some(now + SMOOTH_FRAME)
        };
        moved
    }

    pub fn stop_animation(&mut self) {
        self.smooth_step_at = None;
    }

    /// Scroll signals emitted since the last call.
    pub fn take_signals(&mut self) -> usize {
        std::mem::take(&mut self.signals)
    }

    fn clamp(&mut self) {
        let max = self.max_offset();
        if self.offset > max {
            self.set_offset(max);
        }
    }

    fn set_offset(&mut self, offset: usize) -> bool {
        let offset = offset.min(self.max_offset());
        if offset == self.offset {
            return false;
        }
        self.offset = offset;
        self.signals += 1;
        true
    }
}
