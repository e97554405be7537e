//! Follow/paused state machine for the log view.
//!
//! The controller decides whether the view should keep jumping to the newest
//! line. It is driven by buffer mutations, user wheel input, and raw scroll
//! signals from the scroll surface. Raw scroll signals are ambiguous: the
//! surface emits them for its own programmatic jumps too. Every programmatic
//! jump therefore raises a guard window during which scroll and wheel signals
//! are discarded.
//!
//! Timers are plain deadlines held in the controller. The owner feeds the
//! current time into every call and calls [`ScrollFollowController::poll`]
//! when [`ScrollFollowController::next_deadline`] is reached.

use std::time::{Duration, Instant};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMode {
    Follow,
    Paused,
}

impl ScrollMode {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::Paused => "paused",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Instant,
    Smooth,
}

/// Instruction for the scroll surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollCommand {
    ToBottom { behavior: ScrollBehavior },
    ToTop,
}

/// Scroll surface position in surface units (rows, pixels).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollGeometry {
    pub offset: usize,
    pub content_height: usize,
    pub viewport_height: usize,
}

impl ScrollGeometry {
    #[must_use]
    pub fn distance_from_bottom(&self) -> usize {
        self.content_height
            .saturating_sub(self.offset.saturating_add(self.viewport_height))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollConfig {
    /// Distance from bottom under which the view counts as "at the bottom".
    pub threshold: usize,
    /// Guard raised around the auto-scroll that follows a buffer mutation.
    pub auto_scroll_guard: Duration,
    /// Quiet period before a raw scroll signal is evaluated.
    pub scroll_debounce: Duration,
    /// Guard raised around explicit scroll-to-top/bottom actions.
    pub manual_scroll_guard: Duration,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            threshold: 50,
            auto_scroll_guard: Duration::from_millis(100),
            scroll_debounce: Duration::from_millis(150),
            manual_scroll_guard: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrollFollowController {
    config: ScrollConfig,
    mode: ScrollMode,
    guard_until: Option<Instant>,
    debounce_at: Option<Instant>,
    transitions: u64,
}

impl Default for ScrollFollowController {
    fn default() -> Self {
        Self::new(ScrollConfig::default())
    }
}

impl ScrollFollowController {
    #[must_use]
    pub fn new(config: ScrollConfig) -> Self {
        Self {
            config,
            mode: ScrollMode::Follow,
            guard_until: None,
            debounce_at: None,
            transitions: 0,
        }
    }

    #[must_use]
    pub fn mode(&self) -> ScrollMode {
        self.mode
    }

    #[must_use]
    pub fn is_following(&self) -> bool {
        self.mode == ScrollMode::Follow
    }

    #[must_use]
    pub fn config(&self) -> ScrollConfig {
        self.config
    }

    #[must_use]
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    #[must_use]
    pub fn is_guarded(&self, now: Instant) -> bool {
        self.guard_until.is_some_and(|until| now < until)
    }

    /// Earliest pending timer, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.guard_until, self.debounce_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// The buffer changed. In follow mode the surface must jump to the newest
    /// line; the returned command is that jump.
    pub fn on_buffer_changed(&mut self, now: Instant) -> Option<ScrollCommand> {
        if self.mode != ScrollMode::Follow {
            return None;
        }
        self.raise_guard(now, self.config.auto_scroll_guard);
        Some(ScrollCommand::ToBottom {
            behavior: ScrollBehavior::Instant,
        })
    }

    /// User wheel input. `geometry` is the surface position after the wheel
    /// movement was applied.
    pub fn on_wheel(&mut self, direction: WheelDirection, geometry: ScrollGeometry, now: Instant) {
        if self.is_guarded(now) {
            return;
        }
        match (self.mode, direction) {
            (ScrollMode::Follow, WheelDirection::Up) => {
                self.transition(ScrollMode::Paused, "wheel up");
            }
            (ScrollMode::Paused, _)
                if geometry.distance_from_bottom() < self.config.threshold =>
            {
                self.transition(ScrollMode::Follow, "wheel reached bottom");
            }
            _ => {}
        }
    }

    /// Raw scroll signal from the surface. Evaluated once signals settle.
    pub fn on_scroll(&mut self, now: Instant) {
        if self.is_guarded(now) {
            return;
        }
        self.debounce_at = Some(now + self.config.scroll_debounce);
    }

    /// Fire due timers against the current surface position.
    pub fn poll(&mut self, now: Instant, geometry: ScrollGeometry) {
        if self.guard_until.is_some_and(|until| until <= now) {
            self.guard_until = None;
        }

        let Some(at) = self.debounce_at else {
            return;
        };
        if now < at {
            return;
        }
        self.debounce_at = None;
        if self.is_guarded(now) {
            return;
        }

        let distance = geometry.distance_from_bottom();
        match self.mode {
            ScrollMode::Follow if distance > self.config.threshold => {
                self.transition(ScrollMode::Paused, "scrolled away from bottom");
            }
            ScrollMode::Paused if distance <= self.config.threshold => {
                self.transition(ScrollMode::Follow, "scrolled back to bottom");
            }
            _ => {}
        }
    }

    /// Explicit jump to the oldest line; always pauses following.
    pub fn scroll_to_top(&mut self, now: Instant) -> ScrollCommand {
        self.transition(ScrollMode::Paused, "scroll to top");
        self.debounce_at = None;
        self.raise_guard(now, self.config.manual_scroll_guard);
        ScrollCommand::ToTop
    }

    /// Explicit jump to the newest line; always resumes following.
    pub fn scroll_to_bottom(&mut self, now: Instant) -> ScrollCommand {
        self.transition(ScrollMode::Follow, "scroll to bottom");
        self.debounce_at = None;
        self.raise_guard(now, self.config.manual_scroll_guard);
        ScrollCommand::ToBottom {
            behavior: ScrollBehavior::Smooth,
        }
    }

    /// Keyboard scroll-back. Key presses are never produced by the surface
    /// itself, so the guard does not apply.
    pub fn pause(&mut self) {
        self.transition(ScrollMode::Paused, "keyboard scroll up");
    }

    /// Cancel all timers. Mode is left as is.
    pub fn teardown(&mut self) {
        self.guard_until = None;
        self.debounce_at = None;
    }

    fn raise_guard(&mut self, now: Instant, window: Duration) {
        let until = now + window;
        self.guard_until = Some(match self.guard_until {
            Some(current) if current > until => current,
            _ => until,
        });
    }

    fn transition(&mut self, to: ScrollMode, cause: &'static str) {
        if self.mode == to {
            return;
        }
        debug!(from = self.mode.label(), to = to.label(), cause, "scroll mode transition");
        self.mode = to;
        self.transitions = self.transitions.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn at_distance(distance: usize) -> ScrollGeometry {
        ScrollGeometry {
            offset: 1000 - 100 - distance,
            content_height: 1000,
            viewport_height: 100,
        }
    }

    fn paused(now: Instant) -> ScrollFollowController {
        let mut controller = ScrollFollowController::default();
        controller.on_wheel(WheelDirection::Up, at_distance(0), now);
        assert_eq!(controller.mode(), ScrollMode::Paused);
        controller
    }

    #[test]
    fn starts_in_follow() {
        let controller = ScrollFollowController::default();
        assert_eq!(controller.mode(), ScrollMode::Follow);
        assert_eq!(controller.next_deadline(), None);
    }

    #[test]
    fn distance_from_bottom_saturates() {
        let geometry = ScrollGeometry {
            offset: 50,
            content_height: 10,
            viewport_height: 20,
        };
        assert_eq!(geometry.distance_from_bottom(), 0);
        assert_eq!(at_distance(37).distance_from_bottom(), 37);
    }

    #[test]
    fn append_in_follow_jumps_without_pausing_on_its_own_scroll() {
        let t0 = Instant::now();
        let mut controller = ScrollFollowController::default();

        let command = controller.on_buffer_changed(t0);
        assert_eq!(
            command,
            Some(ScrollCommand::ToBottom {
                behavior: ScrollBehavior::Instant
            })
        );

        // The jump makes the surface emit a scroll signal mid-flight.
        controller.on_scroll(t0 + ms(5));
        controller.poll(t0 + ms(300), at_distance(500));
        assert_eq!(controller.mode(), ScrollMode::Follow);
        assert_eq!(controller.transitions(), 0);
    }

    #[test]
    fn append_while_paused_does_not_jump() {
        let t0 = Instant::now();
        let mut controller = paused(t0);
        assert_eq!(controller.on_buffer_changed(t0 + ms(1)), None);
        assert!(!controller.is_guarded(t0 + ms(1)));
    }

    #[test]
    fn wheel_up_pauses_immediately_regardless_of_position() {
        let t0 = Instant::now();
        let mut controller = ScrollFollowController::default();
        controller.on_wheel(WheelDirection::Up, at_distance(0), t0);
        assert_eq!(controller.mode(), ScrollMode::Paused);
    }

    #[test]
    fn wheel_is_ignored_inside_guard_window() {
        let t0 = Instant::now();
        let mut controller = ScrollFollowController::default();
        let _ = controller.on_buffer_changed(t0);
        controller.on_wheel(WheelDirection::Up, at_distance(0), t0 + ms(50));
        assert_eq!(controller.mode(), ScrollMode::Follow);

        controller.on_wheel(WheelDirection::Up, at_distance(0), t0 + ms(100));
        assert_eq!(controller.mode(), ScrollMode::Paused);
    }

    #[test]
    fn wheel_down_near_bottom_resumes_follow() {
        let t0 = Instant::now();
        let mut controller = paused(t0);

        controller.on_wheel(WheelDirection::Down, at_distance(200), t0 + ms(1));
        assert_eq!(controller.mode(), ScrollMode::Paused);

        controller.on_wheel(WheelDirection::Down, at_distance(10), t0 + ms(2));
        assert_eq!(controller.mode(), ScrollMode::Follow);
    }

    #[test]
    fn wheel_resume_requires_strictly_less_than_threshold() {
        let t0 = Instant::now();
        let mut controller = paused(t0);
        controller.on_wheel(WheelDirection::Down, at_distance(50), t0 + ms(1));
        assert_eq!(controller.mode(), ScrollMode::Paused);
    }

    #[test]
    fn debounced_scroll_near_bottom_resumes_follow() {
        let t0 = Instant::now();
        let mut controller = paused(t0);

        controller.on_scroll(t0);
        controller.poll(t0 + ms(149), at_distance(10));
        assert_eq!(controller.mode(), ScrollMode::Paused);

        controller.poll(t0 + ms(150), at_distance(10));
        assert_eq!(controller.mode(), ScrollMode::Follow);
    }

    #[test]
    fn debounced_scroll_far_from_bottom_stays_paused() {
        let t0 = Instant::now();
        let mut controller = paused(t0);
        controller.on_scroll(t0);
        controller.poll(t0 + ms(200), at_distance(500));
        assert_eq!(controller.mode(), ScrollMode::Paused);
    }

    #[test]
    fn debounced_scroll_away_pauses_follow() {
        let t0 = Instant::now();
        let mut controller = ScrollFollowController::default();
        controller.on_scroll(t0);
        controller.poll(t0 + ms(150), at_distance(51));
        assert_eq!(controller.mode(), ScrollMode::Paused);
    }

    #[test]
    fn debounce_restarts_on_each_signal() {
        let t0 = Instant::now();
        let mut controller = ScrollFollowController::default();
        controller.on_scroll(t0);
        controller.on_scroll(t0 + ms(100));
        assert_eq!(controller.next_deadline(), Some(t0 + ms(250)));

        controller.poll(t0 + ms(200), at_distance(500));
        assert_eq!(controller.mode(), ScrollMode::Follow);
        controller.poll(t0 + ms(250), at_distance(500));
        assert_eq!(controller.mode(), ScrollMode::Paused);
    }

    #[test]
    fn scroll_to_top_pauses_and_absorbs_scroll_storm() {
        let t0 = Instant::now();
        let mut controller = ScrollFollowController::default();

        assert_eq!(controller.scroll_to_top(t0), ScrollCommand::ToTop);
        assert_eq!(controller.mode(), ScrollMode::Paused);

        controller.on_scroll(t0 + ms(10));
        controller.on_wheel(WheelDirection::Down, at_distance(0), t0 + ms(20));
        controller.poll(t0 + ms(900), at_distance(0));
        assert_eq!(controller.mode(), ScrollMode::Paused);
        assert!(controller.is_guarded(t0 + ms(999)));
        assert!(!controller.is_guarded(t0 + ms(1000)));
    }

    #[test]
    fn scroll_to_bottom_follows_smoothly() {
        let t0 = Instant::now();
        let mut controller = paused(t0);
        assert_eq!(
            controller.scroll_to_bottom(t0 + ms(1)),
            ScrollCommand::ToBottom {
                behavior: ScrollBehavior::Smooth
            }
        );
        assert_eq!(controller.mode(), ScrollMode::Follow);

        // Smooth scroll is still travelling; its signals must not pause.
        controller.on_scroll(t0 + ms(200));
        controller.poll(t0 + ms(600), at_distance(400));
        assert_eq!(controller.mode(), ScrollMode::Follow);
    }

    #[test]
    fn short_guard_does_not_cut_long_guard() {
        let t0 = Instant::now();
        let mut controller = ScrollFollowController::default();
        let _ = controller.scroll_to_bottom(t0);
        let _ = controller.on_buffer_changed(t0 + ms(10));
        assert!(controller.is_guarded(t0 + ms(500)));
    }

    #[test]
    fn poll_lowers_expired_guard() {
        let t0 = Instant::now();
        let mut controller = ScrollFollowController::default();
        let _ = controller.on_buffer_changed(t0);
        assert_eq!(controller.next_deadline(), Some(t0 + ms(100)));
        controller.poll(t0 + ms(100), at_distance(0));
        assert_eq!(controller.next_deadline(), None);
    }

    #[test]
    fn teardown_cancels_pending_timers() {
        let t0 = Instant::now();
        let mut controller = ScrollFollowController::default();
        let _ = controller.on_buffer_changed(t0);
        controller.poll(t0 + ms(100), at_distance(0));
        controller.on_scroll(t0 + ms(120));
        assert!(controller.next_deadline().is_some());

        controller.teardown();
        assert_eq!(controller.next_deadline(), None);
        controller.poll(t0 + ms(1000), at_distance(900));
        assert_eq!(controller.mode(), ScrollMode::Follow);
    }

    #[test]
    fn keyboard_pause_ignores_guard() {
        let now = Instant::now();
        let mut controller = ScrollFollowController::default();
        assert!(controller.on_buffer_changed(now).is_some());
        assert!(controller.is_guarded(now));

        controller.pause();
        assert_eq!(controller.mode(), ScrollMode::Paused);
        assert_eq!(controller.transitions(), 1);
    }

    #[test]
    fn thresholds_are_tunable() {
        let t0 = Instant::now();
        let mut controller = ScrollFollowController::new(ScrollConfig {
            threshold: 2,
            ..ScrollConfig::default()
        });
        controller.on_scroll(t0);
        controller.poll(t0 + ms(150), at_distance(3));
        assert_eq!(controller.mode(), ScrollMode::Paused);
    }
}
