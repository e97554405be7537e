//! Input model and key bindings for the log view.
//!
//! Terminal events are first mapped onto a small backend-neutral event set,
//! then translated into actions according to the current input mode.

use crossterm::event::{
    Event as TerminalEvent, KeyCode as TerminalKeyCode, KeyEventKind, KeyModifiers,
    MouseEventKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    #[must_use]
    pub const fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                ctrl: false,
                alt: false,
            },
        }
    }

    #[must_use]
    pub const fn ctrl(ch: char) -> Self {
        Self {
            key: Key::Char(ch),
            modifiers: Modifiers {
                ctrl: true,
                alt: false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseWheelDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Wheel(MouseWheelDirection),
    Resize { width: usize, height: usize },
}

/// Whether keystrokes edit the search input or drive the view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Noop,
    Quit,
    BeginSearch,
    SearchInput(char),
    SearchBackspace,
    CommitSearch,
    ClearSearch,
    ScrollToTop,
    ScrollToBottom,
    LineUp,
    LineDown,
    PageUp,
    PageDown,
    Wheel(MouseWheelDirection),
    ClearView,
    Truncate,
    ShowDownload,
    Resize { width: usize, height: usize },
}

#[must_use]
pub fn translate_input(event: &InputEvent, mode: InputMode) -> UiAction {
    match *event {
        InputEvent::Resize { width, height } => UiAction::Resize { width, height },
        InputEvent::Wheel(direction) => UiAction::Wheel(direction),
        InputEvent::Key(KeyEvent {
            key: Key::Char('c'),
            modifiers,
        }) if modifiers.ctrl => UiAction::Quit,
        InputEvent::Key(key) => match mode {
            InputMode::Search => translate_search_key(key),
            InputMode::Normal => translate_normal_key(key),
        },
    }
}

fn translate_search_key(event: KeyEvent) -> UiAction {
    match event.key {
        Key::Enter => UiAction::CommitSearch,
        Key::Escape => UiAction::ClearSearch,
        Key::Backspace => UiAction::SearchBackspace,
        Key::Char(ch) if !event.modifiers.ctrl && !event.modifiers.alt => {
            UiAction::SearchInput(ch)
        }
        _ => UiAction::Noop,
    }
}

fn translate_normal_key(event: KeyEvent) -> UiAction {
    if event.modifiers.ctrl || event.modifiers.alt {
        return UiAction::Noop;
    }
    match event.key {
        Key::Char('q') => UiAction::Quit,
        Key::Char('/') => UiAction::BeginSearch,
        Key::Escape => UiAction::ClearSearch,
        Key::Char('g') | Key::Home => UiAction::ScrollToTop,
        Key::Char('G') | Key::End => UiAction::ScrollToBottom,
        Key::Char('k') | Key::Up => UiAction::LineUp,
        Key::Char('j') | Key::Down => UiAction::LineDown,
        Key::PageUp => UiAction::PageUp,
        Key::PageDown => UiAction::PageDown,
        Key::Char('c') => UiAction::ClearView,
        Key::Char('T') => UiAction::Truncate,
        Key::Char('d') => UiAction::ShowDownload,
        _ => UiAction::Noop,
    }
}

/// Map a crossterm event onto the input model. Unhandled events map to `None`.
#[must_use]
pub fn map_terminal_event(event: TerminalEvent) -> Option<InputEvent> {
    match event {
        TerminalEvent::Resize(width, height) => Some(InputEvent::Resize {
            width: usize::from(width),
            height: usize::from(height),
        }),
        TerminalEvent::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => Some(InputEvent::Wheel(MouseWheelDirection::Up)),
            MouseEventKind::ScrollDown => Some(InputEvent::Wheel(MouseWheelDirection::Down)),
            _ => None,
        },
        TerminalEvent::Key(key_event) => {
            if !matches!(key_event.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                return None;
            }
            let key = match key_event.code {
                TerminalKeyCode::Char(ch) => Key::Char(ch),
                TerminalKeyCode::Enter => Key::Enter,
                TerminalKeyCode::Esc => Key::Escape,
                TerminalKeyCode::Backspace => Key::Backspace,
                TerminalKeyCode::Up => Key::Up,
                TerminalKeyCode::Down => Key::Down,
                TerminalKeyCode::PageUp => Key::PageUp,
                TerminalKeyCode::PageDown => Key::PageDown,
                TerminalKeyCode::Home => Key::Home,
                TerminalKeyCode::End => Key::End,
                _ => return None,
            };
            Some(InputEvent::Key(KeyEvent {
                key,
                modifiers: Modifiers {
                    ctrl: key_event.modifiers.contains(KeyModifiers::CONTROL),
                    alt: key_event.modifiers.contains(KeyModifiers::ALT),
                },
            }))
        }
        _ => None,
    }
}
