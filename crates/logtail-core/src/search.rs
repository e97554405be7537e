//! Search term state and match decoration.
//!
//! Matching never hides lines; it only flags them for highlighting.

use crate::entry::LogEntry;

/// Live search input plus the committed term used for matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    term: String,
    active_term: String,
}

impl SearchState {
    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub fn active_term(&self) -> &str {
        &self.active_term
    }

    pub fn set_term(&mut self, term: impl Into<String>) {
        self.term = term.into();
    }

    pub fn push_char(&mut self, ch: char) {
        self.term.push(ch);
    }

    pub fn pop_char(&mut self) {
        let _ = self.term.pop();
    }

    /// Make `term` the term matching is computed against.
    pub fn commit(&mut self, term: impl Into<String>) {
        let term = term.into();
        self.term.clone_from(&term);
        self.active_term = term;
    }

    /// Commit whatever is currently typed.
    pub fn commit_current(&mut self) {
        self.active_term.clone_from(&self.term);
    }

    pub fn clear(&mut self) {
        self.term.clear();
        self.active_term.clear();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.active_term.is_empty()
    }
}

/// One entry as handed to the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewEntry<'a> {
    pub entry: &'a LogEntry,
    pub is_match: bool,
}

struct Matcher {
    needle: String,
}

impl Matcher {
    fn new(active_term: &str) -> Option<Self> {
        if active_term.is_empty() {
            return None;
        }
        Some(Self {
            needle: active_term.to_lowercase(),
        })
    }

    fn matches(&self, entry: &LogEntry) -> bool {
        entry.raw.to_lowercase().contains(&self.needle)
    }
}

/// Decorate `entries` with case-insensitive match flags for `active_term`.
pub fn view<'a, I>(entries: I, active_term: &str) -> Vec<ViewEntry<'a>>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let matcher = Matcher::new(active_term);
    entries
        .into_iter()
        .map(|entry| ViewEntry {
            entry,
            is_match: matcher.as_ref().is_some_and(|m| m.matches(entry)),
        })
        .collect()
}

#[must_use]
pub fn match_count(view: &[ViewEntry<'_>]) -> usize {
    view.iter().filter(|item| item.is_match).count()
}
