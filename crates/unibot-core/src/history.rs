//! Bounded conversation history.
//!
//! A [`History`] keeps the most recent `max_length` turns in chronological
//! order. Appending past the cap drops turns from the oldest end; turns are
//! never reordered or edited. `max_length` must be even so that a full
//! history always holds whole user/assistant exchanges.

use std::collections::VecDeque;
use std::fmt;

use crate::error::{Error, Result};

/// Default cap: 10 turns, i.e. 5 exchanges.
pub const DEFAULT_MAX_LENGTH: usize = 10;

/// Rendered in place of the history when no turn has been recorded yet.
pub const EMPTY_HISTORY_PLACEHOLDER: &str = "No previous conversation.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    fn render(&self) -> String {
        match self.role {
            Role::User => format!("User said: {}", self.content),
            Role::Assistant => format!("Assistant replied: {}", self.content),
        }
    }
}

#[derive(Debug, Clone)]
pub struct History {
    turns: VecDeque<Turn>,
    max_length: usize,
}

impl History {
    /// `max_length` must be even and greater than zero.
    pub fn new(max_length: usize) -> Result<Self> {
        if max_length == 0 || max_length % 2 != 0 {
            return Err(Error::InvalidArgument(format!(
                "history max_length must be a positive even number, got {}",
                max_length
            )));
        }
        Ok(Self {
            turns: VecDeque::with_capacity(max_length + 1),
            max_length,
        })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Append `turn`, then drop the oldest turns beyond `max_length`.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.max_length {
            self.turns.pop_front();
        }
    }

    /// Append a question and its answer as one exchange.
    pub fn push_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.append(Turn::user(question));
        self.append(Turn::assistant(answer));
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// One line per turn, oldest first, or [`EMPTY_HISTORY_PLACEHOLDER`].
    pub fn render(&self) -> String {
        if self.turns.is_empty() {
            return EMPTY_HISTORY_PLACEHOLDER.to_string();
        }
        self.turns
            .iter()
            .map(Turn::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for History {
    fn default() -> Self {
        Self {
            turns: VecDeque::with_capacity(DEFAULT_MAX_LENGTH + 1),
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_odd_or_zero_length() {
        assert!(matches!(History::new(0), Err(Error::InvalidArgument(_))));
        assert!(matches!(History::new(7), Err(Error::InvalidArgument(_))));
        assert!(History::new(2).is_ok());
    }

    #[test]
    fn test_empty_renders_placeholder() {
        let history = History::default();
        assert_eq!(history.max_length(), 10);
        assert_eq!(history.render(), EMPTY_HISTORY_PLACEHOLDER);
    }

    #[test]
    fn test_render_format() {
        let mut history = History::default();
        history.push_exchange("When do exams start?", "On 6 January.");
        assert_eq!(
            history.render(),
            "User said: When do exams start?\nAssistant replied: On 6 January."
        );
    }

    #[test]
    fn test_twelve_turns_keep_last_ten_in_order() {
        let mut history = History::new(10).unwrap();
        for i in 0..12 {
            if i % 2 == 0 {
                history.append(Turn::user(format!("q{}", i)));
            } else {
                history.append(Turn::assistant(format!("a{}", i)));
            }
        }
        assert_eq!(history.len(), 10);

        let rendered = history.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "User said: q2");
        assert_eq!(lines[9], "Assistant replied: a11");
        assert!(!rendered.contains("q0"));
        assert!(!rendered.contains("a1\n"));
        assert!(!rendered.contains(EMPTY_HISTORY_PLACEHOLDER));
    }

    #[test]
    fn test_trim_keeps_most_recent_exchanges() {
        let mut history = History::new(4).unwrap();
        for i in 0..5 {
            history.push_exchange(format!("q{}", i), format!("a{}", i));
        }
        let contents: Vec<&str> = history.turns().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["q3", "a3", "q4", "a4"]);
    }

    #[test]
    fn test_clear() {
        let mut history = History::default();
        history.push_exchange("q", "a");
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.render(), EMPTY_HISTORY_PLACEHOLDER);
    }
}
