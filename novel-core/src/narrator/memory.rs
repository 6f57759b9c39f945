//! Key event log.
//!
//! Keeps the plot beats the storyteller flagged with `[KEY_EVENT: ...]` so
//! later prompts can remind it of them. Only the newest events are kept.

use crate::world::KeyStoryEvent;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of events retained.
pub const MAX_KEY_EVENTS: usize = 15;

/// Number of events included in a generation prompt.
pub const KEY_EVENTS_IN_PROMPT: usize = 5;

/// Insertion-ordered, capped list of key story events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEventLog {
    events: VecDeque<KeyStoryEvent>,
    capacity: usize,
}

impl KeyEventLog {
    pub fn new() -> Self {
        Self::with_capacity(MAX_KEY_EVENTS)
    }

    /// Create a log that keeps at most `capacity` events (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Rebuild a log from stored events, keeping the newest ones.
    pub fn from_events(events: impl IntoIterator<Item = KeyStoryEvent>) -> Self {
        let mut log = Self::new();
        log.extend(events);
        log
    }

    /// Append an event, evicting the oldest when full. Blank events are
    /// ignored.
    pub fn push(&mut self, event: impl Into<KeyStoryEvent>) {
        let event = event.into();
        let event = event.trim();
        if event.is_empty() {
            return;
        }
        self.events.push_back(event.to_string());
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = KeyStoryEvent>) {
        for event in events {
            self.push(event);
        }
    }

    /// The newest `n` events, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&KeyStoryEvent> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip).collect()
    }

    /// `- event` lines for the newest `n` events, or `None` when empty.
    pub fn summary(&self, n: usize) -> Option<String> {
        let recent = self.recent(n);
        if recent.is_empty() {
            return None;
        }
        Some(
            recent
                .iter()
                .map(|e| format!("- {e}"))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyStoryEvent> {
        self.events.iter()
    }

    pub fn to_vec(&self) -> Vec<KeyStoryEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for KeyEventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_creation() {
        let log = KeyEventLog::new();
        assert!(log.is_empty());
        assert_eq!(log.capacity(), MAX_KEY_EVENTS);
        assert_eq!(log.summary(KEY_EVENTS_IN_PROMPT), None);
    }

    #[test]
    fn test_oldest_evicted_first() {
        let mut log = KeyEventLog::new();
        for i in 0..20 {
            log.push(format!("Sự kiện {i}"));
        }

        assert_eq!(log.len(), MAX_KEY_EVENTS);
        assert_eq!(log.iter().next().map(String::as_str), Some("Sự kiện 5"));
        assert_eq!(log.iter().last().map(String::as_str), Some("Sự kiện 19"));
    }

    #[test]
    fn test_blank_events_ignored() {
        let mut log = KeyEventLog::new();
        log.push("   ");
        log.push(" Gặp sư phụ ");
        assert_eq!(log.to_vec(), vec!["Gặp sư phụ".to_string()]);
    }

    #[test]
    fn test_recent_and_summary() {
        let mut log = KeyEventLog::with_capacity(10);
        log.extend(["Một", "Hai", "Ba"].map(String::from));

        assert_eq!(log.recent(2), vec!["Hai", "Ba"]);
        assert_eq!(log.recent(10).len(), 3);
        assert_eq!(log.summary(2).as_deref(), Some("- Hai\n- Ba"));
    }

    #[test]
    fn test_from_events_keeps_newest() {
        let events: Vec<String> = (0..30).map(|i| i.to_string()).collect();
        let log = KeyEventLog::from_events(events);
        assert_eq!(log.len(), MAX_KEY_EVENTS);
        assert_eq!(log.iter().next().map(String::as_str), Some("15"));
    }
}
