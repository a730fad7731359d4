//! Bounded back/forward history

use crate::error::{BrowseError, Result};
use app_fs::Entry;
use std::collections::VecDeque;

/// Most-recent-first stack that evicts its oldest entry when full.
///
/// Revisits are not deduplicated.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: VecDeque<Entry>,
    capacity: usize,
}

impl HistoryStack {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: Entry) {
        if self.entries.len() == self.capacity {
            if let Some(evicted) = self.entries.pop_back() {
                tracing::trace!("History full, evicting {}", evicted);
            }
        }
        self.entries.push_front(entry);
    }

    /// Remove the most recent entry. Callers check [`is_not_empty`](Self::is_not_empty) first.
    pub fn pop(&mut self) -> Result<Entry> {
        self.entries.pop_front().ok_or(BrowseError::EmptyHistory)
    }

    pub fn peek(&self) -> Option<&Entry> {
        self.entries.front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_not_empty(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries, most recent first
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use app_fs::LocalEntry;

    fn dir(i: usize) -> Entry {
        Entry::Local(LocalEntry::directory(format!("/dir{}", i)))
    }

    #[test]
    fn test_keeps_ten_most_recent() {
        let mut stack = HistoryStack::new(10);
        for i in 0..15 {
            stack.push(dir(i));
        }
        assert_eq!(stack.len(), 10);

        for i in (5..15).rev() {
            assert_eq!(stack.pop().unwrap(), dir(i));
        }
        assert!(!stack.is_not_empty());
    }

    #[test]
    fn test_pop_empty_is_contract_violation() {
        let mut stack = HistoryStack::new(10);
        assert!(matches!(stack.pop(), Err(BrowseError::EmptyHistory)));
    }

    #[test]
    fn test_duplicates_accumulate() {
        let mut stack = HistoryStack::new(10);
        stack.push(dir(1));
        stack.push(dir(1));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.peek(), Some(&dir(1)));
    }

    #[test]
    fn test_clear() {
        let mut stack = HistoryStack::new(10);
        stack.push(dir(1));
        stack.clear();
        assert!(stack.is_empty());
    }
}
