//! The bounded event buffer.
//!
//! Events are kept in arrival order. When the buffer is full the oldest
//! event is evicted to admit the newest; no event is ever rejected.

use crate::filter;
use std::collections::VecDeque;
use stbl_core::{ChainEvent, EventFilter};

/// A FIFO ring of the most recent events.
#[derive(Debug)]
pub struct EventBuffer {
    events: VecDeque<ChainEvent>,
    capacity: usize,
}

impl EventBuffer {
    /// Create a buffer holding at most `capacity` events. A zero capacity
    /// is raised to one so `push` can always retain the newest event.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append an event, evicting the oldest when at capacity.
    pub fn push(&mut self, event: ChainEvent) {
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// The newest `limit` events, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<ChainEvent> {
        let skip = self.events.len().saturating_sub(limit);
        self.events.iter().skip(skip).cloned().collect()
    }

    /// Buffered events matching `filter`, keeping the newest `limit`
    /// matches, oldest first.
    pub fn query(&self, filter: &EventFilter, limit: usize) -> Vec<ChainEvent> {
        let mut matched: Vec<ChainEvent> = self
            .events
            .iter()
            .filter(|e| filter::matches(filter, e))
            .cloned()
            .collect();
        let skip = matched.len().saturating_sub(limit);
        matched.drain(..skip);
        matched
    }

    /// Remove all buffered events, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.events.len();
        self.events.clear();
        n
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn numbered(n: u64) -> ChainEvent {
        ChainEvent::new("block").with_data("n", json!(n))
    }

    #[test]
    fn eviction_is_oldest_first() {
        let mut buffer = EventBuffer::new(3);
        for n in 0..5 {
            buffer.push(numbered(n));
        }
        assert_eq!(buffer.len(), 3);
        let recent = buffer.recent(10);
        let ns: Vec<_> = recent.iter().map(|e| e.data["n"].as_u64().unwrap()).collect();
        assert_eq!(ns, vec![2, 3, 4]);
    }

    #[test]
    fn recent_returns_newest_in_arrival_order() {
        let mut buffer = EventBuffer::new(10);
        for n in 0..6 {
            buffer.push(numbered(n));
        }
        let recent = buffer.recent(3);
        let ns: Vec<_> = recent.iter().map(|e| e.data["n"].as_u64().unwrap()).collect();
        assert_eq!(ns, vec![3, 4, 5]);
    }

    #[test]
    fn recent_with_limit_above_len_returns_all() {
        let mut buffer = EventBuffer::new(10);
        buffer.push(numbered(1));
        assert_eq!(buffer.recent(50).len(), 1);
    }

    #[test]
    fn query_keeps_newest_matches() {
        let mut buffer = EventBuffer::new(10);
        for n in 0..4 {
            buffer.push(numbered(n));
        }
        buffer.push(ChainEvent::new("contract_event"));

        let blocks = EventFilter::new().with_kind("block");
        let matched = buffer.query(&blocks, 2);
        let ns: Vec<_> = matched.iter().map(|e| e.data["n"].as_u64().unwrap()).collect();
        assert_eq!(ns, vec![2, 3]);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut buffer = EventBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        for n in 0..3 {
            buffer.push(numbered(n));
        }
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.recent(10)[0].data["n"].as_u64().unwrap(), 2);
    }

    #[test]
    fn clear_reports_dropped_count() {
        let mut buffer = EventBuffer::new(10);
        buffer.push(numbered(1));
        buffer.push(numbered(2));
        assert_eq!(buffer.clear(), 2);
        assert!(buffer.is_empty());
    }
}
