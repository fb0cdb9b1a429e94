//! Capped sanitization log (most recent first).

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One successful sanitization. Holds the sanitized text only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub text: String,
    pub score: u8,
    pub run_id: Uuid,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunLog {
    entries: VecDeque<LogEntry>,
    #[serde(skip)]
    capacity: usize,
}

impl RunLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend an entry, dropping the oldest once the log is full.
    pub fn record(&mut self, entry: LogEntry) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: u8) -> LogEntry {
        LogEntry {
            text: format!("prompt {n}"),
            score: n,
            run_id: Uuid::new_v4(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn newest_first() {
        let mut log = RunLog::with_capacity(20);
        log.record(entry(1));
        log.record(entry(2));
        assert_eq!(log.latest().unwrap().score, 2);
        let scores: Vec<u8> = log.entries().map(|e| e.score).collect();
        assert_eq!(scores, vec![2, 1]);
    }

    #[test]
    fn twenty_first_entry_drops_oldest() {
        let mut log = RunLog::with_capacity(20);
        for n in 1..=21 {
            log.record(entry(n));
        }
        assert_eq!(log.len(), 20);
        assert_eq!(log.latest().unwrap().score, 21);
        assert!(log.entries().all(|e| e.score != 1));
        assert_eq!(log.entries().last().unwrap().score, 2);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut log = RunLog::with_capacity(0);
        log.record(entry(1));
        assert!(log.is_empty());
    }

    #[test]
    fn serializes_entries_only() {
        let mut log = RunLog::with_capacity(3);
        log.record(entry(5));
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["entries"][0]["score"], 5);
        assert!(json.get("capacity").is_none());
    }
}
