// src/diagnostics.rs
use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;

/// Most recent entries kept for the polling endpoint.
const LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: String,
    pub message: String,
}

/// Process-scoped ring buffer of recent diagnostic events, polled by clients
/// via `GET /api/logs?lastId=`. Initialized once at startup; no teardown.
pub struct Diagnostics {
    inner: Mutex<Ring>,
}

struct Ring {
    next_id: u64,
    entries: VecDeque<LogEntry>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Ring {
                next_id: 1,
                entries: VecDeque::with_capacity(LOG_CAPACITY),
            }),
        }
    }

    pub fn record(&self, level: &str, message: impl Into<String>) {
        let mut ring = self.inner.lock().expect("diagnostics lock poisoned");
        let id = ring.next_id;
        ring.next_id += 1;
        if ring.entries.len() == LOG_CAPACITY {
            ring.entries.pop_front();
        }
        ring.entries.push_back(LogEntry {
            id,
            timestamp: chrono::Utc::now(),
            level: level.to_string(),
            message: message.into(),
        });
    }

    /// Entries newer than `last_id`, plus the current high-water id so the
    /// client can resume polling from where it left off.
    pub fn entries_after(&self, last_id: u64) -> (Vec<LogEntry>, u64) {
        let ring = self.inner.lock().expect("diagnostics lock poisoned");
        let newest = ring.next_id - 1;
        let entries = ring
            .entries
            .iter()
            .filter(|entry| entry.id > last_id)
            .cloned()
            .collect();
        (entries, newest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_evicts_oldest_entries() {
        let diag = Diagnostics::new();
        for i in 0..150 {
            diag.record("info", format!("event {}", i));
        }

        let (entries, newest) = diag.entries_after(0);
        assert_eq!(entries.len(), LOG_CAPACITY);
        assert_eq!(newest, 150);
        // Oldest 50 are gone; the ring starts at id 51.
        assert_eq!(entries.first().unwrap().id, 51);
        assert_eq!(entries.last().unwrap().id, 150);
    }

    #[test]
    fn polling_resumes_from_last_id() {
        let diag = Diagnostics::new();
        diag.record("info", "first");
        diag.record("warn", "second");
        diag.record("error", "third");

        let (entries, newest) = diag.entries_after(1);
        assert_eq!(newest, 3);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "second");
        assert_eq!(entries[1].level, "error");

        let (empty, _) = diag.entries_after(newest);
        assert!(empty.is_empty());
    }
}
