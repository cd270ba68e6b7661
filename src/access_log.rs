//! Bounded in-memory record of completed proxy transactions.
//!
//! [`AccessLog`] keeps the most recent entries newest-first in a
//! `VecDeque` behind a `std::sync::Mutex`. Recording is O(1): the new
//! entry is pushed to the front and the oldest is dropped from the back
//! once capacity is exceeded, so the length never exceeds capacity.
//! Nothing is persisted; the log lives and dies with the process.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyLogEntry {
    pub id: u64,
    pub method: String,
    pub path: String,
    pub target_service: String,
    pub status_code: u16,
    #[serde(rename = "responseTime")]
    pub response_time_ms: u64,
    pub timestamp: String,
}

/// Fields supplied by the caller; `id` and `timestamp` are assigned on record.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub method: String,
    pub path: String,
    pub target_service: String,
    pub status_code: u16,
    pub response_time_ms: u64,
}

#[derive(Debug)]
struct Ring {
    entries: VecDeque<ProxyLogEntry>,
    next_id: u64,
}

#[derive(Debug)]
pub struct AccessLog {
    capacity: usize,
    ring: Mutex<Ring>,
}

impl AccessLog {
    /// `capacity` is clamped to at least one entry.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            ring: Mutex::new(Ring {
                entries: VecDeque::with_capacity(capacity),
                next_id: 1,
            }),
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, entry: NewEntry) -> ProxyLogEntry {
        self.record_at(entry, Utc::now())
    }

    pub fn record_at(&self, entry: NewEntry, at: DateTime<Utc>) -> ProxyLogEntry {
        let mut ring = self.lock();
        let recorded = ProxyLogEntry {
            id: ring.next_id,
            method: entry.method,
            path: entry.path,
            target_service: entry.target_service,
            status_code: entry.status_code,
            response_time_ms: entry.response_time_ms,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        ring.next_id += 1;
        ring.entries.push_front(recorded.clone());
        ring.entries.truncate(self.capacity);
        recorded
    }

    /// Newest-first copy of at most `limit` entries.
    #[must_use]
    pub fn list(&self, limit: usize) -> Vec<ProxyLogEntry> {
        self.lock().entries.iter().take(limit).cloned().collect()
    }

    /// Newest entry recorded for `service`, if any.
    #[must_use]
    pub fn latest_for(&self, service: &str) -> Option<ProxyLogEntry> {
        self.lock()
            .entries
            .iter()
            .find(|e| e.target_service == service)
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, service: &str, status: u16) -> NewEntry {
        NewEntry {
            method: "GET".into(),
            path: path.into(),
            target_service: service.into(),
            status_code: status,
            response_time_ms: 12,
        }
    }

    #[test]
    fn newest_first() {
        let log = AccessLog::new(10);
        log.record(entry("/a", "auth", 200));
        log.record(entry("/b", "video", 201));
        let paths: Vec<String> = log.list(10).into_iter().map(|e| e.path).collect();
        assert_eq!(paths, ["/b", "/a"]);
    }

    #[test]
    fn entry_101_evicts_entry_1() {
        let log = AccessLog::new(100);
        for i in 1..=101 {
            log.record(entry(&format!("/req/{i}"), "auth", 200));
        }
        assert_eq!(log.len(), 100);

        let entries = log.list(usize::MAX);
        assert_eq!(entries.len(), 100);
        assert!(entries.iter().all(|e| e.path != "/req/1"));
        let expected: Vec<String> = (2..=101).rev().map(|i| format!("/req/{i}")).collect();
        let actual: Vec<String> = entries.into_iter().map(|e| e.path).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn list_truncates_to_limit() {
        let log = AccessLog::new(100);
        for i in 0..5 {
            log.record(entry(&format!("/{i}"), "auth", 200));
        }
        assert_eq!(log.list(2).len(), 2);
        assert_eq!(log.list(2)[0].path, "/4");
        assert!(log.list(0).is_empty());
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let log = AccessLog::new(3);
        let first = log.record(entry("/a", "auth", 200));
        let second = log.record(entry("/b", "auth", 200));
        assert!(second.id > first.id);
    }

    #[test]
    fn latest_for_finds_newest_entry_of_service() {
        let log = AccessLog::new(10);
        log.record(entry("/old", "auth", 200));
        log.record(entry("/v", "video", 200));
        log.record(entry("/new", "auth", 502));
        let latest = log.latest_for("auth").unwrap();
        assert_eq!(latest.path, "/new");
        assert_eq!(latest.status_code, 502);
        assert!(log.latest_for("emotion").is_none());
    }

    #[test]
    fn serializes_in_camel_case() {
        let log = AccessLog::new(1);
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:00:00.250Z")
            .unwrap()
            .with_timezone(&Utc);
        let recorded = log.record_at(entry("/api/upload", "video", 201), at);
        let json = serde_json::to_value(&recorded).unwrap();
        assert_eq!(json["targetService"], "video");
        assert_eq!(json["statusCode"], 201);
        assert_eq!(json["responseTime"], 12);
        assert_eq!(json["timestamp"], "2024-05-01T10:00:00.250Z");
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let log = AccessLog::new(0);
        log.record(entry("/a", "auth", 200));
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn concurrent_records_are_never_lost() {
        let log = std::sync::Arc::new(AccessLog::new(1_000));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let log = std::sync::Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        log.record(entry(&format!("/{t}/{i}"), "auth", 200));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let entries = log.list(usize::MAX);
        assert_eq!(entries.len(), 200);
        let mut ids: Vec<u64> = entries.iter().map(|e| e.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 200);
    }
}
