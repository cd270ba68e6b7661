//! Fixed-window request counting per client.
//!
//! [`RateLimiter::admit`] is the whole contract: the first request from a
//! client (or the first after its window elapsed) opens a fresh window
//! with a count of one; later requests increment the count and are
//! rejected once it exceeds the threshold. The table lives behind a
//! `std::sync::Mutex` held only for the read-modify-write, so concurrent
//! requests from one client serialize their increments. Expired windows
//! of other clients are swept lazily, at most once per window duration.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientWindow {
    pub request_count: u64,
    pub reset_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Reject {
        limit: u64,
        window: Duration,
        retry_after: Duration,
    },
}

impl Decision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Operator-facing explanation for a rejection, `None` when allowed.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Allow => None,
            Self::Reject { limit, window, .. } => Some(format!(
                "Rate limit exceeded. Maximum {limit} requests per {}.",
                describe_window(*window)
            )),
        }
    }
}

fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    if secs % 60 == 0 {
        let minutes = secs / 60;
        if minutes == 1 {
            "1 minute".into()
        } else {
            format!("{minutes} minutes")
        }
    } else if secs == 1 {
        "1 second".into()
    } else {
        format!("{secs} seconds")
    }
}

#[derive(Debug)]
struct Table {
    windows: HashMap<String, ClientWindow>,
    next_sweep: Option<Instant>,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u64,
    window: Duration,
    table: Mutex<Table>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_requests: u64, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            table: Mutex::new(Table {
                windows: HashMap::new(),
                next_sweep: None,
            }),
        }
    }

    #[must_use]
    pub const fn max_requests(&self) -> u64 {
        self.max_requests
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    pub fn admit(&self, client_key: &str, now: Instant) -> Decision {
        let mut table = self.lock();

        if table.next_sweep.map_or(true, |at| now >= at) {
            let before = table.windows.len();
            table.windows.retain(|_, w| now < w.reset_at);
            let purged = before - table.windows.len();
            if purged > 0 {
                tracing::debug!(purged, remaining = table.windows.len(), "expired rate-limit windows swept");
            }
            table.next_sweep = Some(now + self.window);
        }

        let entry = table
            .windows
            .entry(client_key.to_string())
            .or_insert(ClientWindow {
                request_count: 0,
                reset_at: now,
            });
        if now >= entry.reset_at {
            *entry = ClientWindow {
                request_count: 1,
                reset_at: now + self.window,
            };
        } else {
            entry.request_count = entry.request_count.saturating_add(1);
        }
        let window = *entry;
        drop(table);

        if window.request_count > self.max_requests {
            Decision::Reject {
                limit: self.max_requests,
                window: self.window,
                retry_after: window.reset_at.saturating_duration_since(now),
            }
        } else {
            Decision::Allow
        }
    }

    /// Number of clients currently holding a window (expired ones included until swept).
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.lock().windows.len()
    }

    /// Snapshot of a single client's window.
    #[must_use]
    pub fn window_for(&self, client_key: &str) -> Option<ClientWindow> {
        self.lock().windows.get(client_key).copied()
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        // The table holds plain counters; a panic mid-update cannot leave it inconsistent.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(15 * 60);

    #[test]
    fn admits_up_to_threshold_then_rejects() {
        let limiter = RateLimiter::new(100, WINDOW);
        let now = Instant::now();
        for i in 1..=100 {
            assert!(limiter.admit("10.0.0.1", now).is_allowed(), "request {i}");
        }
        let decision = limiter.admit("10.0.0.1", now);
        assert!(!decision.is_allowed());
        assert_eq!(
            decision.message().unwrap(),
            "Rate limit exceeded. Maximum 100 requests per 15 minutes."
        );
    }

    #[test]
    fn clients_are_counted_independently() {
        let limiter = RateLimiter::new(2, WINDOW);
        let now = Instant::now();
        assert!(limiter.admit("a", now).is_allowed());
        assert!(limiter.admit("a", now).is_allowed());
        assert!(!limiter.admit("a", now).is_allowed());
        assert!(limiter.admit("b", now).is_allowed());
    }

    #[test]
    fn window_rollover_resets_count_to_one() {
        let limiter = RateLimiter::new(2, WINDOW);
        let start = Instant::now();
        limiter.admit("a", start);
        limiter.admit("a", start);
        assert!(!limiter.admit("a", start + Duration::from_secs(1)).is_allowed());

        let later = start + WINDOW;
        assert!(limiter.admit("a", later).is_allowed());
        let window = limiter.window_for("a").unwrap();
        assert_eq!(window.request_count, 1);
        assert_eq!(window.reset_at, later + WINDOW);
    }

    #[test]
    fn count_keeps_growing_while_rejected() {
        let limiter = RateLimiter::new(1, WINDOW);
        let now = Instant::now();
        for _ in 0..5 {
            limiter.admit("a", now);
        }
        assert_eq!(limiter.window_for("a").unwrap().request_count, 5);
    }

    #[test]
    fn retry_after_counts_down_to_reset() {
        let limiter = RateLimiter::new(1, WINDOW);
        let start = Instant::now();
        limiter.admit("a", start);
        let decision = limiter.admit("a", start + Duration::from_secs(60));
        match decision {
            Decision::Reject { retry_after, .. } => {
                assert_eq!(retry_after, WINDOW - Duration::from_secs(60));
            }
            Decision::Allow => panic!("expected rejection"),
        }
    }

    #[test]
    fn expired_windows_of_other_clients_are_swept() {
        let limiter = RateLimiter::new(10, WINDOW);
        let start = Instant::now();
        limiter.admit("a", start);
        limiter.admit("b", start);
        assert_eq!(limiter.tracked_clients(), 2);

        limiter.admit("c", start + WINDOW + Duration::from_secs(1));
        assert_eq!(limiter.tracked_clients(), 1);
        assert!(limiter.window_for("a").is_none());
    }

    #[test]
    fn concurrent_requests_are_not_undercounted() {
        let limiter = std::sync::Arc::new(RateLimiter::new(1_000, WINDOW));
        let now = Instant::now();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = std::sync::Arc::clone(&limiter);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        limiter.admit("shared", now);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(limiter.window_for("shared").unwrap().request_count, 800);
    }

    #[test]
    fn window_descriptions() {
        assert_eq!(describe_window(Duration::from_secs(900)), "15 minutes");
        assert_eq!(describe_window(Duration::from_secs(60)), "1 minute");
        assert_eq!(describe_window(Duration::from_secs(90)), "90 seconds");
    }
}
