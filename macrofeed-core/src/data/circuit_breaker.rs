//! Per-host circuit breaker for rate limiting and IP bans.
//!
//! Each upstream host has its own breaker state, so a ban on one provider
//! never blocks requests to another. A host trips after `failure_threshold`
//! consecutive failures, or immediately on HTTP 403, and refuses requests
//! until the cooldown has elapsed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open { tripped_at: Instant },
}

#[derive(Debug, Clone, Copy)]
struct HostState {
    state: BreakerState,
    consecutive_failures: u32,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
        }
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    hosts: Mutex<HashMap<String, HostState>>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration, failure_threshold: u32) -> Self {
        Self {
            hosts: Mutex::new(HashMap::new()),
            cooldown,
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// 30-minute cooldown, trips after 3 consecutive failures.
    pub fn default_provider() -> Self {
        Self::new(Duration::from_secs(30 * 60), 3)
    }

    // A panic while holding the lock leaves plain counters behind, which are
    // still meaningful, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, HostState>> {
        self.hosts.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether requests to `host` are currently allowed.
    pub fn is_allowed(&self, host: &str) -> bool {
        let mut hosts = self.lock();
        let Some(entry) = hosts.get_mut(host) else {
            return true;
        };
        match entry.state {
            BreakerState::Closed => true,
            BreakerState::Open { tripped_at } => {
                if tripped_at.elapsed() >= self.cooldown {
                    *entry = HostState::default();
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self, host: &str) {
        if let Some(entry) = self.lock().get_mut(host) {
            entry.consecutive_failures = 0;
        }
    }

    pub fn record_failure(&self, host: &str) {
        let mut hosts = self.lock();
        let entry = hosts.entry(host.to_string()).or_default();
        entry.consecutive_failures += 1;
        if entry.consecutive_failures >= self.failure_threshold {
            entry.state = BreakerState::Open {
                tripped_at: Instant::now(),
            };
        }
    }

    /// Immediately open the breaker for `host` (HTTP 403).
    pub fn trip(&self, host: &str) {
        let mut hosts = self.lock();
        let entry = hosts.entry(host.to_string()).or_default();
        entry.state = BreakerState::Open {
            tripped_at: Instant::now(),
        };
    }

    pub fn state(&self, host: &str) -> BreakerState {
        self.lock()
            .get(host)
            .map(|e| e.state)
            .unwrap_or(BreakerState::Closed)
    }

    /// Remaining cooldown for `host` (zero if closed).
    pub fn remaining_cooldown(&self, host: &str) -> Duration {
        match self.state(host) {
            BreakerState::Closed => Duration::ZERO,
            BreakerState::Open { tripped_at } => {
                self.cooldown.saturating_sub(tripped_at.elapsed())
            }
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::default_provider()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_host_is_allowed() {
        let cb = CircuitBreaker::new(Duration::from_secs(60), 3);
        assert!(cb.is_allowed("fred.stlouisfed.org"));
        assert_eq!(cb.remaining_cooldown("fred.stlouisfed.org"), Duration::ZERO);
    }

    #[test]
    fn trips_after_threshold_failures() {
        let cb = CircuitBreaker::new(Duration::from_secs(60), 3);
        cb.record_failure("a");
        cb.record_failure("a");
        assert!(cb.is_allowed("a"));
        cb.record_failure("a");
        assert!(!cb.is_allowed("a"));
    }

    #[test]
    fn hosts_are_isolated() {
        let cb = CircuitBreaker::new(Duration::from_secs(60), 3);
        cb.trip("query2.finance.yahoo.com");
        assert!(!cb.is_allowed("query2.finance.yahoo.com"));
        assert!(cb.is_allowed("fred.stlouisfed.org"));
    }

    #[test]
    fn success_resets_counter() {
        let cb = CircuitBreaker::new(Duration::from_secs(60), 3);
        cb.record_failure("a");
        cb.record_failure("a");
        cb.record_success("a");
        cb.record_failure("a");
        assert!(cb.is_allowed("a"));
    }

    #[test]
    fn expires_after_cooldown() {
        let cb = CircuitBreaker::new(Duration::from_millis(10), 3);
        cb.trip("a");
        assert!(!cb.is_allowed("a"));
        std::thread::sleep(Duration::from_millis(15));
        assert!(cb.is_allowed("a"));
        assert_eq!(cb.state("a"), BreakerState::Closed);
    }
}
