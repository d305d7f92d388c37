//! Upstream liveness state machine.
//!
//! # States
//! - Unknown: never observed, still eligible for selection
//! - Healthy: receives traffic
//! - Unhealthy: skipped by the load balancer
//!
//! # State Transitions
//! ```text
//! Healthy/Unknown → Unhealthy: consecutive failures >= unhealthy_threshold
//! Unhealthy/Unknown → Healthy: consecutive successes >= healthy_threshold
//! ```
//!
//! An Unhealthy upstream becomes selectable again once `retry_after` has
//! passed since its last recorded failure. A failure in that window restarts
//! the wait; successes count toward `healthy_threshold`.
//!
//! The handle is shared through `Arc`, so whatever decides liveness (passive
//! observation, an external prober, tests) only needs a clone of it.

use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

/// Liveness signal for one upstream.
#[derive(Debug)]
pub struct UpstreamHealth {
    state: AtomicU8,
    consecutive_failures: AtomicUsize,
    consecutive_successes: AtomicUsize,
    /// Milliseconds since `epoch` of the last failure seen while down.
    down_since_ms: AtomicU64,
    epoch: Instant,
}

impl UpstreamHealth {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(HealthState::Unknown as u8),
            consecutive_failures: AtomicUsize::new(0),
            consecutive_successes: AtomicUsize::new(0),
            down_since_ms: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn state(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Relaxed))
    }

    /// True unless the upstream has been marked unhealthy.
    pub fn is_alive(&self) -> bool {
        self.state() != HealthState::Unhealthy
    }

    /// Like [`is_alive`](Self::is_alive), but an Unhealthy upstream counts as
    /// selectable once `retry_after` has passed since its last failure.
    pub fn is_selectable(&self, retry_after: Duration) -> bool {
        if self.is_alive() {
            return true;
        }
        let since = self.down_since_ms.load(Ordering::Relaxed);
        let waited = Duration::from_millis(self.now_ms().saturating_sub(since));
        waited >= retry_after
    }

    /// Force the state, bypassing thresholds. Counters are reset.
    pub fn set_alive(&self, alive: bool) {
        let state = if alive {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        };
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.consecutive_successes.store(0, Ordering::Relaxed);
        if !alive {
            self.down_since_ms.store(self.now_ms(), Ordering::Relaxed);
        }
        self.state.store(state as u8, Ordering::Relaxed);
    }

    /// Report a successful forward.
    ///
    /// Returns true if this call moved the upstream to Healthy.
    pub fn mark_success(&self, healthy_threshold: usize) -> bool {
        self.consecutive_failures.store(0, Ordering::Relaxed);

        if self.state() == HealthState::Healthy {
            return false;
        }

        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= healthy_threshold {
            self.consecutive_successes.store(0, Ordering::Relaxed);
            self.state.store(HealthState::Healthy as u8, Ordering::Relaxed);
            return true;
        }
        false
    }

    /// Report a failed forward.
    ///
    /// Returns true if this call moved the upstream to Unhealthy.
    pub fn mark_failure(&self, unhealthy_threshold: usize) -> bool {
        self.consecutive_successes.store(0, Ordering::Relaxed);

        if self.state() == HealthState::Unhealthy {
            self.down_since_ms.store(self.now_ms(), Ordering::Relaxed);
            return false;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= unhealthy_threshold {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            self.down_since_ms.store(self.now_ms(), Ordering::Relaxed);
            self.state.store(HealthState::Unhealthy as u8, Ordering::Relaxed);
            return true;
        }
        false
    }
}

impl Default for UpstreamHealth {
    fn default() -> Self {
        Self::new()
    }
}
