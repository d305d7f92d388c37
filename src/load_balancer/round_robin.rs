//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::LoadBalancer;
use crate::upstream::Upstream;

/// Round-robin selector.
///
/// The counter only ever grows (wrapping on overflow); the index is taken
/// modulo the pool size when read. Every probed index consumes one tick, so
/// the next call resumes right after the upstream just returned, and a
/// skipped upstream is not retried first on the following call.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current raw cursor value.
    pub fn cursor(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, upstreams: &[Arc<dyn Upstream>]) -> Option<Arc<dyn Upstream>> {
        let len = upstreams.len();

        // At most one probe per upstream, so an all-dead pool still returns.
        for _ in 0..len {
            let index = self.counter.fetch_add(1, Ordering::Relaxed) % len;
            let upstream = &upstreams[index];
            if upstream.is_alive() {
                return Some(upstream.clone());
            }
        }
        None
    }
}
