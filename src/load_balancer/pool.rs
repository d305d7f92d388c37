//! Upstream pool management.
//!
//! # Responsibilities
//! - Hold the fixed, ordered list of upstreams
//! - Apply the load balancing strategy to select one
//! - Refuse to exist without at least one upstream

use std::sync::Arc;

use thiserror::Error;

use crate::config::ProxyConfig;
use crate::config::validation::parse_upstream_address;
use crate::load_balancer::{round_robin::RoundRobin, LoadBalancer, NoUpstreamAvailable};
use crate::upstream::{HttpUpstream, ProxyClient, Upstream};

/// Error building a pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("upstream pool is empty")]
    Empty,

    #[error("invalid upstream address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },
}

/// Fixed set of upstreams plus the strategy rotating through them.
#[derive(Debug)]
pub struct UpstreamPool {
    upstreams: Vec<Arc<dyn Upstream>>,
    balancer: Box<dyn LoadBalancer>,
}

impl UpstreamPool {
    /// Create a round-robin pool. Order of `upstreams` is the rotation order.
    pub fn new(upstreams: Vec<Arc<dyn Upstream>>) -> Result<Self, PoolError> {
        Self::with_balancer(upstreams, Box::new(RoundRobin::new()))
    }

    pub fn with_balancer(
        upstreams: Vec<Arc<dyn Upstream>>,
        balancer: Box<dyn LoadBalancer>,
    ) -> Result<Self, PoolError> {
        if upstreams.is_empty() {
            return Err(PoolError::Empty);
        }
        Ok(Self { upstreams, balancer })
    }

    /// Build HTTP upstreams for every configured address.
    ///
    /// Any malformed address fails the whole pool; entries are never dropped.
    pub fn from_config(config: &ProxyConfig, client: ProxyClient) -> Result<Self, PoolError> {
        let mut upstreams: Vec<Arc<dyn Upstream>> = Vec::with_capacity(config.upstreams.len());

        for upstream in &config.upstreams {
            let target = parse_upstream_address(&upstream.address).map_err(|reason| {
                PoolError::InvalidAddress {
                    address: upstream.address.clone(),
                    reason,
                }
            })?;

            let http = HttpUpstream::new(upstream.address.clone(), target, client.clone(), &config.timeouts)
                .with_passive_health(&config.health);
            upstreams.push(Arc::new(http));
        }

        Self::new(upstreams)
    }

    /// Select the next live upstream.
    pub fn next(&self) -> Result<Arc<dyn Upstream>, NoUpstreamAvailable> {
        match self.balancer.next_server(&self.upstreams) {
            Some(upstream) => Ok(upstream),
            None => {
                tracing::debug!(upstream_count = self.upstreams.len(), "No live upstream found in pool");
                for u in &self.upstreams {
                    tracing::debug!(upstream = %u.address(), alive = u.is_alive(), "Upstream status");
                }
                Err(NoUpstreamAvailable {
                    probed: self.upstreams.len(),
                })
            }
        }
    }

    /// All upstreams in rotation order.
    pub fn upstreams(&self) -> &[Arc<dyn Upstream>] {
        &self.upstreams
    }

    pub fn len(&self) -> usize {
        self.upstreams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upstreams.is_empty()
    }
}
