//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → pool.rs (fixed, ordered upstream list)
//!     → round_robin.rs (rotate through live upstreams)
//!     → Return upstream or NoUpstreamAvailable
//! ```
//!
//! # Design Decisions
//! - The pool is read-only after construction and shared without locks
//! - The rotation cursor is the only mutable state and is a single atomic
//! - Dead upstreams are skipped; a call probes each upstream at most once

pub mod pool;
pub mod round_robin;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::upstream::Upstream;

pub use pool::{PoolError, UpstreamPool};
pub use round_robin::RoundRobin;

/// Strategy choosing one upstream out of a pool.
pub trait LoadBalancer: Send + Sync + fmt::Debug {
    /// Pick a live upstream, or `None` if no probe found one.
    fn next_server(&self, upstreams: &[Arc<dyn Upstream>]) -> Option<Arc<dyn Upstream>>;
}

/// Every upstream probed during a selection reported not alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no upstream available ({probed} probed)")]
pub struct NoUpstreamAvailable {
    pub probed: usize,
}
