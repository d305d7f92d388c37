//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher / upstreams produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (text or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID (x-request-id) is attached by the HTTP layer and shows up in trace spans
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
