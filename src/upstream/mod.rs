//! Upstream abstraction.
//!
//! # Data Flow
//! ```text
//! Dispatcher picked an upstream
//!     → Upstream::serve(request)
//!         - http.rs: rewrite URI + headers, relay through client.rs
//!         - health.rs: optional passive liveness update
//!         - fixed.rs: canned in-process responses
//!     → Response (backend's own, or 502/504 on transport failure)
//! ```
//!
//! # Design Decisions
//! - Selection only needs `address` and `is_alive`; forwarding only needs `serve`
//! - `serve` never returns an error: transport failures become gateway responses
//! - No retry against the same or another upstream

pub mod client;
pub mod fixed;
pub mod health;
pub mod http;

use std::fmt;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use thiserror::Error;

pub use client::{build_client, ProxyClient};
pub use fixed::FixedUpstream;
pub use health::{HealthState, UpstreamHealth};
pub use http::HttpUpstream;

/// One backend the proxy can forward to.
#[async_trait]
pub trait Upstream: Send + Sync + fmt::Debug {
    /// The address this upstream was configured with.
    fn address(&self) -> &str;

    /// Whether the upstream is currently eligible for selection.
    ///
    /// Must return promptly; callers probe it while selecting.
    fn is_alive(&self) -> bool;

    /// Forward `request` and produce the response to send back to the client.
    async fn serve(&self, request: Request<Body>) -> Response<Body>;
}

/// Why a forward did not produce a backend response.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream did not respond within {0:?}")]
    Timeout(std::time::Duration),

    #[error("upstream request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("could not build upstream request: {0}")]
    InvalidRequest(#[from] axum::http::Error),
}
