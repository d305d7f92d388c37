//! Per-request entry point: select an upstream and hand the request to it.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};

use crate::http::response::no_upstream_response;
use crate::load_balancer::UpstreamPool;
use crate::observability::metrics;

/// Coordinates selection and forwarding. Holds no per-request state.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    pool: Arc<UpstreamPool>,
}

impl Dispatcher {
    pub fn new(pool: Arc<UpstreamPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &UpstreamPool {
        &self.pool
    }

    /// Handle one inbound request.
    ///
    /// Answers 503 when no upstream is live; otherwise the chosen upstream's
    /// response is returned untouched.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let start = Instant::now();
        let method = request.method().to_string();

        let upstream = match self.pool.next() {
            Ok(upstream) => upstream,
            Err(e) => {
                tracing::warn!(error = %e, path = %request.uri().path(), "No upstream available");
                metrics::record_no_upstream();
                let response = no_upstream_response(&e);
                metrics::record_request(&method, response.status().as_u16(), "none", start);
                return response;
            }
        };

        tracing::info!(upstream = %upstream.address(), "Forwarding request");

        let response = upstream.serve(request).await;

        metrics::record_upstream_alive(upstream.address(), upstream.is_alive());
        metrics::record_request(&method, response.status().as_u16(), upstream.address(), start);
        response
    }
}
