//! In-process upstream that answers with a canned response.
//!
//! Stands in for a real backend when exercising selection and dispatch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};

use crate::upstream::{Upstream, UpstreamHealth};

#[derive(Debug)]
pub struct FixedUpstream {
    address: String,
    status: StatusCode,
    body: String,
    health: Arc<UpstreamHealth>,
    served: AtomicUsize,
}

impl FixedUpstream {
    /// An upstream answering `200 OK` with its own address as the body.
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            body: address.clone(),
            address,
            status: StatusCode::OK,
            health: Arc::new(UpstreamHealth::new()),
            served: AtomicUsize::new(0),
        }
    }

    pub fn with_response(mut self, status: StatusCode, body: impl Into<String>) -> Self {
        self.status = status;
        self.body = body.into();
        self
    }

    pub fn health(&self) -> Arc<UpstreamHealth> {
        self.health.clone()
    }

    pub fn set_alive(&self, alive: bool) {
        self.health.set_alive(alive);
    }

    /// Number of requests this upstream has served.
    pub fn served(&self) -> usize {
        self.served.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Upstream for FixedUpstream {
    fn address(&self) -> &str {
        &self.address
    }

    fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    async fn serve(&self, _request: Request<Body>) -> Response<Body> {
        self.served.fetch_add(1, Ordering::Relaxed);
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        response
    }
}
