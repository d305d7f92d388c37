//! Error responses produced by the proxy itself.
//!
//! # Responsibilities
//! - Map selection and forwarding failures to HTTP status codes
//!
//! # Design Decisions
//! - No live upstream results in 503 Service Unavailable
//! - Upstream timeouts result in 504 Gateway Timeout
//! - Any other transport failure results in 502 Bad Gateway

use axum::body::Body;
use axum::http::{header, Response, StatusCode};

use crate::load_balancer::NoUpstreamAvailable;
use crate::upstream::ForwardError;

fn plain(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Response for a request that found no live upstream.
pub fn no_upstream_response(_err: &NoUpstreamAvailable) -> Response<Body> {
    plain(StatusCode::SERVICE_UNAVAILABLE, "No upstream available")
}

/// Response for a forward that failed before the upstream answered.
pub fn forward_error_response(err: &ForwardError) -> Response<Body> {
    match err {
        ForwardError::Timeout(_) => plain(StatusCode::GATEWAY_TIMEOUT, "Upstream timed out"),
        ForwardError::Transport(_) | ForwardError::InvalidRequest(_) => {
            plain(StatusCode::BAD_GATEWAY, "Upstream request failed")
        }
    }
}
