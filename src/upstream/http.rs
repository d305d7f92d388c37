//! Forwarding upstream backed by the shared HTTP client.
//!
//! # Responsibilities
//! - Rewrite the inbound request onto the upstream origin (single-host relay)
//! - Relay it through the pooled client under a request timeout
//! - Map transport failures to 502 / 504 responses
//! - Optionally feed outcomes into the upstream's liveness

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderValue, Request, Response, StatusCode, Uri};
use url::Url;

use crate::config::{HealthConfig, TimeoutConfig};
use crate::http::headers::{append_forwarded_for, strip_hop_by_hop};
use crate::http::response::forward_error_response;
use crate::upstream::{ForwardError, ProxyClient, Upstream, UpstreamHealth};

/// Consecutive-outcome thresholds used when passive health is on.
#[derive(Debug, Clone, Copy)]
struct PassiveHealth {
    healthy_threshold: usize,
    unhealthy_threshold: usize,
    retry_after: Duration,
}

/// An upstream reached over HTTP or HTTPS.
#[derive(Debug)]
pub struct HttpUpstream {
    address: String,
    target: Url,
    client: ProxyClient,
    health: Arc<UpstreamHealth>,
    request_timeout: Duration,
    passive: Option<PassiveHealth>,
}

impl HttpUpstream {
    /// Create an upstream for an already-validated target URL.
    pub fn new(address: impl Into<String>, target: Url, client: ProxyClient, timeouts: &TimeoutConfig) -> Self {
        Self {
            address: address.into(),
            target,
            client,
            health: Arc::new(UpstreamHealth::new()),
            request_timeout: Duration::from_secs(timeouts.request_secs),
            passive: None,
        }
    }

    /// Share an externally owned liveness signal.
    pub fn with_health(mut self, health: Arc<UpstreamHealth>) -> Self {
        self.health = health;
        self
    }

    /// Track forwarding outcomes in this upstream's liveness.
    pub fn with_passive_health(mut self, config: &HealthConfig) -> Self {
        if config.passive_enabled {
            self.passive = Some(PassiveHealth {
                healthy_threshold: config.healthy_threshold as usize,
                unhealthy_threshold: config.unhealthy_threshold as usize,
                retry_after: Duration::from_millis(config.retry_after_ms),
            });
        }
        self
    }

    /// Handle to this upstream's liveness signal.
    pub fn health(&self) -> Arc<UpstreamHealth> {
        self.health.clone()
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let (mut parts, body) = request.into_parts();

        let client_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        parts.uri = rewrite_uri(&self.target, &parts.uri)?;
        strip_hop_by_hop(&mut parts.headers);
        if let Some(ip) = client_ip {
            append_forwarded_for(&mut parts.headers, ip);
        }
        if let Some(authority) = parts.uri.authority() {
            if let Ok(host) = HeaderValue::from_str(authority.as_str()) {
                parts.headers.insert(header::HOST, host);
            }
        }

        let upstream_request = Request::from_parts(parts, body);
        let response = tokio::time::timeout(self.request_timeout, self.client.request(upstream_request))
            .await
            .map_err(|_| ForwardError::Timeout(self.request_timeout))??;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }

    fn record_outcome(&self, status: StatusCode) {
        let Some(passive) = self.passive else {
            return;
        };

        let failed = matches!(
            status,
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
        );
        if failed {
            if self.health.mark_failure(passive.unhealthy_threshold) {
                tracing::warn!(upstream = %self.address, "Upstream marked down");
            }
        } else if self.health.mark_success(passive.healthy_threshold) {
            tracing::info!(upstream = %self.address, "Upstream marked alive");
        }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    fn address(&self) -> &str {
        &self.address
    }

    fn is_alive(&self) -> bool {
        match self.passive {
            Some(passive) => self.health.is_selectable(passive.retry_after),
            None => self.health.is_alive(),
        }
    }

    async fn serve(&self, request: Request<Body>) -> Response<Body> {
        let response = match self.forward(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(upstream = %self.address, error = %e, "Upstream error");
                forward_error_response(&e)
            }
        };
        self.record_outcome(response.status());
        response
    }
}

/// Map an inbound request URI onto `target`.
///
/// Scheme and authority come from the target. The path is the target path
/// joined to the request path with a single slash; queries are joined with `&`.
pub fn rewrite_uri(target: &Url, inbound: &Uri) -> Result<Uri, ForwardError> {
    let path = join_paths(target.path(), inbound.path());

    let query = match (target.query().filter(|q| !q.is_empty()), inbound.query()) {
        (Some(t), Some(i)) if !i.is_empty() => format!("?{}&{}", t, i),
        (Some(t), _) => format!("?{}", t),
        (None, Some(i)) => format!("?{}", i),
        (None, None) => String::new(),
    };

    let authority = &target[url::Position::BeforeHost..url::Position::AfterPort];
    let uri = Uri::builder()
        .scheme(target.scheme())
        .authority(authority)
        .path_and_query(format!("{}{}", path, query))
        .build()?;
    Ok(uri)
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}
