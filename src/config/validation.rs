//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject an empty upstream pool and malformed upstream addresses
//! - Validate value ranges (timeouts > 0, thresholds > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no upstreams configured")]
    NoUpstreams,

    #[error("upstream #{index} has invalid address {address:?}: {reason}")]
    InvalidUpstream {
        index: usize,
        address: String,
        reason: String,
    },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("invalid bind host {0:?}")]
    InvalidBindHost(String),

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),
}

/// Check that an upstream address is an absolute http(s) URL with a host.
///
/// Returns the parsed URL so callers building upstreams don't parse twice.
pub fn parse_upstream_address(address: &str) -> Result<Url, String> {
    let url = Url::parse(address).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme {:?}", other)),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("missing host".to_string());
    }
    Ok(url)
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.upstreams.is_empty() {
        errors.push(ValidationError::NoUpstreams);
    }

    for (index, upstream) in config.upstreams.iter().enumerate() {
        if let Err(reason) = parse_upstream_address(&upstream.address) {
            errors.push(ValidationError::InvalidUpstream {
                index,
                address: upstream.address.clone(),
                reason,
            });
        }
    }

    let host = &config.listener.bind_host;
    if host.is_empty() || (host.parse::<IpAddr>().is_err() && host != "localhost") {
        errors.push(ValidationError::InvalidBindHost(host.clone()));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.connect_secs" });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }
    if config.health.unhealthy_threshold == 0 {
        errors.push(ValidationError::Zero { field: "health.unhealthy_threshold" });
    }
    if config.health.healthy_threshold == 0 {
        errors.push(ValidationError::Zero { field: "health.healthy_threshold" });
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
