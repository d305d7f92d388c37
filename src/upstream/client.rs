//! Shared HTTP client used to relay requests to upstreams.

use std::time::Duration;

use axum::body::Body;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;

/// Pooled client that speaks to both `http` and `https` upstreams.
pub type ProxyClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Build the client shared by every upstream.
pub fn build_client(timeouts: &TimeoutConfig) -> Result<ProxyClient, rustls::Error> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_nodelay(true);
    http.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

    let https = HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    Ok(Client::builder(TokioExecutor::new()).build(https))
}
