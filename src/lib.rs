//! Round-robin HTTP reverse proxy library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::{Dispatcher, HttpServer};
pub use lifecycle::Shutdown;
pub use load_balancer::{NoUpstreamAvailable, UpstreamPool};
pub use upstream::Upstream;
