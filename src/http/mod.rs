//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → dispatcher.rs (pick upstream from the pool)
//!     → Upstream::serve (headers.rs rewrites, relay)
//!     → response.rs (503 / 502 / 504 when the proxy answers itself)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod headers;
pub mod response;
pub mod server;

pub use dispatcher::Dispatcher;
pub use server::HttpServer;
