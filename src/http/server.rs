//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router sending every path and method to the dispatcher
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener with client address info
//! - Stop accepting on shutdown and drain in-flight requests

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::http::dispatcher::Dispatcher;
use crate::load_balancer::UpstreamPool;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    pool: Arc<UpstreamPool>,
}

impl HttpServer {
    /// Create a server forwarding to `pool`.
    pub fn new(pool: Arc<UpstreamPool>) -> Self {
        let state = AppState {
            dispatcher: Dispatcher::new(pool.clone()),
        };
        Self {
            router: Self::build_router(state),
            pool,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn pool(&self) -> &Arc<UpstreamPool> {
        &self.pool
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstreams = self.pool.len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Every route lands here.
async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response<Body> {
    state.dispatcher.handle(request).await
}
