//! Round-robin HTTP reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │               REVERSE PROXY                  │
//!                         │                                              │
//!     Client Request      │  ┌─────────┐    ┌────────────┐               │
//!     ────────────────────┼─▶│  http   │───▶│ dispatcher │               │
//!                         │  │ server  │    └─────┬──────┘               │
//!                         │  └─────────┘          │                      │
//!                         │                       ▼                      │
//!                         │               ┌──────────────┐               │
//!                         │               │load_balancer │               │
//!                         │               │ pool + rr    │               │
//!                         │               └──────┬───────┘               │
//!                         │                      ▼                       │
//!     Client Response     │               ┌──────────────┐               │
//!     ◀───────────────────┼───────────────│  upstream    │◀──────────────┼──── Backend
//!                         │               │  relay       │               │
//!                         │               └──────────────┘               │
//!                         │                                              │
//!                         │  config · lifecycle · observability          │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use clap::Parser;

use round_robin_proxy::lifecycle::{startup, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match startup::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("round-robin-proxy: {}", e);
            ExitCode::FAILURE
        }
    }
}
