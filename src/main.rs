//! Music API gateway (v1)
//!
//! Front door for the music backend, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                   GATEWAY                         │
//!                         │                                                   │
//!     Client Request      │  ┌──────────┐   ┌──────────┐   ┌─────────────┐   │
//!     ────────────────────┼─▶│ security │──▶│   http   │──▶│   routing   │───┼──▶ search / stream /
//!                         │  │cors+limit│   │body+log  │   │ /api/v1/... │   │    tracks services
//!                         │  └──────────┘   └──────────┘   └─────────────┘   │
//!                         │                                                   │
//!     Client Response     │  ┌──────────────────────────────────────────┐    │
//!     ◀───────────────────┼──│ error handler · headers · compression    │◀───┤
//!                         │  └──────────────────────────────────────────┘    │
//!                         │                                                   │
//!                         │  config · health · lifecycle · observability      │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use music_gateway::config::load_config;
use music_gateway::http::HttpServer;
use music_gateway::lifecycle::{await_server, install_panic_hook, startup, termination_signal, Shutdown};
use music_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "music-gateway")]
#[command(about = "HTTP gateway for the music API", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // .env is optional; real environment variables win.
    let _ = dotenvy::dotenv();

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("music-gateway: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    if let Err(e) = logging::init(config.observability.log_format, config.mode) {
        eprintln!("music-gateway: failed to initialise logging: {}", e);
        return ExitCode::FAILURE;
    }
    install_panic_hook();

    tracing::info!("music-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = match HttpServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build gateway");
            return ExitCode::FAILURE;
        }
    };

    let listener = match startup::bind(server.config()).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start server");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        let received = termination_signal().await;
        tracing::info!(signal = %received, "{} received, shutting down", received);
        shutdown.trigger();
    });

    // The server runs in its own task so a panic escaping it is observed
    // here instead of unwinding through main.
    let outcome = await_server(tokio::spawn(server.run(listener, signal))).await;
    ExitCode::from(outcome.exit_code())
}
