//! Serve command - run the collector
//!
//! Wires the configured store backend, the live broker and the WebSocket
//! server together, then runs until SIGINT/SIGTERM. Shutdown stops the
//! broker maintenance sweep and flushes the store.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use theia_live::Broker;
use theia_server::{build_router, AppState};
use theia_store::{open_store, StoreKind};

/// Serve command arguments
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Bind host
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Bind port
    #[arg(short, long, default_value_t = 6433)]
    pub port: u16,

    /// Data directory for the file store
    #[arg(short, long, default_value = "./events")]
    pub data_dir: String,

    /// Store backend
    #[arg(long, value_enum, default_value_t = StoreArg::File)]
    pub store: StoreArg,

    /// Database URL for the rdbs backend (path or :memory:)
    #[arg(long)]
    pub db_url: Option<String>,
}

/// Store backend selection on the command line
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum StoreArg {
    /// File-per-bucket segments under the data directory
    File,
    /// Relational backend
    Rdbs,
}

impl From<StoreArg> for StoreKind {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::File => StoreKind::File,
            StoreArg::Rdbs => StoreKind::Rdbs,
        }
    }
}

/// Run the collector until a shutdown signal arrives.
pub async fn run(args: ServeArgs) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        store = ?args.store,
        data_dir = %args.data_dir,
        "theia collector starting"
    );

    let store = open_store(args.store.into(), &args.data_dir, args.db_url.as_deref())
        .await
        .context("failed to open event store")?;

    let broker = Arc::new(Broker::new());
    let shutdown = CancellationToken::new();
    let maintenance = broker.spawn_maintenance(shutdown.clone());

    let state = Arc::new(AppState::new(Arc::clone(&store), Arc::clone(&broker)));
    let router = build_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "collector listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_shutdown())
        .await
        .context("server error")?;

    info!("shutdown signal received, stopping collector");
    shutdown.cancel();
    if let Err(e) = maintenance.await {
        warn!(error = %e, "broker maintenance task ended abnormally");
    }

    let stats = broker.stats();
    info!(
        dispatched = stats.dispatched,
        delivered = stats.delivered,
        subscribers = stats.subscriber_count,
        "live broker stopped"
    );

    store.close().await.context("failed to flush event store")?;
    info!("theia shutdown complete");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
