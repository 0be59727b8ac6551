//! Theia - distributed log-event aggregator
//!
//! This binary runs the Collector: it terminates watcher push channels,
//! persists every received event, answers historical queries and fans
//! matching events out to live subscribers.
//!
//! # Usage
//!
//! ```bash
//! # File-backed store in ./events, listening on 0.0.0.0:6433
//! theia
//!
//! # Custom bind and data directory
//! theia --host 127.0.0.1 --port 7000 --data-dir /var/lib/theia
//!
//! # Relational backend
//! theia --store rdbs --db-url /var/lib/theia/events.db
//! ```

mod cmd;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Theia log-event collector
#[derive(Parser, Debug)]
#[command(name = "theia")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    serve: cmd::serve::ServeArgs,

    /// Verbose logging (debug level). RUST_LOG overrides this.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    cmd::serve::run(cli.serve).await
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
