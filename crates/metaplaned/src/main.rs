//! metaplaned — the topology registry daemon.
//!
//! Single binary that assembles the registry subsystems:
//! - Snapshot persistence (redb)
//! - Universe store + ownership index, hydrated from storage
//! - REST API server
//!
//! # Usage
//!
//! ```text
//! metaplaned serve --port 9000 --data-dir /var/lib/metaplane
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use metaplane_registry::{OwnershipIndex, UniverseStore};
use metaplane_state::SnapshotStore;

#[derive(Parser)]
#[command(name = "metaplaned", about = "Metaplane topology registry daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the registry API server.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "9000")]
        port: u16,

        /// Data directory for persistent state.
        #[arg(long, default_value = "/var/lib/metaplane")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,metaplaned=debug,metaplane=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { port, data_dir } => serve(port, data_dir).await,
    }
}

async fn serve(port: u16, data_dir: PathBuf) -> anyhow::Result<()> {
    info!("metaplane daemon starting");

    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("metaplane.redb");

    // Snapshot persistence.
    let storage = SnapshotStore::open(&db_path)?;
    info!(path = ?db_path, "snapshot store opened");

    // Universe store, hydrated with whatever storage has.
    let store = UniverseStore::new().with_sink(Arc::new(storage.clone()));
    let snapshots = storage.load_universes()?;
    info!(universes = snapshots.len(), "hydrating registry");

    // Ownership index rebuilt from each snapshot's owner.
    let ownership = OwnershipIndex::new();
    for snapshot in &snapshots {
        ownership.add_ownership(&snapshot.customer_id, &snapshot.universe_id)?;
    }
    store.hydrate(snapshots);

    // ── Start API server ───────────────────────────────────────

    let router = metaplane_api::build_router(store, ownership);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
            }
        })
        .await?;

    info!("metaplane daemon stopped");
    Ok(())
}
