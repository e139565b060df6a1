use std::sync::Arc;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use parishdb::{
    api::{self, AppState},
    config::{CliArgs, Config, StorageKind},
    office::ParishOffice,
};
use parishdb_core::{Snapshot, StorageBackend};
use parishdb_memory::InMemoryStorage;
use parishdb_sqlite::SqliteStorage;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();
    let config = Config::load(&cli);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let storage: Arc<dyn StorageBackend> = match config.storage.backend {
        StorageKind::Memory => Arc::new(InMemoryStorage::new()),
        StorageKind::Sqlite => match SqliteStorage::new(&config.storage.path) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                tracing::error!(path = %config.storage.path, error = %e, "Failed to open SQLite store");
                std::process::exit(1);
            }
        },
    };
    tracing::info!(backend = ?config.storage.backend, "Storage ready");

    let office = ParishOffice::new(storage);
    let on_change = Arc::new(|snapshot: &Snapshot| {
        tracing::debug!(records = snapshot.len(), "Store changed");
    });
    if let Err(e) = office.init(on_change, &config.seed.parishes) {
        tracing::error!(error = %e, "Failed to initialize parish directory");
        std::process::exit(1);
    }

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Metrics exporter unavailable");
            None
        }
    };

    let app = api::router(Arc::new(AppState::new(office, metrics)));

    let addr = match config.listen_addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, "Invalid listen address");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "API listening");

    if let Err(e) = axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }
}
