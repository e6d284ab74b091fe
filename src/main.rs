//! File sorter service: binary entrypoint.
//! Boots the Axum HTTP server that receives S3 notifications for the incoming
//! bucket and routes each file to its instrument bucket.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use file_sorter::api::{self, AppState};
use file_sorter::metrics::Metrics;
use file_sorter::{FileSorter, SorterConfig};

/// Logging: `RUST_LOG` filter (default `file_sorter=info,warn`), JSON lines
/// when `SORTER_LOG_JSON=1`, compact text otherwise.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("file_sorter=info,warn"));
    let json = std::env::var("SORTER_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    // The runtime may already have installed a subscriber; keep it if so.
    let _ = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = SorterConfig::from_env();
    let sorter = FileSorter::from_config(&config).await?;
    let metrics = Metrics::init(sorter.mapping().len())?;

    let router = api::router(AppState::new(sorter)).merge(metrics.router());
    Ok(router.into())
}
