//! ShopPulse: storefront analytics aggregation service.
//!
//! Main entry point that wires the event store, ingestion pipeline, and
//! reporting façade, then starts the HTTP server.

use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use shoppulse_analytics::ClickHouseEventStore;
use shoppulse_api::{ApiServer, AppState};
use shoppulse_core::config::AppConfig;
use shoppulse_core::store::{
    EventStore, MemoryCommerceSource, MemoryEventStore, MemoryProductCatalog,
};
use shoppulse_ingest::{
    ActorResolver, EnvironmentContext, EventTracker, HttpGeoLookup, HttpOriginLookup,
    MemorySessionStorage, SessionManager,
};
use shoppulse_reporting::DashboardReporter;

#[derive(Parser, Debug)]
#[command(name = "shop-pulse")]
#[command(about = "Storefront analytics aggregation service")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "SHOP_PULSE__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "SHOP_PULSE__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Hostname used for production classification
    #[arg(long, env = "SHOP_PULSE__HOSTNAME", default_value = "localhost")]
    hostname: String,

    /// Force production classification (enables ingestion)
    #[arg(long, default_value_t = false)]
    production: bool,

    /// Use the in-memory event store instead of ClickHouse
    #[arg(long, default_value_t = false)]
    memory_store: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shop_pulse=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("ShopPulse starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if cli.production {
        config.tracking.production = true;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        hostname = %cli.hostname,
        production = config.tracking.production,
        "Configuration loaded"
    );

    // Event store: ClickHouse in production, in-memory for local runs
    let store: Arc<dyn EventStore> = if cli.memory_store {
        info!("Using in-memory event store");
        Arc::new(MemoryEventStore::new())
    } else {
        Arc::new(ClickHouseEventStore::new(&config.clickhouse).await?)
    };

    // Ingestion pipeline
    let lookup_timeout = Duration::from_millis(config.tracking.lookup_timeout_ms);
    let origin = Arc::new(HttpOriginLookup::new(
        &config.tracking.origin_endpoint,
        lookup_timeout,
    )?);
    let geo = Arc::new(HttpGeoLookup::new(&config.tracking.geo_endpoint, lookup_timeout)?);
    let environment = EnvironmentContext::from_config(&config.tracking, cli.hostname.clone());
    let sessions = SessionManager::new(Arc::new(MemorySessionStorage::new()));
    let tracker = Arc::new(EventTracker::new(
        store.clone(),
        sessions,
        origin,
        geo,
        environment,
        lookup_timeout,
    ));
    let resolver = ActorResolver::new(config.tracking.admin_users.clone());

    // Catalog and commerce snapshots, kept current via the sync endpoints
    let catalog = Arc::new(MemoryProductCatalog::new());
    let commerce = Arc::new(MemoryCommerceSource::new());

    // Reporting façade
    let reporter = Arc::new(DashboardReporter::new(
        store.clone(),
        catalog.clone(),
        commerce.clone(),
    ));

    let state = AppState {
        tracker,
        reporter,
        resolver,
        catalog,
        commerce,
        node_id: config.node_id.clone(),
        start_time: Instant::now(),
    };

    let server = ApiServer::new(config, state);
    server.start_metrics().await?;
    server.start_http().await?;

    Ok(())
}
