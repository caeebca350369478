use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pharmacy_orders::api::{self, AppState};
use pharmacy_orders::config::{Config, StorageBackend};
use pharmacy_orders::domain::inventory::InventoryAdjuster;
use pharmacy_orders::domain::order::ApprovalEngine;
use pharmacy_orders::metrics::Metrics;
use pharmacy_orders::store::{
    ensure_schema, CatalogStore, InMemoryCatalogStore, InMemoryOrderStore, OrderStore, ScyllaCatalogStore,
    ScyllaOrderStore,
};
use pharmacy_orders::utils::{retry_with_backoff, RetryConfig};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;

    // RUST_LOG wins over the configured filter
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter)))
        .init();

    tracing::info!(
        backend = ?config.storage.backend,
        report_inventory_outcomes = config.approval.report_inventory_outcomes,
        "Starting pharmacy order service"
    );

    let (orders, catalog) = build_stores(&config).await?;

    for item in &config.catalog.seed {
        catalog.upsert(item).await?;
    }
    if !config.catalog.seed.is_empty() {
        tracing::info!(items = config.catalog.seed.len(), "Catalog seeded");
    }

    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("Metrics registry created with {} metrics", metrics.registry().gather().len());

    let inventory = Arc::new(InventoryAdjuster::new(
        catalog.clone(),
        metrics.clone(),
        config.approval.stock_cas_attempts,
    ));
    let engine = Arc::new(ApprovalEngine::new(orders.clone(), inventory, metrics.clone()));

    let state = web::Data::new(AppState {
        orders,
        catalog,
        engine,
        metrics,
        report_inventory_outcomes: config.approval.report_inventory_outcomes,
    });

    let (host, port) = config.bind_address();
    tracing::info!(host = %host, port = port, "HTTP server listening");

    let mut server = HttpServer::new(move || App::new().app_data(state.clone()).configure(api::configure));
    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }
    server.bind((host.as_str(), port))?.run().await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn build_stores(config: &Config) -> anyhow::Result<(Arc<dyn OrderStore>, Arc<dyn CatalogStore>)> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory stores; data is lost on restart");
            let orders: Arc<dyn OrderStore> = Arc::new(InMemoryOrderStore::new());
            let catalog: Arc<dyn CatalogStore> = Arc::new(InMemoryCatalogStore::new());
            Ok((orders, catalog))
        }
        StorageBackend::Scylla => {
            let scylla = &config.storage.scylla;
            tracing::info!(nodes = ?scylla.known_nodes, "Connecting to ScyllaDB...");

            let retry = RetryConfig::default().with_max_attempts(config.startup.connect_attempts);
            let session: Session = retry_with_backoff("scylla_connect", retry, |_| async move {
                SessionBuilder::new().known_nodes(&scylla.known_nodes).build().await
            })
            .await?;

            ensure_schema(&session, &scylla.keyspace, scylla.replication_factor).await?;
            tracing::info!(keyspace = %scylla.keyspace, "ScyllaDB schema ready");

            let session = Arc::new(session);
            let orders: Arc<dyn OrderStore> = Arc::new(ScyllaOrderStore::new(session.clone()));
            let catalog: Arc<dyn CatalogStore> = Arc::new(ScyllaCatalogStore::new(session));
            Ok((orders, catalog))
        }
    }
}
