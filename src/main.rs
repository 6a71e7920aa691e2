use pool_fee_tracker::{
    config::Settings,
    database::{
        create_database_if_not_exists, establish_connection, run_migrations, test_connection,
        FeeStore, PgFeeStore,
    },
    handlers::create_router,
    services::{ExplorerClient, FeeService, PriceFeedClient, Tracker, TrackerConfig},
    utils::init_logging,
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::new()?;
    init_logging(&settings.logging)?;

    info!("Starting pool fee tracker");

    create_database_if_not_exists(&settings.database.url).await?;
    let db_pool = establish_connection(&settings.database).await?;
    test_connection(&db_pool).await?;
    run_migrations(&db_pool).await?;
    info!("Database ready");

    let explorer = Arc::new(ExplorerClient::new(&settings.explorer)?);
    let price_feed = Arc::new(PriceFeedClient::new(&settings.price_feed)?);
    let store: Arc<dyn FeeStore> = Arc::new(PgFeeStore::new(db_pool));
    let config = TrackerConfig::from_settings(&settings);

    let tracker = Tracker::new(explorer.clone(), price_feed.clone(), store.clone(), config.clone());
    if let Err(e) = tracker.run().await {
        error!(error = %e, "Fee tracker failed to start");
        store.close().await;
        return Err(e.into());
    }

    let app_state = AppState {
        fee_service: Arc::new(FeeService::new(explorer, price_feed, store, config)),
    };
    let app = create_router(app_state);

    let addr: SocketAddr = format!("{}:{}", settings.api.host, settings.api.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server listening on {}", addr);
    info!("  GET    /health");
    info!("  GET    /api/v1/trxfee/{{trx_hash}} - Fee of one transaction");
    info!("  GET    /api/v1/trxfee/list - Stored fees by time range");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Shutting down pool fee tracker");
    tracker.shutdown().await;

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Received shutdown signal");
}
