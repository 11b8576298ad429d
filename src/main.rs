use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use equipment_insights::{
    config::Config,
    db::{self, PgDatasetRepository},
    report::PdfReportRenderer,
    routes::create_router,
    AppState, DatasetStore, EquipmentService, SessionRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "equipment_insights=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    let store = match config.database.url.as_deref() {
        Some(url) => {
            let pool = db::create_pool(url, &config.database).await?;

            info!("Running database migrations...");
            db::run_migrations(&pool).await?;
            info!("Database migrations completed");

            let store = DatasetStore::with_repository(Arc::new(PgDatasetRepository::new(pool)));
            let restored = store.hydrate().await?;
            info!(restored, "Dataset history restored");
            store
        }
        None => {
            warn!("DATABASE_URL not set, datasets will not survive a restart");
            DatasetStore::in_memory()
        }
    };

    let service = EquipmentService::new(store, Arc::new(PdfReportRenderer::new()))
        .with_default_name(config.upload.default_dataset_name.clone());

    // Create shared state
    let state = AppState {
        config: config.clone(),
        service,
        sessions: SessionRegistry::default(),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
