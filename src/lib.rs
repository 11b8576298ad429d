// Equipment Insights - CSV ingestion and summary service for process equipment

pub mod config;
pub mod db;
pub mod models;
pub mod types;
pub mod parser;
pub mod analysis;
pub mod data_registry;
pub mod session;
pub mod service;
pub mod report;
pub mod routes;
pub mod middleware;

// Re-exports for convenience
pub use config::Config;
pub use data_registry::DatasetStore;
pub use models::AppState;
pub use service::EquipmentService;
pub use session::SessionRegistry;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
