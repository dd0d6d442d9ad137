use std::sync::Arc;

use clap::Parser;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::info;
use tracing_subscriber::EnvFilter;

use portico::config::{CliArgs, Config};
use portico::images::{FsImageStore, ImageStore};
use portico::store::mongo::MongoModel;
use portico::{AppState, EntityState, create_app, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from(CliArgs::parse());
    info!(
        "Starting portico v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.bind_addr
    );
    info!(
        "Database: {} (db {:?})",
        config.database_url, config.database_name
    );

    let database = db::init_database(&config.database_url, &config.database_name).await?;

    let images: Arc<dyn ImageStore> = Arc::new(FsImageStore::new(&config.image_root));

    let state = AppState {
        trips: EntityState::new(
            Arc::new(MongoModel::new(&database, "trips")),
            images.clone(),
            Some("trips".to_string()),
        ),
        users: EntityState::new(
            Arc::new(MongoModel::new(&database, "users")),
            images.clone(),
            Some("users".to_string()),
        ),
    };

    // Stored images are served back under the same /public prefix their
    // synthesized URLs point at
    let app = create_app(state)
        .nest_service("/public", ServeDir::new(config.image_root.join("public")))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
