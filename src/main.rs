use discussions::config::Config;
use discussions::database::{create_pool, run_migrations};
use discussions::services::discussion_service::DiscussionService;
use discussions::services::profile_service::PgProfileDirectory;
use discussions::store::PgDiscussionStore;
use discussions::{AppState, create_app};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "discussions=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        max_depth = config.discussions.max_depth,
        moderator_tier = %config.discussions.moderator_tier,
        "Configuration loaded successfully"
    );

    let db = create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database connection pool created");

    run_migrations(&db).await?;
    tracing::info!("Database migrations completed");

    // Stories and profiles live in the same database; one directory answers
    // entity lookups, membership tiers and the discussions flag.
    let directory = Arc::new(PgProfileDirectory::new(db.clone()));
    let discussions = DiscussionService::new(
        Arc::new(PgDiscussionStore::new(db)),
        directory.clone(),
        directory.clone(),
        directory,
        config.discussions.clone(),
    );

    let state = AppState {
        discussions: Arc::new(discussions),
        config: Arc::new(config.clone()),
    };

    let app = create_app(state);

    let listener = TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    tracing::info!("Server listening on {}:{}", config.host, config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
