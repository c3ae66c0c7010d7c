use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use evently_server::config::Config;
use evently_server::identity::MemoryIdentityProvider;
use evently_server::routes::create_routes;
use evently_server::state::AppState;
use evently_server::store::{EventStore, MemoryEventStore, PgEventStore};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("evently_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().expect("Invalid configuration");

    let store: Arc<dyn EventStore> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .expect("Failed to connect to database");

            tracing::info!("Successfully connected to database");

            sqlx::migrate!()
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            tracing::info!("Migrations run successfully");
            Arc::new(PgEventStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, events are kept in memory");
            Arc::new(MemoryEventStore::new())
        }
    };

    if config.dev_auth() {
        tracing::warn!("Development sign-in is enabled at POST /api/auth/session");
    }

    let addr = config.bind_addr;
    let (state, _session_follower) =
        AppState::build(config, store, Arc::new(MemoryIdentityProvider::new()))
            .await
            .expect("Failed to start session projection");

    let app = create_routes(state);

    tracing::info!("Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
