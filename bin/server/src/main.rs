use habbiter_server::{config::ServerConfig, reconcile, routes, state::AppState};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let listen_addr = config.http.listen_addr.clone();
    let state = Arc::new(AppState::new(db_pool, config));

    // Reconcile expired subscription caches on startup
    match reconcile::run_once(&state).await {
        Ok(stats) if stats.processed > 0 || stats.errors > 0 => {
            tracing::info!(
                processed = stats.processed,
                errors = stats.errors,
                "Reconciled expired subscription caches on startup"
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Failed to reconcile subscription caches on startup");
        }
    }

    // Spawn periodic reconciliation task
    reconcile::spawn_periodic(state.clone());

    // The endpoints are called from the web app's origin; CORS stays
    // permissive exactly like the hosted functions this replaces.
    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", listen_addr);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("server error");
}
