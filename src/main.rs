use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use moodlist_backend::db::Database;
use moodlist_backend::routers::{health_check_route, playlist_routes, root_route, spotify_routes, youtube_routes};
use moodlist_backend::secrets::SECRET_MANAGER;

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_target(false)
        .init();

    // Initialize database
    let database = match Database::new().await {
        Ok(db) => {
            info!("📊 Connected to PostgreSQL database");
            db
        }
        Err(e) => {
            error!("❌ Failed to connect to database: {}", e);
            panic!("Database connection required");
        }
    };

    // Run migrations
    if let Err(e) = sqlx::migrate!("./migrations").run(database.pool()).await {
        error!("❌ Failed to run database migrations: {}", e);
        panic!("Database migrations failed");
    }
    info!("📊 Database migrations completed");

    let port = SECRET_MANAGER.get("PORT");
    let backend_url = SECRET_MANAGER.get("BACKEND_URL");
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .expect("failed to bind listener");

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app: Router = Router::new()
        // Core routes
        .route("/", get(root_route))
        .route("/health", get(health_check_route))
        // Provider OAuth routes
        .nest("/spotify", spotify_routes())
        .nest("/youtube", youtube_routes())
        // Playlist generation, rating, history, export
        .merge(playlist_routes())
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(database);

    info!("🎧 moodlist backend listening on {}", backend_url);

    axum::serve(listener, app).await.expect("server error");
}
