// Playlist routes
use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::controllers::playlist::{
    disconnect_provider_route, export_route, generate_route, get_route, list_route, rate_route,
};
use crate::db::Database;

pub fn playlist_routes() -> Router<Database> {
    Router::new()
        .route("/api/playlists/generate", post(generate_route))
        .route("/api/playlists", get(list_route))
        .route("/api/playlists/{id}", get(get_route))
        .route("/api/playlists/{id}/rate", post(rate_route))
        .route("/api/playlists/{id}/export", post(export_route))
        .route("/api/providers/{provider}", delete(disconnect_provider_route))
}
