// Spotify routes
use axum::{routing::get, Router};

use crate::controllers::spotify::{spotify_auth_route, spotify_callback_route};
use crate::db::Database;

pub fn spotify_routes() -> Router<Database> {
    Router::new()
        .route("/auth", get(spotify_auth_route))
        .route("/callback", get(spotify_callback_route))
}
