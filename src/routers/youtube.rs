// YouTube routes
use axum::{routing::get, Router};

use crate::controllers::youtube::{youtube_auth_route, youtube_callback_route};
use crate::db::Database;

pub fn youtube_routes() -> Router<Database> {
    Router::new()
        .route("/auth", get(youtube_auth_route))
        .route("/callback", get(youtube_callback_route))
}
