use axum::response::{IntoResponse, Json};
use serde_json::json;

pub struct RootController;

impl RootController {
    pub async fn root() -> impl IntoResponse {
        Json(json!({
            "service": "moodlist-backend",
            "version": env!("CARGO_PKG_VERSION"),
        }))
    }

    pub async fn health_check() -> impl IntoResponse {
        Json(json!({ "status": "ok" }))
    }
}
