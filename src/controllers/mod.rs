pub mod feedback;
pub mod gemini;
pub mod mood;
pub mod playlist;
pub mod prompt;
pub mod root;
pub mod spotify;
pub mod validator;
pub mod youtube;

pub use root::RootController;

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::ApiError;

/// Extracts the caller identity from the Authorization header. Token
/// issuance and verification belong to the external auth provider; an
/// absent or empty bearer value is all we reject here.
pub fn require_user(headers: &axum::http::HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let uid = value.strip_prefix("Bearer ").unwrap_or("").trim();
    if uid.is_empty() {
        return Err(ApiError::Authorization("sign in first"));
    }
    Ok(uid.to_string())
}

// OAuth state store for CSRF protection, shared by both provider flows.
// Maps a one-time state string to the owner who started the flow.
struct PendingState {
    owner_id: String,
    created_at: i64,
}

static OAUTH_STATE_STORE: Lazy<Arc<RwLock<HashMap<String, PendingState>>>> =
    Lazy::new(|| Arc::new(RwLock::new(HashMap::new())));

/// Generate a cryptographically secure random state string.
pub(crate) fn generate_state() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    // Random bytes for unpredictability + timestamp for uniqueness.
    let random_bytes: [u8; 16] = rand::random();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    format!("{:032x}{:x}", u128::from_be_bytes(random_bytes), timestamp)
}

fn now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Store an OAuth state with its owner and timestamp.
pub(crate) async fn store_state(state: &str, owner_id: &str) {
    let mut store = OAUTH_STATE_STORE.write().await;
    let now = now_secs();

    store.insert(
        state.to_string(),
        PendingState {
            owner_id: owner_id.to_string(),
            created_at: now,
        },
    );

    // Clean up old states (older than 10 minutes).
    store.retain(|_, pending| now - pending.created_at < 600);
}

/// Validate and consume an OAuth state (one-time use). Returns the owner
/// who started the flow.
pub(crate) async fn validate_state(state: &str) -> Option<String> {
    let mut store = OAUTH_STATE_STORE.write().await;

    // State valid for 5 minutes.
    if let Some(pending) = store.remove(state) {
        if now_secs() - pending.created_at < 300 {
            return Some(pending.owner_id);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    #[test]
    fn test_require_user_accepts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer uid-42"));
        assert_eq!(require_user(&headers).unwrap(), "uid-42");
    }

    #[test]
    fn test_require_user_rejects_missing_header() {
        let headers = HeaderMap::new();
        assert!(matches!(
            require_user(&headers),
            Err(ApiError::Authorization(_))
        ));
    }

    #[test]
    fn test_require_user_rejects_empty_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(require_user(&headers).is_err());
    }

    #[tokio::test]
    async fn test_oauth_state_is_single_use() {
        let state = generate_state();
        store_state(&state, "uid-7").await;
        assert_eq!(validate_state(&state).await.as_deref(), Some("uid-7"));
        assert!(validate_state(&state).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_oauth_state_is_rejected() {
        assert!(validate_state("never-stored").await.is_none());
    }
}
