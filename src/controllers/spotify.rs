// Spotify OAuth and playlist-export controller
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Redirect},
};
use chrono::{Duration as ChronoDuration, Utc};
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::controllers::{generate_state, require_user, store_state, validate_state};
use crate::db::Database;
use crate::error::ApiError;
use crate::models::playlist::{
    ExportResult, Platform, PlaylistRecord, PlaylistSongRecord, ProviderAccount,
};
use crate::secrets::SECRET_MANAGER;

/// Spotify API endpoints
const SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

/// Scopes needed to create playlists on the user's account
const SPOTIFY_SCOPES: &str = "playlist-modify-private playlist-modify-public user-read-email";

/// Tokens are refreshed when they expire within this window.
const EXPIRY_SLACK_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthCallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthUrlResponse {
    pub auth_url: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    pub display_name: Option<String>,
}

pub struct SpotifyController {
    client: Client,
}

impl SpotifyController {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Generate OAuth authorization URL
    pub fn get_auth_url(&self, state: &str) -> String {
        let client_id = SECRET_MANAGER.get("SPOTIFY_CLIENT_ID");
        let redirect_uri = SECRET_MANAGER.get("SPOTIFY_REDIRECT_URI");

        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}",
            SPOTIFY_AUTH_URL,
            client_id,
            urlencoding::encode(&redirect_uri),
            urlencoding::encode(SPOTIFY_SCOPES),
            state
        )
    }

    /// Exchange authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<SpotifyTokens, ApiError> {
        let client_id = SECRET_MANAGER.get("SPOTIFY_CLIENT_ID");
        let client_secret = SECRET_MANAGER.get("SPOTIFY_CLIENT_SECRET");
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(ApiError::Configuration("SPOTIFY_CLIENT_ID/SECRET"));
        }
        let redirect_uri = SECRET_MANAGER.get("SPOTIFY_REDIRECT_URI");

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &redirect_uri),
        ];

        let response = self
            .client
            .post(SPOTIFY_TOKEN_URL)
            .basic_auth(&client_id, Some(&client_secret))
            .form(&params)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("spotify token request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "spotify token exchange failed: {}",
                error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("failed to parse spotify tokens: {}", e)))
    }

    /// Refresh access token
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<SpotifyTokens, ApiError> {
        let client_id = SECRET_MANAGER.get("SPOTIFY_CLIENT_ID");
        let client_secret = SECRET_MANAGER.get("SPOTIFY_CLIENT_SECRET");

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let response = self
            .client
            .post(SPOTIFY_TOKEN_URL)
            .basic_auth(&client_id, Some(&client_secret))
            .form(&params)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("spotify refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "spotify token refresh failed: {}",
                error_text
            )));
        }

        let mut tokens: SpotifyTokens = response
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("failed to parse spotify tokens: {}", e)))?;

        // Keep the original refresh token if not provided in response
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }

        Ok(tokens)
    }

    /// Get current user's profile
    pub async fn get_current_user(&self, access_token: &str) -> Result<SpotifyUser, ApiError> {
        let response = self
            .client
            .get(format!("{}/me", SPOTIFY_API_URL))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("spotify profile request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ApiError::Upstream(
                "failed to get spotify user profile".to_string(),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("failed to parse spotify user: {}", e)))
    }

    /// Resolve one song to a track URI by title/artist search. None when
    /// nothing matches; resolution misses are skips, not failures.
    pub async fn find_track_uri(
        &self,
        access_token: &str,
        title: &str,
        artist: &str,
    ) -> Result<Option<String>, ApiError> {
        let query = format!("track:{} artist:{}", title, artist);
        let response = self
            .client
            .get(format!("{}/search", SPOTIFY_API_URL))
            .bearer_auth(access_token)
            .query(&[("q", query.as_str()), ("type", "track"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("spotify search failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ApiError::Upstream("spotify search failed".to_string()));
        }

        let results: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("failed to parse search results: {}", e)))?;

        Ok(results["tracks"]["items"][0]["uri"]
            .as_str()
            .map(|s| s.to_string()))
    }

    /// Create an empty playlist on the user's account, returns (id, url).
    pub async fn create_playlist(
        &self,
        access_token: &str,
        spotify_user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<(String, String), ApiError> {
        let response = self
            .client
            .post(format!(
                "{}/users/{}/playlists",
                SPOTIFY_API_URL, spotify_user_id
            ))
            .bearer_auth(access_token)
            .json(&serde_json::json!({
                "name": name,
                "description": description,
                "public": false,
            }))
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("spotify playlist create failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "spotify playlist create failed: {}",
                error_text
            )));
        }

        let playlist: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("failed to parse playlist: {}", e)))?;

        let id = playlist["id"]
            .as_str()
            .ok_or_else(|| ApiError::Upstream("playlist response missing id".to_string()))?
            .to_string();
        let url = playlist["external_urls"]["spotify"]
            .as_str()
            .unwrap_or(&format!("https://open.spotify.com/playlist/{}", id))
            .to_string();

        Ok((id, url))
    }

    pub async fn add_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .post(format!(
                "{}/playlists/{}/tracks",
                SPOTIFY_API_URL, playlist_id
            ))
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "uris": uris }))
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("spotify add tracks failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "spotify add tracks failed: {}",
                error_text
            )));
        }

        Ok(())
    }
}

// Singleton instance
pub static SPOTIFY_CONTROLLER: Lazy<SpotifyController> = Lazy::new(|| SpotifyController::new());

/// Returns a usable access token for the owner, refreshing it when it is
/// about to expire. No stored account means the provider was never
/// connected.
async fn ensure_fresh_account(
    database: &Database,
    owner_id: &str,
) -> Result<ProviderAccount, ApiError> {
    let mut account = database
        .get_provider_account(owner_id, Platform::Spotify)
        .await?
        .ok_or(ApiError::Authorization("connect spotify first"))?;

    let expiring = account
        .expires_at
        .map(|at| at - ChronoDuration::seconds(EXPIRY_SLACK_SECS) <= Utc::now())
        .unwrap_or(false);

    if expiring {
        let refresh = account
            .refresh_token
            .clone()
            .ok_or(ApiError::Authorization("connect spotify first"))?;
        let tokens = SPOTIFY_CONTROLLER.refresh_token(&refresh).await?;

        account.access_token = tokens.access_token;
        account.refresh_token = tokens.refresh_token;
        account.expires_at = Some(Utc::now() + ChronoDuration::seconds(tokens.expires_in));
        account.updated_at = Utc::now();
        database.upsert_provider_account(&account).await?;
        info!(owner_id, "refreshed spotify access token");
    }

    Ok(account)
}

/// Creates the playlist on Spotify, resolving each song by title/artist.
pub async fn export_playlist(
    database: &Database,
    owner_id: &str,
    record: &PlaylistRecord,
    songs: &[PlaylistSongRecord],
) -> Result<ExportResult, ApiError> {
    let account = ensure_fresh_account(database, owner_id).await?;

    let spotify_user_id = match &account.external_user_id {
        Some(id) => id.clone(),
        None => {
            SPOTIFY_CONTROLLER
                .get_current_user(&account.access_token)
                .await?
                .id
        }
    };

    let description = record
        .vibe_summary
        .clone()
        .unwrap_or_else(|| format!("made by moodlist from: {}", record.mood_input));

    let (playlist_id, url) = SPOTIFY_CONTROLLER
        .create_playlist(&account.access_token, &spotify_user_id, &record.name, &description)
        .await?;

    let mut uris = Vec::with_capacity(songs.len());
    let mut skipped = 0usize;
    for song in songs {
        match SPOTIFY_CONTROLLER
            .find_track_uri(&account.access_token, &song.title, &song.artist)
            .await?
        {
            Some(uri) => uris.push(uri),
            None => {
                warn!(title = %song.title, artist = %song.artist, "no spotify match, skipping");
                skipped += 1;
            }
        }
    }

    if !uris.is_empty() {
        SPOTIFY_CONTROLLER
            .add_tracks(&account.access_token, &playlist_id, &uris)
            .await?;
    }

    Ok(ExportResult {
        url,
        songs_added: uris.len(),
        songs_skipped: skipped,
    })
}

// Route handlers

/// GET /spotify/auth - hand the authorization URL to the client
pub async fn spotify_auth_route(
    State(_database): State<Database>,
    headers: HeaderMap,
) -> Result<Json<AuthUrlResponse>, ApiError> {
    let owner_id = require_user(&headers)?;

    let state = generate_state();
    store_state(&state, &owner_id).await;

    let auth_url = SPOTIFY_CONTROLLER.get_auth_url(&state);
    Ok(Json(AuthUrlResponse { auth_url, state }))
}

/// GET /spotify/callback - OAuth callback handler
pub async fn spotify_callback_route(
    State(database): State<Database>,
    Query(params): Query<AuthCallbackQuery>,
) -> impl IntoResponse {
    let frontend_url = SECRET_MANAGER.get("FRONTEND_URL");

    // Validate CSRF state first
    let state = params.state.as_deref().unwrap_or("");
    let owner_id = match validate_state(state).await {
        Some(owner) => owner,
        None => {
            error!("invalid or expired oauth state");
            return Redirect::temporary(&format!("{}?error=invalid_state", frontend_url))
                .into_response();
        }
    };

    if let Some(error) = params.error {
        error!(error = %error, "spotify oauth error");
        return Redirect::temporary(&format!("{}?error={}", frontend_url, error)).into_response();
    }

    let code = match params.code {
        Some(c) => c,
        None => {
            return Redirect::temporary(&format!("{}?error=no_code", frontend_url)).into_response();
        }
    };

    let tokens = match SPOTIFY_CONTROLLER.exchange_code(&code).await {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "spotify token exchange failed");
            return Redirect::temporary(&format!("{}?error=token_exchange_failed", frontend_url))
                .into_response();
        }
    };

    let external_user_id = match SPOTIFY_CONTROLLER.get_current_user(&tokens.access_token).await {
        Ok(user) => Some(user.id),
        Err(e) => {
            warn!(error = %e, "could not load spotify profile, storing tokens anyway");
            None
        }
    };

    let account = ProviderAccount {
        owner_id: owner_id.clone(),
        provider: Platform::Spotify.as_str().to_string(),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_at: Some(Utc::now() + ChronoDuration::seconds(tokens.expires_in)),
        external_user_id,
        updated_at: Utc::now(),
    };

    if let Err(e) = database.upsert_provider_account(&account).await {
        error!(error = %e, "failed to store spotify tokens");
        return Redirect::temporary(&format!("{}?error=token_store_failed", frontend_url))
            .into_response();
    }

    info!(%owner_id, "spotify connected");
    Redirect::temporary(&format!("{}?connected=spotify", frontend_url)).into_response()
}
