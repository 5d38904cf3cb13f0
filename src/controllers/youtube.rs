// YouTube Music OAuth and playlist-export controller
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

use crate::controllers::spotify::AuthCallbackQuery;
use crate::controllers::{generate_state, require_user, store_state, validate_state};
use crate::db::Database;
use crate::error::ApiError;
use crate::models::playlist::{
    ExportResult, Platform, PlaylistRecord, PlaylistSongRecord, ProviderAccount,
};
use crate::secrets::SECRET_MANAGER;

/// Google OAuth and YouTube Data API endpoints
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3";

const YOUTUBE_SCOPES: &str =
    "https://www.googleapis.com/auth/youtube https://www.googleapis.com/auth/youtube.force-ssl";

/// Music category id in the YouTube Data API, used to narrow song searches.
const MUSIC_CATEGORY_ID: &str = "10";

const EXPIRY_SLACK_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

pub struct YoutubeController {
    client: Client,
}

impl YoutubeController {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Generate OAuth authorization URL. Offline access so Google hands out
    /// a refresh token.
    pub fn get_auth_url(&self, state: &str) -> String {
        let client_id = SECRET_MANAGER.get("YOUTUBE_CLIENT_ID");
        let redirect_uri = SECRET_MANAGER.get("YOUTUBE_REDIRECT_URI");

        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}&access_type=offline&prompt=consent",
            GOOGLE_AUTH_URL,
            client_id,
            urlencoding::encode(&redirect_uri),
            urlencoding::encode(YOUTUBE_SCOPES),
            state
        )
    }

    /// Exchange authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleTokens, ApiError> {
        let client_id = SECRET_MANAGER.get("YOUTUBE_CLIENT_ID");
        let client_secret = SECRET_MANAGER.get("YOUTUBE_CLIENT_SECRET");
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(ApiError::Configuration("YOUTUBE_CLIENT_ID/SECRET"));
        }
        let redirect_uri = SECRET_MANAGER.get("YOUTUBE_REDIRECT_URI");

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &client_id),
            ("client_secret", &client_secret),
            ("redirect_uri", &redirect_uri),
        ];

        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("google token request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "google token exchange failed: {}",
                error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("failed to parse google tokens: {}", e)))
    }

    /// Refresh access token
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<GoogleTokens, ApiError> {
        let client_id = SECRET_MANAGER.get("YOUTUBE_CLIENT_ID");
        let client_secret = SECRET_MANAGER.get("YOUTUBE_CLIENT_SECRET");

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &client_id),
            ("client_secret", &client_secret),
        ];

        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("google refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "google token refresh failed: {}",
                error_text
            )));
        }

        let mut tokens: GoogleTokens = response
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("failed to parse google tokens: {}", e)))?;

        // Google omits the refresh token on refresh; keep the original.
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }

        Ok(tokens)
    }

    /// Resolve one song to a video id by title/artist search in the music
    /// category.
    pub async fn find_video_id(
        &self,
        access_token: &str,
        title: &str,
        artist: &str,
    ) -> Result<Option<String>, ApiError> {
        let query = format!("{} {}", title, artist);
        let response = self
            .client
            .get(format!("{}/search", YOUTUBE_API_URL))
            .bearer_auth(access_token)
            .query(&[
                ("part", "snippet"),
                ("q", query.as_str()),
                ("type", "video"),
                ("videoCategoryId", MUSIC_CATEGORY_ID),
                ("maxResults", "1"),
            ])
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("youtube search failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ApiError::Upstream("youtube search failed".to_string()));
        }

        let results: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("failed to parse search results: {}", e)))?;

        Ok(results["items"][0]["id"]["videoId"]
            .as_str()
            .map(|s| s.to_string()))
    }

    /// Create an empty playlist, returns (id, url).
    pub async fn create_playlist(
        &self,
        access_token: &str,
        name: &str,
        description: &str,
    ) -> Result<(String, String), ApiError> {
        let response = self
            .client
            .post(format!("{}/playlists", YOUTUBE_API_URL))
            .bearer_auth(access_token)
            .query(&[("part", "snippet,status")])
            .json(&serde_json::json!({
                "snippet": { "title": name, "description": description },
                "status": { "privacyStatus": "private" },
            }))
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("youtube playlist create failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "youtube playlist create failed: {}",
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
        let url = format!("https://music.youtube.com/playlist?list={}", id);

        Ok((id, url))
    }

    pub async fn add_video(
        &self,
        access_token: &str,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .post(format!("{}/playlistItems", YOUTUBE_API_URL))
            .bearer_auth(access_token)
            .query(&[("part", "snippet")])
            .json(&serde_json::json!({
                "snippet": {
                    "playlistId": playlist_id,
                    "resourceId": { "kind": "youtube#video", "videoId": video_id },
                },
            }))
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("youtube add video failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "youtube add video failed: {}",
                error_text
            )));
        }

        Ok(())
    }
}

// Singleton instance
pub static YOUTUBE_CONTROLLER: Lazy<YoutubeController> = Lazy::new(|| YoutubeController::new());

async fn ensure_fresh_account(
    database: &Database,
    owner_id: &str,
) -> Result<ProviderAccount, ApiError> {
    let mut account = database
        .get_provider_account(owner_id, Platform::YoutubeMusic)
        .await?
        .ok_or(ApiError::Authorization("connect youtube first"))?;

    let expiring = account
        .expires_at
        .map(|at| at - ChronoDuration::seconds(EXPIRY_SLACK_SECS) <= Utc::now())
        .unwrap_or(false);

    if expiring {
        let refresh = account
            .refresh_token
            .clone()
            .ok_or(ApiError::Authorization("connect youtube first"))?;
        let tokens = YOUTUBE_CONTROLLER.refresh_token(&refresh).await?;

        account.access_token = tokens.access_token;
        account.refresh_token = tokens.refresh_token;
        account.expires_at = Some(Utc::now() + ChronoDuration::seconds(tokens.expires_in));
        account.updated_at = Utc::now();
        database.upsert_provider_account(&account).await?;
        info!(owner_id, "refreshed youtube access token");
    }

    Ok(account)
}

/// Creates the playlist on YouTube Music, resolving each song by search.
pub async fn export_playlist(
    database: &Database,
    owner_id: &str,
    record: &PlaylistRecord,
    songs: &[PlaylistSongRecord],
) -> Result<ExportResult, ApiError> {
    let account = ensure_fresh_account(database, owner_id).await?;

    let description = record
        .vibe_summary
        .clone()
        .unwrap_or_else(|| format!("made by moodlist from: {}", record.mood_input));

    let (playlist_id, url) = YOUTUBE_CONTROLLER
        .create_playlist(&account.access_token, &record.name, &description)
        .await?;

    let mut added = 0usize;
    let mut skipped = 0usize;
    for song in songs {
        match YOUTUBE_CONTROLLER
            .find_video_id(&account.access_token, &song.title, &song.artist)
            .await?
        {
            Some(video_id) => {
                YOUTUBE_CONTROLLER
                    .add_video(&account.access_token, &playlist_id, &video_id)
                    .await?;
                added += 1;
            }
            None => {
                warn!(title = %song.title, artist = %song.artist, "no youtube match, skipping");
                skipped += 1;
            }
        }
    }

    Ok(ExportResult {
        url,
        songs_added: added,
        songs_skipped: skipped,
    })
}

// Route handlers

/// GET /youtube/auth - hand the authorization URL to the client
pub async fn youtube_auth_route(
    State(_database): State<Database>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let owner_id = require_user(&headers)?;

    let state = generate_state();
    store_state(&state, &owner_id).await;

    let auth_url = YOUTUBE_CONTROLLER.get_auth_url(&state);
    Ok(Json(serde_json::json!({ "auth_url": auth_url, "state": state })))
}

/// GET /youtube/callback - OAuth callback handler
pub async fn youtube_callback_route(
    State(database): State<Database>,
    Query(params): Query<AuthCallbackQuery>,
) -> impl IntoResponse {
    let frontend_url = SECRET_MANAGER.get("FRONTEND_URL");

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
        error!(error = %error, "youtube oauth error");
        return Redirect::temporary(&format!("{}?error={}", frontend_url, error)).into_response();
    }

    let code = match params.code {
        Some(c) => c,
        None => {
            return Redirect::temporary(&format!("{}?error=no_code", frontend_url)).into_response();
        }
    };

    let mut tokens = match YOUTUBE_CONTROLLER.exchange_code(&code).await {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "youtube token exchange failed");
            return Redirect::temporary(&format!("{}?error=token_exchange_failed", frontend_url))
                .into_response();
        }
    };

    // Google only issues a refresh token on first consent; keep the one we
    // already have on re-connect.
    if tokens.refresh_token.is_none() {
        match database
            .get_provider_account(&owner_id, Platform::YoutubeMusic)
            .await
        {
            Ok(Some(existing)) => tokens.refresh_token = existing.refresh_token,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "could not load existing youtube account"),
        }
    }

    let account = ProviderAccount {
        owner_id: owner_id.clone(),
        provider: Platform::YoutubeMusic.as_str().to_string(),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_at: Some(Utc::now() + ChronoDuration::seconds(tokens.expires_in)),
        external_user_id: None,
        updated_at: Utc::now(),
    };

    if let Err(e) = database.upsert_provider_account(&account).await {
        error!(error = %e, "failed to store youtube tokens");
        return Redirect::temporary(&format!("{}?error=token_store_failed", frontend_url))
            .into_response();
    }

    info!(%owner_id, "youtube connected");
    Redirect::temporary(&format!("{}?connected=youtube", frontend_url)).into_response()
}
