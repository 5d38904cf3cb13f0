// Playlist generation pipeline: classify -> compose -> generate -> validate,
// one sequential unit of work per request. Persistence happens after the
// draft is fully validated, never before.
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::controllers::{feedback, mood, prompt, require_user, validator};
use crate::controllers::gemini::{GenerationBackend, GEMINI_CLIENT};
use crate::controllers::prompt::PromptPolicy;
use crate::controllers::{spotify, youtube};
use crate::db::Database;
use crate::error::ApiError;
use crate::models::playlist::{
    ExportResult, FeedbackContext, GenerateRequest, MoodInput, Platform, PlaylistDraft,
    PlaylistResponse, RateRequest,
};

/// Runs the core pipeline against a generation backend. Holds no request
/// state; safe to build per request.
pub struct PlaylistGenerator<'a> {
    backend: &'a dyn GenerationBackend,
    policy: PromptPolicy,
}

impl<'a> PlaylistGenerator<'a> {
    pub fn new(backend: &'a dyn GenerationBackend, policy: PromptPolicy) -> Self {
        Self { backend, policy }
    }

    /// Mood text in, validated draft out. Every failure is one of the typed
    /// generation-path errors; no partial draft ever escapes.
    pub async fn generate_draft(
        &self,
        input: &MoodInput,
        feedback: Option<&FeedbackContext>,
    ) -> Result<PlaylistDraft, ApiError> {
        let profile = mood::classify(&input.text);
        let request = prompt::compose_with_policy(input, Some(&profile), feedback, &self.policy);
        let raw = self.backend.generate(&request).await?;
        let draft = validator::validate(&raw, &self.policy.bounds)?;

        info!(
            category = profile.category.as_str(),
            songs = draft.songs.len(),
            "generated playlist draft"
        );
        Ok(draft)
    }
}

/// POST /api/playlists/generate
pub async fn generate_route(
    State(database): State<Database>,
    headers: HeaderMap,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<PlaylistResponse>, ApiError> {
    let owner_id = require_user(&headers)?;

    let mood_text = payload.mood_input.trim().to_string();
    if mood_text.is_empty() {
        return Err(ApiError::InvalidRequest("mood input must not be empty"));
    }
    let platform = payload.platform.unwrap_or(Platform::Spotify);

    // An explicit rating on the request wins; otherwise fall back to the
    // most recently rated playlist. Best-effort: a concurrent rating write
    // may or may not be visible here.
    let feedback_ctx = match feedback::from_rating(payload.rating, payload.rating_notes.clone()) {
        Some(ctx) => Some(ctx),
        None => match database.latest_rating(&owner_id).await {
            Ok(prior) => prior.and_then(|(rating, notes)| feedback::from_rating(Some(rating), notes)),
            Err(e) => {
                warn!(error = %e, "could not load prior rating, composing without feedback");
                None
            }
        },
    };

    let input = MoodInput {
        text: mood_text.clone(),
        genre_preference: payload.genre_preference,
        era: payload.era,
    };

    let generator = PlaylistGenerator::new(&*GEMINI_CLIENT, PromptPolicy::from_secrets());
    let draft = generator.generate_draft(&input, feedback_ctx.as_ref()).await?;

    // A failed save never discards the validated draft: the user still gets
    // their playlist, it just won't show up in history.
    match database
        .create_playlist(&owner_id, &mood_text, platform, &draft)
        .await
    {
        Ok((record, songs)) => Ok(Json(PlaylistResponse::from_record(record, songs))),
        Err(e) => {
            error!(error = %e, "failed to persist playlist, returning unsaved draft");
            Ok(Json(PlaylistResponse::unsaved(draft, mood_text, platform)))
        }
    }
}

/// POST /api/playlists/{id}/rate
pub async fn rate_route(
    State(database): State<Database>,
    headers: HeaderMap,
    Path(playlist_id): Path<String>,
    Json(payload): Json<RateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let owner_id = require_user(&headers)?;
    let playlist_id = parse_playlist_id(&playlist_id)?;

    if !(1..=5).contains(&payload.rating) {
        return Err(ApiError::InvalidRequest("rating must be between 1 and 5"));
    }

    let updated = database
        .rate_playlist(
            playlist_id,
            &owner_id,
            payload.rating,
            payload.notes.as_deref(),
        )
        .await?;

    if !updated {
        return Err(ApiError::NotFound("playlist not found"));
    }

    info!(%playlist_id, rating = payload.rating, "playlist rated");
    Ok(Json(json!({ "ok": true })))
}

/// GET /api/playlists
pub async fn list_route(
    State(database): State<Database>,
    headers: HeaderMap,
) -> Result<Json<Vec<PlaylistResponse>>, ApiError> {
    let owner_id = require_user(&headers)?;

    let playlists = database.list_playlists(&owner_id).await?;
    let responses = playlists
        .into_iter()
        .map(|(record, songs)| PlaylistResponse::from_record(record, songs))
        .collect();

    Ok(Json(responses))
}

/// GET /api/playlists/{id}
pub async fn get_route(
    State(database): State<Database>,
    headers: HeaderMap,
    Path(playlist_id): Path<String>,
) -> Result<Json<PlaylistResponse>, ApiError> {
    let owner_id = require_user(&headers)?;
    let playlist_id = parse_playlist_id(&playlist_id)?;

    let (record, songs) = database
        .get_playlist(playlist_id, &owner_id)
        .await?
        .ok_or(ApiError::NotFound("playlist not found"))?;

    Ok(Json(PlaylistResponse::from_record(record, songs)))
}

/// POST /api/playlists/{id}/export - create the playlist on the connected
/// streaming account. Fire-and-forget from the pipeline's point of view:
/// export success is not part of generation correctness.
pub async fn export_route(
    State(database): State<Database>,
    headers: HeaderMap,
    Path(playlist_id): Path<String>,
) -> Result<Json<ExportResult>, ApiError> {
    let owner_id = require_user(&headers)?;
    let playlist_id = parse_playlist_id(&playlist_id)?;

    let (record, songs) = database
        .get_playlist(playlist_id, &owner_id)
        .await?
        .ok_or(ApiError::NotFound("playlist not found"))?;

    let platform = Platform::parse(&record.platform).unwrap_or(Platform::Spotify);
    let result = match platform {
        Platform::Spotify => spotify::export_playlist(&database, &owner_id, &record, &songs).await?,
        Platform::YoutubeMusic => {
            youtube::export_playlist(&database, &owner_id, &record, &songs).await?
        }
    };

    info!(
        %playlist_id,
        platform = platform.as_str(),
        added = result.songs_added,
        skipped = result.songs_skipped,
        "playlist exported"
    );
    Ok(Json(result))
}

/// DELETE /api/providers/{provider} - disconnect a streaming account.
pub async fn disconnect_provider_route(
    State(database): State<Database>,
    headers: HeaderMap,
    Path(provider): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let owner_id = require_user(&headers)?;
    let provider = Platform::parse(&provider)
        .ok_or(ApiError::InvalidRequest("unknown provider"))?;

    database.delete_provider_account(&owner_id, provider).await?;
    Ok(Json(json!({ "ok": true })))
}

fn parse_playlist_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidRequest("invalid playlist id"))
}
