use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// One recommended song with the backend's justification for picking it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongEntry {
    pub title: String,
    pub artist: String,
    pub reason: String,
}

/// A validated, not-yet-persisted playlist. Invariants are enforced by the
/// validator: non-empty name, song count within bounds, no duplicate
/// (title, artist) pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistDraft {
    pub name: String,
    pub vibe_summary: Option<String>,
    pub songs: Vec<SongEntry>,
}

/// Closed range for the number of songs a draft must carry.
#[derive(Debug, Clone, Copy)]
pub struct SongCountBounds {
    pub min: usize,
    pub max: usize,
}

impl Default for SongCountBounds {
    fn default() -> Self {
        Self { min: 15, max: 22 }
    }
}

/// Streaming platform a playlist is targeted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Spotify,
    YoutubeMusic,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Spotify => "spotify",
            Platform::YoutubeMusic => "youtube_music",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "spotify" => Some(Platform::Spotify),
            "youtube_music" => Some(Platform::YoutubeMusic),
            _ => None,
        }
    }
}

/// Raw user input for one generation request.
#[derive(Debug, Clone)]
pub struct MoodInput {
    pub text: String,
    pub genre_preference: Option<String>,
    pub era: Option<String>,
}

/// Prior-rating signal consumed by the next prompt for the same mood thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackContext {
    pub prior_rating: i32,
    pub prior_notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct PlaylistRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub mood_input: String,
    pub name: String,
    pub vibe_summary: Option<String>,
    pub platform: String, // "spotify" | "youtube_music"
    pub created_at: DateTime<Utc>,
    pub rating: Option<i32>,
    pub rating_notes: Option<String>,
    pub rated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct PlaylistSongRecord {
    pub id: Uuid,
    pub playlist_id: Uuid,
    pub position: i32,
    pub title: String,
    pub artist: String,
    pub reason: String,
}

/// Stored OAuth credentials for one (user, provider) pair.
#[derive(Debug, Clone, FromRow)]
pub struct ProviderAccount {
    pub owner_id: String,
    pub provider: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub external_user_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// Request / response DTOs

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub mood_input: String,
    pub genre_preference: Option<String>,
    pub era: Option<String>,
    pub platform: Option<Platform>,
    pub rating: Option<i32>,
    pub rating_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rating: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlaylistResponse {
    /// None when the draft was valid but the save failed (the playlist is
    /// still usable, just not in history).
    pub id: Option<Uuid>,
    pub name: String,
    pub vibe_summary: Option<String>,
    pub mood_input: String,
    pub platform: Platform,
    pub created_at: Option<DateTime<Utc>>,
    pub rating: Option<i32>,
    pub rating_notes: Option<String>,
    pub songs: Vec<SongEntry>,
}

impl PlaylistResponse {
    pub fn from_record(record: PlaylistRecord, songs: Vec<PlaylistSongRecord>) -> Self {
        let platform = Platform::parse(&record.platform).unwrap_or(Platform::Spotify);
        Self {
            id: Some(record.id),
            name: record.name,
            vibe_summary: record.vibe_summary,
            mood_input: record.mood_input,
            platform,
            created_at: Some(record.created_at),
            rating: record.rating,
            rating_notes: record.rating_notes,
            songs: songs
                .into_iter()
                .map(|s| SongEntry {
                    title: s.title,
                    artist: s.artist,
                    reason: s.reason,
                })
                .collect(),
        }
    }

    pub fn unsaved(draft: PlaylistDraft, mood_input: String, platform: Platform) -> Self {
        Self {
            id: None,
            name: draft.name,
            vibe_summary: draft.vibe_summary,
            mood_input,
            platform,
            created_at: None,
            rating: None,
            rating_notes: None,
            songs: draft.songs,
        }
    }
}

/// Outcome of exporting a playlist to a streaming provider.
#[derive(Debug, Serialize)]
pub struct ExportResult {
    pub url: String,
    pub songs_added: usize,
    pub songs_skipped: usize,
}
