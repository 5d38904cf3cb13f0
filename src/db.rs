use sqlx::postgres::PgPoolOptions;
use sqlx::types::chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::playlist::{
    Platform, PlaylistDraft, PlaylistRecord, PlaylistSongRecord, ProviderAccount,
};
use crate::secrets::SECRET_MANAGER;

/// History depth returned to the UI.
const HISTORY_LIMIT: i64 = 8;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new() -> Result<Self, sqlx::Error> {
        let database_url = SECRET_MANAGER.get("DATABASE_URL");

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Persists an accepted draft and its songs atomically. Either the whole
    /// playlist lands or nothing does.
    pub async fn create_playlist(
        &self,
        owner_id: &str,
        mood_input: &str,
        platform: Platform,
        draft: &PlaylistDraft,
    ) -> Result<(PlaylistRecord, Vec<PlaylistSongRecord>), sqlx::Error> {
        let playlist_id = Uuid::new_v4();
        let created_at = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO playlists (id, owner_id, mood_input, name, vibe_summary, platform, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(playlist_id)
        .bind(owner_id)
        .bind(mood_input)
        .bind(&draft.name)
        .bind(&draft.vibe_summary)
        .bind(platform.as_str())
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        let mut songs = Vec::with_capacity(draft.songs.len());
        for (position, song) in draft.songs.iter().enumerate() {
            let song_id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO playlist_songs (id, playlist_id, position, title, artist, reason)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(song_id)
            .bind(playlist_id)
            .bind(position as i32)
            .bind(&song.title)
            .bind(&song.artist)
            .bind(&song.reason)
            .execute(&mut *tx)
            .await?;

            songs.push(PlaylistSongRecord {
                id: song_id,
                playlist_id,
                position: position as i32,
                title: song.title.clone(),
                artist: song.artist.clone(),
                reason: song.reason.clone(),
            });
        }

        tx.commit().await?;

        let record = PlaylistRecord {
            id: playlist_id,
            owner_id: owner_id.to_string(),
            mood_input: mood_input.to_string(),
            name: draft.name.clone(),
            vibe_summary: draft.vibe_summary.clone(),
            platform: platform.as_str().to_string(),
            created_at,
            rating: None,
            rating_notes: None,
            rated_at: None,
        };

        Ok((record, songs))
    }

    /// Attaches a rating to a playlist. Returns false when the playlist does
    /// not exist or belongs to someone else.
    pub async fn rate_playlist(
        &self,
        playlist_id: Uuid,
        owner_id: &str,
        rating: i32,
        notes: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE playlists SET rating = $1, rating_notes = $2, rated_at = $3
             WHERE id = $4 AND owner_id = $5",
        )
        .bind(rating)
        .bind(notes)
        .bind(Utc::now())
        .bind(playlist_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_playlist(
        &self,
        playlist_id: Uuid,
        owner_id: &str,
    ) -> Result<Option<(PlaylistRecord, Vec<PlaylistSongRecord>)>, sqlx::Error> {
        let record = sqlx::query_as::<_, PlaylistRecord>(
            "SELECT * FROM playlists WHERE id = $1 AND owner_id = $2",
        )
        .bind(playlist_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        let record = match record {
            Some(r) => r,
            None => return Ok(None),
        };

        let songs = self.get_playlist_songs(playlist_id).await?;
        Ok(Some((record, songs)))
    }

    async fn get_playlist_songs(
        &self,
        playlist_id: Uuid,
    ) -> Result<Vec<PlaylistSongRecord>, sqlx::Error> {
        sqlx::query_as::<_, PlaylistSongRecord>(
            "SELECT * FROM playlist_songs WHERE playlist_id = $1 ORDER BY position",
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Most recent playlists for one user, newest first.
    pub async fn list_playlists(
        &self,
        owner_id: &str,
    ) -> Result<Vec<(PlaylistRecord, Vec<PlaylistSongRecord>)>, sqlx::Error> {
        let records = sqlx::query_as::<_, PlaylistRecord>(
            "SELECT * FROM playlists WHERE owner_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(owner_id)
        .bind(HISTORY_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let mut playlists = Vec::with_capacity(records.len());
        for record in records {
            let songs = self.get_playlist_songs(record.id).await?;
            playlists.push((record, songs));
        }
        Ok(playlists)
    }

    /// Rating and notes of the most recently rated playlist, if any. Feeds
    /// the next prompt; best-effort, last write wins.
    pub async fn latest_rating(
        &self,
        owner_id: &str,
    ) -> Result<Option<(i32, Option<String>)>, sqlx::Error> {
        let row = sqlx::query_as::<_, (i32, Option<String>)>(
            "SELECT rating, rating_notes FROM playlists
             WHERE owner_id = $1 AND rating IS NOT NULL
             ORDER BY rated_at DESC LIMIT 1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn upsert_provider_account(
        &self,
        account: &ProviderAccount,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO provider_accounts
                 (owner_id, provider, access_token, refresh_token, expires_at, external_user_id, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (owner_id, provider) DO UPDATE SET
                 access_token = EXCLUDED.access_token,
                 refresh_token = EXCLUDED.refresh_token,
                 expires_at = EXCLUDED.expires_at,
                 external_user_id = EXCLUDED.external_user_id,
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(&account.owner_id)
        .bind(&account.provider)
        .bind(&account.access_token)
        .bind(&account.refresh_token)
        .bind(account.expires_at)
        .bind(&account.external_user_id)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_provider_account(
        &self,
        owner_id: &str,
        provider: Platform,
    ) -> Result<Option<ProviderAccount>, sqlx::Error> {
        sqlx::query_as::<_, ProviderAccount>(
            "SELECT * FROM provider_accounts WHERE owner_id = $1 AND provider = $2",
        )
        .bind(owner_id)
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete_provider_account(
        &self,
        owner_id: &str,
        provider: Platform,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM provider_accounts WHERE owner_id = $1 AND provider = $2")
                .bind(owner_id)
                .bind(provider.as_str())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
