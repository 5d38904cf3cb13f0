// Response validator & normalizer: nothing structurally invalid or
// under-filled from the backend gets past this module.
use serde_json::Value;
use tracing::warn;

use crate::error::ApiError;
use crate::models::playlist::{PlaylistDraft, SongCountBounds, SongEntry};

/// Artists may repeat at most this often before the diversity warning fires.
/// Observability only; repeats are never dropped for it.
const ARTIST_REPEAT_CAP: usize = 2;

/// Parses raw backend output into a canonical draft, enforcing the hard
/// invariants: required fields, song count within bounds, no duplicate
/// (title, artist) pairs.
pub fn validate(raw: &str, bounds: &SongCountBounds) -> Result<PlaylistDraft, ApiError> {
    let json = extract_json(raw).ok_or_else(|| ApiError::MalformedOutput {
        reason: "no JSON object found in output".to_string(),
        raw: raw.to_string(),
    })?;

    let value: Value = serde_json::from_str(&json).map_err(|e| ApiError::MalformedOutput {
        reason: format!("JSON parse failed: {}", e),
        raw: raw.to_string(),
    })?;

    let name = value["playlistName"]
        .as_str()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::MalformedOutput {
            reason: "missing or empty playlistName".to_string(),
            raw: raw.to_string(),
        })?
        .to_string();

    let vibe_summary = value["vibeAnalysis"]
        .as_str()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let entries = value["songs"].as_array().ok_or_else(|| ApiError::MalformedOutput {
        reason: "missing songs array".to_string(),
        raw: raw.to_string(),
    })?;

    // Coerce entries, dropping the ones missing a required field.
    let mut dropped_invalid = 0usize;
    let mut songs: Vec<SongEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        match coerce_song(entry) {
            Some(song) => songs.push(song),
            None => dropped_invalid += 1,
        }
    }

    // De-duplicate by case-insensitive (title, artist), keeping first
    // occurrences in order.
    let mut dropped_duplicates = 0usize;
    let mut seen: Vec<(String, String)> = Vec::with_capacity(songs.len());
    songs.retain(|song| {
        let key = (song.title.to_lowercase(), song.artist.to_lowercase());
        if seen.contains(&key) {
            dropped_duplicates += 1;
            false
        } else {
            seen.push(key);
            true
        }
    });

    if dropped_invalid > 0 || dropped_duplicates > 0 {
        warn!(
            dropped_invalid,
            dropped_duplicates,
            remaining = songs.len(),
            "discarded unusable song entries"
        );
    }

    // Below the minimum even after best-effort recovery: reject the draft.
    if songs.len() < bounds.min {
        return Err(ApiError::InsufficientSongs {
            valid: songs.len(),
            min: bounds.min,
        });
    }

    // Above the maximum is a soft-rule violation: truncate, don't reject.
    if songs.len() > bounds.max {
        warn!(
            returned = songs.len(),
            max = bounds.max,
            "truncating oversized song list"
        );
        songs.truncate(bounds.max);
    }

    report_artist_diversity(&songs);

    Ok(PlaylistDraft {
        name,
        vibe_summary,
        songs,
    })
}

fn coerce_song(entry: &Value) -> Option<SongEntry> {
    let field = |name: &str| {
        entry[name]
            .as_str()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    Some(SongEntry {
        title: field("title")?,
        artist: field("artist")?,
        reason: field("reason")?,
    })
}

/// Diversity statistics, emitted as a warning signal only; the artist cap
/// is an instruction to the backend, not an enforced invariant.
fn report_artist_diversity(songs: &[SongEntry]) {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for song in songs {
        let artist = song.artist.to_lowercase();
        match counts.iter_mut().find(|(a, _)| *a == artist) {
            Some((_, n)) => *n += 1,
            None => counts.push((artist, 1)),
        }
    }
    let over_cap = counts.iter().filter(|(_, n)| *n > ARTIST_REPEAT_CAP).count();
    if over_cap > 0 {
        warn!(over_cap, cap = ARTIST_REPEAT_CAP, "low artist diversity in draft");
    }
}

/// Pulls a JSON object out of possibly fenced or chatty model output.
fn extract_json(text: &str) -> Option<String> {
    // Fenced code block first.
    if let Some(start) = text.find("```json") {
        let json_start = start + 7;
        if let Some(end) = text[json_start..].find("```") {
            return Some(text[json_start..json_start + end].trim().to_string());
        }
    }
    if let Some(start) = text.find("```\n") {
        let json_start = start + 4;
        if let Some(end) = text[json_start..].find("```") {
            return Some(text[json_start..json_start + end].trim().to_string());
        }
    }

    // Raw object.
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(text[start..=end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song_json(i: usize) -> Value {
        serde_json::json!({
            "title": format!("Song {}", i),
            "artist": format!("Artist {}", i),
            "reason": format!("Reason {} is specific enough", i),
        })
    }

    fn draft_json(count: usize) -> String {
        let songs: Vec<Value> = (1..=count).map(song_json).collect();
        serde_json::json!({
            "playlistName": "late night static",
            "vibeAnalysis": "Hushed and a little unmoored.",
            "songs": songs,
        })
        .to_string()
    }

    fn bounds() -> SongCountBounds {
        SongCountBounds { min: 15, max: 22 }
    }

    #[test]
    fn test_valid_draft_passes_through_unchanged() {
        let raw = draft_json(18);
        let draft = validate(&raw, &bounds()).unwrap();
        assert_eq!(draft.name, "late night static");
        assert_eq!(draft.vibe_summary.as_deref(), Some("Hushed and a little unmoored."));
        assert_eq!(draft.songs.len(), 18);
        // Idempotent: re-serializing and re-validating yields the same draft.
        let reserialized = serde_json::json!({
            "playlistName": draft.name.clone(),
            "vibeAnalysis": draft.vibe_summary.clone(),
            "songs": draft.songs.clone(),
        })
        .to_string();
        let again = validate(&reserialized, &bounds()).unwrap();
        assert_eq!(again, draft);
    }

    #[test]
    fn test_too_few_valid_songs_is_rejected_not_truncated() {
        let raw = draft_json(8);
        match validate(&raw, &bounds()) {
            Err(ApiError::InsufficientSongs { valid, min }) => {
                assert_eq!(valid, 8);
                assert_eq!(min, 15);
            }
            other => panic!("expected InsufficientSongs, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_list_is_truncated_in_original_order() {
        let raw = draft_json(40);
        let draft = validate(&raw, &bounds()).unwrap();
        assert_eq!(draft.songs.len(), 22);
        assert_eq!(draft.songs[0].title, "Song 1");
        assert_eq!(draft.songs[21].title, "Song 22");
    }

    #[test]
    fn test_case_insensitive_duplicates_keep_first_occurrence() {
        let mut songs: Vec<Value> = (1..=15).map(song_json).collect();
        songs.push(serde_json::json!({
            "title": "SONG 3",
            "artist": "artist 3",
            "reason": "same pair, different case",
        }));
        let raw = serde_json::json!({
            "playlistName": "dupes",
            "songs": songs,
        })
        .to_string();
        let draft = validate(&raw, &bounds()).unwrap();
        assert_eq!(draft.songs.len(), 15);
        assert_eq!(
            draft.songs.iter().filter(|s| s.title.eq_ignore_ascii_case("song 3")).count(),
            1
        );
        // First occurrence wins, original casing preserved.
        assert_eq!(draft.songs[2].title, "Song 3");
    }

    #[test]
    fn test_entries_missing_fields_are_dropped_not_fatal() {
        let mut songs: Vec<Value> = (1..=16).map(song_json).collect();
        songs.push(serde_json::json!({ "title": "No Artist", "reason": "orphaned" }));
        songs.push(serde_json::json!({ "title": "No Reason", "artist": "Someone" }));
        let raw = serde_json::json!({
            "playlistName": "partial entries",
            "songs": songs,
        })
        .to_string();
        let draft = validate(&raw, &bounds()).unwrap();
        assert_eq!(draft.songs.len(), 16);
    }

    #[test]
    fn test_dropping_below_minimum_rejects_the_whole_response() {
        let mut songs: Vec<Value> = (1..=14).map(song_json).collect();
        songs.push(serde_json::json!({ "title": "No Reason", "artist": "Someone" }));
        let raw = serde_json::json!({
            "playlistName": "mostly broken",
            "songs": songs,
        })
        .to_string();
        assert!(matches!(
            validate(&raw, &bounds()),
            Err(ApiError::InsufficientSongs { valid: 14, .. })
        ));
    }

    #[test]
    fn test_fenced_output_is_unwrapped() {
        let raw = format!("Here you go!\n```json\n{}\n```\nEnjoy.", draft_json(15));
        let draft = validate(&raw, &bounds()).unwrap();
        assert_eq!(draft.songs.len(), 15);
    }

    #[test]
    fn test_non_json_output_is_malformed_and_keeps_raw_text() {
        let raw = "I'm sorry, I can't produce a playlist right now.";
        match validate(raw, &bounds()) {
            Err(ApiError::MalformedOutput { raw: kept, .. }) => assert_eq!(kept, raw),
            other => panic!("expected MalformedOutput, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_playlist_name_is_malformed() {
        let raw = serde_json::json!({
            "songs": (1..=15).map(song_json).collect::<Vec<_>>(),
        })
        .to_string();
        assert!(matches!(
            validate(&raw, &bounds()),
            Err(ApiError::MalformedOutput { .. })
        ));
    }

    #[test]
    fn test_missing_vibe_is_fine() {
        let raw = serde_json::json!({
            "playlistName": "no vibe line",
            "songs": (1..=15).map(song_json).collect::<Vec<_>>(),
        })
        .to_string();
        let draft = validate(&raw, &bounds()).unwrap();
        assert!(draft.vibe_summary.is_none());
    }
}
