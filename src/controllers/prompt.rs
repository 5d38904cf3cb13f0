// Prompt composer: assembles the instruction payload for the generative
// backend. Soft preferences (hidden-gem ratio, artist cap, naming style)
// live only in this text; hard invariants are re-enforced by the validator.
use serde_json::{json, Value};

use crate::models::mood::MoodProfile;
use crate::models::playlist::{FeedbackContext, MoodInput, SongCountBounds};
use crate::secrets::SECRET_MANAGER;

/// Per-deployment knobs for the rule text.
#[derive(Debug, Clone, Copy)]
pub struct PromptPolicy {
    pub bounds: SongCountBounds,
    /// When the user names a specific artist: true suspends the
    /// repeat-artist cap entirely, false only relaxes it.
    pub artist_lock_bypasses_cap: bool,
}

impl Default for PromptPolicy {
    fn default() -> Self {
        Self {
            bounds: SongCountBounds::default(),
            artist_lock_bypasses_cap: true,
        }
    }
}

impl PromptPolicy {
    pub fn from_secrets() -> Self {
        Self {
            bounds: SongCountBounds::default(),
            artist_lock_bypasses_cap: SECRET_MANAGER.get_bool("ARTIST_LOCK_BYPASSES_CAP"),
        }
    }
}

/// The fully composed payload for one backend call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_rules: String,
    pub user_context: String,
    pub output_schema: Value,
    pub sampling: SamplingParams,
}

#[derive(Debug, Clone, Copy)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.9,
            top_p: 0.95,
        }
    }
}

fn system_rules(policy: &PromptPolicy) -> String {
    let artist_lock_rule = if policy.artist_lock_bypasses_cap {
        "If the mood input names a specific artist, pick exclusively from that artist's catalog; the per-artist cap does not apply in that case."
    } else {
        "If the mood input names a specific artist, draw mostly from that artist's catalog; the per-artist cap is relaxed but still avoid filling the list with one record."
    };

    format!(
        r#"You are an expert music curator who deeply understands human emotions and how they translate to music.

YOUR MISSION:
Create playlists that truly resonate with what the user is feeling. Don't just match genres - capture the EXACT emotional frequency.

CORE RULES:
1. Generate between {min} and {max} songs (never fewer than {min}, never more than {max})
2. Include 60-70% lesser-known tracks (hidden gems)
3. Maximum 2 songs per artist
4. {artist_lock_rule}
5. Cross genres freely if emotionally accurate
6. Each reason must be SPECIFIC to that song (no generic "upbeat vibe")
7. Create an emotional arc - the playlist should evolve

NAMING:
The playlist name must be short and literal, built from the user's own words. No metaphors, no poetry, no generic titles like "Mood Mix" or "Vibes".

VIBE:
Optionally add a 2-3 sentence vibe description in evocative, non-technical language.

EXAMPLES OF GOOD REASONS:
- "Haunting harmonies over sparse piano mirror that empty-room loneliness"
- "The way it builds from whisper to scream matches how grief ambushes you"
EXAMPLES OF BAD REASONS:
- "Great song for this mood" (too generic)
- "Popular track" (not a reason)

Always return exactly the JSON shape described by the response schema: playlistName (string), optional vibeAnalysis (string), and songs (array of {{title, artist, reason}})."#,
        min = policy.bounds.min,
        max = policy.bounds.max,
        artist_lock_rule = artist_lock_rule,
    )
}

fn output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "playlistName": { "type": "string" },
            "vibeAnalysis": { "type": "string" },
            "songs": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "artist": { "type": "string" },
                        "reason": { "type": "string" }
                    },
                    "required": ["title", "artist", "reason"]
                }
            }
        },
        "required": ["playlistName", "songs"]
    })
}

/// Builds the request for one generation call with the default policy.
pub fn compose(
    input: &MoodInput,
    profile: Option<&MoodProfile>,
    feedback: Option<&FeedbackContext>,
) -> GenerationRequest {
    compose_with_policy(input, profile, feedback, &PromptPolicy::default())
}

pub fn compose_with_policy(
    input: &MoodInput,
    profile: Option<&MoodProfile>,
    feedback: Option<&FeedbackContext>,
    policy: &PromptPolicy,
) -> GenerationRequest {
    let mut context = format!("Mood input: {}\n", input.text);

    if let Some(profile) = profile {
        context.push_str(&format!(
            "\nDETECTED MOOD: {}\nMUSICAL CHARACTERISTICS FOR THIS MOOD:\n- Suggested tempo: {}\n- Energy level: {}\n- Genre suggestions: {}\n",
            profile.category.as_str(),
            profile.tempo_range,
            profile.energy_level,
            profile.genre_hints.join(", "),
        ));
    }

    if let Some(genre) = input.genre_preference.as_deref().filter(|g| !g.trim().is_empty()) {
        context.push_str(&format!("\nThe user leans toward: {}\n", genre));
    }
    if let Some(era) = input.era.as_deref().filter(|e| !e.trim().is_empty()) {
        context.push_str(&format!("Preferred era: {}\n", era));
    }

    if let Some(feedback) = feedback {
        context.push_str(&format!(
            "\nFEEDBACK ON THE PREVIOUS PLAYLIST (rated {}/5): {}\n",
            feedback.prior_rating,
            feedback.directive(),
        ));
        if let Some(notes) = feedback.prior_notes.as_deref() {
            context.push_str(&format!("The user added: \"{}\"\n", notes));
        }
    }

    context.push_str("\nNow create the perfect playlist for this feeling.");

    GenerationRequest {
        system_rules: system_rules(policy),
        user_context: context,
        output_schema: output_schema(),
        sampling: SamplingParams::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::{feedback, mood};

    fn input(text: &str) -> MoodInput {
        MoodInput {
            text: text.to_string(),
            genre_preference: None,
            era: None,
        }
    }

    #[test]
    fn test_compose_always_carries_schema_and_bounds() {
        let request = compose(&input("tired but hopeful"), None, None);
        let schema = request.output_schema;
        assert!(schema["properties"]["playlistName"].is_object());
        assert!(schema["properties"]["songs"].is_object());
        assert!(request.system_rules.contains("between 15 and 22 songs"));
    }

    #[test]
    fn test_compose_includes_detected_mood_characteristics() {
        let profile = mood::classify("3am and can't sleep");
        let request = compose(&input("3am and can't sleep"), Some(&profile), None);
        assert!(request.user_context.contains("DETECTED MOOD: reflective"));
        assert!(request.user_context.contains("singer-songwriter"));
    }

    #[test]
    fn test_low_rating_directive_appears_in_context() {
        let feedback = feedback::from_rating(Some(2), Some("too obvious".to_string())).unwrap();
        let request = compose(&input("still restless"), None, Some(&feedback));
        assert!(request.user_context.contains("hidden gems"));
        assert!(request.user_context.contains("avoid mainstream"));
        assert!(request.user_context.contains("too obvious"));
    }

    #[test]
    fn test_high_rating_does_not_push_hidden_gems() {
        let feedback = feedback::from_rating(Some(5), None).unwrap();
        let request = compose(&input("more of that"), None, Some(&feedback));
        assert!(!request.user_context.contains("avoid mainstream"));
        assert!(request.user_context.contains("Preserve the vibe"));
    }

    #[test]
    fn test_genre_and_era_hints_are_threaded_through() {
        let request = compose(
            &MoodInput {
                text: "slow morning".to_string(),
                genre_preference: Some("jazz".to_string()),
                era: Some("70s".to_string()),
            },
            None,
            None,
        );
        assert!(request.user_context.contains("jazz"));
        assert!(request.user_context.contains("70s"));
    }

    #[test]
    fn test_artist_lock_policy_changes_rule_text() {
        let bypass = PromptPolicy {
            artist_lock_bypasses_cap: true,
            ..PromptPolicy::default()
        };
        let relaxed = PromptPolicy {
            artist_lock_bypasses_cap: false,
            ..PromptPolicy::default()
        };
        let a = compose_with_policy(&input("only bowie today"), None, None, &bypass);
        let b = compose_with_policy(&input("only bowie today"), None, None, &relaxed);
        assert!(a.system_rules.contains("cap does not apply"));
        assert!(b.system_rules.contains("cap is relaxed"));
    }

    #[test]
    fn test_sampling_params_match_deployment_defaults() {
        let request = compose(&input("anything"), None, None);
        assert_eq!(request.sampling.temperature, 0.9);
        assert_eq!(request.sampling.top_p, 0.95);
    }
}
