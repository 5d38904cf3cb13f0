// End-to-end pipeline tests against scripted generation backends. The real
// backend never participates; every behavior here is deterministic.
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use moodlist_backend::controllers::gemini::{GenerationBackend, GeminiClient};
use moodlist_backend::controllers::playlist::PlaylistGenerator;
use moodlist_backend::controllers::prompt::{GenerationRequest, PromptPolicy};
use moodlist_backend::controllers::{feedback, mood};
use moodlist_backend::error::ApiError;
use moodlist_backend::models::mood::MoodCategory;
use moodlist_backend::models::playlist::MoodInput;

/// Backend fake that returns a canned payload and counts invocations.
struct ScriptedBackend {
    payload: String,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

fn well_formed_payload(count: usize) -> String {
    let songs: Vec<serde_json::Value> = (1..=count)
        .map(|i| {
            serde_json::json!({
                "title": format!("Track {}", i),
                "artist": format!("Band {}", i),
                "reason": format!("The hush in verse {} fits a sleepless room", i),
            })
        })
        .collect();
    serde_json::json!({
        "playlistName": "3am and can't sleep",
        "vibeAnalysis": "Quiet songs for a loud head.",
        "songs": songs,
    })
    .to_string()
}

fn input(text: &str) -> MoodInput {
    MoodInput {
        text: text.to_string(),
        genre_preference: None,
        era: None,
    }
}

#[tokio::test]
async fn test_sleepless_mood_flows_through_to_a_full_draft() {
    // "3am" routes to the reflective bucket before anything else matches.
    let profile = mood::classify("3am and can't sleep");
    assert_eq!(profile.category, MoodCategory::Reflective);

    let backend = ScriptedBackend::new(well_formed_payload(20));
    let generator = PlaylistGenerator::new(&backend, PromptPolicy::default());

    let draft = generator
        .generate_draft(&input("3am and can't sleep"), None)
        .await
        .unwrap();

    assert_eq!(backend.call_count(), 1);
    assert_eq!(draft.songs.len(), 20);
    assert_eq!(draft.name, "3am and can't sleep");
    assert_eq!(draft.vibe_summary.as_deref(), Some("Quiet songs for a loud head."));
}

#[tokio::test]
async fn test_missing_credential_fails_without_touching_the_network() {
    // A keyless client refuses before constructing the outbound request,
    // so no socket is ever opened.
    let keyless = GeminiClient::new(None, "gemini-2.5-flash");
    let generator = PlaylistGenerator::new(&keyless, PromptPolicy::default());

    let err = generator
        .generate_draft(&input("quiet evening"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Configuration("GEMINI_API_KEY")));
}

#[tokio::test]
async fn test_pipeline_surfaces_insufficient_songs() {
    let backend = ScriptedBackend::new(well_formed_payload(8));
    let generator = PlaylistGenerator::new(&backend, PromptPolicy::default());

    let err = generator
        .generate_draft(&input("bored"), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::InsufficientSongs { valid: 8, min: 15 }
    ));
}

#[tokio::test]
async fn test_pipeline_surfaces_malformed_output() {
    let backend = ScriptedBackend::new("sorry, no playlist today");
    let generator = PlaylistGenerator::new(&backend, PromptPolicy::default());

    let err = generator
        .generate_draft(&input("anything"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::MalformedOutput { .. }));
}

#[tokio::test]
async fn test_oversized_output_is_truncated_to_the_bound() {
    let backend = ScriptedBackend::new(well_formed_payload(40));
    let generator = PlaylistGenerator::new(&backend, PromptPolicy::default());

    let draft = generator
        .generate_draft(&input("everything at once"), None)
        .await
        .unwrap();
    assert_eq!(draft.songs.len(), 22);
    assert_eq!(draft.songs[0].title, "Track 1");
    assert_eq!(draft.songs[21].title, "Track 22");
}

#[tokio::test]
async fn test_feedback_context_reaches_the_composed_prompt() {
    // A backend that inspects the request it was handed.
    struct CapturingBackend {
        payload: String,
    }

    #[async_trait]
    impl GenerationBackend for CapturingBackend {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, ApiError> {
            assert!(request.user_context.contains("hidden gems"));
            assert!(request.system_rules.contains("between 15 and 22 songs"));
            Ok(self.payload.clone())
        }
    }

    let backend = CapturingBackend {
        payload: well_formed_payload(15),
    };
    let generator = PlaylistGenerator::new(&backend, PromptPolicy::default());
    let feedback = feedback::from_rating(Some(1), Some("way too obvious".to_string()));

    let draft = generator
        .generate_draft(&input("still restless"), feedback.as_ref())
        .await
        .unwrap();
    assert_eq!(draft.songs.len(), 15);
}
